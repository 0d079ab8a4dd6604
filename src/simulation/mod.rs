//! The per-day agent simulation loop
//!
//! Days step from the configured start to end date. Within a day, people
//! are visited in a fresh uniform shuffle. Each active person arrives (an
//! out-event row from midnight to their start), then repeatedly picks an
//! event (recalling a previously attended one with probability
//! `1 - PAST_PR`, otherwise enumerating every event's logistics), attends
//! it with movement rows through intermediate spaces, and finally leaves:
//! a route to the outside space and an out-event row to 23:59:59. Every
//! row lands in `data.csv`; the narrative is tee'd to stdout and
//! `data_log.txt`.

use crate::calendar::{day_end, day_start, format_datetime, NormalTime, TimePeriod};
use crate::data::World;
use crate::error::{ScenarioError, ScenarioResult};
use crate::model::{EventLogistics, Trajectory};
use crate::output::{create_csv, TeeLog};
use crate::random::{pick_weighted, shuffled, SimRng};
use crate::types::{EventId, PersonId, SpaceId};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Probability of skipping the recurring-event recall and searching fresh
/// events instead
const PAST_PR: f64 = 0.8;

/// Header of the attendance CSV
const DATA_HEADER: &str = "PersonID,EventID,SpaceID,StartDateTime,EndDateTime";

/// Duration distribution of one leisure stint
fn leisure_time() -> NormalTime {
    NormalTime::new(Duration::minutes(10), Duration::minutes(1))
}

/// The synthetic-attendance generator
#[derive(Debug)]
pub struct Simulator {
    world: World,
    rng: SimRng,
    out: BufWriter<File>,
    log: TeeLog,
}

impl Simulator {
    /// Open the output streams and prepare a run over the loaded world
    pub fn new(world: World, rng: SimRng) -> ScenarioResult<Self> {
        std::fs::create_dir_all(&world.paths.output)?;
        let out = create_csv(&world.paths.data_csv(), DATA_HEADER)?;
        let mut log = TeeLog::create(&world.paths.data_log())?;
        log.line("Starting to generate synthetic data");
        log.line("");
        Ok(Self {
            world,
            rng,
            out,
            log,
        })
    }

    /// Consume the simulator and hand the world back (the registries carry
    /// the run's final occupancy and enrollment state)
    pub fn into_world(self) -> World {
        self.world
    }

    /// Run the full day-by-day simulation
    pub fn run(&mut self) -> ScenarioResult<()> {
        let mut day = self.world.window.start;
        while day <= self.world.window.end {
            self.run_day(day)?;
            day += Duration::days(1);
        }
        self.out.flush()?;
        self.log.flush();
        Ok(())
    }

    fn run_day(&mut self, day: NaiveDate) -> ScenarioResult<()> {
        self.log.line("=======================");
        self.log.line(format!("Starting day {}", day));
        self.log.line("=======================");

        let order = shuffled(self.world.people.ids(), &mut self.rng);
        for pid in order {
            let active = {
                let person = self
                    .world
                    .people
                    .get(pid)
                    .ok_or_else(|| ScenarioError::data(format!("person {} absent", pid)))?;
                self.world
                    .query_person(person, day_start(day), &mut self.rng)
            };
            let Some(active) = active else {
                continue; // not present today
            };
            self.log.line(format!("Person {}: {}", pid, active));

            let mut curr = active.start;
            self.arrive(pid, curr)?;
            while curr <= active.end {
                let logistics = match self.search_prev_events(pid, curr)? {
                    Some(el) => el,
                    None => self.search_new_events(pid, curr)?,
                };
                self.attend_event(pid, &logistics, &mut curr)?;
            }
            self.leave(pid, &mut curr, day)?;
        }

        self.log.line("=======================");
        self.log.line(format!("Finished day {}", day));
        self.log.line("=======================");
        self.log.line("");
        Ok(())
    }

    /// Record the pre-arrival out-event row from midnight to `curr`
    fn arrive(&mut self, pid: PersonId, curr: NaiveDateTime) -> ScenarioResult<()> {
        let space = self.person(pid)?.current_space;
        self.record(pid, EventId::OUT, space, day_start(curr.date()), curr)
    }

    /// Route the person outside and record the trailing out-event row
    fn leave(
        &mut self,
        pid: PersonId,
        curr: &mut NaiveDateTime,
        day: NaiveDate,
    ) -> ScenarioResult<()> {
        let from = self.person(pid)?.current_space;
        let traj = self
            .world
            .trajectories
            .get_path(from, SpaceId::OUTSIDE, &mut self.rng)?;
        self.move_person(pid, EventId::OUT, &traj, curr)?;
        let end = day_end(day);
        let start = (*curr).min(end);
        self.record(pid, EventId::OUT, SpaceId::OUTSIDE, start, end)
    }

    /// With probability `1 - PAST_PR`, offer previously attended events whose
    /// profile matches now
    fn search_prev_events(
        &mut self,
        pid: PersonId,
        curr: NaiveDateTime,
    ) -> ScenarioResult<Option<EventLogistics>> {
        if self.rng.gen::<f64>() < PAST_PR {
            return Ok(None); // go to fresh events
        }

        let (from, attended) = {
            let person = self.person(pid)?;
            (
                person.current_space,
                person.attended.iter().cloned().collect::<Vec<_>>(),
            )
        };

        let mut possible = Vec::new();
        for mut el in attended {
            let period = match self.world.events.get(el.event) {
                Some(event) => self.world.query_event(event, curr, &mut self.rng),
                None => None,
            };
            let Some(period) = period else {
                continue;
            };
            el.trajectory = self
                .world
                .trajectories
                .get_path(from, el.space, &mut self.rng)?;
            el.period = period;
            self.log.line(format!("    considering past event {}", el));
            possible.push(el);
        }

        if possible.is_empty() {
            Ok(None)
        } else {
            self.select_event(possible, pid).map(Some)
        }
    }

    /// Enumerate every event's logistics; fall back to a leisure stint when
    /// nothing is attendable
    fn search_new_events(
        &mut self,
        pid: PersonId,
        curr: NaiveDateTime,
    ) -> ScenarioResult<EventLogistics> {
        let mut possible = Vec::new();
        for eid in self.world.events.ids().to_vec() {
            if let Some(el) = self.produce_logistics(eid, pid, curr)? {
                self.log.line(format!("    consider new event {}", el));
                possible.push(el);
            }
        }

        if !possible.is_empty() {
            return self.select_event(possible, pid);
        }

        // Leisure fallback: a short stint at the outside space
        let from = self.person(pid)?.current_space;
        let trajectory = self
            .world
            .trajectories
            .get_path(from, SpaceId::OUTSIDE, &mut self.rng)?;
        let stint = std::cmp::max(
            leisure_time().sample(&mut self.rng),
            Duration::seconds(1),
        );
        Ok(EventLogistics {
            event: EventId::LEISURE,
            space: SpaceId::OUTSIDE,
            metaevent: crate::types::MetaEventId::LEISURE,
            trajectory,
            period: TimePeriod::new(curr, curr + stint),
        })
    }

    /// Build the logistics of attending event `eid` starting from `curr`, or
    /// `None` if capacity, occupancy, the time profile, or a constraint
    /// rejects it
    fn produce_logistics(
        &mut self,
        eid: EventId,
        pid: PersonId,
        curr: NaiveDateTime,
    ) -> ScenarioResult<Option<EventLogistics>> {
        let (open_to_all, attendable, spaces, metaevent) = {
            let event = self
                .world
                .events
                .get(eid)
                .ok_or_else(|| ScenarioError::data(format!("event {} absent", eid)))?;
            let mid = self.person(pid)?.metaperson;
            (
                event.is_open_to_all(),
                event.can_attend(mid),
                event.spaces.clone(),
                event.metaevent,
            )
        };
        if !open_to_all && !attendable {
            return Ok(None);
        }

        let from = self.person(pid)?.current_space;

        // Keep only routes whose destination has room at the expected arrival
        let mut routes: Vec<Trajectory> = Vec::new();
        for space_id in spaces {
            let traj = self
                .world
                .trajectories
                .get_path(from, space_id, &mut self.rng)?;
            let arrival = curr + traj.total_time();
            let space = self.world.spaces.get(space_id).ok_or_else(|| {
                ScenarioError::data(format!("event {}: space {} absent", eid, space_id))
            })?;
            if space.is_unlimited() || space.occupancy_at(arrival) + 1 < space.capacity {
                routes.push(traj);
            }
        }
        if routes.is_empty() {
            return Ok(None);
        }

        let trajectory = routes[self.rng.gen_range(0..routes.len())].clone();
        let space = trajectory.dest().unwrap_or(from);

        let period = {
            let event = self
                .world
                .events
                .get(eid)
                .ok_or_else(|| ScenarioError::data(format!("event {} absent", eid)))?;
            self.world.query_event(event, curr, &mut self.rng)
        };
        let Some(period) = period else {
            return Ok(None);
        };

        // Cross-cutting constraints, short-circuiting
        {
            let person = self
                .world
                .people
                .get(pid)
                .ok_or_else(|| ScenarioError::data(format!("person {} absent", pid)))?;
            let event = self
                .world
                .events
                .get(eid)
                .ok_or_else(|| ScenarioError::data(format!("event {} absent", eid)))?;
            if !self
                .world
                .constraints
                .check_cp_constraints(space, person, curr, &mut self.rng)
                || !self
                    .world
                    .constraints
                    .check_ce_constraints(space, event, curr, &mut self.rng)
                || !self
                    .world
                    .constraints
                    .check_pe_constraints(person, event, curr)
            {
                return Ok(None);
            }
        }

        Ok(Some(EventLogistics {
            event: eid,
            space,
            metaevent,
            trajectory,
            period,
        }))
    }

    /// Weighted choice of a metaevent by the person's affinities, then a
    /// uniform choice among that metaevent's candidates
    fn select_event(
        &mut self,
        mut possible: Vec<EventLogistics>,
        pid: PersonId,
    ) -> ScenarioResult<EventLogistics> {
        let metaperson = self.person(pid)?.metaperson;
        let affinity = self
            .world
            .metapeople
            .get(metaperson)
            .ok_or_else(|| ScenarioError::data(format!("metaperson {} absent", metaperson)))?;

        let mids: Vec<crate::types::MetaEventId> =
            possible.iter().map(|el| el.metaevent).collect();
        let weights: Vec<f64> = mids.iter().map(|&m| affinity.affinity_for(m)).collect();
        let chosen = *pick_weighted(&mids, &weights, &mut self.rng)
            .ok_or_else(|| ScenarioError::invariant("event selection over empty candidates"))?;

        possible.retain(|el| el.metaevent == chosen);
        let index = self.rng.gen_range(0..possible.len());
        Ok(possible.swap_remove(index))
    }

    /// Attend the chosen event: bookkeeping, movement, the attendance row,
    /// and the clock advance
    fn attend_event(
        &mut self,
        pid: PersonId,
        logistics: &EventLogistics,
        curr: &mut NaiveDateTime,
    ) -> ScenarioResult<()> {
        self.log.line(format!("Person {}: {}", pid, logistics));

        if logistics.event != EventId::LEISURE && logistics.event != EventId::OUT {
            let metaperson = {
                let person = self
                    .world
                    .people
                    .get_mut(pid)
                    .ok_or_else(|| ScenarioError::data(format!("person {} absent", pid)))?;
                person.add_attended(logistics.clone());
                person.metaperson
            };
            if let Some(event) = self.world.events.get_mut(logistics.event) {
                event.enroll(metaperson);
            }
        }

        self.move_person(pid, logistics.event, &logistics.trajectory, curr)?;
        self.record(
            pid,
            logistics.event,
            logistics.space,
            *curr,
            logistics.period.end,
        )?;
        *curr = logistics.period.end;
        Ok(())
    }

    /// Walk the trajectory's intermediate hops, recording a transit row per
    /// space. Departure waits for the occupied space's next open second; a
    /// day with no opening falls back to the expected departure time.
    fn move_person(
        &mut self,
        pid: PersonId,
        eid: EventId,
        trajectory: &Trajectory,
        curr: &mut NaiveDateTime,
    ) -> ScenarioResult<()> {
        if trajectory.len() <= 1 {
            return Ok(()); // already at the target space
        }
        for i in 0..trajectory.len() - 1 {
            let expected = *curr + trajectory.deltas[i];
            let here = self.person(pid)?.current_space;
            let actual = self
                .world
                .spaces
                .get(here)
                .and_then(|space| space.next_open_time(expected))
                .unwrap_or(expected);
            self.record(pid, eid, trajectory.spaces[i], *curr, actual)?;
            *curr = actual;
        }
        Ok(())
    }

    /// Write one attendance row, moving the person and counting occupancy
    fn record(
        &mut self,
        pid: PersonId,
        eid: EventId,
        space_id: SpaceId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> ScenarioResult<()> {
        {
            let person = self
                .world
                .people
                .get_mut(pid)
                .ok_or_else(|| ScenarioError::data(format!("person {} absent", pid)))?;
            person.current_space = space_id;
        }
        let space = self
            .world
            .spaces
            .get_mut(space_id)
            .ok_or_else(|| ScenarioError::data(format!("space {} absent", space_id)))?;
        space.insert_occupancy(start, end);
        writeln!(
            self.out,
            "{},{},{},{},{}",
            pid,
            eid,
            space_id,
            format_datetime(start),
            format_datetime(end)
        )?;
        Ok(())
    }

    fn person(&self, pid: PersonId) -> ScenarioResult<&crate::model::Person> {
        self.world
            .people
            .get(pid)
            .ok_or_else(|| ScenarioError::data(format!("person {} absent", pid)))
    }
}
