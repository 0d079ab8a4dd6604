//! Occupancy-replay dispatch: walk each person's trajectory through the
//! attendance CSV and let a behavior react to every visit

use crate::error::ScenarioResult;
use crate::observation::{ObsContext, ObsWriter, ObservationGenerator};
use crate::random::SimRng;
use crate::types::{MetaSensorId, PersonId, SensorId, SpaceId};
use chrono::NaiveDateTime;
use std::collections::BTreeSet;

/// One (space, start, end) stop of a person's day
pub type Visit = (SpaceId, NaiveDateTime, NaiveDateTime);

/// Behavior plugged into the occupancy-replay shape
pub trait OccupancyBehavior {
    /// Header of the observation CSV
    fn header(&self) -> &'static str;

    /// Human-readable generator name for the log banner
    fn kind(&self) -> &'static str;

    /// React to one visit; `cover` holds the sensors watching the space
    fn update(
        &mut self,
        person: PersonId,
        visit: &Visit,
        cover: &BTreeSet<SensorId>,
        rng: &mut SimRng,
    );

    /// Flush whatever `update` staged for this person
    fn record(&mut self, person: PersonId, out: &mut ObsWriter) -> ScenarioResult<()>;

    /// Emit anything deferred to the end of the replay
    fn record_rest(&mut self, out: &mut ObsWriter) -> ScenarioResult<()> {
        let _ = out;
        Ok(())
    }
}

/// The occupancy-replay driver
#[derive(Debug)]
pub struct OccupancyReplay<B> {
    behavior: B,
}

impl<B> OccupancyReplay<B> {
    /// Wrap a behavior
    pub fn new(behavior: B) -> Self {
        Self { behavior }
    }
}

impl<B: OccupancyBehavior> ObservationGenerator for OccupancyReplay<B> {
    fn header(&self) -> &'static str {
        self.behavior.header()
    }

    fn banner(&self, metasensor: MetaSensorId) -> String {
        format!("{} data from metasensor {}", self.behavior.kind(), metasensor)
    }

    fn generate(
        &mut self,
        ctx: &ObsContext<'_>,
        out: &mut ObsWriter,
        rng: &mut SimRng,
    ) -> ScenarioResult<()> {
        let coverage = ctx.coverage_map();
        let trajectories = ctx.trajectory_map();
        let empty = BTreeSet::new();

        for &person in ctx.world.people.ids() {
            let Some(visits) = trajectories.get(&person) else {
                continue;
            };
            for visit in visits {
                let cover = coverage.get(&visit.0).unwrap_or(&empty);
                self.behavior.update(person, visit, cover, rng);
                self.behavior.record(person, out)?;
            }
        }
        self.behavior.record_rest(out)
    }
}
