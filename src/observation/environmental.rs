//! Environmental dispatch: step every sensor of the metasensor through each
//! simulated day at a fixed cadence

use crate::calendar::{day_end, day_start, epoch_seconds};
use crate::error::ScenarioResult;
use crate::interval::IntervalMap;
use crate::model::Sensor;
use crate::observation::{ObsContext, ObsWriter, ObservationGenerator};
use crate::random::SimRng;
use crate::types::{MetaSensorId, PersonId, SpaceId};
use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};

/// Who is present where, precomputed from the attendance CSV
pub type AttendanceBySpace = BTreeMap<SpaceId, IntervalMap<BTreeSet<PersonId>>>;

/// Behavior plugged into the environmental shape
pub trait EnvironmentalBehavior {
    /// Header of the observation CSV
    fn header(&self) -> &'static str;

    /// Human-readable generator name for the log banner
    fn kind(&self) -> &'static str;

    /// Sampling cadence; the default is one minute
    fn step(&self) -> Duration {
        Duration::minutes(1)
    }

    /// Advance the sensor's state to `now`
    fn update(
        &mut self,
        sensor: &Sensor,
        now: NaiveDateTime,
        attendance: &AttendanceBySpace,
        rng: &mut SimRng,
    );

    /// Emit the sensor's current state
    fn record(&mut self, sensor: &Sensor, out: &mut ObsWriter) -> ScenarioResult<()>;
}

/// Count of people in the spaces a sensor covers at one instant
pub fn people_covered(sensor: &Sensor, now: NaiveDateTime, attendance: &AttendanceBySpace) -> usize {
    let at = epoch_seconds(now);
    sensor
        .coverage
        .spaces()
        .iter()
        .filter_map(|space| attendance.get(space))
        .filter_map(|map| map.get(at))
        .map(BTreeSet::len)
        .sum()
}

/// The environmental-tick driver
#[derive(Debug)]
pub struct EnvironmentalSampling<B> {
    behavior: B,
}

impl<B> EnvironmentalSampling<B> {
    /// Wrap a behavior
    pub fn new(behavior: B) -> Self {
        Self { behavior }
    }
}

impl<B: EnvironmentalBehavior> ObservationGenerator for EnvironmentalSampling<B> {
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
        let attendance = ctx.attendance_map();
        let step = self.behavior.step();

        let mut day = ctx.world.window.start;
        while day <= ctx.world.window.end {
            out.note("=======================");
            out.note(format!("Starting day {}", day));
            out.note("=======================");

            let last = day_end(day);
            for &sid in ctx.world.sensor_ids_of(ctx.metasensor) {
                let Some(sensor) = ctx.world.sensors.get(sid) else {
                    continue;
                };
                let mut now = day_start(day);
                while now <= last {
                    self.behavior.update(sensor, now, &attendance, rng);
                    self.behavior.record(sensor, out)?;
                    now += step;
                }
            }
            day += Duration::days(1);
        }
        Ok(())
    }
}
