//! Usage dispatch: feed each covering sensor the actual event attendances
//! of its spaces (transit rows collapsed away)

use crate::error::ScenarioResult;
use crate::model::Sensor;
use crate::observation::{ObsContext, ObsWriter, ObservationGenerator};
use crate::random::SimRng;
use crate::types::{EventId, MetaSensorId, PersonId};
use chrono::NaiveDateTime;

/// One collapsed attendance: person, event, window
pub type AttendanceEntry = (PersonId, EventId, NaiveDateTime, NaiveDateTime);

/// Behavior plugged into the usage shape
pub trait UsageBehavior {
    /// Header of the observation CSV
    fn header(&self) -> &'static str;

    /// Human-readable generator name for the log banner
    fn kind(&self) -> &'static str;

    /// Accumulate usage caused by one attendance
    fn update(&mut self, sensor: &Sensor, entry: &AttendanceEntry, rng: &mut SimRng);

    /// Emit the sensor's accumulated usage
    fn record(&mut self, sensor: &Sensor, out: &mut ObsWriter) -> ScenarioResult<()>;
}

/// The usage-collapse driver
#[derive(Debug)]
pub struct UsageCollapse<B> {
    behavior: B,
}

impl<B> UsageCollapse<B> {
    /// Wrap a behavior
    pub fn new(behavior: B) -> Self {
        Self { behavior }
    }
}

impl<B: UsageBehavior> ObservationGenerator for UsageCollapse<B> {
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
        let attendance = ctx.event_attendance_map();

        for &sid in ctx.world.sensor_ids_of(ctx.metasensor) {
            let Some(sensor) = ctx.world.sensors.get(sid) else {
                continue;
            };
            for space in sensor.coverage.spaces() {
                if let Some(entries) = attendance.get(space) {
                    for entry in entries {
                        self.behavior.update(sensor, entry, rng);
                    }
                }
            }
            self.behavior.record(sensor, out)?;
        }
        Ok(())
    }
}
