//! Water-usage observations
//!
//! Within each attendance, a person draws one unit of water for roughly
//! `N(3min, 30s)` every `N(30min, 5min)`. Draws from different attendances
//! sum where they overlap; each resulting interval is emitted with its
//! total.

use crate::calendar::{epoch_seconds, format_datetime, from_epoch_seconds, NormalTime};
use crate::error::ScenarioResult;
use crate::interval::IntervalMap;
use crate::model::Sensor;
use crate::observation::usage::{AttendanceEntry, UsageBehavior};
use crate::observation::ObsWriter;
use crate::random::SimRng;
use crate::types::SensorId;
use chrono::Duration;
use std::collections::BTreeMap;

/// Gap between successive draws
fn usage_step() -> NormalTime {
    NormalTime::new(Duration::minutes(30), Duration::minutes(5))
}

/// Length of one draw
fn usage_duration() -> NormalTime {
    NormalTime::new(Duration::minutes(3), Duration::seconds(30))
}

/// Water behavior state: summed usage intervals per sensor
#[derive(Debug, Default)]
pub struct WaterBehavior {
    usage: BTreeMap<SensorId, IntervalMap<f64>>,
}

impl UsageBehavior for WaterBehavior {
    fn header(&self) -> &'static str {
        "SensorID,DateTime,WaterUsage"
    }

    fn kind(&self) -> &'static str {
        "WaterUsage"
    }

    fn update(&mut self, sensor: &Sensor, entry: &AttendanceEntry, rng: &mut SimRng) {
        let (_, _, start, end) = *entry;
        let usage = self.usage.entry(sensor.id).or_default();

        let mut at = start;
        while at <= end {
            let draw = std::cmp::max(usage_duration().sample(rng), Duration::seconds(1));
            usage.add(epoch_seconds(at), epoch_seconds(at + draw), 1.0);
            at += std::cmp::max(usage_step().sample(rng), Duration::minutes(1));
        }
    }

    fn record(&mut self, sensor: &Sensor, out: &mut ObsWriter) -> ScenarioResult<()> {
        if let Some(usage) = self.usage.get(&sensor.id) {
            for (start, _, amount) in usage.iter() {
                let at = from_epoch_seconds(start);
                out.emit(format!(
                    "{},{},{}",
                    sensor.id,
                    format_datetime(at),
                    amount
                ))?;
                out.note(format!(
                    "Sensor {} at datetime {} recorded value {}",
                    sensor.id,
                    format_datetime(at),
                    amount
                ));
            }
        }
        Ok(())
    }
}
