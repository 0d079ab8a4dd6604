//! Door-activation observations
//!
//! A dwell under five minutes is a pass-through: the space's door sensor
//! fires once at a uniformly random offset within the dwell. Overlapping
//! activations merge into one opened interval; everything is emitted at the
//! end of the replay.

use crate::calendar::{epoch_seconds, format_datetime, from_epoch_seconds};
use crate::error::ScenarioResult;
use crate::observation::occupancy::{OccupancyBehavior, Visit};
use crate::observation::ObsWriter;
use crate::random::SimRng;
use crate::types::{PersonId, SensorId};
use chrono::Duration;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

/// Dwell threshold under which the person is passing through
fn moving_threshold() -> Duration {
    Duration::minutes(5)
}

/// How long one activation holds the door open
const OPEN_SECONDS: i64 = 10;

/// Door behavior state: opened intervals per sensor
#[derive(Debug, Default)]
pub struct DoorBehavior {
    opened: BTreeMap<SensorId, Vec<(i64, i64)>>,
}

impl OccupancyBehavior for DoorBehavior {
    fn header(&self) -> &'static str {
        "SensorID,DateTime"
    }

    fn kind(&self) -> &'static str {
        "Door Observation"
    }

    fn update(
        &mut self,
        _person: PersonId,
        visit: &Visit,
        cover: &BTreeSet<SensorId>,
        rng: &mut SimRng,
    ) {
        let (_, start, end) = *visit;
        // One door sensor per space
        let Some(&sensor) = cover.iter().next() else {
            return;
        };
        if end - start < moving_threshold() {
            let span = (end - start).num_seconds().max(0);
            let offset = rng.gen_range(0..=span);
            let opened_at = epoch_seconds(start) + offset;
            self.opened
                .entry(sensor)
                .or_default()
                .push((opened_at, opened_at + OPEN_SECONDS));
        }
    }

    fn record(&mut self, _person: PersonId, _out: &mut ObsWriter) -> ScenarioResult<()> {
        Ok(()) // everything is deferred to record_rest
    }

    fn record_rest(&mut self, out: &mut ObsWriter) -> ScenarioResult<()> {
        for (&sensor, intervals) in &mut self.opened {
            intervals.sort_unstable();
            let mut merged: Vec<(i64, i64)> = Vec::new();
            for &(start, end) in intervals.iter() {
                match merged.last_mut() {
                    Some(last) if start <= last.1 => last.1 = last.1.max(end),
                    _ => merged.push((start, end)),
                }
            }
            for (start, _) in merged {
                let at = from_epoch_seconds(start);
                out.emit(format!("{},{}", sensor, format_datetime(at)))?;
                out.note(format!(
                    "Sensor {} activated at datetime {}",
                    sensor,
                    format_datetime(at)
                ));
            }
        }
        Ok(())
    }
}
