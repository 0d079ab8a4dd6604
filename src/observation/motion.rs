//! Motion-detector observations
//!
//! Each covering detector fires with probability 0.7 per visit. A
//! stationary dwell (over five minutes) yields one detection near the start
//! and one near the end, each offset by roughly `N(5min, 1min)`; a
//! pass-through yields a single detection at a uniform instant within the
//! dwell.

use crate::calendar::{format_datetime, NormalTime};
use crate::error::ScenarioResult;
use crate::observation::occupancy::{OccupancyBehavior, Visit};
use crate::observation::ObsWriter;
use crate::random::SimRng;
use crate::types::{PersonId, SensorId};
use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

/// Chance that a covering detector captures the movement
const DETECT_PR: f64 = 0.7;

/// Dwell threshold separating stationary from moving
fn stationary_threshold() -> Duration {
    Duration::minutes(5)
}

/// Offset of a detection from the start or end of a stay
fn motion_offset() -> NormalTime {
    NormalTime::new(Duration::minutes(5), Duration::minutes(1))
}

/// Motion behavior state: detections staged for the current visit
#[derive(Debug, Default)]
pub struct MotionBehavior {
    pending: BTreeMap<PersonId, Vec<(NaiveDateTime, SensorId)>>,
}

impl OccupancyBehavior for MotionBehavior {
    fn header(&self) -> &'static str {
        "SensorID,DateTime"
    }

    fn kind(&self) -> &'static str {
        "Motion Detection"
    }

    fn update(
        &mut self,
        person: PersonId,
        visit: &Visit,
        cover: &BTreeSet<SensorId>,
        rng: &mut SimRng,
    ) {
        let (_, start, end) = *visit;
        let staged = self.pending.entry(person).or_default();
        staged.clear();

        if cover.is_empty() {
            return;
        }

        if end - start > stationary_threshold() {
            // Stationary: detections near both ends of the stay
            for &sensor in cover {
                if rng.gen::<f64>() < DETECT_PR {
                    staged.push((start + motion_offset().sample(rng), sensor));
                    staged.push((end - motion_offset().sample(rng), sensor));
                }
            }
        } else {
            // Passing through: one detection somewhere in the dwell
            for &sensor in cover {
                if rng.gen::<f64>() < DETECT_PR {
                    let span = (end - start).num_seconds().max(0);
                    staged.push((start + Duration::seconds(rng.gen_range(0..=span)), sensor));
                }
            }
        }
    }

    fn record(&mut self, person: PersonId, out: &mut ObsWriter) -> ScenarioResult<()> {
        if let Some(staged) = self.pending.get(&person) {
            for &(at, sensor) in staged {
                out.emit(format!("{},{}", sensor, format_datetime(at)))?;
                out.note(format!(
                    "Detector {} detected motion at {}",
                    sensor,
                    format_datetime(at)
                ));
            }
        }
        Ok(())
    }
}
