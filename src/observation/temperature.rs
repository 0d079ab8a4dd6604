//! Temperature observations
//!
//! Every fifteen minutes a sensor's reading decays toward a baseline of
//! 70 plus a quarter degree per covered occupant:
//! `value ← 0.4·value + 0.6·(70 + 0.25·n)`.

use crate::calendar::format_datetime;
use crate::error::ScenarioResult;
use crate::model::Sensor;
use crate::observation::environmental::{people_covered, AttendanceBySpace, EnvironmentalBehavior};
use crate::observation::ObsWriter;
use crate::random::SimRng;
use crate::types::SensorId;
use chrono::{Duration, NaiveDateTime};
use std::collections::BTreeMap;

/// Unoccupied baseline temperature
const BASELINE: f64 = 70.0;

#[derive(Debug, Clone, Copy)]
struct State {
    at: NaiveDateTime,
    value: f64,
}

/// Temperature behavior state over all sensors
#[derive(Debug, Default)]
pub struct TemperatureBehavior {
    states: BTreeMap<SensorId, State>,
}

impl EnvironmentalBehavior for TemperatureBehavior {
    fn header(&self) -> &'static str {
        "SensorID,DateTime,Temperature"
    }

    fn kind(&self) -> &'static str {
        "Temperature"
    }

    fn step(&self) -> Duration {
        Duration::minutes(15)
    }

    fn update(
        &mut self,
        sensor: &Sensor,
        now: NaiveDateTime,
        attendance: &AttendanceBySpace,
        _rng: &mut SimRng,
    ) {
        let occupants = people_covered(sensor, now, attendance) as f64;
        let state = self.states.entry(sensor.id).or_insert(State {
            at: now,
            value: BASELINE,
        });
        state.value = 0.4 * state.value + 0.6 * (BASELINE + 0.25 * occupants);
        state.at = now;
    }

    fn record(&mut self, sensor: &Sensor, out: &mut ObsWriter) -> ScenarioResult<()> {
        if let Some(state) = self.states.get(&sensor.id) {
            out.emit(format!(
                "{},{},{:.2}",
                sensor.id,
                format_datetime(state.at),
                state.value
            ))?;
            out.note(format!(
                "Sensor {} at datetime {} records value = {:.2}",
                sensor.id,
                format_datetime(state.at),
                state.value
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{epoch_seconds, parse_datetime};
    use crate::interval::IntervalMap;
    use crate::model::Coverage;
    use crate::random::engine;
    use crate::types::{MetaSensorId, PersonId, SpaceId};
    use std::collections::BTreeSet;

    fn sensor() -> Sensor {
        Sensor {
            id: SensorId(1),
            metasensor: MetaSensorId(3),
            description: String::new(),
            interval: 900,
            coverage: Coverage::Static(vec![SpaceId(4)]),
            coordinates: None,
        }
    }

    #[test]
    fn test_empty_space_stays_at_baseline() {
        let mut rng = engine(Some(61));
        let mut behavior = TemperatureBehavior::default();
        let now = parse_datetime("2024-01-01 08:00:00").unwrap();
        behavior.update(&sensor(), now, &BTreeMap::new(), &mut rng);
        assert!((behavior.states[&SensorId(1)].value - BASELINE).abs() < 1e-9);
    }

    #[test]
    fn test_occupants_raise_reading() {
        let mut rng = engine(Some(62));
        let mut behavior = TemperatureBehavior::default();
        let now = parse_datetime("2024-01-01 08:00:00").unwrap();

        let mut occupied: IntervalMap<BTreeSet<PersonId>> = IntervalMap::new();
        let start = epoch_seconds(parse_datetime("2024-01-01 07:00:00").unwrap());
        let end = epoch_seconds(parse_datetime("2024-01-01 09:00:00").unwrap());
        for pid in 0..4 {
            occupied.add(start, end, BTreeSet::from([PersonId(pid)]));
        }
        let attendance = BTreeMap::from([(SpaceId(4), occupied)]);

        behavior.update(&sensor(), now, &attendance, &mut rng);
        // 0.4*70 + 0.6*(70 + 0.25*4) = 70.6
        assert!((behavior.states[&SensorId(1)].value - 70.6).abs() < 1e-9);
    }
}
