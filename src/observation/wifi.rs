//! WiFi access-point association observations
//!
//! A dwell longer than five minutes counts as stationary: the person's
//! device re-associates to its remembered AP roughly every fifteen minutes
//! for the whole stay. Shorter dwells are transit: at most one association
//! is emitted, to a newly picked AP when the remembered one does not cover
//! the space, or to the remembered one if more than five minutes have
//! passed since the last association.

use crate::calendar::{format_datetime, NormalTime};
use crate::error::ScenarioResult;
use crate::observation::occupancy::{OccupancyBehavior, Visit};
use crate::observation::ObsWriter;
use crate::random::{pick_uniform, SimRng};
use crate::types::{PersonId, SensorId};
use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

/// Dwell threshold separating stationary from moving
fn stationary_threshold() -> Duration {
    Duration::minutes(5)
}

/// Re-association cadence while stationary
fn connection_step() -> NormalTime {
    NormalTime::new(Duration::minutes(15), Duration::minutes(3))
}

#[derive(Debug, Clone)]
struct PersonState {
    last_ap: Option<SensorId>,
    last_time: Option<NaiveDateTime>,
    pending: Vec<(NaiveDateTime, SensorId)>,
}

impl Default for PersonState {
    fn default() -> Self {
        Self {
            last_ap: None,
            last_time: None,
            pending: Vec::new(),
        }
    }
}

/// WiFi behavior state over all people
#[derive(Debug, Default)]
pub struct WifiBehavior {
    states: BTreeMap<PersonId, PersonState>,
}

impl OccupancyBehavior for WifiBehavior {
    fn header(&self) -> &'static str {
        "PersonID,DateTime,WiFiAP"
    }

    fn kind(&self) -> &'static str {
        "WiFi Observation"
    }

    fn update(
        &mut self,
        person: PersonId,
        visit: &Visit,
        cover: &BTreeSet<SensorId>,
        rng: &mut SimRng,
    ) {
        let (_, start, end) = *visit;
        let state = self.states.entry(person).or_default();
        state.pending.clear();

        if cover.is_empty() {
            return; // no AP observes this space
        }
        let aps: Vec<SensorId> = cover.iter().copied().collect();

        if state.last_ap.is_none() {
            state.last_ap = pick_uniform(&aps, rng).copied();
        }

        if end - start > stationary_threshold() {
            // Stationary: periodic re-associations to the remembered AP
            let ap = match state.last_ap {
                Some(ap) => ap,
                None => return,
            };
            let step = connection_step();
            let mut at = start;
            while at <= end {
                state.pending.push((at, ap));
                at += std::cmp::max(step.sample(rng), Duration::seconds(60));
            }
            state.last_time = state.pending.last().map(|&(t, _)| t);
        } else if !cover.contains(&state.last_ap.unwrap_or(SensorId(i64::MIN))) {
            // Moving out of range: associate once to a new AP
            let ap = match pick_uniform(&aps, rng).copied() {
                Some(ap) => ap,
                None => return,
            };
            state.last_ap = Some(ap);
            let at = random_instant(start, end, rng);
            state.last_time = Some(at);
            state.pending.push((at, ap));
        } else if state
            .last_time
            .map(|t| start - t > stationary_threshold())
            .unwrap_or(true)
        {
            // Moving within range: re-associate if enough time has passed
            let ap = state.last_ap.expect("checked above");
            let at = random_instant(start, end, rng);
            state.last_time = Some(at);
            state.pending.push((at, ap));
        }
    }

    fn record(&mut self, person: PersonId, out: &mut ObsWriter) -> ScenarioResult<()> {
        if let Some(state) = self.states.get(&person) {
            for &(at, ap) in &state.pending {
                out.emit(format!("{},{},{}", person, format_datetime(at), ap))?;
                out.note(format!(
                    "Person {} at datetime {} connects to {}",
                    person,
                    format_datetime(at),
                    ap
                ));
            }
        }
        Ok(())
    }
}

/// Uniform instant within `[start, end]`
fn random_instant(start: NaiveDateTime, end: NaiveDateTime, rng: &mut SimRng) -> NaiveDateTime {
    let span = (end - start).num_seconds().max(0);
    start + Duration::seconds(rng.gen_range(0..=span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_datetime;
    use crate::random::engine;
    use crate::types::SpaceId;

    fn visit(start: &str, end: &str) -> Visit {
        (
            SpaceId(1),
            parse_datetime(start).unwrap(),
            parse_datetime(end).unwrap(),
        )
    }

    #[test]
    fn test_stationary_dwell_emits_periodic_associations() {
        let mut rng = engine(Some(31));
        let mut behavior = WifiBehavior::default();
        let cover = BTreeSet::from([SensorId(10)]);
        behavior.update(
            PersonId(1),
            &visit("2024-01-01 09:00:00", "2024-01-01 10:00:00"),
            &cover,
            &mut rng,
        );
        let state = &behavior.states[&PersonId(1)];
        // Roughly every 15 minutes over an hour
        assert!(state.pending.len() >= 3);
        assert!(state.pending.iter().all(|&(_, ap)| ap == SensorId(10)));
    }

    #[test]
    fn test_transit_emits_at_most_one_association() {
        let mut rng = engine(Some(32));
        let mut behavior = WifiBehavior::default();
        let cover = BTreeSet::from([SensorId(10)]);
        behavior.update(
            PersonId(1),
            &visit("2024-01-01 09:00:00", "2024-01-01 09:02:00"),
            &cover,
            &mut rng,
        );
        assert!(behavior.states[&PersonId(1)].pending.len() <= 1);
    }

    #[test]
    fn test_uncovered_space_emits_nothing() {
        let mut rng = engine(Some(33));
        let mut behavior = WifiBehavior::default();
        behavior.update(
            PersonId(1),
            &visit("2024-01-01 09:00:00", "2024-01-01 10:00:00"),
            &BTreeSet::new(),
            &mut rng,
        );
        assert!(behavior.states[&PersonId(1)].pending.is_empty());
    }
}
