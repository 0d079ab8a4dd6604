//! Entity generation: materializing concrete events and people from their
//! archetypes
//!
//! Three modes per population: `none` reloads the existing file, `all`
//! regenerates from scratch, `diff` tops the existing file up to the
//! requested count. Generated populations are written back to their
//! configured files so later pipeline stages can reload them.

use crate::config::{GenerationMode, GenerationSpec};
use crate::data::{loaders, World};
use crate::error::{ScenarioError, ScenarioResult};
use crate::model::{Event, MetaEvent, Person};
use crate::random::{pick_weighted, sample_weighted, SimRng};
use crate::registry::Registry;
use crate::types::{EventId, MetaEventId, PersonId};
use std::collections::BTreeMap;
use tracing::info;

/// Give up on a capacity draw after this many lo/hi resamples
const MAX_CAPACITY_RESAMPLES: usize = 10_000;

/// Generate (or reload) events per the `[events]` section and write the
/// events file
pub fn generate_events(world: &mut World, spec: GenerationSpec, rng: &mut SimRng) -> ScenarioResult<()> {
    info!("generating events: mode {:?}, target {}", spec.mode, spec.number);
    match spec.mode {
        GenerationMode::None => {
            world.load_events()?;
        }
        GenerationMode::All => {
            world.events = Registry::new();
            add_event_sentinels(&mut world.events);
            generate_event_batch(world, spec.number, rng)?;
        }
        GenerationMode::Diff => {
            world.load_events()?;
            let missing = spec.number.saturating_sub(world.events.len());
            generate_event_batch(world, missing, rng)?;
        }
    }
    loaders::dump_events(&world.paths.events, &world.events)
}

/// Generate (or reload) people per the `[people]` section and write the
/// people file
pub fn generate_people(world: &mut World, spec: GenerationSpec, rng: &mut SimRng) -> ScenarioResult<()> {
    info!("generating people: mode {:?}, target {}", spec.mode, spec.number);
    match spec.mode {
        GenerationMode::None => {
            world.load_people()?;
        }
        GenerationMode::All => {
            world.people = Registry::new();
            generate_people_batch(world, spec.number, rng)?;
        }
        GenerationMode::Diff => {
            world.load_people()?;
            let missing = spec.number.saturating_sub(world.people.len());
            generate_people_batch(world, missing, rng)?;
        }
    }
    loaders::dump_people(&world.paths.people, &world.people)
}

fn add_event_sentinels(events: &mut Registry<Event>) {
    if !events.contains(EventId::OUT) {
        events.add(Event::out_sentinel());
    }
    if !events.contains(EventId::LEISURE) {
        events.add(Event::leisure_sentinel());
    }
}

/// Add `n` events: first at most one per distinct archetype (weighted,
/// without replacement), then weighted draws with replacement up to `n`
fn generate_event_batch(world: &mut World, n: usize, rng: &mut SimRng) -> ScenarioResult<()> {
    if n == 0 {
        return Ok(());
    }
    let ids: Vec<MetaEventId> = world.metaevents.ids().to_vec();
    let weights: Vec<f64> = world
        .metaevents
        .iter()
        .map(|me| me.probability)
        .collect();

    let mut next_id = world
        .events
        .ids()
        .iter()
        .map(|e| e.0)
        .max()
        .unwrap_or(0)
        + 1;

    let distinct = n.min(ids.len());
    for mid in sample_weighted(&ids, &weights, distinct, false, rng)? {
        let me = world
            .metaevents
            .get(mid)
            .ok_or_else(|| ScenarioError::data(format!("metaevent {} absent", mid)))?;
        let event = sample_metaevent(me, EventId(next_id), rng)?;
        next_id += 1;
        world.events.add(event);
    }

    for _ in distinct..n {
        let mid = *pick_weighted(&ids, &weights, rng)
            .ok_or_else(|| ScenarioError::data("no metaevents to draw from"))?;
        let me = world
            .metaevents
            .get(mid)
            .ok_or_else(|| ScenarioError::data(format!("metaevent {} absent", mid)))?;
        let event = sample_metaevent(me, EventId(next_id), rng)?;
        next_id += 1;
        world.events.add(event);
    }
    Ok(())
}

/// Materialize one concrete event from an archetype
fn sample_metaevent(me: &MetaEvent, id: EventId, rng: &mut SimRng) -> ScenarioResult<Event> {
    let profile_index = pick_profile_index(&me.profile_probabilities, rng);
    let spaces = me.selector.select(rng)?;

    let mut capacity = BTreeMap::new();
    for (&mp, &(lo_distr, hi_distr)) in &me.capacity {
        let mut lo = 1;
        let mut hi = 0;
        let mut attempts = 0;
        while lo > hi {
            if attempts >= MAX_CAPACITY_RESAMPLES {
                return Err(ScenarioError::invariant(format!(
                    "metaevent {}: capacity bounds for metaperson {} never satisfy lo <= hi",
                    me.id, mp
                )));
            }
            lo = lo_distr.sample(rng);
            hi = hi_distr.sample(rng);
            attempts += 1;
        }
        capacity.insert(mp, (lo, hi));
    }

    Ok(Event::new(
        id,
        me.id,
        me.description.clone(),
        profile_index,
        spaces,
        capacity,
    ))
}

/// Add `n` people drawn from the metaperson distribution
fn generate_people_batch(world: &mut World, n: usize, rng: &mut SimRng) -> ScenarioResult<()> {
    if n == 0 {
        return Ok(());
    }
    let ids: Vec<crate::types::MetaPersonId> = world.metapeople.ids().to_vec();
    let weights: Vec<f64> = world
        .metapeople
        .iter()
        .map(|mp| mp.probability)
        .collect();
    if ids.is_empty() {
        return Err(ScenarioError::data("no metapeople to draw from"));
    }

    let mut next_id = world
        .people
        .ids()
        .iter()
        .map(|p| p.0)
        .max()
        .unwrap_or(0)
        + 1;

    for _ in 0..n {
        let mid = *pick_weighted(&ids, &weights, rng)
            .ok_or_else(|| ScenarioError::data("no metapeople to draw from"))?;
        let mp = world
            .metapeople
            .get(mid)
            .ok_or_else(|| ScenarioError::data(format!("metaperson {} absent", mid)))?;
        let profile_index = pick_profile_index(&mp.profile_probabilities, rng);
        world.people.add(Person::new(
            PersonId(next_id),
            mid,
            mp.description.clone(),
            profile_index,
        ));
        next_id += 1;
    }
    Ok(())
}

/// Weighted draw of a profile index; empty profile lists collapse to 0
fn pick_profile_index(probabilities: &[f64], rng: &mut SimRng) -> usize {
    if probabilities.is_empty() {
        return 0;
    }
    let indices: Vec<usize> = (0..probabilities.len()).collect();
    pick_weighted(&indices, probabilities, rng)
        .copied()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{engine, NormalValue, SpaceSelector};
    use crate::types::{MetaPersonId, SpaceId};

    fn metaevent(id: i64, probability: f64) -> MetaEvent {
        let mut capacity = BTreeMap::new();
        capacity.insert(
            MetaPersonId(1),
            (NormalValue::new(2.0, 0.0), NormalValue::new(10.0, 0.0)),
        );
        MetaEvent {
            id: MetaEventId(id),
            description: format!("me{}", id),
            probability,
            selector: SpaceSelector::new(vec![SpaceId(1), SpaceId(2)], 1),
            profiles: Vec::new(),
            profile_probabilities: Vec::new(),
            capacity,
        }
    }

    #[test]
    fn test_sample_metaevent_capacity_ordering() {
        let mut rng = engine(Some(21));
        let me = metaevent(4, 1.0);
        let e = sample_metaevent(&me, EventId(9), &mut rng).unwrap();
        assert_eq!(e.id, EventId(9));
        assert_eq!(e.metaevent, MetaEventId(4));
        assert_eq!(e.capacity[&MetaPersonId(1)], (2, 10));
        assert_eq!(e.spaces.len(), 1);
    }

    #[test]
    fn test_sample_metaevent_impossible_capacity_errors() {
        let mut rng = engine(Some(22));
        let mut me = metaevent(4, 1.0);
        me.capacity.insert(
            MetaPersonId(1),
            (NormalValue::new(10.0, 0.0), NormalValue::new(2.0, 0.0)),
        );
        assert!(sample_metaevent(&me, EventId(9), &mut rng).is_err());
    }

    #[test]
    fn test_pick_profile_index_empty_is_zero() {
        let mut rng = engine(Some(23));
        assert_eq!(pick_profile_index(&[], &mut rng), 0);
    }

    #[test]
    fn test_pick_profile_index_respects_weights() {
        let mut rng = engine(Some(24));
        for _ in 0..50 {
            assert_eq!(pick_profile_index(&[0.0, 1.0, 0.0], &mut rng), 1);
        }
    }
}
