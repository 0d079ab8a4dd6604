//! Event archetypes

use crate::calendar::TimeProfile;
use crate::random::{NormalValue, SpaceSelector};
use crate::types::{MetaEventId, MetaPersonId, Probability};
use std::collections::BTreeMap;
use std::fmt;

/// Capacity ceiling used for the leisure archetype
pub const MAX_METAEVENT_CAPACITY: i64 = 99999;

/// An event archetype: where concrete events of this kind can be held, when
/// they run, and how many people of each archetype they admit
#[derive(Debug, Clone)]
pub struct MetaEvent {
    /// Archetype id; 0 is leisure, -1 is out-of-simulation
    pub id: MetaEventId,
    /// Human-readable description
    pub description: String,
    /// Selection probability during event generation
    pub probability: Probability,
    /// Chooses the concrete spaces at materialization
    pub selector: SpaceSelector,
    /// Candidate time profiles
    pub profiles: Vec<TimeProfile>,
    /// Selection probability per profile
    pub profile_probabilities: Vec<Probability>,
    /// Capacity bound distributions (lo, hi) per metaperson
    pub capacity: BTreeMap<MetaPersonId, (NormalValue, NormalValue)>,
}

impl MetaEvent {
    /// The out-of-simulation archetype (id -1, outside space)
    pub fn out_sentinel() -> Self {
        Self {
            id: MetaEventId::OUT,
            description: "out-of-simulation (added)".into(),
            probability: 1.0,
            selector: SpaceSelector::new(vec![crate::types::SpaceId::OUTSIDE], 1),
            profiles: Vec::new(),
            profile_probabilities: Vec::new(),
            capacity: BTreeMap::new(),
        }
    }

    /// The leisure archetype (id 0, outside space, unbounded capacity)
    pub fn leisure_sentinel() -> Self {
        let mut capacity = BTreeMap::new();
        capacity.insert(
            MetaPersonId(-1),
            (
                NormalValue::new(0.0, 0.0),
                NormalValue::new(MAX_METAEVENT_CAPACITY as f64, 0.0),
            ),
        );
        Self {
            id: MetaEventId::LEISURE,
            description: "leisure (added)".into(),
            probability: 1.0,
            selector: SpaceSelector::new(vec![crate::types::SpaceId::OUTSIDE], 1),
            profiles: Vec::new(),
            profile_probabilities: Vec::new(),
            capacity,
        }
    }
}

impl fmt::Display for MetaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MetaEvent(id={}, desc=\"{}\", pr={}, profiles={})",
            self.id,
            self.description,
            self.probability,
            self.profiles.len()
        )
    }
}
