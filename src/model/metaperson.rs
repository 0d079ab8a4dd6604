//! Person archetypes

use crate::calendar::TimeProfile;
use crate::types::{MetaEventId, MetaPersonId, Probability};
use std::collections::BTreeMap;
use std::fmt;

/// A person archetype: how often such people occur, when they are present,
/// and how strongly they are drawn to each event archetype
#[derive(Debug, Clone)]
pub struct MetaPerson {
    /// Archetype id
    pub id: MetaPersonId,
    /// Selection probability during people generation
    pub probability: Probability,
    /// Human-readable description
    pub description: String,
    /// Candidate time profiles
    pub profiles: Vec<TimeProfile>,
    /// Selection probability per profile
    pub profile_probabilities: Vec<Probability>,
    /// Affinity toward each event archetype; missing entries count as zero
    pub affinity: BTreeMap<MetaEventId, Probability>,
}

impl MetaPerson {
    /// Affinity toward the given event archetype
    pub fn affinity_for(&self, id: MetaEventId) -> Probability {
        self.affinity.get(&id).copied().unwrap_or(0.0)
    }
}

impl fmt::Display for MetaPerson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MetaPerson(id={}, desc=\"{}\", pr={}, profiles={})",
            self.id,
            self.description,
            self.probability,
            self.profiles.len()
        )
    }
}
