//! Sensor archetypes

use crate::types::MetaSensorId;
use std::fmt;

/// A sensor archetype; observation generators are registered per metasensor
/// id
#[derive(Debug, Clone)]
pub struct MetaSensor {
    /// Archetype id
    pub id: MetaSensorId,
    /// Human-readable description
    pub description: String,
}

impl fmt::Display for MetaSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetaSensor(id={}, desc=\"{}\")", self.id, self.description)
    }
}
