//! Concrete sensors and sensor archetypes' coverage

use crate::types::{Coordinates, MetaSensorId, PersonId, SensorId, SpaceId};
use std::fmt;

/// What a sensor observes: a fixed set of spaces, or one person it travels
/// with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    /// Installed in place, covering the listed spaces
    Static(Vec<SpaceId>),
    /// Carried by a person
    Mobile(PersonId),
}

impl Coverage {
    /// The covered spaces; empty for mobile sensors
    pub fn spaces(&self) -> &[SpaceId] {
        match self {
            Coverage::Static(spaces) => spaces,
            Coverage::Mobile(_) => &[],
        }
    }
}

/// A deployed sensor
#[derive(Debug, Clone)]
pub struct Sensor {
    /// Sensor id
    pub id: SensorId,
    /// The archetype determining which observation generator handles it
    pub metasensor: MetaSensorId,
    /// Human-readable description
    pub description: String,
    /// Sampling interval in seconds
    pub interval: i64,
    /// What the sensor observes
    pub coverage: Coverage,
    /// Mounting position, when known
    pub coordinates: Option<Coordinates>,
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sensor(id={}, msid={}, desc=\"{}\", interval={}s)",
            self.id, self.metasensor, self.description, self.interval
        )
    }
}
