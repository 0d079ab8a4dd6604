//! Identifier types shared across the scenario generator
//!
//! Entity ids are caller-supplied integers (generation assigns sequential
//! ones). Two ids are reserved throughout the pipeline: space 0 is the
//! "outside" space, and events/metaevents 0 and -1 are the leisure and
//! out-of-simulation sentinels.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type!(
    /// Identifier for a space (room or region)
    SpaceId
);
id_type!(
    /// Identifier for a concrete person
    PersonId
);
id_type!(
    /// Identifier for a concrete event
    EventId
);
id_type!(
    /// Identifier for a concrete sensor
    SensorId
);
id_type!(
    /// Identifier for a person archetype
    MetaPersonId
);
id_type!(
    /// Identifier for an event archetype
    MetaEventId
);
id_type!(
    /// Identifier for a sensor archetype
    MetaSensorId
);

impl SpaceId {
    /// The reserved "outside" space; every simulation day begins and ends here
    pub const OUTSIDE: SpaceId = SpaceId(0);
}

impl EventId {
    /// The leisure fallback event (infinite capacity, outside space)
    pub const LEISURE: EventId = EventId(0);
    /// The out-of-simulation sentinel event
    pub const OUT: EventId = EventId(-1);
}

impl MetaEventId {
    /// Archetype of the leisure event
    pub const LEISURE: MetaEventId = MetaEventId(0);
    /// Archetype of the out-of-simulation event
    pub const OUT: MetaEventId = MetaEventId(-1);
}

/// Selection probability / affinity weight
pub type Probability = f64;

/// 3-D integer coordinates of a space or sensor
pub type Coordinates = [i64; 3];

/// Manhattan distance between two coordinate triples
pub fn manhattan(a: &Coordinates, b: &Coordinates) -> i64 {
    (a[0] - b[0]).abs() + (a[1] - b[1]).abs() + (a[2] - b[2]).abs()
}
