//! Entity model: spaces, people, events, sensors, and their archetypes
//!
//! Archetypes (`Meta*`) are immutable after loading; concrete entities carry
//! the mutable simulation state (occupancy, enrollment, attendance).

pub mod event;
pub mod logistics;
pub mod metaevent;
pub mod metaperson;
pub mod metasensor;
pub mod person;
pub mod sensor;
pub mod space;
pub mod trajectory;

pub use event::{CapRange, Event};
pub use logistics::EventLogistics;
pub use metaevent::MetaEvent;
pub use metaperson::MetaPerson;
pub use metasensor::MetaSensor;
pub use person::Person;
pub use sensor::{Coverage, Sensor};
pub use space::Space;
pub use trajectory::{MetaTrajectory, Trajectory};
