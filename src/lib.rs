//! SmartSPEC scenario generator
//!
//! Produces synthetic occupancy and sensor-observation logs for an
//! instrumented physical space. A declarative description of rooms
//! (spaces), person and event archetypes, sensors, and recurrence profiles
//! is materialized into concrete people and events; a day-by-day simulation
//! then schedules each person's event attendance, reconciling recurrence
//! patterns, capacity accounting, per-space occupancy, shortest-path
//! routing, cross-cutting constraints, and affinity-weighted selection.
//! A replay pass turns the resulting trajectories into per-sensor
//! observation streams.
//!
//! # Pipeline
//!
//! The three binaries mirror the three stages, each driven by one
//! INI-style config file:
//!
//! 1. `entitygen` materializes concrete events and people from their
//!    archetypes and writes them back to JSON.
//! 2. `datagen` runs the simulation and writes the attendance log
//!    (`data.csv`) plus its narrative (`data_log.txt`).
//! 3. `obsgen` replays `data.csv` through the registered observation
//!    generators, one output CSV per sensor archetype.
//!
//! # Module organization
//!
//! - [`types`]: id newtypes and coordinates
//! - [`calendar`]: dates, recurrence patterns, time profiles
//! - [`interval`]: interval maps over epoch seconds
//! - [`model`]: spaces, people, events, sensors and their archetypes
//! - [`registry`]: dense id-indexed collections
//! - [`routing`]: spaces graph and trajectory store
//! - [`config`] / [`data`]: run configuration and the loaded [`data::World`]
//! - [`constraints`]: the eight-table constraint engine
//! - [`generator`]: entity materialization
//! - [`simulation`]: the per-day scheduling loop
//! - [`observation`]: the sensor-observation framework
#![warn(missing_docs, missing_debug_implementations)]

pub mod calendar;
pub mod config;
pub mod constraints;
pub mod data;
pub mod error;
pub mod generator;
pub mod interval;
pub mod logging;
pub mod model;
pub mod observation;
pub mod output;
pub mod random;
pub mod registry;
pub mod routing;
pub mod simulation;
pub mod types;

pub use calendar::{TimePeriod, TimeProfile};
pub use config::{FilePaths, GenerationMode, GenerationSpec, IniConfig, SimulationWindow};
pub use constraints::ConstraintEngine;
pub use data::World;
pub use error::{ScenarioError, ScenarioResult};
pub use model::{Event, EventLogistics, MetaEvent, MetaPerson, Person, Sensor, Space, Trajectory};
pub use observation::{GeneratorRegistry, ObservationGenerator};
pub use registry::Registry;
pub use routing::{SpacesGraph, TrajectoryStore};
pub use simulation::Simulator;
pub use types::{
    EventId, MetaEventId, MetaPersonId, MetaSensorId, PersonId, SensorId, SpaceId,
};
