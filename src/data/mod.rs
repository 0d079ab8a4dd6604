//! The loaded world: every registry, the constraint engine, and the
//! trajectory store, assembled from one config file
//!
//! Loading order follows the dependency chain: spaces first (the trajectory
//! store builds its graph from them), then sensors and archetypes, then
//! constraints. Events and people are loaded separately because entity
//! generation runs between [`World::load`] and the simulation.

pub mod loaders;

use crate::config::{FilePaths, IniConfig, SimulationWindow};
use crate::constraints::ConstraintEngine;
use crate::error::ScenarioResult;
use crate::model::{Event, MetaEvent, MetaPerson, MetaSensor, Person, Sensor, Space};
use crate::random::SimRng;
use crate::registry::Registry;
use crate::routing::TrajectoryStore;
use crate::types::{MetaSensorId, SensorId};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::Path;

/// Everything the simulator and observation generators consume
#[derive(Debug)]
pub struct World {
    /// Raw configuration
    pub config: IniConfig,
    /// The `[filepaths]` section
    pub paths: FilePaths,
    /// Simulated day range and seed
    pub window: SimulationWindow,
    /// Spaces (always includes the outside space)
    pub spaces: Registry<Space>,
    /// Deployed sensors
    pub sensors: Registry<Sensor>,
    /// Sensor archetypes
    pub metasensors: Registry<MetaSensor>,
    /// Person archetypes
    pub metapeople: Registry<MetaPerson>,
    /// Event archetypes (always includes out and leisure)
    pub metaevents: Registry<MetaEvent>,
    /// Concrete people; empty until [`World::load_people`]
    pub people: Registry<Person>,
    /// Concrete events; empty until [`World::load_events`]
    pub events: Registry<Event>,
    /// The eight constraint tables
    pub constraints: ConstraintEngine,
    /// Shortest paths and recorded trajectories
    pub trajectories: TrajectoryStore,
    sensors_by_metasensor: BTreeMap<MetaSensorId, Vec<SensorId>>,
}

impl World {
    /// Load everything except events and people from the given config file
    pub fn load(config_path: &Path) -> ScenarioResult<Self> {
        let config = IniConfig::load(config_path)?;
        let paths = FilePaths::from_config(&config)?;
        let window = SimulationWindow::from_config(&config)?;

        let spaces = loaders::load_spaces(&paths.spaces)?;
        let sensors = loaders::load_sensors(&paths.sensors)?;
        let metasensors = loaders::load_metasensors(&paths.metasensors)?;
        let metapeople = loaders::load_metapeople(&paths.metapeople)?;
        let metaevents = loaders::load_metaevents(&paths.metaevents)?;

        let constraints = match &paths.constraints {
            Some(path) => ConstraintEngine::from_json(&serde_json::from_str(
                &std::fs::read_to_string(path)?,
            )?)?,
            None => ConstraintEngine::new(),
        };

        let mut trajectories = TrajectoryStore::new(&spaces, paths.path_cache.as_deref())?;
        if let Some(path) = &paths.metatrajectories {
            loaders::load_metatrajectories(path, &mut trajectories)?;
        }

        let mut sensors_by_metasensor: BTreeMap<MetaSensorId, Vec<SensorId>> = BTreeMap::new();
        for s in &sensors {
            sensors_by_metasensor.entry(s.metasensor).or_default().push(s.id);
        }

        Ok(Self {
            config,
            paths,
            window,
            spaces,
            sensors,
            metasensors,
            metapeople,
            metaevents,
            people: Registry::new(),
            events: Registry::new(),
            constraints,
            trajectories,
            sensors_by_metasensor,
        })
    }

    /// Load the (generated) events file
    pub fn load_events(&mut self) -> ScenarioResult<()> {
        self.events = loaders::load_events(&self.paths.events, &self.metaevents)?;
        Ok(())
    }

    /// Load the (generated) people file
    pub fn load_people(&mut self) -> ScenarioResult<()> {
        self.people = loaders::load_people(&self.paths.people, &self.metapeople)?;
        Ok(())
    }

    /// The deployed sensors of one archetype
    pub fn sensor_ids_of(&self, metasensor: MetaSensorId) -> &[SensorId] {
        self.sensors_by_metasensor
            .get(&metasensor)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sample the person's presence window for the anchor's day (non-ETA)
    pub fn query_person(
        &self,
        person: &Person,
        anchor: NaiveDateTime,
        rng: &mut SimRng,
    ) -> Option<crate::calendar::TimePeriod> {
        self.metapeople
            .get(person.metaperson)?
            .profiles
            .get(person.profile_index)?
            .query(anchor, false, rng)
    }

    /// Sample the event's attendance window from the anchor onward (ETA)
    pub fn query_event(
        &self,
        event: &Event,
        anchor: NaiveDateTime,
        rng: &mut SimRng,
    ) -> Option<crate::calendar::TimePeriod> {
        self.metaevents
            .get(event.metaevent)?
            .profiles
            .get(event.profile_index)?
            .query(anchor, true, rng)
    }
}
