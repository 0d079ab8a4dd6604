//! Sensor-observation framework
//!
//! Replays the attendance CSV produced by the simulator through a registry
//! of per-metasensor observation generators. Three dispatch shapes exist:
//! per-person trajectory replay ([`occupancy`]), periodic environmental
//! ticking ([`environmental`]), and per-event usage collapse ([`usage`]).
//! Concrete generators (WiFi, door, motion, temperature, water usage) plug a
//! behavior into one of those shapes and are registered by metasensor id;
//! duplicate registrations are rejected at startup.

pub mod door;
pub mod environmental;
pub mod motion;
pub mod occupancy;
pub mod temperature;
pub mod usage;
pub mod water;
pub mod wifi;

use crate::calendar::{epoch_seconds, parse_datetime};
use crate::data::World;
use crate::error::{ScenarioError, ScenarioResult};
use crate::interval::IntervalMap;
use crate::output::{create_csv, TeeLog};
use crate::random::SimRng;
use crate::types::{EventId, MetaSensorId, PersonId, SensorId, SpaceId};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// One parsed row of `data.csv`
#[derive(Debug, Clone)]
pub struct AttendanceRow {
    /// Person id
    pub person: PersonId,
    /// Event id
    pub event: EventId,
    /// Space id
    pub space: SpaceId,
    /// Row start
    pub start: NaiveDateTime,
    /// Row end
    pub end: NaiveDateTime,
}

/// Parse the attendance CSV written by the simulator
pub fn read_attendance(path: &Path) -> ScenarioResult<Vec<AttendanceRow>> {
    let text = std::fs::read_to_string(path)?;
    let mut rows = Vec::new();
    for (lineno, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 5 {
            return Err(ScenarioError::data(format!(
                "{}:{}: expected 5 CSV fields",
                path.display(),
                lineno + 1
            )));
        }
        let id = |s: &str| -> ScenarioResult<i64> {
            s.trim()
                .parse()
                .map_err(|e| ScenarioError::data(format!("bad id `{}`: {}", s, e)))
        };
        rows.push(AttendanceRow {
            person: PersonId(id(fields[0])?),
            event: EventId(id(fields[1])?),
            space: SpaceId(id(fields[2])?),
            start: parse_datetime(fields[3])?,
            end: parse_datetime(fields[4])?,
        });
    }
    Ok(rows)
}

/// Shared inputs of one generator run
#[derive(Debug)]
pub struct ObsContext<'a> {
    /// The loaded world
    pub world: &'a World,
    /// The metasensor being generated
    pub metasensor: MetaSensorId,
    /// Parsed attendance rows
    pub rows: &'a [AttendanceRow],
}

impl ObsContext<'_> {
    /// Space → covering sensors of this metasensor (static coverage only)
    pub fn coverage_map(&self) -> BTreeMap<SpaceId, BTreeSet<SensorId>> {
        let mut map: BTreeMap<SpaceId, BTreeSet<SensorId>> = BTreeMap::new();
        for &sid in self.world.sensor_ids_of(self.metasensor) {
            if let Some(sensor) = self.world.sensors.get(sid) {
                for &space in sensor.coverage.spaces() {
                    map.entry(space).or_default().insert(sid);
                }
            }
        }
        map
    }

    /// Person → their (space, start, end) visits in CSV order
    pub fn trajectory_map(&self) -> BTreeMap<PersonId, Vec<(SpaceId, NaiveDateTime, NaiveDateTime)>> {
        let mut map: BTreeMap<PersonId, Vec<_>> = BTreeMap::new();
        for row in self.rows {
            map.entry(row.person)
                .or_default()
                .push((row.space, row.start, row.end));
        }
        map
    }

    /// Space → interval map of who is present when. The event column is
    /// intentionally ignored here.
    pub fn attendance_map(&self) -> BTreeMap<SpaceId, IntervalMap<BTreeSet<PersonId>>> {
        let mut map: BTreeMap<SpaceId, IntervalMap<BTreeSet<PersonId>>> = BTreeMap::new();
        for row in self.rows {
            map.entry(row.space).or_default().add(
                epoch_seconds(row.start),
                epoch_seconds(row.end),
                BTreeSet::from([row.person]),
            );
        }
        map
    }

    /// Space → actual event attendances, collapsing each (person, event,
    /// day) to its last row (transit rows share the event id; the final row
    /// is the attendance itself)
    pub fn event_attendance_map(
        &self,
    ) -> BTreeMap<SpaceId, Vec<(PersonId, EventId, NaiveDateTime, NaiveDateTime)>> {
        let mut last: BTreeMap<(PersonId, EventId, NaiveDate), (SpaceId, NaiveDateTime, NaiveDateTime)> =
            BTreeMap::new();
        for row in self.rows {
            last.insert(
                (row.person, row.event, row.start.date()),
                (row.space, row.start, row.end),
            );
        }
        let mut map: BTreeMap<SpaceId, Vec<_>> = BTreeMap::new();
        for ((person, event, _), (space, start, end)) in last {
            map.entry(space).or_default().push((person, event, start, end));
        }
        map
    }
}

/// Output streams of one generator: the observation CSV and its stdout-tee'd
/// log
#[derive(Debug)]
pub struct ObsWriter {
    out: BufWriter<File>,
    log: TeeLog,
}

impl ObsWriter {
    fn create(world: &World, metasensor: MetaSensorId, header: &str, banner: &str) -> ScenarioResult<Self> {
        let out = create_csv(&world.paths.observations_csv(metasensor), header)?;
        let mut log = TeeLog::create(&world.paths.observations_log(metasensor))?;
        log.line(banner);
        Ok(Self { out, log })
    }

    /// Write one CSV row
    pub fn emit(&mut self, row: impl AsRef<str>) -> ScenarioResult<()> {
        writeln!(self.out, "{}", row.as_ref())?;
        Ok(())
    }

    /// Write one narrative line to stdout and the log
    pub fn note(&mut self, msg: impl AsRef<str>) {
        self.log.line(msg);
    }

    fn flush(&mut self) -> ScenarioResult<()> {
        self.out.flush()?;
        self.log.flush();
        Ok(())
    }
}

/// A per-metasensor observation generator
pub trait ObservationGenerator {
    /// Header of the observation CSV
    fn header(&self) -> &'static str;

    /// First line of the observation log
    fn banner(&self, metasensor: MetaSensorId) -> String;

    /// Produce every observation for this metasensor
    fn generate(
        &mut self,
        ctx: &ObsContext<'_>,
        out: &mut ObsWriter,
        rng: &mut SimRng,
    ) -> ScenarioResult<()>;
}

/// Constructor for a registered generator
pub type GeneratorBuilder = Box<dyn Fn() -> Box<dyn ObservationGenerator>>;

/// Generators keyed by metasensor id
#[derive(Default)]
pub struct GeneratorRegistry {
    builders: BTreeMap<MetaSensorId, GeneratorBuilder>,
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("metasensors", &self.builders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GeneratorRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in generators: WiFi (1), door (2), temperature (3), motion
    /// (4), water usage (5)
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(MetaSensorId(1), || {
                Box::new(occupancy::OccupancyReplay::new(wifi::WifiBehavior::default()))
            })
            .expect("empty registry accepts WiFi");
        registry
            .register(MetaSensorId(2), || {
                Box::new(occupancy::OccupancyReplay::new(door::DoorBehavior::default()))
            })
            .expect("empty registry accepts door");
        registry
            .register(MetaSensorId(3), || {
                Box::new(environmental::EnvironmentalSampling::new(
                    temperature::TemperatureBehavior::default(),
                ))
            })
            .expect("empty registry accepts temperature");
        registry
            .register(MetaSensorId(4), || {
                Box::new(occupancy::OccupancyReplay::new(
                    motion::MotionBehavior::default(),
                ))
            })
            .expect("empty registry accepts motion");
        registry
            .register(MetaSensorId(5), || {
                Box::new(usage::UsageCollapse::new(water::WaterBehavior::default()))
            })
            .expect("empty registry accepts water usage");
        registry
    }

    /// Register a generator; a second registration for the same metasensor
    /// id is an invariant error
    pub fn register(
        &mut self,
        metasensor: MetaSensorId,
        builder: impl Fn() -> Box<dyn ObservationGenerator> + 'static,
    ) -> ScenarioResult<()> {
        if self.builders.contains_key(&metasensor) {
            return Err(ScenarioError::invariant(format!(
                "duplicate observation generator for metasensor {}",
                metasensor
            )));
        }
        self.builders.insert(metasensor, Box::new(builder));
        Ok(())
    }

    /// Registered metasensor ids in ascending order
    pub fn metasensors(&self) -> impl Iterator<Item = MetaSensorId> + '_ {
        self.builders.keys().copied()
    }

    fn build(&self, metasensor: MetaSensorId) -> Option<Box<dyn ObservationGenerator>> {
        self.builders.get(&metasensor).map(|b| b())
    }
}

/// Run every registered generator whose metasensor exists in the world,
/// reading the attendance CSV the simulator wrote
pub fn generate_observations(
    world: &World,
    registry: &GeneratorRegistry,
    rng: &mut SimRng,
) -> ScenarioResult<()> {
    std::fs::create_dir_all(&world.paths.output)?;
    let rows = read_attendance(&world.paths.data_csv())?;
    for metasensor in registry.metasensors() {
        if !world.metasensors.contains(metasensor) {
            continue; // nothing deployed under this archetype
        }
        info!("generating observations for metasensor {}", metasensor);
        let mut generator = registry
            .build(metasensor)
            .ok_or_else(|| ScenarioError::invariant("registry lost a builder"))?;
        let ctx = ObsContext {
            world,
            metasensor,
            rows: &rows,
        };
        let mut out = ObsWriter::create(
            world,
            metasensor,
            generator.header(),
            &generator.banner(metasensor),
        )?;
        generator.generate(&ctx, &mut out, rng)?;
        out.flush()?;
    }
    Ok(())
}
