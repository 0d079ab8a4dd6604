//! JSON loaders and dumpers for the entity input files
//!
//! Each input file is a JSON array of objects. Simple entities deserialize
//! through serde records; metapeople and metaevents walk the document
//! because their time profiles and capacity distributions are polymorphic.
//! Loading inserts the reserved sentinels (outside space, out/leisure
//! events and metaevents) when the files do not carry them.

use crate::calendar::parse_hms;
use crate::error::{ScenarioError, ScenarioResult};
use crate::model::{
    Coverage, Event, MetaEvent, MetaPerson, MetaSensor, Person, Sensor, Space, Trajectory,
};
use crate::random::{NormalValue, SpaceSelector};
use crate::registry::Registry;
use crate::routing::TrajectoryStore;
use crate::types::{
    EventId, MetaEventId, MetaPersonId, MetaSensorId, PersonId, SensorId, SpaceId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

fn read_json(path: &Path) -> ScenarioResult<Value> {
    let text = fs::read_to_string(path).map_err(|e| {
        ScenarioError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    Ok(serde_json::from_str(&text)?)
}

fn as_array(doc: &Value, what: &str) -> ScenarioResult<Vec<Value>> {
    doc.as_array()
        .cloned()
        .ok_or_else(|| ScenarioError::data(format!("{} file must be a JSON array", what)))
}

// ---------------------------------------------------------------------------
// Spaces

#[derive(Debug, Deserialize)]
struct SpaceRecord {
    id: i64,
    #[serde(default)]
    description: String,
    coordinates: [i64; 3],
    capacity: i64,
    #[serde(default)]
    neighbors: Vec<i64>,
}

/// Load the spaces file; the outside space (id 0) is added if missing
pub fn load_spaces(path: &Path) -> ScenarioResult<Registry<Space>> {
    info!("reading spaces file {}", path.display());
    let records: Vec<SpaceRecord> = serde_json::from_value(read_json(path)?)?;
    let mut registry = Registry::new();
    for r in records {
        registry.add(Space::new(
            SpaceId(r.id),
            r.description,
            r.coordinates,
            r.capacity,
            r.neighbors.into_iter().map(SpaceId).collect(),
        ));
    }
    if !registry.contains(SpaceId::OUTSIDE) {
        registry.add(Space::outside());
    }
    Ok(registry)
}

// ---------------------------------------------------------------------------
// Sensors / metasensors

#[derive(Debug, Deserialize)]
struct SensorRecord {
    id: i64,
    #[serde(rename = "metasensor-id")]
    metasensor_id: i64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    interval: i64,
    mobility: String,
    coverage: Value,
    coordinates: Option<[i64; 3]>,
}

/// Load the sensors file
pub fn load_sensors(path: &Path) -> ScenarioResult<Registry<Sensor>> {
    info!("reading sensors file {}", path.display());
    let records: Vec<SensorRecord> = serde_json::from_value(read_json(path)?)?;
    let mut registry = Registry::new();
    for r in records {
        let coverage = match r.mobility.as_str() {
            "static" => {
                let spaces = r
                    .coverage
                    .as_array()
                    .ok_or_else(|| {
                        ScenarioError::data(format!(
                            "sensor {}: static coverage must be a space-id array",
                            r.id
                        ))
                    })?
                    .iter()
                    .filter_map(Value::as_i64)
                    .map(SpaceId)
                    .collect();
                Coverage::Static(spaces)
            }
            "mobile" => {
                let person = r.coverage.as_i64().ok_or_else(|| {
                    ScenarioError::data(format!(
                        "sensor {}: mobile coverage must be a person id",
                        r.id
                    ))
                })?;
                Coverage::Mobile(PersonId(person))
            }
            other => {
                return Err(ScenarioError::data(format!(
                    "sensor {}: unknown mobility `{}`",
                    r.id, other
                )))
            }
        };
        registry.add(Sensor {
            id: SensorId(r.id),
            metasensor: MetaSensorId(r.metasensor_id),
            description: r.description,
            interval: r.interval,
            coverage,
            coordinates: r.coordinates,
        });
    }
    Ok(registry)
}

#[derive(Debug, Deserialize)]
struct MetaSensorRecord {
    id: i64,
    #[serde(default)]
    description: String,
}

/// Load the metasensors file
pub fn load_metasensors(path: &Path) -> ScenarioResult<Registry<MetaSensor>> {
    info!("reading metasensors file {}", path.display());
    let records: Vec<MetaSensorRecord> = serde_json::from_value(read_json(path)?)?;
    let mut registry = Registry::new();
    for r in records {
        registry.add(MetaSensor {
            id: MetaSensorId(r.id),
            description: r.description,
        });
    }
    Ok(registry)
}

// ---------------------------------------------------------------------------
// People

#[derive(Debug, Serialize, Deserialize)]
struct PersonRecord {
    id: i64,
    #[serde(rename = "metaperson-id")]
    metaperson_id: i64,
    #[serde(default)]
    description: String,
    #[serde(rename = "profile-index")]
    profile_index: usize,
}

/// Load the people file, validating archetype references
pub fn load_people(
    path: &Path,
    metapeople: &Registry<MetaPerson>,
) -> ScenarioResult<Registry<Person>> {
    info!("reading people file {}", path.display());
    let records: Vec<PersonRecord> = serde_json::from_value(read_json(path)?)?;
    let mut registry = Registry::new();
    for r in records {
        let mid = MetaPersonId(r.metaperson_id);
        let mp = metapeople.get(mid).ok_or_else(|| {
            ScenarioError::data(format!("person {}: metaperson {} absent", r.id, mid))
        })?;
        if r.profile_index >= mp.profiles.len() {
            return Err(ScenarioError::data(format!(
                "person {}: profile index {} out of range",
                r.id, r.profile_index
            )));
        }
        registry.add(Person::new(PersonId(r.id), mid, r.description, r.profile_index));
    }
    Ok(registry)
}

/// Write the people file
pub fn dump_people(path: &Path, people: &Registry<Person>) -> ScenarioResult<()> {
    let records: Vec<PersonRecord> = people
        .iter()
        .map(|p| PersonRecord {
            id: p.id.0,
            metaperson_id: p.metaperson.0,
            description: p.description.clone(),
            profile_index: p.profile_index,
        })
        .collect();
    fs::write(path, serde_json::to_string_pretty(&records)?)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Events

/// Load the events file; out (-1) and leisure (0) are added if missing
pub fn load_events(
    path: &Path,
    metaevents: &Registry<MetaEvent>,
) -> ScenarioResult<Registry<Event>> {
    info!("reading events file {}", path.display());
    let mut registry = Registry::new();
    for v in as_array(&read_json(path)?, "events")? {
        let id = require_i64(&v, "id", "event")?;
        let mid = MetaEventId(require_i64(&v, "metaevent-id", "event")?);
        if !metaevents.contains(mid) {
            return Err(ScenarioError::data(format!(
                "event {}: metaevent {} absent",
                id, mid
            )));
        }
        let spaces = v
            .get("space-ids")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_i64).map(SpaceId).collect())
            .unwrap_or_default();

        let mut capacity = BTreeMap::new();
        match v.get("capacity") {
            Some(Value::String(s)) if s == "inf" => {
                capacity.insert(MetaPersonId(-1), (crate::model::event::MAX_EVENT_CAPACITY, 0));
            }
            Some(Value::Array(entries)) => {
                for x in entries {
                    let mp = MetaPersonId(require_i64(x, "metaperson-id", "event capacity")?);
                    let range = if let Some(r) = x.get("range").and_then(Value::as_array) {
                        let lo = r.first().and_then(Value::as_i64).unwrap_or(0);
                        let hi = r.get(1).and_then(Value::as_i64).unwrap_or(0);
                        (lo, hi)
                    } else {
                        let lo = x.get("lo").and_then(Value::as_i64).unwrap_or(0);
                        let hi = require_i64(x, "hi", "event capacity")?;
                        (lo, hi)
                    };
                    capacity.insert(mp, range);
                }
            }
            _ => {}
        }

        registry.add(Event::new(
            EventId(id),
            mid,
            v.get("description").and_then(Value::as_str).unwrap_or(""),
            v.get("profile-index").and_then(Value::as_u64).unwrap_or(0) as usize,
            spaces,
            capacity,
        ));
    }

    if !registry.contains(EventId::OUT) {
        registry.add(Event::out_sentinel());
    }
    if !registry.contains(EventId::LEISURE) {
        registry.add(Event::leisure_sentinel());
    }
    Ok(registry)
}

/// Write the events file in the dump shape understood by [`load_events`]
pub fn dump_events(path: &Path, events: &Registry<Event>) -> ScenarioResult<()> {
    let mut records = Vec::new();
    for e in events {
        let capacity: Vec<Value> = e
            .capacity
            .iter()
            .map(|(&mp, &(lo, hi))| {
                serde_json::json!({"metaperson-id": mp.0, "range": [lo, hi]})
            })
            .collect();
        records.push(serde_json::json!({
            "id": e.id.0,
            "metaevent-id": e.metaevent.0,
            "description": e.description,
            "profile-index": e.profile_index,
            "space-ids": e.spaces.iter().map(|s| s.0).collect::<Vec<_>>(),
            "capacity": capacity,
        }));
    }
    fs::write(path, serde_json::to_string_pretty(&records)?)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Metapeople

/// Load the metapeople file
pub fn load_metapeople(path: &Path) -> ScenarioResult<Registry<MetaPerson>> {
    info!("reading metapeople file {}", path.display());
    let mut registry = Registry::new();
    for v in as_array(&read_json(path)?, "metapeople")? {
        let id = require_i64(&v, "id", "metaperson")?;
        let (profiles, profile_probabilities) = parse_profiles(&v, "metaperson", id)?;

        let mut affinity = BTreeMap::new();
        if let Some(entries) = v.get("event-affinity").and_then(Value::as_array) {
            for x in entries {
                let me = MetaEventId(require_i64(x, "metaevent-id", "event affinity")?);
                let pr = x.get("probability").and_then(Value::as_f64).unwrap_or(0.0);
                affinity.insert(me, pr);
            }
        }

        registry.add(MetaPerson {
            id: MetaPersonId(id),
            probability: v.get("probability").and_then(Value::as_f64).unwrap_or(1.0),
            description: v
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            profiles,
            profile_probabilities,
            affinity,
        });
    }
    Ok(registry)
}

// ---------------------------------------------------------------------------
// Metaevents

/// Load the metaevents file; out (-1) and leisure (0) are added if missing
pub fn load_metaevents(path: &Path) -> ScenarioResult<Registry<MetaEvent>> {
    info!("reading metaevents file {}", path.display());
    let mut registry = Registry::new();
    for v in as_array(&read_json(path)?, "metaevents")? {
        let id = require_i64(&v, "id", "metaevent")?;
        let (profiles, profile_probabilities) = parse_profiles(&v, "metaevent", id)?;

        let spaces = v
            .get("spaces")
            .ok_or_else(|| ScenarioError::data(format!("metaevent {}: missing `spaces`", id)))?;
        let candidates = spaces
            .get("space-ids")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ScenarioError::data(format!("metaevent {}: missing `spaces.space-ids`", id))
            })?
            .iter()
            .filter_map(Value::as_i64)
            .map(SpaceId)
            .collect();
        let number = spaces.get("number").and_then(Value::as_u64).unwrap_or(1) as usize;

        let mut capacity = BTreeMap::new();
        match v.get("capacity") {
            Some(Value::String(s)) if s == "inf" => {
                capacity.insert(
                    MetaPersonId(-1),
                    (
                        NormalValue::new(0.0, 0.0),
                        NormalValue::new(crate::model::metaevent::MAX_METAEVENT_CAPACITY as f64, 0.0),
                    ),
                );
            }
            Some(Value::Array(entries)) => {
                for x in entries {
                    let mp = MetaPersonId(require_i64(x, "metaperson-id", "metaevent capacity")?);
                    let lo = normal_pair(x, "lo")?;
                    let hi = normal_pair(x, "hi")?;
                    capacity.insert(mp, (lo, hi));
                }
            }
            _ => {}
        }

        registry.add(MetaEvent {
            id: MetaEventId(id),
            description: v
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            probability: v.get("probability").and_then(Value::as_f64).unwrap_or(1.0),
            selector: SpaceSelector::new(candidates, number),
            profiles,
            profile_probabilities,
            capacity,
        });
    }

    if !registry.contains(MetaEventId::OUT) {
        registry.add(MetaEvent::out_sentinel());
    }
    if !registry.contains(MetaEventId::LEISURE) {
        registry.add(MetaEvent::leisure_sentinel());
    }
    Ok(registry)
}

/// A capacity bound that is `[mean, stdev]` or split `<key>-mean` /
/// `<key>-stdev` fields
fn normal_pair(v: &Value, key: &str) -> ScenarioResult<NormalValue> {
    if let Some(pair) = v.get(key).and_then(Value::as_array) {
        let mean = pair.first().and_then(Value::as_f64).ok_or_else(|| {
            ScenarioError::data(format!("capacity `{}` mean must be a number", key))
        })?;
        let stdev = pair.get(1).and_then(Value::as_f64).unwrap_or(0.0);
        return Ok(NormalValue::new(mean, stdev));
    }
    let mean = v
        .get(format!("{}-mean", key))
        .and_then(Value::as_f64)
        .ok_or_else(|| ScenarioError::data(format!("capacity missing `{}` bound", key)))?;
    let stdev = v
        .get(format!("{}-stdev", key))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    Ok(NormalValue::new(mean, stdev))
}

// ---------------------------------------------------------------------------
// Metatrajectories

/// Load pre-recorded trajectories into the store; `path` may be absent
pub fn load_metatrajectories(path: &Path, store: &mut TrajectoryStore) -> ScenarioResult<()> {
    info!("reading metatrajectories file {}", path.display());
    for v in as_array(&read_json(path)?, "metatrajectories")? {
        let src = SpaceId(require_i64(&v, "StartSpaceID", "metatrajectory")?);
        let dst = SpaceId(require_i64(&v, "EndSpaceID", "metatrajectory")?);
        let spaces: Vec<SpaceId> = v
            .get("SpaceID")
            .and_then(Value::as_array)
            .ok_or_else(|| ScenarioError::data("metatrajectory missing `SpaceID`"))?
            .iter()
            .filter_map(Value::as_i64)
            .map(SpaceId)
            .collect();
        let deltas = v
            .get("Delta")
            .and_then(Value::as_array)
            .ok_or_else(|| ScenarioError::data("metatrajectory missing `Delta`"))?
            .iter()
            .map(|x| {
                x.as_str()
                    .ok_or_else(|| ScenarioError::data("metatrajectory delta must be a string"))
                    .and_then(parse_hms)
            })
            .collect::<ScenarioResult<Vec<_>>>()?;
        store.add_recorded(src, dst, Trajectory::new(spaces, deltas));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared helpers

fn require_i64(v: &Value, key: &str, what: &str) -> ScenarioResult<i64> {
    v.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ScenarioError::data(format!("{} missing integer field `{}`", what, key)))
}

/// Parse a `time-profiles` list of `{probability, profile}` entries
fn parse_profiles(
    v: &Value,
    what: &str,
    id: i64,
) -> ScenarioResult<(Vec<crate::calendar::TimeProfile>, Vec<f64>)> {
    let mut profiles = Vec::new();
    let mut probabilities = Vec::new();
    if let Some(list) = v.get("time-profiles").and_then(Value::as_array) {
        for x in list {
            let profile = x.get("profile").ok_or_else(|| {
                ScenarioError::data(format!("{} {}: time profile missing `profile`", what, id))
            })?;
            profiles.push(crate::calendar::TimeProfile::from_json(profile)?);
            probabilities.push(x.get("probability").and_then(Value::as_f64).unwrap_or(1.0));
        }
    }
    Ok((profiles, probabilities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_spaces_adds_outside() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "spaces.json",
            r#"[{"id": 1, "coordinates": [1, 0, 0], "capacity": 10, "neighbors": [0]}]"#,
        );
        let spaces = load_spaces(&path).unwrap();
        assert_eq!(spaces.len(), 2);
        assert!(spaces.contains(SpaceId::OUTSIDE));
        assert!(spaces.get(SpaceId::OUTSIDE).unwrap().is_unlimited());
    }

    #[test]
    fn test_load_sensors_static_and_mobile() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "sensors.json",
            r#"[
                {"id": 1, "metasensor-id": 1, "interval": 60,
                 "mobility": "static", "coverage": [1, 2]},
                {"id": 2, "metasensor-id": 2, "interval": 300,
                 "mobility": "mobile", "coverage": 7, "coordinates": [1, 2, 3]}
            ]"#,
        );
        let sensors = load_sensors(&path).unwrap();
        assert_eq!(
            sensors.get(SensorId(1)).unwrap().coverage,
            Coverage::Static(vec![SpaceId(1), SpaceId(2)])
        );
        assert_eq!(
            sensors.get(SensorId(2)).unwrap().coverage,
            Coverage::Mobile(PersonId(7))
        );
        assert_eq!(sensors.get(SensorId(2)).unwrap().coordinates, Some([1, 2, 3]));
    }

    #[test]
    fn test_load_events_adds_sentinels_and_inf_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let me_path = write_file(&dir, "metaevents.json", "[]");
        let metaevents = load_metaevents(&me_path).unwrap();
        let path = write_file(
            &dir,
            "events.json",
            r#"[{"id": 5, "metaevent-id": 0, "profile-index": 0,
                 "space-ids": [0], "capacity": "inf"}]"#,
        );
        let events = load_events(&path, &metaevents).unwrap();
        assert!(events.contains(EventId::OUT));
        assert!(events.contains(EventId::LEISURE));
        assert!(events.get(EventId(5)).unwrap().is_open_to_all());
    }

    #[test]
    fn test_load_events_unknown_metaevent_is_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let me_path = write_file(&dir, "metaevents.json", "[]");
        let metaevents = load_metaevents(&me_path).unwrap();
        let path = write_file(
            &dir,
            "events.json",
            r#"[{"id": 5, "metaevent-id": 99, "profile-index": 0, "space-ids": [0]}]"#,
        );
        assert!(matches!(
            load_events(&path, &metaevents),
            Err(ScenarioError::Data(_))
        ));
    }

    #[test]
    fn test_events_dump_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let me_path = write_file(&dir, "metaevents.json", "[]");
        let metaevents = load_metaevents(&me_path).unwrap();

        let mut events = Registry::new();
        events.add(Event::out_sentinel());
        events.add(Event::leisure_sentinel());
        let mut capacity = BTreeMap::new();
        capacity.insert(MetaPersonId(1), (2, 8));
        events.add(Event::new(
            EventId(3),
            MetaEventId(0),
            "seminar",
            1,
            vec![SpaceId(4)],
            capacity,
        ));

        let path = dir.path().join("events.json");
        dump_events(&path, &events).unwrap();
        let reloaded = load_events(&path, &metaevents).unwrap();
        assert_eq!(reloaded.len(), 3);
        let e = reloaded.get(EventId(3)).unwrap();
        assert_eq!(e.capacity[&MetaPersonId(1)], (2, 8));
        assert_eq!(e.profile_index, 1);
        assert_eq!(e.spaces, vec![SpaceId(4)]);
    }

    #[test]
    fn test_load_metapeople_with_affinity() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "metapeople.json",
            r#"[{
                "id": 1, "probability": 0.6, "description": "staff",
                "time-profiles": [{
                    "probability": 1.0,
                    "profile": [{
                        "pattern": {
                            "start-date": "2024-01-01", "end-date": "2024-12-31",
                            "period": "day", "period-details": {"repeat-every": 1}
                        },
                        "duration": {
                            "start-time": ["09:00:00", "00:30:00"],
                            "end-time": ["17:00:00", "00:30:00"],
                            "required": ["04:00:00", "00:30:00"]
                        }
                    }]
                }],
                "event-affinity": [{"metaevent-id": 2, "probability": 0.9}]
            }]"#,
        );
        let metapeople = load_metapeople(&path).unwrap();
        let mp = metapeople.get(MetaPersonId(1)).unwrap();
        assert_eq!(mp.probability, 0.6);
        assert_eq!(mp.profiles.len(), 1);
        assert_eq!(mp.affinity_for(MetaEventId(2)), 0.9);
        assert_eq!(mp.affinity_for(MetaEventId(5)), 0.0);
    }

    #[test]
    fn test_load_metaevents_capacity_distributions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "metaevents.json",
            r#"[{
                "id": 2, "probability": 1.0,
                "spaces": {"space-ids": [1, 2, 3], "number": 2},
                "time-profiles": [],
                "capacity": [{"metaperson-id": 1, "lo": [5, 1], "hi": [15, 2]}]
            }]"#,
        );
        let metaevents = load_metaevents(&path).unwrap();
        let me = metaevents.get(MetaEventId(2)).unwrap();
        assert_eq!(me.selector.candidates.len(), 3);
        assert_eq!(me.selector.number, 2);
        let (lo, hi) = &me.capacity[&MetaPersonId(1)];
        assert_eq!(lo.mean, 5.0);
        assert_eq!(hi.stdev, 2.0);
        // Sentinels appended
        assert!(metaevents.contains(MetaEventId::OUT));
        assert!(metaevents.contains(MetaEventId::LEISURE));
    }
}
