//! Entity generation modes: none / all / diff, and the dump/reload cycle

use smartspec::config::{GenerationMode, GenerationSpec};
use smartspec::data::World;
use smartspec::random::engine;
use smartspec::types::{EventId, MetaEventId, MetaPersonId};
use smartspec::generator;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn daily_profile() -> &'static str {
    r#"{
        "pattern": {
            "start-date": "2024-01-01",
            "end-date": "2024-12-31",
            "period": "day",
            "period-details": {"repeat-every": 1}
        },
        "duration": {
            "start-time": ["09:00:00", "00:00:00"],
            "end-time": ["17:00:00", "00:00:00"],
            "required": ["04:00:00", "00:00:00"]
        }
    }"#
}

fn build_fixture(dir: &TempDir) -> PathBuf {
    let root = dir.path();
    let write = |name: &str, content: &str| fs::write(root.join(name), content).unwrap();

    write(
        "spaces.json",
        r#"[
            {"id": 0, "coordinates": [0, 0, 0], "capacity": -1, "neighbors": [1]},
            {"id": 1, "coordinates": [1, 0, 0], "capacity": 20, "neighbors": [0, 2]},
            {"id": 2, "coordinates": [2, 0, 0], "capacity": 20, "neighbors": [1]}
        ]"#,
    );
    write("sensors.json", "[]");
    write("metasensors.json", "[]");
    write(
        "metapeople.json",
        &format!(
            r#"[
                {{
                    "id": 1, "probability": 0.7, "description": "staff",
                    "time-profiles": [{{"probability": 1.0, "profile": [{p}]}}],
                    "event-affinity": [{{"metaevent-id": 2, "probability": 1.0}}]
                }},
                {{
                    "id": 2, "probability": 0.3, "description": "visitor",
                    "time-profiles": [{{"probability": 1.0, "profile": [{p}]}}],
                    "event-affinity": [{{"metaevent-id": 2, "probability": 0.2}}]
                }}
            ]"#,
            p = daily_profile()
        ),
    );
    write(
        "metaevents.json",
        &format!(
            r#"[{{
                "id": 2, "probability": 1.0,
                "spaces": {{"space-ids": [1, 2], "number": 1}},
                "time-profiles": [{{"probability": 1.0, "profile": [{}]}}],
                "capacity": [{{"metaperson-id": 1, "lo": [2, 1], "hi": [10, 2]}}]
            }}]"#,
            daily_profile()
        ),
    );
    write("events.json", "[]");
    write("people.json", "[]");

    let config = format!(
        "[filepaths]\n\
         spaces = {root}/spaces.json\n\
         sensors = {root}/sensors.json\n\
         metapeople = {root}/metapeople.json\n\
         metaevents = {root}/metaevents.json\n\
         metasensors = {root}/metasensors.json\n\
         metatrajectories = none\n\
         path-cache = none\n\
         constraints = none\n\
         events = {root}/events.json\n\
         people = {root}/people.json\n\
         output = {root}/out\n\
         \n\
         [synthetic-data-generator]\n\
         start = 2024-01-01\n\
         end = 2024-01-01\n\
         seed = 9\n\
         \n\
         [events]\n\
         number = 6\n\
         generation = all\n\
         \n\
         [people]\n\
         number = 10\n\
         generation = all\n",
        root = root.display()
    );
    let path = root.join("config.ini");
    fs::write(&path, config).unwrap();
    path
}

#[test]
fn test_generate_all_materializes_and_dumps() {
    let dir = TempDir::new().unwrap();
    let config = build_fixture(&dir);

    let mut world = World::load(&config).unwrap();
    let events_spec = GenerationSpec::from_config(&world.config, "events").unwrap();
    let people_spec = GenerationSpec::from_config(&world.config, "people").unwrap();
    let mut rng = engine(world.window.seed);

    generator::generate_events(&mut world, events_spec, &mut rng).unwrap();
    generator::generate_people(&mut world, people_spec, &mut rng).unwrap();

    // Sentinels plus the six requested events
    assert!(world.events.contains(EventId::OUT));
    assert!(world.events.contains(EventId::LEISURE));
    assert_eq!(world.events.len(), 8);
    assert_eq!(world.people.len(), 10);

    // Every generated event came from a known archetype with ordered bounds
    for event in world.events.iter().filter(|e| e.id.0 > 0) {
        assert!(world.metaevents.contains(event.metaevent));
        for &(lo, hi) in event.capacity.values() {
            assert!(lo <= hi);
        }
        assert_eq!(event.spaces.len(), 1);
    }

    // Every person references an existing metaperson and a valid profile
    for person in &world.people {
        let mp = world.metapeople.get(person.metaperson).unwrap();
        assert!(person.profile_index < mp.profiles.len());
    }

    // The dumps are reloadable
    let mut reloaded = World::load(&config).unwrap();
    reloaded.load_events().unwrap();
    reloaded.load_people().unwrap();
    assert_eq!(reloaded.events.len(), 8);
    assert_eq!(reloaded.people.len(), 10);
}

#[test]
fn test_diff_mode_tops_up_to_target() {
    let dir = TempDir::new().unwrap();
    let config = build_fixture(&dir);

    let mut world = World::load(&config).unwrap();
    let mut rng = engine(Some(10));

    // First pass generates four people
    generator::generate_people(
        &mut world,
        GenerationSpec {
            number: 4,
            mode: GenerationMode::All,
        },
        &mut rng,
    )
    .unwrap();
    assert_eq!(world.people.len(), 4);

    // Diff tops up to ten without disturbing the existing ids
    generator::generate_people(
        &mut world,
        GenerationSpec {
            number: 10,
            mode: GenerationMode::Diff,
        },
        &mut rng,
    )
    .unwrap();
    assert_eq!(world.people.len(), 10);
    let ids: Vec<i64> = world.people.ids().iter().map(|p| p.0).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<i64>>());

    // Diff at or below the current count adds nothing
    generator::generate_people(
        &mut world,
        GenerationSpec {
            number: 5,
            mode: GenerationMode::Diff,
        },
        &mut rng,
    )
    .unwrap();
    assert_eq!(world.people.len(), 10);
}

#[test]
fn test_none_mode_reloads_existing_file() {
    let dir = TempDir::new().unwrap();
    let config = build_fixture(&dir);
    fs::write(
        dir.path().join("people.json"),
        r#"[{"id": 3, "metaperson-id": 2, "description": "visitor", "profile-index": 0}]"#,
    )
    .unwrap();

    let mut world = World::load(&config).unwrap();
    let mut rng = engine(Some(11));
    generator::generate_people(
        &mut world,
        GenerationSpec {
            number: 99,
            mode: GenerationMode::None,
        },
        &mut rng,
    )
    .unwrap();

    // `none` ignores the requested number entirely
    assert_eq!(world.people.len(), 1);
    assert_eq!(world.people.ids()[0].0, 3);
    assert_eq!(
        world.people.get(smartspec::types::PersonId(3)).unwrap().metaperson,
        MetaPersonId(2)
    );
}

#[test]
fn test_event_generation_draws_weighted_metaevents() {
    let dir = TempDir::new().unwrap();
    let config = build_fixture(&dir);

    let mut world = World::load(&config).unwrap();
    let mut rng = engine(Some(12));
    generator::generate_events(
        &mut world,
        GenerationSpec {
            number: 5,
            mode: GenerationMode::All,
        },
        &mut rng,
    )
    .unwrap();

    // All non-sentinel events reference one of the loaded metaevents
    let known: std::collections::BTreeSet<MetaEventId> =
        world.metaevents.ids().iter().copied().collect();
    for event in world.events.iter() {
        assert!(known.contains(&event.metaevent));
    }
}
