//! Trajectory store: (src, dst) → recorded or synthesized trajectories
//!
//! Queries prefer pre-recorded trajectories when they exist; otherwise the
//! shortest path is materialized with per-hop durations sampled from
//! `N(5·d, 1·d)` seconds, d being the Manhattan distance between consecutive
//! hops. A per-pair choice cache can pin the picked alternative so repeated
//! queries return the same route.

use crate::error::{ScenarioError, ScenarioResult};
use crate::model::{MetaTrajectory, Space, Trajectory};
use crate::random::{NormalValue, SimRng};
use crate::routing::SpacesGraph;
use crate::types::{manhattan, Coordinates, SpaceId};
use chrono::Duration;
use rand::Rng;
use std::collections::BTreeMap;
use std::path::Path;

/// Seconds of transit per unit of Manhattan distance (mean)
const SECONDS_PER_UNIT: f64 = 5.0;
/// Seconds of transit per unit of Manhattan distance (stdev)
const SECONDS_PER_UNIT_STDEV: f64 = 1.0;

/// The trajectory store
#[derive(Debug, Default)]
pub struct TrajectoryStore {
    graph: SpacesGraph,
    coordinates: BTreeMap<SpaceId, Coordinates>,
    entries: Vec<MetaTrajectory>,
    index: BTreeMap<(SpaceId, SpaceId), usize>,
    choice_cache: BTreeMap<(SpaceId, SpaceId), (usize, usize)>,
}

impl TrajectoryStore {
    /// Build the store over the given spaces, constructing the graph's
    /// all-pairs table (seeded from `path_cache` when present)
    pub fn new<'a>(
        spaces: impl IntoIterator<Item = &'a Space> + Clone,
        path_cache: Option<&Path>,
    ) -> ScenarioResult<Self> {
        let graph = SpacesGraph::from_spaces(spaces.clone(), path_cache)?;
        let coordinates = spaces
            .into_iter()
            .map(|c| (c.id, c.coordinates))
            .collect();
        Ok(Self {
            graph,
            coordinates,
            entries: Vec::new(),
            index: BTreeMap::new(),
            choice_cache: BTreeMap::new(),
        })
    }

    /// Register a pre-recorded trajectory for its (src, dst) pair
    pub fn add_recorded(&mut self, src: SpaceId, dst: SpaceId, trajectory: Trajectory) {
        match self.index.get(&(src, dst)) {
            Some(&i) => self.entries[i].trajectories.push(trajectory),
            None => {
                self.index.insert((src, dst), self.entries.len());
                self.entries.push(MetaTrajectory {
                    src,
                    dst,
                    trajectories: vec![trajectory],
                });
            }
        }
    }

    /// The underlying graph
    pub fn graph(&self) -> &SpacesGraph {
        &self.graph
    }

    /// Resolve a trajectory from `s` to `t` with default options
    pub fn get_path(&mut self, s: SpaceId, t: SpaceId, rng: &mut SimRng) -> ScenarioResult<Trajectory> {
        self.get_path_with(s, t, false, false, rng)
    }

    /// Resolve a trajectory from `s` to `t`.
    ///
    /// With `use_shortest`, or when no recorded trajectory exists, the
    /// shortest path is synthesized (and remembered). With `use_cache`, an
    /// earlier pick for the pair is returned unchanged; otherwise one of the
    /// recorded alternatives is chosen uniformly and cached.
    pub fn get_path_with(
        &mut self,
        s: SpaceId,
        t: SpaceId,
        use_cache: bool,
        use_shortest: bool,
        rng: &mut SimRng,
    ) -> ScenarioResult<Trajectory> {
        let key = (s, t);

        if use_shortest || !self.index.contains_key(&key) {
            let hops = self.graph.shortest_path(s, t)?.to_vec();
            let deltas = self.estimate_times(&hops, rng);
            let trajectory = Trajectory::new(hops, deltas);
            self.add_recorded(s, t, trajectory.clone());
            return Ok(trajectory);
        }

        if use_cache {
            if let Some(&(entry, which)) = self.choice_cache.get(&key) {
                return Ok(self.entries[entry].trajectories[which].clone());
            }
        }

        let entry = self.index[&key];
        let alternatives = &self.entries[entry].trajectories;
        if alternatives.is_empty() {
            return Err(ScenarioError::invariant(format!(
                "trajectory entry {} -> {} has no alternatives",
                s, t
            )));
        }
        let which = rng.gen_range(0..alternatives.len());
        self.choice_cache.insert(key, (entry, which));
        Ok(self.entries[entry].trajectories[which].clone())
    }

    /// Sample per-hop durations for a space sequence
    fn estimate_times(&self, hops: &[SpaceId], rng: &mut SimRng) -> Vec<Duration> {
        let origin = [0, 0, 0];
        hops.windows(2)
            .map(|pair| {
                let a = self.coordinates.get(&pair[0]).unwrap_or(&origin);
                let b = self.coordinates.get(&pair[1]).unwrap_or(&origin);
                let d = manhattan(a, b) as f64;
                let secs = NormalValue::new(
                    SECONDS_PER_UNIT * d,
                    SECONDS_PER_UNIT_STDEV * d,
                )
                .sample(rng);
                Duration::seconds(secs.max(0))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::engine;

    fn line_spaces() -> Vec<Space> {
        let mk = |id: i64, x: i64, neighbors: Vec<i64>| {
            Space::new(
                SpaceId(id),
                "",
                [x, 0, 0],
                -1,
                neighbors.into_iter().map(SpaceId).collect(),
            )
        };
        vec![
            mk(0, 0, vec![1]),
            mk(1, 1, vec![0, 2]),
            mk(2, 2, vec![1, 3]),
            mk(3, 3, vec![2]),
        ]
    }

    #[test]
    fn test_synthesized_path_follows_graph() {
        let spaces = line_spaces();
        let mut store = TrajectoryStore::new(&spaces, None).unwrap();
        let mut rng = engine(Some(11));
        let traj = store.get_path(SpaceId(0), SpaceId(3), &mut rng).unwrap();
        assert_eq!(
            traj.spaces,
            vec![SpaceId(0), SpaceId(1), SpaceId(2), SpaceId(3)]
        );
        assert_eq!(traj.deltas.len(), 3);
        assert!(traj.total_time() >= Duration::zero());
    }

    #[test]
    fn test_recorded_trajectory_is_preferred() {
        let spaces = line_spaces();
        let mut store = TrajectoryStore::new(&spaces, None).unwrap();
        let mut rng = engine(Some(12));
        let scenic = Trajectory::new(
            vec![SpaceId(0), SpaceId(1), SpaceId(2), SpaceId(1), SpaceId(2), SpaceId(3)],
            vec![Duration::seconds(5); 5],
        );
        store.add_recorded(SpaceId(0), SpaceId(3), scenic.clone());
        let traj = store.get_path(SpaceId(0), SpaceId(3), &mut rng).unwrap();
        assert_eq!(traj, scenic);
    }

    #[test]
    fn test_use_shortest_overrides_recorded() {
        let spaces = line_spaces();
        let mut store = TrajectoryStore::new(&spaces, None).unwrap();
        let mut rng = engine(Some(13));
        let scenic = Trajectory::new(
            vec![SpaceId(0), SpaceId(1), SpaceId(0), SpaceId(1), SpaceId(2), SpaceId(3)],
            vec![Duration::seconds(5); 5],
        );
        store.add_recorded(SpaceId(0), SpaceId(3), scenic);
        let traj = store
            .get_path_with(SpaceId(0), SpaceId(3), false, true, &mut rng)
            .unwrap();
        assert_eq!(
            traj.spaces,
            vec![SpaceId(0), SpaceId(1), SpaceId(2), SpaceId(3)]
        );
    }

    #[test]
    fn test_choice_cache_pins_alternative() {
        let spaces = line_spaces();
        let mut store = TrajectoryStore::new(&spaces, None).unwrap();
        let mut rng = engine(Some(14));
        for i in 0..4 {
            store.add_recorded(
                SpaceId(0),
                SpaceId(3),
                Trajectory::new(
                    vec![SpaceId(0), SpaceId(3)],
                    vec![Duration::seconds(i + 1)],
                ),
            );
        }
        let first = store
            .get_path_with(SpaceId(0), SpaceId(3), true, false, &mut rng)
            .unwrap();
        for _ in 0..10 {
            let again = store
                .get_path_with(SpaceId(0), SpaceId(3), true, false, &mut rng)
                .unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_same_space_path_is_null_trajectory() {
        let spaces = line_spaces();
        let mut store = TrajectoryStore::new(&spaces, None).unwrap();
        let mut rng = engine(Some(15));
        let traj = store.get_path(SpaceId(2), SpaceId(2), &mut rng).unwrap();
        assert_eq!(traj.len(), 1);
        assert!(traj.is_null());
    }
}
