//! Spaces graph: adjacency plus memoized all-pairs shortest paths
//!
//! Vertices are space ids (0, the outside space, is always present); edges
//! come from each space's neighbor list and weigh the Manhattan distance
//! between the endpoints' coordinates. The all-pairs table is built once
//! with Dijkstra per source (a BFS variant exists for the unweighted
//! path-cache build mode), optionally seeded from and persisted to a CSV
//! cache file with lines `src,dst,p0;p1;…;pn`.

use crate::error::{ScenarioError, ScenarioResult};
use crate::model::Space;
use crate::types::{manhattan, Coordinates, SpaceId};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

type Prev = BTreeMap<SpaceId, SpaceId>;

/// The spaces adjacency graph with its shortest-path cache
#[derive(Debug, Clone, Default)]
pub struct SpacesGraph {
    vertices: BTreeSet<SpaceId>,
    edges: BTreeMap<SpaceId, BTreeSet<SpaceId>>,
    coordinates: BTreeMap<SpaceId, Coordinates>,
    paths: BTreeMap<(SpaceId, SpaceId), Vec<SpaceId>>,
    ready: bool,
}

impl SpacesGraph {
    /// Create an empty graph containing only the outside space
    pub fn new() -> Self {
        let mut g = Self::default();
        g.vertices.insert(SpaceId::OUTSIDE);
        g
    }

    /// Build the graph from loaded spaces and construct the all-pairs table,
    /// seeding from `cache_file` when it exists and rewriting it afterwards.
    /// Pass `None` to skip persistence.
    pub fn from_spaces<'a>(
        spaces: impl IntoIterator<Item = &'a Space>,
        cache_file: Option<&Path>,
    ) -> ScenarioResult<Self> {
        let mut g = Self::new();
        for space in spaces {
            g.add_node(space.id, space.coordinates);
            for &n in &space.neighbors {
                g.add_edge(space.id, n);
            }
        }
        g.cache_all_shortest_paths(cache_file, false)?;
        Ok(g)
    }

    /// Add a vertex; invalidates the all-pairs table
    pub fn add_node(&mut self, s: SpaceId, coordinates: Coordinates) {
        self.ready = false;
        self.vertices.insert(s);
        self.coordinates.insert(s, coordinates);
    }

    /// Add a directed edge; invalidates the all-pairs table
    pub fn add_edge(&mut self, s: SpaceId, t: SpaceId) {
        self.ready = false;
        self.vertices.insert(s);
        self.vertices.insert(t);
        self.edges.entry(s).or_default().insert(t);
    }

    /// The vertex set
    pub fn vertices(&self) -> &BTreeSet<SpaceId> {
        &self.vertices
    }

    /// Build (or load) the all-pairs table. With `use_bfs` the unweighted
    /// BFS variant is used, matching the standalone path-cache build mode.
    pub fn cache_all_shortest_paths(
        &mut self,
        cache_file: Option<&Path>,
        use_bfs: bool,
    ) -> ScenarioResult<()> {
        let loaded = match cache_file {
            Some(path) if path.exists() => {
                info!("reading path cache from {}", path.display());
                self.load_cache(path)?;
                true
            }
            _ => false,
        };

        if !loaded {
            let sources: Vec<SpaceId> = self.vertices.iter().copied().collect();
            for s in sources {
                let prev = if use_bfs {
                    self.bfs(s)
                } else {
                    self.dijkstra(s)
                };
                self.cache_paths_from(s, &prev);
            }
        }

        self.ready = true;
        if let Some(path) = cache_file {
            self.write_cache(path)?;
        }
        Ok(())
    }

    /// The cached shortest path from `s` to `t`. The path starts with `s`
    /// and ends with `t`, or is `[t]` when no route exists.
    pub fn shortest_path(&self, s: SpaceId, t: SpaceId) -> ScenarioResult<&[SpaceId]> {
        if !self.ready {
            return Err(ScenarioError::invariant(
                "shortest path queried before the all-pairs cache was built",
            ));
        }
        self.paths
            .get(&(s, t))
            .map(Vec::as_slice)
            .ok_or_else(|| ScenarioError::data(format!("no path entry for {} -> {}", s, t)))
    }

    /// Manhattan weight of an edge; vertices without coordinates sit at the
    /// origin
    fn weight(&self, s: SpaceId, t: SpaceId) -> i64 {
        let origin = [0, 0, 0];
        let a = self.coordinates.get(&s).unwrap_or(&origin);
        let b = self.coordinates.get(&t).unwrap_or(&origin);
        manhattan(a, b)
    }

    /// Single-source Dijkstra over Manhattan edge weights
    fn dijkstra(&self, s: SpaceId) -> Prev {
        let mut dist: BTreeMap<SpaceId, i64> = BTreeMap::new();
        let mut prev: Prev = BTreeMap::new();
        let mut heap: BinaryHeap<Reverse<(i64, SpaceId)>> = BinaryHeap::new();

        dist.insert(s, 0);
        heap.push(Reverse((0, s)));

        while let Some(Reverse((d, u))) = heap.pop() {
            if dist.get(&u).copied().unwrap_or(i64::MAX) < d {
                continue; // stale heap entry
            }
            let Some(neighbors) = self.edges.get(&u) else {
                continue;
            };
            for &v in neighbors {
                let cand = d + self.weight(u, v);
                if cand < dist.get(&v).copied().unwrap_or(i64::MAX) {
                    dist.insert(v, cand);
                    prev.insert(v, u);
                    heap.push(Reverse((cand, v)));
                }
            }
        }
        prev
    }

    /// Single-source BFS (hop counts instead of weights)
    fn bfs(&self, s: SpaceId) -> Prev {
        let mut prev: Prev = BTreeMap::new();
        let mut seen: BTreeSet<SpaceId> = BTreeSet::from([s]);
        let mut queue: Vec<SpaceId> = vec![s];
        let mut head = 0;

        while head < queue.len() {
            let u = queue[head];
            head += 1;
            let Some(neighbors) = self.edges.get(&u) else {
                continue;
            };
            for &v in neighbors {
                if seen.insert(v) {
                    prev.insert(v, u);
                    queue.push(v);
                }
            }
        }
        prev
    }

    /// Reconstruct and memoize the path from `s` to every vertex
    fn cache_paths_from(&mut self, s: SpaceId, prev: &Prev) {
        for &t in &self.vertices {
            let mut path = Vec::new();
            let mut curr = t;
            let mut reachable = true;
            while curr != s {
                path.push(curr);
                match prev.get(&curr) {
                    Some(&p) => curr = p,
                    None => {
                        reachable = false;
                        break;
                    }
                }
            }
            let path = if reachable {
                path.push(s);
                path.reverse();
                path
            } else {
                vec![t]
            };
            self.paths.insert((s, t), path);
        }
    }

    fn load_cache(&mut self, file: &Path) -> ScenarioResult<()> {
        let text = fs::read_to_string(file)?;
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.splitn(3, ',');
            let (src, dst, hops) = match (fields.next(), fields.next(), fields.next()) {
                (Some(a), Some(b), Some(c)) => (a, b, c),
                _ => {
                    return Err(ScenarioError::data(format!(
                        "path cache {}:{}: expected `src,dst,path`",
                        file.display(),
                        lineno + 1
                    )))
                }
            };
            let parse = |s: &str| -> ScenarioResult<SpaceId> {
                s.trim()
                    .parse::<i64>()
                    .map(SpaceId)
                    .map_err(|e| ScenarioError::data(format!("path cache: bad id `{}`: {}", s, e)))
            };
            let key = (parse(src)?, parse(dst)?);
            let path = hops
                .split(';')
                .filter(|h| !h.trim().is_empty())
                .map(parse)
                .collect::<ScenarioResult<Vec<_>>>()?;
            self.paths.insert(key, path);
        }
        Ok(())
    }

    fn write_cache(&self, file: &Path) -> ScenarioResult<()> {
        let mut out = std::io::BufWriter::new(fs::File::create(file)?);
        for ((s, t), path) in &self.paths {
            let hops: Vec<String> = path.iter().map(|p| p.0.to_string()).collect();
            writeln!(out, "{},{},{}", s.0, t.0, hops.join(";"))?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A line of four spaces 0-1-2-3 with unit spacing
    fn line_spaces() -> Vec<Space> {
        let mk = |id: i64, x: i64, neighbors: Vec<i64>| {
            Space::new(
                SpaceId(id),
                format!("s{}", id),
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
    fn test_shortest_path_endpoints() {
        let spaces = line_spaces();
        let g = SpacesGraph::from_spaces(&spaces, None).unwrap();
        let path = g.shortest_path(SpaceId(0), SpaceId(3)).unwrap();
        assert_eq!(path, &[SpaceId(0), SpaceId(1), SpaceId(2), SpaceId(3)]);
        let path = g.shortest_path(SpaceId(2), SpaceId(2)).unwrap();
        assert_eq!(path, &[SpaceId(2)]);
    }

    #[test]
    fn test_dijkstra_prefers_lighter_route() {
        // 0 -> 1 -> 3 is shorter in Manhattan weight than 0 -> 2 -> 3
        let mk = |id: i64, coords: [i64; 3], neighbors: Vec<i64>| {
            Space::new(
                SpaceId(id),
                "",
                coords,
                -1,
                neighbors.into_iter().map(SpaceId).collect(),
            )
        };
        let spaces = vec![
            mk(0, [0, 0, 0], vec![1, 2]),
            mk(1, [1, 0, 0], vec![3]),
            mk(2, [0, 9, 0], vec![3]),
            mk(3, [2, 0, 0], vec![]),
        ];
        let g = SpacesGraph::from_spaces(&spaces, None).unwrap();
        let path = g.shortest_path(SpaceId(0), SpaceId(3)).unwrap();
        assert_eq!(path, &[SpaceId(0), SpaceId(1), SpaceId(3)]);
    }

    #[test]
    fn test_unreachable_returns_destination_only() {
        let mk = |id: i64| Space::new(SpaceId(id), "", [0, 0, 0], -1, vec![]);
        let spaces = vec![mk(0), mk(5)];
        let g = SpacesGraph::from_spaces(&spaces, None).unwrap();
        assert_eq!(g.shortest_path(SpaceId(0), SpaceId(5)).unwrap(), &[SpaceId(5)]);
    }

    #[test]
    fn test_query_before_build_is_invariant_error() {
        let g = SpacesGraph::new();
        assert!(matches!(
            g.shortest_path(SpaceId(0), SpaceId(0)),
            Err(ScenarioError::Invariant(_))
        ));
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("paths.csv");
        let spaces = line_spaces();

        let g1 = SpacesGraph::from_spaces(&spaces, Some(&cache)).unwrap();
        assert!(cache.exists());

        // A second graph loads the persisted table instead of recomputing
        let g2 = SpacesGraph::from_spaces(&spaces, Some(&cache)).unwrap();
        for &s in g1.vertices() {
            for &t in g1.vertices() {
                assert_eq!(
                    g1.shortest_path(s, t).unwrap(),
                    g2.shortest_path(s, t).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_bfs_build_mode() {
        let spaces = line_spaces();
        let mut g = SpacesGraph::new();
        for c in &spaces {
            g.add_node(c.id, c.coordinates);
            for &n in &c.neighbors {
                g.add_edge(c.id, n);
            }
        }
        g.cache_all_shortest_paths(None, true).unwrap();
        let path = g.shortest_path(SpaceId(3), SpaceId(0)).unwrap();
        assert_eq!(path, &[SpaceId(3), SpaceId(2), SpaceId(1), SpaceId(0)]);
    }
}
