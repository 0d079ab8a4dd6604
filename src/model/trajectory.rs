//! Trajectories: paths through spaces with per-hop durations

use crate::types::SpaceId;
use chrono::Duration;
use std::fmt;

/// An ordered walk through spaces. A single-element trajectory means the
/// subject is already at the destination; a trajectory with no per-hop
/// durations is treated as invalid by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trajectory {
    /// Visited space ids, source first
    pub spaces: Vec<SpaceId>,
    /// Transit time between consecutive spaces; `deltas.len() == spaces.len() - 1`
    pub deltas: Vec<Duration>,
}

impl Trajectory {
    /// Create a trajectory
    pub fn new(spaces: Vec<SpaceId>, deltas: Vec<Duration>) -> Self {
        Self { spaces, deltas }
    }

    /// Number of spaces visited
    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    /// Whether the trajectory visits no spaces
    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    /// Whether the trajectory carries no transit information
    pub fn is_null(&self) -> bool {
        self.deltas.is_empty()
    }

    /// The final space, if any
    pub fn dest(&self) -> Option<SpaceId> {
        self.spaces.last().copied()
    }

    /// Total transit time over all hops
    pub fn total_time(&self) -> Duration {
        self.deltas
            .iter()
            .fold(Duration::zero(), |acc, d| acc + *d)
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for (i, s) in self.spaces.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, ">")
    }
}

/// Pre-recorded alternatives for one (src, dst) pair
#[derive(Debug, Clone)]
pub struct MetaTrajectory {
    /// Source space
    pub src: SpaceId,
    /// Destination space
    pub dst: SpaceId,
    /// Recorded trajectories between the pair
    pub trajectories: Vec<Trajectory>,
}
