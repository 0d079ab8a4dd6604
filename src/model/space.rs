//! Spaces: rooms or regions with capacity, coordinates, and occupancy
//!
//! Occupancy is an interval map from epoch seconds to headcount. The
//! simulator inserts one `[start, end)` interval per attendance row; the
//! capacity gate and the movement logic query point occupancy and the next
//! open second of a day.

use crate::calendar::{day_end, epoch_seconds, from_epoch_seconds};
use crate::interval::IntervalMap;
use crate::types::{Coordinates, SpaceId};
use chrono::NaiveDateTime;
use std::fmt;

/// Capacity value meaning "unlimited"
pub const UNLIMITED_CAPACITY: i64 = -1;

/// A room or region of the instrumented space
#[derive(Debug, Clone)]
pub struct Space {
    /// Space id; 0 is the reserved outside space
    pub id: SpaceId,
    /// Human-readable description
    pub description: String,
    /// 3-D integer coordinates; edge weights are Manhattan distances
    pub coordinates: Coordinates,
    /// Maximum simultaneous occupants; -1 means unlimited
    pub capacity: i64,
    /// Adjacent space ids
    pub neighbors: Vec<SpaceId>,
    /// Occupancy counts over time
    occupancy: IntervalMap<i64>,
}

impl Space {
    /// Create a space with empty occupancy
    pub fn new(
        id: SpaceId,
        description: impl Into<String>,
        coordinates: Coordinates,
        capacity: i64,
        neighbors: Vec<SpaceId>,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            coordinates,
            capacity,
            neighbors,
            occupancy: IntervalMap::new(),
        }
    }

    /// The reserved outside space (id 0, unlimited capacity)
    pub fn outside() -> Self {
        Self::new(
            SpaceId::OUTSIDE,
            "outside (added)",
            [0, 0, 0],
            UNLIMITED_CAPACITY,
            Vec::new(),
        )
    }

    /// Whether the space never fills up
    pub fn is_unlimited(&self) -> bool {
        self.capacity == UNLIMITED_CAPACITY
    }

    /// Count one occupant over `[start, end)`
    pub fn insert_occupancy(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        self.occupancy
            .add(epoch_seconds(start), epoch_seconds(end), 1);
    }

    /// Headcount at the given instant
    pub fn occupancy_at(&self, at: NaiveDateTime) -> i64 {
        self.occupancy
            .get(epoch_seconds(at))
            .copied()
            .unwrap_or(0)
    }

    /// The earliest instant `t' >= at`, within the same day, at which the
    /// space is at or below capacity; `None` if the day stays full.
    pub fn next_open_time(&self, at: NaiveDateTime) -> Option<NaiveDateTime> {
        if self.is_unlimited() {
            return Some(at);
        }
        let last = epoch_seconds(day_end(at.date()));
        let mut cursor = epoch_seconds(at);
        while cursor <= last {
            match self.occupancy.get(cursor) {
                None => return Some(from_epoch_seconds(cursor)),
                Some(&count) if count <= self.capacity => {
                    return Some(from_epoch_seconds(cursor))
                }
                Some(_) => {
                    // Skip to the end of the saturated segment
                    cursor = self
                        .occupancy
                        .range(cursor, last + 1)
                        .next()
                        .map(|(_, end, _)| end)
                        .unwrap_or(last + 1);
                }
            }
        }
        None
    }

    /// Iterate the recorded occupancy segments as `(start, end, count)`
    pub fn occupancy_segments(&self) -> impl Iterator<Item = (i64, i64, &i64)> {
        self.occupancy.iter()
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Space(id={}, desc=\"{}\", cap={}, coords=[{}, {}, {}])",
            self.id,
            self.description,
            self.capacity,
            self.coordinates[0],
            self.coordinates[1],
            self.coordinates[2]
        )
    }
}
