//! Concrete events and per-metaperson enrollment accounting

use crate::types::{EventId, MetaEventId, MetaPersonId, SpaceId};
use std::collections::BTreeMap;
use std::fmt;

/// Capacity ceiling used for the leisure sentinel
pub const MAX_EVENT_CAPACITY: i64 = 99999;

/// Inclusive enrollment bounds for one metaperson; -1 in `max` means
/// unlimited
pub type CapRange = (i64, i64);

/// A concrete event materialized from an archetype
#[derive(Debug, Clone)]
pub struct Event {
    /// Event id; 0 is leisure, -1 is out-of-simulation
    pub id: EventId,
    /// The archetype this event was drawn from
    pub metaevent: MetaEventId,
    /// Human-readable description
    pub description: String,
    /// Index of the chosen time profile within the archetype
    pub profile_index: usize,
    /// Concrete spaces the event can be held in
    pub spaces: Vec<SpaceId>,
    /// Enrollment bounds per metaperson; the key -1 marks the leisure event
    /// attendable by anyone
    pub capacity: BTreeMap<MetaPersonId, CapRange>,
    /// Running enrollment count per metaperson
    pub enrolled: BTreeMap<MetaPersonId, i64>,
}

impl Event {
    /// Create an event with no enrollment
    pub fn new(
        id: EventId,
        metaevent: MetaEventId,
        description: impl Into<String>,
        profile_index: usize,
        spaces: Vec<SpaceId>,
        capacity: BTreeMap<MetaPersonId, CapRange>,
    ) -> Self {
        Self {
            id,
            metaevent,
            description: description.into(),
            profile_index,
            spaces,
            capacity,
            enrolled: BTreeMap::new(),
        }
    }

    /// The out-of-simulation sentinel (id -1, outside space)
    pub fn out_sentinel() -> Self {
        Self::new(
            EventId::OUT,
            MetaEventId::OUT,
            "out-of-simulation (added)",
            0,
            vec![SpaceId::OUTSIDE],
            BTreeMap::new(),
        )
    }

    /// The leisure sentinel (id 0, outside space, open to anyone)
    pub fn leisure_sentinel() -> Self {
        let mut capacity = BTreeMap::new();
        capacity.insert(MetaPersonId(-1), (MAX_EVENT_CAPACITY, 0));
        Self::new(
            EventId::LEISURE,
            MetaEventId::LEISURE,
            "leisure (added)",
            0,
            vec![SpaceId::OUTSIDE],
            capacity,
        )
    }

    /// Whether the event is attendable regardless of metaperson (the leisure
    /// sentinel's `"inf"` capacity)
    pub fn is_open_to_all(&self) -> bool {
        self.capacity.contains_key(&MetaPersonId(-1))
    }

    /// Whether one more person of the given archetype may enroll
    pub fn can_attend(&self, metaperson: MetaPersonId) -> bool {
        match self.capacity.get(&metaperson) {
            None => false,
            Some(&(_, max)) => {
                if max == -1 {
                    return true;
                }
                self.enrolled.get(&metaperson).copied().unwrap_or(0) < max
            }
        }
    }

    /// Count one enrollment for the given archetype
    pub fn enroll(&mut self, metaperson: MetaPersonId) {
        *self.enrolled.entry(metaperson).or_insert(0) += 1;
    }

    /// Sum of maximum capacities over all metapersons
    pub fn total_capacity(&self) -> i64 {
        self.capacity.values().map(|&(_, max)| max).sum()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event(id={}, mid={}, desc=\"{}\", tp={}, spaces={:?})",
            self.id,
            self.metaevent,
            self.description,
            self.profile_index,
            self.spaces.iter().map(|s| s.0).collect::<Vec<_>>()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with_cap(min: i64, max: i64) -> Event {
        let mut capacity = BTreeMap::new();
        capacity.insert(MetaPersonId(1), (min, max));
        Event::new(EventId(5), MetaEventId(2), "seminar", 0, vec![SpaceId(3)], capacity)
    }

    #[test]
    fn test_can_attend_until_full() {
        let mut e = event_with_cap(0, 2);
        let mp = MetaPersonId(1);
        assert!(e.can_attend(mp));
        e.enroll(mp);
        assert!(e.can_attend(mp));
        e.enroll(mp);
        assert!(!e.can_attend(mp));
    }

    #[test]
    fn test_unknown_metaperson_cannot_attend() {
        let e = event_with_cap(0, 10);
        assert!(!e.can_attend(MetaPersonId(99)));
    }

    #[test]
    fn test_unlimited_capacity() {
        let mut e = event_with_cap(0, -1);
        let mp = MetaPersonId(1);
        for _ in 0..100 {
            assert!(e.can_attend(mp));
            e.enroll(mp);
        }
    }

    #[test]
    fn test_zero_capacity_blocks() {
        let e = event_with_cap(0, 0);
        assert!(!e.can_attend(MetaPersonId(1)));
    }

    #[test]
    fn test_leisure_sentinel_is_open_to_all() {
        let e = Event::leisure_sentinel();
        assert!(e.is_open_to_all());
        assert_eq!(e.id, EventId::LEISURE);
        assert_eq!(e.spaces, vec![SpaceId::OUTSIDE]);
    }

    #[test]
    fn test_total_capacity_sums_maxima() {
        let mut capacity = BTreeMap::new();
        capacity.insert(MetaPersonId(1), (0, 4));
        capacity.insert(MetaPersonId(2), (1, 6));
        let e = Event::new(EventId(1), MetaEventId(1), "", 0, vec![], capacity);
        assert_eq!(e.total_capacity(), 10);
    }
}
