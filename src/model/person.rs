//! Concrete people and their attendance state

use crate::model::EventLogistics;
use crate::types::{EventId, MetaEventId, MetaPersonId, PersonId, SpaceId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A simulated person. The current space and attendance sets are mutated by
/// the simulator; everything else is fixed at materialization.
#[derive(Debug, Clone)]
pub struct Person {
    /// Person id
    pub id: PersonId,
    /// The archetype this person was drawn from
    pub metaperson: MetaPersonId,
    /// Human-readable description (copied from the archetype)
    pub description: String,
    /// Index of the chosen time profile within the archetype
    pub profile_index: usize,
    /// Where the person currently is; starts and ends each day outside
    pub current_space: SpaceId,
    /// Events attended so far, keyed by (event, space)
    pub attended: BTreeSet<EventLogistics>,
    /// Derived: ids of attended events
    pub attended_events: BTreeSet<EventId>,
    /// Derived: attendance count per metaevent
    pub attended_metaevents: BTreeMap<MetaEventId, i64>,
}

impl Person {
    /// Create a person standing outside with no attendance history
    pub fn new(
        id: PersonId,
        metaperson: MetaPersonId,
        description: impl Into<String>,
        profile_index: usize,
    ) -> Self {
        Self {
            id,
            metaperson,
            description: description.into(),
            profile_index,
            current_space: SpaceId::OUTSIDE,
            attended: BTreeSet::new(),
            attended_events: BTreeSet::new(),
            attended_metaevents: BTreeMap::new(),
        }
    }

    /// Record an attendance and update the derived tallies
    pub fn add_attended(&mut self, logistics: EventLogistics) {
        self.attended_events.insert(logistics.event);
        *self
            .attended_metaevents
            .entry(logistics.metaevent)
            .or_insert(0) += 1;
        self.attended.insert(logistics);
    }

    /// How many times the person attended events of the given archetype
    pub fn metaevent_count(&self, id: MetaEventId) -> i64 {
        self.attended_metaevents.get(&id).copied().unwrap_or(0)
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Person(id={}, mid={}, desc=\"{}\", tp={})",
            self.id, self.metaperson, self.description, self.profile_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{parse_datetime, TimePeriod};
    use crate::model::Trajectory;

    fn attendance(event: i64, space: i64, metaevent: i64) -> EventLogistics {
        EventLogistics {
            event: EventId(event),
            space: SpaceId(space),
            metaevent: MetaEventId(metaevent),
            trajectory: Trajectory::new(vec![SpaceId(space)], vec![]),
            period: TimePeriod::new(
                parse_datetime("2024-01-01 09:00:00").unwrap(),
                parse_datetime("2024-01-01 10:00:00").unwrap(),
            ),
        }
    }

    #[test]
    fn test_person_starts_outside() {
        let p = Person::new(PersonId(1), MetaPersonId(1), "staff", 0);
        assert_eq!(p.current_space, SpaceId::OUTSIDE);
        assert!(p.attended.is_empty());
    }

    #[test]
    fn test_attendance_updates_tallies() {
        let mut p = Person::new(PersonId(1), MetaPersonId(1), "staff", 0);
        p.add_attended(attendance(10, 3, 2));
        p.add_attended(attendance(11, 3, 2));
        p.add_attended(attendance(10, 3, 2)); // same (event, space) key

        assert_eq!(p.attended.len(), 2);
        assert!(p.attended_events.contains(&EventId(10)));
        assert!(p.attended_events.contains(&EventId(11)));
        assert_eq!(p.metaevent_count(MetaEventId(2)), 3);
        assert_eq!(p.metaevent_count(MetaEventId(9)), 0);
    }
}
