//! Event logistics: one planned or actual attendance

use crate::calendar::TimePeriod;
use crate::model::Trajectory;
use crate::types::{EventId, MetaEventId, SpaceId};
use std::cmp::Ordering;
use std::fmt;

/// The tuple describing one attendance: which event, in which space, how the
/// person gets there, and when. Ordering (and therefore set identity in a
/// person's attended-events set) is by `(event, space)` only; the trajectory
/// and period are per-occasion details.
#[derive(Debug, Clone)]
pub struct EventLogistics {
    /// The attended event
    pub event: EventId,
    /// The chosen space
    pub space: SpaceId,
    /// The event's archetype, kept for attendance bookkeeping
    pub metaevent: MetaEventId,
    /// Route from the person's position to the space
    pub trajectory: Trajectory,
    /// Attendance window
    pub period: TimePeriod,
}

impl PartialEq for EventLogistics {
    fn eq(&self, other: &Self) -> bool {
        self.event == other.event && self.space == other.space
    }
}

impl Eq for EventLogistics {}

impl PartialOrd for EventLogistics {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventLogistics {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.event, self.space).cmp(&(other.event, other.space))
    }
}

impl fmt::Display for EventLogistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventLogistics(eid={}, sid={}, traj={}, tp={})",
            self.event, self.space, self.trajectory, self.period
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_datetime;

    fn logistics(event: i64, space: i64) -> EventLogistics {
        EventLogistics {
            event: EventId(event),
            space: SpaceId(space),
            metaevent: MetaEventId(event),
            trajectory: Trajectory::new(vec![SpaceId(space)], vec![]),
            period: TimePeriod::new(
                parse_datetime("2024-01-01 09:00:00").unwrap(),
                parse_datetime("2024-01-01 10:00:00").unwrap(),
            ),
        }
    }

    #[test]
    fn test_identity_is_event_and_space() {
        let a = logistics(1, 2);
        let mut b = logistics(1, 2);
        b.period = TimePeriod::new(
            parse_datetime("2024-06-01 09:00:00").unwrap(),
            parse_datetime("2024-06-01 10:00:00").unwrap(),
        );
        assert_eq!(a, b);

        let mut set = std::collections::BTreeSet::new();
        set.insert(a);
        assert!(!set.insert(b));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_ordering() {
        assert!(logistics(1, 5) < logistics(2, 0));
        assert!(logistics(1, 1) < logistics(1, 2));
    }
}
