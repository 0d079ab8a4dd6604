//! Cross-cutting constraints between spaces, people, and events
//!
//! Eight keyed tables gate event selection: (space, person) and
//! (space, metaperson) constraints require prior attendance and/or an active
//! time profile; (space, event) and (space, metaevent) constraints gate on a
//! time profile and/or the event's total capacity; the four
//! person/metaperson × event/metaevent tables carry structural `countdown`
//! and `range` slots whose predicates are not evaluated yet and always pass.
//! A missing table entry always passes; each combined check is a
//! short-circuiting conjunction.

use crate::calendar::{NormalTime, TimeProfile};
use crate::error::{ScenarioError, ScenarioResult};
use crate::model::{Event, Person};
use crate::random::SimRng;
use crate::types::{EventId, MetaEventId, MetaPersonId, PersonId, SpaceId};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Attendance a person must already have to enter a space
#[derive(Debug, Clone)]
pub enum RequiredAttendance {
    /// Every listed event must have been attended
    Events(BTreeSet<EventId>),
    /// Attendance count per metaevent must lie in the inclusive range;
    /// -1 on either side means unbounded
    MetaEvents(BTreeMap<MetaEventId, (i64, i64)>),
}

/// A (space, person) or (space, metaperson) constraint
#[derive(Debug, Clone, Default)]
pub struct SpacePersonConstraint {
    /// Required prior attendance, if any
    pub required: Option<RequiredAttendance>,
    /// Gate: the profile must be active at the checked instant
    pub profile: Option<TimeProfile>,
}

/// A (space, event) or (space, metaevent) constraint
#[derive(Debug, Clone, Default)]
pub struct SpaceEventConstraint {
    /// Gate: the profile must be active at the checked instant
    pub profile: Option<TimeProfile>,
    /// Bounds on the event's total maximum capacity; -1 means unbounded
    pub capacity: Option<(i64, i64)>,
}

/// A person/metaperson × event/metaevent constraint. Both slots are
/// structural only: the predicate is not evaluated yet and the check passes.
#[derive(Debug, Clone, Default)]
pub struct PersonEventConstraint {
    /// Lead time before the event, unused by the current predicate
    pub countdown: Option<NormalTime>,
    /// Attendance-count range, unused by the current predicate
    pub range: Option<(i64, i64)>,
}

/// The eight keyed constraint tables
#[derive(Debug, Default)]
pub struct ConstraintEngine {
    cp: BTreeMap<(SpaceId, PersonId), SpacePersonConstraint>,
    cmp: BTreeMap<(SpaceId, MetaPersonId), SpacePersonConstraint>,
    ce: BTreeMap<(SpaceId, EventId), SpaceEventConstraint>,
    cme: BTreeMap<(SpaceId, MetaEventId), SpaceEventConstraint>,
    pe: BTreeMap<(PersonId, EventId), PersonEventConstraint>,
    pme: BTreeMap<(PersonId, MetaEventId), PersonEventConstraint>,
    mpe: BTreeMap<(MetaPersonId, EventId), PersonEventConstraint>,
    mpme: BTreeMap<(MetaPersonId, MetaEventId), PersonEventConstraint>,
}

impl ConstraintEngine {
    /// An engine with no constraints (everything passes)
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the constraints file: one JSON array mixing all eight shapes,
    /// discriminated by which id fields each object carries. Objects that
    /// match no shape are skipped with a warning.
    pub fn from_json(doc: &Value) -> ScenarioResult<Self> {
        let arr = doc
            .as_array()
            .ok_or_else(|| ScenarioError::data("constraints file must be a JSON array"))?;
        let mut engine = Self::new();

        for v in arr {
            let space = id_field(v, "space-id");
            let person = id_field(v, "person-id");
            let metaperson = id_field(v, "metaperson-id");
            let event = id_field(v, "event-id");
            let metaevent = id_field(v, "metaevent-id");

            match (space, person, metaperson, event, metaevent) {
                (Some(c), Some(p), ..) => {
                    engine.add_cp(SpaceId(c), PersonId(p), space_person(v)?);
                }
                (Some(c), None, Some(mp), ..) => {
                    engine.add_cmp(SpaceId(c), MetaPersonId(mp), space_person(v)?);
                }
                (Some(c), None, None, Some(e), _) => {
                    engine.add_ce(SpaceId(c), EventId(e), space_event(v)?);
                }
                (Some(c), None, None, None, Some(me)) => {
                    engine.add_cme(SpaceId(c), MetaEventId(me), space_event(v)?);
                }
                (None, Some(p), _, Some(e), _) => {
                    engine.add_pe(PersonId(p), EventId(e), person_event(v)?);
                }
                (None, Some(p), _, None, Some(me)) => {
                    engine.add_pme(PersonId(p), MetaEventId(me), person_event(v)?);
                }
                (None, None, Some(mp), Some(e), _) => {
                    engine.add_mpe(MetaPersonId(mp), EventId(e), person_event(v)?);
                }
                (None, None, Some(mp), None, Some(me)) => {
                    engine.add_mpme(MetaPersonId(mp), MetaEventId(me), person_event(v)?);
                }
                _ => warn!("constraint entry matches no known shape, skipping"),
            }
        }
        Ok(engine)
    }

    /// Register a (space, person) constraint
    pub fn add_cp(&mut self, space: SpaceId, person: PersonId, c: SpacePersonConstraint) {
        self.cp.insert((space, person), c);
    }

    /// Register a (space, metaperson) constraint
    pub fn add_cmp(&mut self, space: SpaceId, mp: MetaPersonId, c: SpacePersonConstraint) {
        self.cmp.insert((space, mp), c);
    }

    /// Register a (space, event) constraint
    pub fn add_ce(&mut self, space: SpaceId, event: EventId, c: SpaceEventConstraint) {
        self.ce.insert((space, event), c);
    }

    /// Register a (space, metaevent) constraint
    pub fn add_cme(&mut self, space: SpaceId, me: MetaEventId, c: SpaceEventConstraint) {
        self.cme.insert((space, me), c);
    }

    /// Register a (person, event) constraint
    pub fn add_pe(&mut self, person: PersonId, event: EventId, c: PersonEventConstraint) {
        self.pe.insert((person, event), c);
    }

    /// Register a (person, metaevent) constraint
    pub fn add_pme(&mut self, person: PersonId, me: MetaEventId, c: PersonEventConstraint) {
        self.pme.insert((person, me), c);
    }

    /// Register a (metaperson, event) constraint
    pub fn add_mpe(&mut self, mp: MetaPersonId, event: EventId, c: PersonEventConstraint) {
        self.mpe.insert((mp, event), c);
    }

    /// Register a (metaperson, metaevent) constraint
    pub fn add_mpme(&mut self, mp: MetaPersonId, me: MetaEventId, c: PersonEventConstraint) {
        self.mpme.insert((mp, me), c);
    }

    /// CP ∧ CMP for the person entering the space
    pub fn check_cp_constraints(
        &self,
        space: SpaceId,
        person: &Person,
        now: NaiveDateTime,
        rng: &mut SimRng,
    ) -> bool {
        if let Some(c) = self.cp.get(&(space, person.id)) {
            if !check_space_person(c, person, now, rng) {
                return false;
            }
        }
        if let Some(c) = self.cmp.get(&(space, person.metaperson)) {
            if !check_space_person(c, person, now, rng) {
                return false;
            }
        }
        true
    }

    /// CE ∧ CME for the event held in the space
    pub fn check_ce_constraints(
        &self,
        space: SpaceId,
        event: &Event,
        now: NaiveDateTime,
        rng: &mut SimRng,
    ) -> bool {
        if let Some(c) = self.ce.get(&(space, event.id)) {
            if !check_space_event(c, event, now, rng) {
                return false;
            }
        }
        if let Some(c) = self.cme.get(&(space, event.metaevent)) {
            if !check_space_event(c, event, now, rng) {
                return false;
            }
        }
        true
    }

    /// PE ∧ PME ∧ MPE ∧ MPME. The four tables are looked up, but their
    /// predicates are structural placeholders and currently always pass.
    pub fn check_pe_constraints(
        &self,
        person: &Person,
        event: &Event,
        _now: NaiveDateTime,
    ) -> bool {
        let _ = self.pe.get(&(person.id, event.id));
        let _ = self.pme.get(&(person.id, event.metaevent));
        let _ = self.mpe.get(&(person.metaperson, event.id));
        let _ = self.mpme.get(&(person.metaperson, event.metaevent));
        true
    }
}

fn check_space_person(
    c: &SpacePersonConstraint,
    person: &Person,
    now: NaiveDateTime,
    rng: &mut SimRng,
) -> bool {
    match &c.required {
        Some(RequiredAttendance::Events(events)) => {
            if !events.iter().all(|e| person.attended_events.contains(e)) {
                return false;
            }
        }
        Some(RequiredAttendance::MetaEvents(ranges)) => {
            for (&me, &(min, max)) in ranges {
                let count = person.metaevent_count(me);
                if (min != -1 && min > count) || (max != -1 && count > max) {
                    return false;
                }
            }
        }
        None => {}
    }
    match &c.profile {
        Some(tp) => tp.query(now, false, rng).is_some(),
        None => true,
    }
}

fn check_space_event(
    c: &SpaceEventConstraint,
    event: &Event,
    now: NaiveDateTime,
    rng: &mut SimRng,
) -> bool {
    if let Some(tp) = &c.profile {
        if tp.query(now, false, rng).is_none() {
            return false;
        }
    }
    if let Some((min, max)) = c.capacity {
        let total = event.total_capacity();
        if (min != -1 && min > total) || (max != -1 && total > max) {
            return false;
        }
    }
    true
}

fn id_field(v: &Value, key: &str) -> Option<i64> {
    v.get(key).and_then(Value::as_i64)
}

fn range_pair(v: &Value, key: &str) -> ScenarioResult<Option<(i64, i64)>> {
    match v.get(key) {
        None => Ok(None),
        Some(Value::Array(pair)) if pair.len() == 2 => {
            let lo = pair[0]
                .as_i64()
                .ok_or_else(|| ScenarioError::data(format!("`{}` bounds must be integers", key)))?;
            let hi = pair[1]
                .as_i64()
                .ok_or_else(|| ScenarioError::data(format!("`{}` bounds must be integers", key)))?;
            Ok(Some((lo, hi)))
        }
        Some(_) => Err(ScenarioError::data(format!(
            "`{}` must be a two-element array",
            key
        ))),
    }
}

fn profile_field(v: &Value) -> ScenarioResult<Option<TimeProfile>> {
    match v.get("time-profile") {
        Some(list) => Ok(Some(TimeProfile::from_json(list)?)),
        None => Ok(None),
    }
}

fn space_person(v: &Value) -> ScenarioResult<SpacePersonConstraint> {
    let required = if let Some(events) = v.get("required-event-ids") {
        let ids = events
            .as_array()
            .ok_or_else(|| ScenarioError::data("`required-event-ids` must be an array"))?
            .iter()
            .filter_map(Value::as_i64)
            .map(EventId)
            .collect();
        Some(RequiredAttendance::Events(ids))
    } else if let Some(metas) = v.get("required-metaevent-ids") {
        let mut ranges = BTreeMap::new();
        for x in metas
            .as_array()
            .ok_or_else(|| ScenarioError::data("`required-metaevent-ids` must be an array"))?
        {
            let id = id_field(x, "metaevent-id")
                .ok_or_else(|| ScenarioError::data("required metaevent missing `metaevent-id`"))?;
            let range = range_pair(x, "range")?
                .ok_or_else(|| ScenarioError::data("required metaevent missing `range`"))?;
            ranges.insert(MetaEventId(id), range);
        }
        Some(RequiredAttendance::MetaEvents(ranges))
    } else {
        None
    };

    Ok(SpacePersonConstraint {
        required,
        profile: profile_field(v)?,
    })
}

fn space_event(v: &Value) -> ScenarioResult<SpaceEventConstraint> {
    Ok(SpaceEventConstraint {
        profile: profile_field(v)?,
        capacity: range_pair(v, "capacity")?,
    })
}

fn person_event(v: &Value) -> ScenarioResult<PersonEventConstraint> {
    let countdown = match v.get("countdown") {
        Some(Value::Array(pair)) if pair.len() == 2 => {
            let mean = pair[0]
                .as_str()
                .ok_or_else(|| ScenarioError::data("`countdown` times must be strings"))?;
            let stdev = pair[1]
                .as_str()
                .ok_or_else(|| ScenarioError::data("`countdown` times must be strings"))?;
            Some(NormalTime::parse(mean, stdev)?)
        }
        Some(_) => return Err(ScenarioError::data("`countdown` must be a two-element array")),
        None => None,
    };
    Ok(PersonEventConstraint {
        countdown,
        range: range_pair(v, "range")?,
    })
}
