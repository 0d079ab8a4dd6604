//! Interval maps over half-open `[start, end)` ranges of epoch seconds
//!
//! The map keeps a sorted set of disjoint segments. Adding a value over a
//! range splits the boundary segments, accumulates into every covered
//! segment, and fills gaps with fresh segments. Queries are point lookups
//! and ordered walks; both the occupancy counter (per space) and the
//! observation framework's person-set attendance maps build on this one
//! structure.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Values that can be aggregated when ranges overlap
pub trait Accumulate: Clone + Default + PartialEq {
    /// Fold another value into `self`
    fn accumulate(&mut self, other: &Self);
}

impl Accumulate for i64 {
    fn accumulate(&mut self, other: &Self) {
        *self += other;
    }
}

impl Accumulate for f64 {
    fn accumulate(&mut self, other: &Self) {
        *self += other;
    }
}

impl<T: Ord + Clone> Accumulate for BTreeSet<T> {
    fn accumulate(&mut self, other: &Self) {
        self.extend(other.iter().cloned());
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Segment<V> {
    end: i64,
    value: V,
}

/// A map from disjoint half-open intervals to accumulated values
#[derive(Debug, Clone, Default)]
pub struct IntervalMap<V> {
    segments: BTreeMap<i64, Segment<V>>,
}

impl<V: Accumulate> IntervalMap<V> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            segments: BTreeMap::new(),
        }
    }

    /// Whether no interval has been added
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Accumulate `value` over `[start, end)`; empty ranges are ignored
    pub fn add(&mut self, start: i64, end: i64, value: V) {
        if start >= end {
            return;
        }
        self.split_at(start);
        self.split_at(end);

        // Accumulate into covered segments, remembering uncovered gaps
        let mut cursor = start;
        let mut gaps: Vec<(i64, i64)> = Vec::new();
        for (&seg_start, seg) in self.segments.range_mut(start..end) {
            if seg_start > cursor {
                gaps.push((cursor, seg_start));
            }
            seg.value.accumulate(&value);
            cursor = seg.end;
        }
        if cursor < end {
            gaps.push((cursor, end));
        }

        for (gap_start, gap_end) in gaps {
            let mut fresh = V::default();
            fresh.accumulate(&value);
            self.segments.insert(
                gap_start,
                Segment {
                    end: gap_end,
                    value: fresh,
                },
            );
        }

        self.coalesce(start, end);
    }

    /// The value at point `t`, if any interval covers it
    pub fn get(&self, t: i64) -> Option<&V> {
        let (_, seg) = self.segments.range(..=t).next_back()?;
        (t < seg.end).then_some(&seg.value)
    }

    /// Iterate segments as `(start, end, value)`, ordered by start
    pub fn iter(&self) -> impl Iterator<Item = (i64, i64, &V)> {
        self.segments
            .iter()
            .map(|(&start, seg)| (start, seg.end, &seg.value))
    }

    /// Iterate the segments intersecting `[from, to)`
    pub fn range(&self, from: i64, to: i64) -> impl Iterator<Item = (i64, i64, &V)> {
        // A segment starting before `from` may still cover it
        let lead = self
            .segments
            .range(..from)
            .next_back()
            .filter(|(_, seg)| seg.end > from)
            .map(|(&start, seg)| (start, seg.end, &seg.value));
        lead.into_iter().chain(
            self.segments
                .range(from..to)
                .map(|(&start, seg)| (start, seg.end, &seg.value)),
        )
    }

    /// Split the segment covering `point` (if any) so that `point` becomes a
    /// segment boundary
    fn split_at(&mut self, point: i64) {
        let Some((_, seg)) = self.segments.range_mut(..point).next_back() else {
            return;
        };
        if seg.end <= point {
            return;
        }
        let tail = Segment {
            end: seg.end,
            value: seg.value.clone(),
        };
        seg.end = point;
        self.segments.insert(point, tail);
    }

    /// Merge adjacent equal-valued segments around the touched range
    fn coalesce(&mut self, start: i64, end: i64) {
        let from = self
            .segments
            .range(..start)
            .next_back()
            .map(|(&s, _)| s)
            .unwrap_or(start);
        let keys: Vec<i64> = self.segments.range(from..=end).map(|(&s, _)| s).collect();
        let mut left = match keys.first() {
            Some(&k) => k,
            None => return,
        };
        for &right in &keys[1..] {
            let merge = match (self.segments.get(&left), self.segments.get(&right)) {
                (Some(a), Some(b)) => a.end == right && a.value == b.value,
                _ => false,
            };
            if merge {
                let absorbed = self.segments.remove(&right).expect("segment exists");
                if let Some(a) = self.segments.get_mut(&left) {
                    a.end = absorbed.end;
                }
            } else {
                left = right;
            }
        }
    }
}
