//! Random engine and selection helpers
//!
//! The whole pipeline is deterministic given a seed: a single [`SimRng`] is
//! constructed by the driver (from the optional `seed` config key or OS
//! entropy) and passed by `&mut` through every sampling API. Weighted
//! selection uses `WeightedIndex`, matching the semantics of a discrete
//! distribution over non-negative weights.

use crate::error::{ScenarioError, ScenarioResult};
use crate::types::SpaceId;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

/// The random engine threaded through the simulation
pub type SimRng = StdRng;

/// Construct the engine, seeded explicitly or from OS entropy
pub fn engine(seed: Option<u64>) -> SimRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Pick one item uniformly at random; `None` on an empty slice
pub fn pick_uniform<'a, T>(items: &'a [T], rng: &mut SimRng) -> Option<&'a T> {
    items.choose(rng)
}

/// Pick one item by weight. Degenerate weight vectors (all zero, or any
/// negative) fall back to a uniform pick rather than failing the run.
pub fn pick_weighted<'a, T>(items: &'a [T], weights: &[f64], rng: &mut SimRng) -> Option<&'a T> {
    if items.is_empty() || items.len() != weights.len() {
        return None;
    }
    match WeightedIndex::new(weights) {
        Ok(distr) => items.get(distr.sample(rng)),
        Err(_) => pick_uniform(items, rng),
    }
}

/// Draw `n` items uniformly. Without replacement, `n` must not exceed the
/// population size.
pub fn sample_uniform<T: Clone>(
    items: &[T],
    n: usize,
    replace: bool,
    rng: &mut SimRng,
) -> ScenarioResult<Vec<T>> {
    if replace {
        Ok((0..n).filter_map(|_| items.choose(rng).cloned()).collect())
    } else {
        if n > items.len() {
            return Err(ScenarioError::invariant(format!(
                "cannot draw {} of {} items without replacement",
                n,
                items.len()
            )));
        }
        let mut idx: Vec<usize> = (0..items.len()).collect();
        idx.shuffle(rng);
        Ok(idx.into_iter().take(n).map(|i| items[i].clone()).collect())
    }
}

/// Draw `n` items by weight. Without replacement, each draw removes the
/// selected item and its weight before the next draw.
pub fn sample_weighted<T: Clone>(
    items: &[T],
    weights: &[f64],
    n: usize,
    replace: bool,
    rng: &mut SimRng,
) -> ScenarioResult<Vec<T>> {
    if items.len() != weights.len() {
        return Err(ScenarioError::invariant(
            "weighted sample: items and weights differ in length",
        ));
    }
    if replace {
        Ok((0..n)
            .filter_map(|_| pick_weighted(items, weights, rng).cloned())
            .collect())
    } else {
        if n > items.len() {
            return Err(ScenarioError::invariant(format!(
                "cannot draw {} of {} items without replacement",
                n,
                items.len()
            )));
        }
        let mut pool: Vec<T> = items.to_vec();
        let mut prs: Vec<f64> = weights.to_vec();
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let i = match WeightedIndex::new(&prs) {
                Ok(distr) => distr.sample(rng),
                Err(_) => rng.gen_range(0..pool.len()),
            };
            out.push(pool.remove(i));
            prs.remove(i);
        }
        Ok(out)
    }
}

/// Return a fresh uniformly shuffled copy of the items
pub fn shuffled<T: Clone>(items: &[T], rng: &mut SimRng) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}

/// An integer quantity drawn from a normal distribution (capacity bounds)
#[derive(Debug, Clone, Copy)]
pub struct NormalValue {
    /// Distribution mean
    pub mean: f64,
    /// Distribution standard deviation
    pub stdev: f64,
}

impl NormalValue {
    /// Create from mean and standard deviation
    pub fn new(mean: f64, stdev: f64) -> Self {
        Self { mean, stdev }
    }

    /// Draw one sample, rounded toward zero
    pub fn sample(&self, rng: &mut SimRng) -> i64 {
        match rand_distr::Normal::new(self.mean, self.stdev) {
            Ok(distr) => rand_distr::Distribution::sample(&distr, rng) as i64,
            Err(_) => self.mean as i64,
        }
    }
}

/// Chooses N concrete spaces out of K candidates when an event archetype is
/// materialized
#[derive(Debug, Clone, Default)]
pub struct SpaceSelector {
    /// Candidate space ids
    pub candidates: Vec<SpaceId>,
    /// How many spaces each concrete event occupies
    pub number: usize,
}

impl SpaceSelector {
    /// Create a selector over the given candidates
    pub fn new(candidates: Vec<SpaceId>, number: usize) -> Self {
        Self { candidates, number }
    }

    /// Draw `number` distinct spaces
    pub fn select(&self, rng: &mut SimRng) -> ScenarioResult<Vec<SpaceId>> {
        sample_uniform(&self.candidates, self.number, false, rng)
    }
}
