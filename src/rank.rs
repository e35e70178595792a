//! Rank Allocation
//!
//! Sortable positions for inserting between two neighbors without
//! renumbering the lane.

use std::fmt;

/// Spacing between consecutive ranks of a freshly ranked lane
pub const GAP: f64 = 640.0;

/// Neighbors closer than this are treated as exhausted
pub const MIN_SPACING: f64 = 1e-6;

/// Bisection between two neighbors can no longer produce a usable rank
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankExhausted {
    pub prev: f64,
    pub next: f64,
}

impl fmt::Display for RankExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no rank left between {} and {}", self.prev, self.next)
    }
}

impl std::error::Error for RankExhausted {}

/// Rank for an item placed after `prev` and before `next`
pub fn allocate(prev: Option<f64>, next: Option<f64>) -> f64 {
    match (prev, next) {
        (None, None) => GAP,
        (None, Some(next)) => next - GAP,
        (Some(prev), None) => prev + GAP,
        (Some(prev), Some(next)) => (prev + next) / 2.0,
    }
}

/// Like `allocate`, but refuses when the result would not sort strictly
/// between the neighbors.
pub fn try_allocate(prev: Option<f64>, next: Option<f64>) -> Result<f64, RankExhausted> {
    try_allocate_with(prev, next, MIN_SPACING)
}

pub fn try_allocate_with(
    prev: Option<f64>,
    next: Option<f64>,
    min_spacing: f64,
) -> Result<f64, RankExhausted> {
    let rank = allocate(prev, next);
    let ok = match (prev, next) {
        (Some(p), Some(n)) => n - p > min_spacing && p < rank && rank < n,
        (Some(p), None) => rank > p && rank.is_finite(),
        (None, Some(n)) => rank < n && rank.is_finite(),
        (None, None) => true,
    };
    if ok {
        Ok(rank)
    } else {
        Err(RankExhausted {
            prev: prev.unwrap_or(f64::NEG_INFINITY),
            next: next.unwrap_or(f64::INFINITY),
        })
    }
}

/// Evenly spaced ranks for renumbering a lane of `len` items
pub fn spread(len: usize) -> Vec<f64> {
    (1..=len).map(|i| i as f64 * GAP).collect()
}
