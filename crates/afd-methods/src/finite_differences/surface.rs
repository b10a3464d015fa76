//! Stored price history of one solve.
//!
//! Grids may change mid-run, so every slice carries its own grid. Slices are
//! ordered by calendar time: index 0 is the valuation date `t = 0`, the last
//! slice is maturity.

use afd_core::{Real, Time};

use super::grid::Grid;

/// Prices on one grid at one calendar time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlice {
    /// Calendar time `t` (0 = valuation, `T` = maturity).
    pub time: Time,
    /// Grid the values live on.
    pub grid: Grid,
    /// One value per grid node.
    pub values: Vec<Real>,
}

impl TimeSlice {
    /// Value at node `ni`, if it exists.
    pub fn value(&self, ni: usize) -> Option<Real> {
        self.values.get(ni).copied()
    }
}

/// Time-ordered slices of a solved price field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSurface {
    slices: Vec<TimeSlice>,
}

impl PriceSurface {
    /// Wrap slices already in ascending time order.
    pub(crate) fn from_slices(slices: Vec<TimeSlice>) -> Self {
        debug_assert!(slices.windows(2).all(|w| w[0].time <= w[1].time));
        Self { slices }
    }

    /// Number of stored slices.
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// `true` if no slice is stored.
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Slice `ti`, counted from the earliest stored time.
    pub fn slice(&self, ti: usize) -> Option<&TimeSlice> {
        self.slices.get(ti)
    }

    /// All slices, earliest first.
    pub fn slices(&self) -> &[TimeSlice] {
        &self.slices
    }

    /// Price at time index `ti` and node index `ni`.
    pub fn value(&self, ti: usize, ni: usize) -> Option<Real> {
        self.slice(ti)?.value(ni)
    }

    /// The earliest slice: `t = 0` for a completed solve.
    pub fn final_slice(&self) -> Option<&TimeSlice> {
        self.slices.first()
    }

    /// The slice at maturity (the payoff).
    pub fn terminal_slice(&self) -> Option<&TimeSlice> {
        self.slices.last()
    }

    /// Distinct grids in time order; consecutive slices sharing a grid
    /// contribute it once.
    pub fn grids(&self) -> Vec<&Grid> {
        let mut out: Vec<&Grid> = Vec::new();
        for slice in &self.slices {
            match out.last() {
                Some(last) if last.is_same(&slice.grid) || **last == slice.grid => {}
                _ => out.push(&slice.grid),
            }
        }
        out
    }

    /// Every stored point as `(t, S, V)`.
    pub fn triples(&self) -> impl Iterator<Item = (Time, Real, Real)> + '_ {
        self.slices.iter().flat_map(|slice| {
            slice
                .grid
                .nodes()
                .iter()
                .zip(&slice.values)
                .map(move |(&s, &v)| (slice.time, s, v))
        })
    }
}
