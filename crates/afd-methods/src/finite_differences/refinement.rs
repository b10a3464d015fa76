//! Curvature-driven grid refinement.
//!
//! Each pass estimates `|V''|` at every interior node from a reference field,
//! normalises by the grid maximum and flags the nodes above the threshold.
//! Every edge incident to a flagged node is then split at its midpoint, so a
//! whole neighbourhood is refined at once rather than the single worst node.
//!
//! Passes repeat until nothing is flagged, the pass budget is spent, or the
//! next pass would exceed the node cap. Hitting the cap is not an error: the
//! pass is skipped entirely and the returned status reports `capped`.

use afd_core::{ensure_config, errors::Result, OptionType, Real, Size};
use afd_math::resample_linear;
use tracing::{debug, warn};

use super::config::SolverConfig;
use super::grid::Grid;
use super::operator::second_derivative_weights;

/// Curvature below `CURVATURE_FLOOR × value scale / domain²` is numerical
/// noise; a field that flat flags nothing.
const CURVATURE_FLOOR: Real = 1e-9;

/// Field whose curvature drives refinement.
#[derive(Debug, Clone, Copy)]
pub enum RefinementReference<'a> {
    /// The terminal payoff, re-evaluated on every refined grid.
    Payoff {
        /// Call or put.
        option_type: OptionType,
        /// Strike.
        strike: Real,
    },
    /// Values on the input grid; carried to refined grids by linear
    /// interpolation.
    Field(&'a [Real]),
}

/// Outcome of one or more refinement calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefinementStatus {
    /// A pass was skipped because it would have exceeded `max_nodes`.
    pub capped: bool,
    /// Number of insertion passes actually performed.
    pub passes_run: usize,
    /// The last refinement call ended with no node flagged.
    pub converged: bool,
}

impl RefinementStatus {
    /// Combine with the status of a later refinement call.
    pub fn merge(self, later: RefinementStatus) -> RefinementStatus {
        RefinementStatus {
            capped: self.capped || later.capped,
            passes_run: self.passes_run + later.passes_run,
            converged: later.converged,
        }
    }
}

/// Inserts nodes where the reference field bends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinementEngine {
    threshold: Real,
    max_passes: usize,
    max_nodes: Size,
    min_spacing: Real,
}

impl RefinementEngine {
    /// Engine flagging nodes above `threshold` × the maximum curvature.
    ///
    /// The spacing floor defaults to zero (edges are always split).
    pub fn new(threshold: Real, max_passes: usize, max_nodes: Size) -> Self {
        Self {
            threshold,
            max_passes,
            max_nodes,
            min_spacing: 0.0,
        }
    }

    /// Never split an edge shorter than `2 × min_spacing`.
    pub fn with_min_spacing(mut self, min_spacing: Real) -> Self {
        self.min_spacing = min_spacing;
        self
    }

    /// Engine configured from a solver request.
    pub fn from_config(config: &SolverConfig) -> Self {
        let r = &config.refinement;
        Self::new(r.threshold, r.max_passes, r.max_nodes).with_min_spacing(config.min_spacing())
    }

    /// `|V''(S_i)|` at every node; zero at the two boundary nodes.
    pub fn curvature(grid: &Grid, values: &[Real]) -> Vec<Real> {
        let s = grid.nodes();
        let n = s.len();
        let mut kappa = vec![0.0; n];
        for i in 1..n - 1 {
            let (a, b, c) = second_derivative_weights(s[i] - s[i - 1], s[i + 1] - s[i]);
            kappa[i] = (a * values[i - 1] + b * values[i] + c * values[i + 1]).abs();
        }
        kappa
    }

    /// Nodes whose normalised curvature exceeds the threshold.
    pub fn flag(&self, grid: &Grid, values: &[Real]) -> Vec<bool> {
        let kappa = Self::curvature(grid, values);
        let kappa_max = kappa.iter().copied().fold(0.0, Real::max);
        let scale = values.iter().fold(1.0, |m: Real, v| m.max(v.abs()));
        let span = grid.s_max() - grid.s_min();
        if !(kappa_max * span * span > CURVATURE_FLOOR * scale) {
            return vec![false; grid.len()];
        }
        let last = grid.len() - 1;
        kappa
            .iter()
            .enumerate()
            .map(|(i, k)| i > 0 && i < last && k / kappa_max > self.threshold)
            .collect()
    }

    /// Edges to split for one pass: both edges of every flagged node, except
    /// edges already at the spacing floor.
    fn edges_to_split(&self, grid: &Grid, values: &[Real]) -> Vec<bool> {
        let flags = self.flag(grid, values);
        let mut split = vec![false; grid.len() - 1];
        for (i, _) in flags.iter().enumerate().filter(|&(_, &f)| f) {
            split[i - 1] = true;
            split[i] = true;
        }
        for (i, h) in grid.spacings().enumerate() {
            if h < 2.0 * self.min_spacing {
                split[i] = false;
            }
        }
        split
    }

    fn reference_values(
        reference: &RefinementReference<'_>,
        grid: &Grid,
        previous: Option<(&Grid, &[Real])>,
    ) -> Result<Vec<Real>> {
        match (reference, previous) {
            (RefinementReference::Payoff { option_type, strike }, _) => Ok(grid
                .nodes()
                .iter()
                .map(|&s| option_type.payoff(s, *strike))
                .collect()),
            (RefinementReference::Field(values), None) => Ok(values.to_vec()),
            (RefinementReference::Field(_), Some((old, old_values))) => {
                resample_linear(old.nodes(), old_values, grid.nodes())
            }
        }
    }

    /// Refine `grid` against `reference`.
    ///
    /// Returns the refined grid (the input grid itself if nothing changed)
    /// and the pass status.
    ///
    /// # Errors
    /// `InvalidConfig` for a threshold outside `(0, 1)` or a negative
    /// spacing floor; `Precondition` for a [`RefinementReference::Field`]
    /// whose length differs from the grid.
    pub fn refine(
        &self,
        grid: &Grid,
        reference: RefinementReference<'_>,
    ) -> Result<(Grid, RefinementStatus)> {
        ensure_config!(
            self.threshold > 0.0 && self.threshold < 1.0,
            "refinement threshold must lie in (0, 1), got {}",
            self.threshold
        );
        ensure_config!(
            self.min_spacing >= 0.0,
            "min_spacing must not be negative, got {}",
            self.min_spacing
        );
        if let RefinementReference::Field(values) = reference {
            afd_core::ensure!(
                values.len() == grid.len(),
                "reference field has {} values for {} nodes",
                values.len(),
                grid.len()
            );
        }

        let mut current = grid.clone();
        let mut values = Self::reference_values(&reference, &current, None)?;
        let mut status = RefinementStatus::default();

        loop {
            let split = self.edges_to_split(&current, &values);
            let inserts = split.iter().filter(|&&s| s).count();
            if inserts == 0 {
                status.converged = true;
                break;
            }
            if status.passes_run == self.max_passes {
                break;
            }
            if current.len() + inserts > self.max_nodes {
                warn!(
                    nodes = current.len(),
                    inserts,
                    max_nodes = self.max_nodes,
                    "refinement capped by node limit"
                );
                status.capped = true;
                break;
            }

            let refined = current.with_midpoints(&split);
            values = Self::reference_values(&reference, &refined, Some((&current, &values)))?;
            current = refined;
            status.passes_run += 1;
            debug!(
                pass = status.passes_run,
                inserts,
                nodes = current.len(),
                min_spacing = current.min_spacing(),
                "refinement pass"
            );
        }

        Ok((current, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afd_core::Error;
    use approx::assert_abs_diff_eq;

    const CALL_AT_100: RefinementReference<'static> = RefinementReference::Payoff {
        option_type: OptionType::Call,
        strike: 100.0,
    };

    #[test]
    fn payoff_kink_is_the_only_flag() {
        let grid = Grid::uniform(200.0, 50).unwrap();
        let values: Vec<Real> = grid.nodes().iter().map(|&s| (s - 100.0).max(0.0)).collect();
        let engine = RefinementEngine::new(0.05, 5, 1000);
        let flags = engine.flag(&grid, &values);
        let flagged: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(flagged, vec![25]);

        let kappa = RefinementEngine::curvature(&grid, &values);
        // slope jump of 1 over a 4-wide cell
        assert_abs_diff_eq!(kappa[25], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn one_pass_splits_both_neighbouring_edges() {
        let grid = Grid::uniform(200.0, 50).unwrap();
        let engine = RefinementEngine::new(0.05, 1, 1000);
        let (refined, status) = engine.refine(&grid, CALL_AT_100).unwrap();
        assert_eq!(status.passes_run, 1);
        assert!(!status.converged);
        assert_eq!(refined.len(), grid.len() + 2);
        assert!(refined.index_of(98.0).is_some());
        assert!(refined.index_of(102.0).is_some());
    }

    #[test]
    fn strike_between_nodes_flags_both_neighbours() {
        let grid = Grid::uniform(200.0, 40).unwrap(); // h = 5, strike 102 off-node
        let engine = RefinementEngine::new(0.05, 1, 1000);
        let reference = RefinementReference::Payoff {
            option_type: OptionType::Put,
            strike: 102.0,
        };
        let (refined, _) = engine.refine(&grid, reference).unwrap();
        // nodes 100 and 105 flagged: edges 95–100, 100–105, 105–110 split
        assert_eq!(refined.len(), grid.len() + 3);
        for mid in [97.5, 102.5, 107.5] {
            assert!(refined.index_of(mid).is_some(), "missing {mid}");
        }
    }

    #[test]
    fn node_cap_skips_the_pass() {
        let grid = Grid::uniform(200.0, 50).unwrap();
        let engine = RefinementEngine::new(0.05, 10, 52);
        let (refined, status) = engine.refine(&grid, CALL_AT_100).unwrap();
        assert!(status.capped);
        assert_eq!(status.passes_run, 0);
        assert!(refined.is_same(&grid));
    }

    #[test]
    fn spacing_floor_leads_to_convergence() {
        let grid = Grid::uniform(200.0, 50).unwrap();
        let engine = RefinementEngine::new(0.05, 50, 1000).with_min_spacing(0.5);
        let (refined, status) = engine.refine(&grid, CALL_AT_100).unwrap();
        assert!(status.converged);
        assert!(!status.capped);
        // 4 → 2 → 1 → 0.5: three passes, stops before going below the floor
        assert_eq!(status.passes_run, 3);
        assert_abs_diff_eq!(refined.min_spacing(), 0.5, epsilon = 1e-12);

        let (again, second) = engine.refine(&refined, CALL_AT_100).unwrap();
        assert_eq!(again, refined);
        assert_eq!(second.passes_run, 0);
        assert!(second.converged);
    }

    #[test]
    fn linear_field_flags_nothing() {
        let grid = Grid::uniform(200.0, 20).unwrap();
        let values: Vec<Real> = grid.nodes().iter().map(|s| 3.0 * s - 7.0).collect();
        let engine = RefinementEngine::new(0.05, 5, 1000);
        let (refined, status) = engine.refine(&grid, RefinementReference::Field(&values)).unwrap();
        assert!(status.converged);
        assert_eq!(status.passes_run, 0);
        assert!(refined.is_same(&grid));
    }

    #[test]
    fn field_reference_must_match_grid() {
        let grid = Grid::uniform(200.0, 20).unwrap();
        let engine = RefinementEngine::new(0.05, 5, 1000);
        assert!(engine
            .refine(&grid, RefinementReference::Field(&[0.0; 3]))
            .is_err());
    }

    #[test]
    fn out_of_range_threshold_is_an_error() {
        let grid = Grid::uniform(200.0, 10).unwrap();
        for threshold in [-0.1, 0.0, 1.0, Real::NAN] {
            let engine = RefinementEngine::new(threshold, 2, 100);
            assert!(
                matches!(engine.refine(&grid, CALL_AT_100), Err(Error::InvalidConfig(_))),
                "threshold {threshold} accepted"
            );
        }
    }

    #[test]
    fn boundary_nodes_are_never_flagged() {
        let grid = Grid::uniform(200.0, 10).unwrap();
        let values: Vec<Real> = grid.nodes().iter().map(|&s| (s - 100.0).max(0.0)).collect();
        let flags = RefinementEngine::new(0.05, 2, 100).flag(&grid, &values);
        assert!(!flags[0]);
        assert!(!flags[grid.len() - 1]);
        assert!(flags[5]);
    }

    #[test]
    fn status_merge() {
        let first = RefinementStatus {
            capped: true,
            passes_run: 2,
            converged: false,
        };
        let later = RefinementStatus {
            capped: false,
            passes_run: 3,
            converged: true,
        };
        let merged = first.merge(later);
        assert!(merged.capped);
        assert_eq!(merged.passes_run, 5);
        assert!(merged.converged);
    }
}
