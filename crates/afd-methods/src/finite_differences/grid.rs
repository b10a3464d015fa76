//! Spatial grids over the asset-price domain.
//!
//! A [`Grid`] is an immutable, strictly increasing node sequence
//! `S_0 = 0 < S_1 < … < S_n = S_max`. Refinement never mutates a grid; it
//! produces a new snapshot. Clones share the node buffer, so
//! [`Grid::is_same`] can be used as a cheap identity check.

use std::sync::Arc;

use afd_core::{ensure_config, errors::Result, Real, Size};

use super::config::SolverConfig;

/// Ordered node coordinates over `[S_0, S_max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    nodes: Arc<[Real]>,
}

impl Grid {
    /// Build a grid from explicit node coordinates.
    ///
    /// # Errors
    /// Fewer than 3 nodes, non-finite coordinates, or a sequence that is not
    /// strictly increasing.
    pub fn from_nodes(nodes: Vec<Real>) -> Result<Self> {
        afd_core::ensure!(
            nodes.len() >= 3,
            "a grid needs at least 3 nodes, got {}",
            nodes.len()
        );
        afd_core::ensure!(
            nodes.iter().all(|s| s.is_finite()),
            "grid nodes must be finite"
        );
        if let Some(i) = nodes.windows(2).position(|w| w[1] <= w[0]) {
            afd_core::fail!(
                "grid nodes must be strictly increasing: S[{i}] = {} >= S[{}] = {}",
                nodes[i],
                i + 1,
                nodes[i + 1]
            );
        }
        Ok(Self {
            nodes: nodes.into(),
        })
    }

    /// `intervals + 1` equally spaced nodes over `[0, s_max]`.
    pub fn uniform(s_max: Real, intervals: Size) -> Result<Self> {
        ensure_config!(
            s_max.is_finite() && s_max > 0.0,
            "s_max must be positive, got {s_max}"
        );
        ensure_config!(
            intervals >= 2,
            "initial node count must be at least 2, got {intervals}"
        );
        let h = s_max / intervals as Real;
        let mut nodes: Vec<Real> = (0..=intervals).map(|i| i as Real * h).collect();
        // pin the far edge exactly
        nodes[intervals] = s_max;
        Self::from_nodes(nodes)
    }

    /// All node coordinates.
    pub fn nodes(&self) -> &[Real] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; grids hold at least three nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node `i`.
    pub fn node(&self, i: usize) -> Real {
        self.nodes[i]
    }

    /// Lower edge of the domain.
    pub fn s_min(&self) -> Real {
        self.nodes[0]
    }

    /// Upper edge of the domain.
    pub fn s_max(&self) -> Real {
        self.nodes[self.nodes.len() - 1]
    }

    /// Spacing `h_i = S_{i+1} − S_i`.
    pub fn spacing(&self, i: usize) -> Real {
        self.nodes[i + 1] - self.nodes[i]
    }

    /// All spacings, left to right.
    pub fn spacings(&self) -> impl Iterator<Item = Real> + '_ {
        self.nodes.windows(2).map(|w| w[1] - w[0])
    }

    /// Smallest spacing on the grid.
    pub fn min_spacing(&self) -> Real {
        self.spacings().fold(Real::INFINITY, Real::min)
    }

    /// Nodes per unit price inside `[lo, hi]`.
    pub fn density(&self, lo: Real, hi: Real) -> Real {
        if hi <= lo {
            return 0.0;
        }
        let count = self.nodes.iter().filter(|&&s| s >= lo && s <= hi).count();
        count as Real / (hi - lo)
    }

    /// Index of `s` if it is a node of this grid.
    pub fn index_of(&self, s: Real) -> Option<usize> {
        self.nodes.binary_search_by(|x| x.total_cmp(&s)).ok()
    }

    /// `true` if both handles point at the same node buffer.
    pub fn is_same(&self, other: &Grid) -> bool {
        Arc::ptr_eq(&self.nodes, &other.nodes)
    }

    /// New grid with the midpoint of every edge `i` where `split[i]` is set.
    ///
    /// Existing nodes are kept bit-for-bit.
    pub(crate) fn with_midpoints(&self, split: &[bool]) -> Grid {
        debug_assert_eq!(split.len(), self.len() - 1);
        let extra = split.iter().filter(|&&s| s).count();
        let mut nodes = Vec::with_capacity(self.len() + extra);
        for (i, w) in self.nodes.windows(2).enumerate() {
            nodes.push(w[0]);
            if split[i] {
                nodes.push(0.5 * (w[0] + w[1]));
            }
        }
        nodes.push(self.s_max());
        Grid {
            nodes: nodes.into(),
        }
    }
}

/// Builds the initial grid of a solve.
///
/// Both uniform and adaptive solves start from the same uniform seed; the
/// adaptive strategy hands it to the refinement engine afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridBuilder;

impl GridBuilder {
    /// Validate the grid-related configuration fields.
    ///
    /// # Errors
    /// `InvalidConfig` if `S_max ≤ 0`, `initial_nodes < 2`, or the strike
    /// is outside `(0, S_max)`.
    pub fn check(config: &SolverConfig) -> Result<()> {
        ensure_config!(
            config.s_max.is_finite() && config.s_max > 0.0,
            "s_max must be positive, got {}",
            config.s_max
        );
        ensure_config!(
            config.initial_nodes >= 2,
            "initial node count must be at least 2, got {}",
            config.initial_nodes
        );
        ensure_config!(
            config.strike > 0.0 && config.strike < config.s_max,
            "strike {} outside the domain (0, {})",
            config.strike,
            config.s_max
        );
        Ok(())
    }

    /// Uniform `[0, S_max]` grid with `initial_nodes + 1` nodes.
    pub fn build(config: &SolverConfig) -> Result<Grid> {
        Self::check(config)?;
        Grid::uniform(config.s_max, config.initial_nodes)
    }
}
