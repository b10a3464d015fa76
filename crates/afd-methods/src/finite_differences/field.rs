//! Price values attached to a grid.

use afd_core::{errors::Result, OptionType, Real};
use afd_math::{resample_linear, HermiteCubic, Interpolation1D, LinearInterpolation, SlopeMethod};

use super::grid::Grid;

/// How prices between nodes are read off a solved field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceInterpolation {
    /// Straight line between the two bracketing nodes.
    #[default]
    Linear,
    /// Monotone (Fritsch-Butland) cubic Hermite.
    Cubic,
}

/// One price per grid node at a single point in time.
///
/// The value vector always has the grid's length.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceField {
    grid: Grid,
    values: Vec<Real>,
}

impl PriceField {
    /// Wrap `values` on `grid`.
    pub fn new(grid: Grid, values: Vec<Real>) -> Result<Self> {
        afd_core::ensure!(
            values.len() == grid.len(),
            "price field has {} values for {} grid nodes",
            values.len(),
            grid.len()
        );
        Ok(Self { grid, values })
    }

    /// Terminal condition: the payoff at every node.
    pub fn from_payoff(grid: Grid, option_type: OptionType, strike: Real) -> Self {
        let values = grid
            .nodes()
            .iter()
            .map(|&s| option_type.payoff(s, strike))
            .collect();
        Self { grid, values }
    }

    /// The grid the values live on.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Node values.
    pub fn values(&self) -> &[Real] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [Real] {
        &mut self.values
    }

    /// Carry the field onto `grid` by linear interpolation.
    ///
    /// Values at nodes shared by both grids are copied exactly.
    pub fn reinterpolate(&self, grid: &Grid) -> Result<PriceField> {
        let values = resample_linear(self.grid.nodes(), &self.values, grid.nodes())?;
        Ok(Self {
            grid: grid.clone(),
            values,
        })
    }

    /// Interpolated price at `spot`.
    ///
    /// # Errors
    /// `InvalidArgument` if `spot` lies outside the grid.
    pub fn value_at(&self, spot: Real, method: PriceInterpolation) -> Result<Real> {
        if !(spot >= self.grid.s_min() && spot <= self.grid.s_max()) {
            afd_core::fail!(
                "spot {spot} outside the grid [{}, {}]",
                self.grid.s_min(),
                self.grid.s_max()
            );
        }
        let xs = self.grid.nodes();
        let value = match method {
            PriceInterpolation::Linear => LinearInterpolation::new(xs, &self.values)?.operator(spot),
            PriceInterpolation::Cubic => {
                HermiteCubic::new(xs, &self.values, SlopeMethod::FritschButland)?.operator(spot)
            }
        };
        Ok(value)
    }
}
