//! 1D interpolation on ordered node sets.
//!
//! Used to read prices off a solved grid and to carry a price field onto a
//! refined grid.

pub mod cubic;

pub use cubic::{HermiteCubic, SlopeMethod};

use afd_core::{errors::Result, Real};

/// A 1D interpolation function `f: R → R` defined by a set of known points.
pub trait Interpolation1D: std::fmt::Debug {
    /// Evaluate the interpolation at `x`.
    fn operator(&self, x: Real) -> Real;

    /// Return the lower bound of the interpolation domain.
    fn x_min(&self) -> Real;

    /// Return the upper bound of the interpolation domain.
    fn x_max(&self) -> Real;

    /// Return `true` if `x` is within the interpolation range.
    fn is_in_range(&self, x: Real) -> bool {
        x >= self.x_min() && x <= self.x_max()
    }
}

/// Find `i` such that `xs[i] <= x < xs[i+1]`, clamped to `[0, n-2]`.
///
/// `xs` must be sorted and hold at least two points.
pub fn locate(xs: &[Real], x: Real) -> usize {
    let n = xs.len();
    debug_assert!(n >= 2);
    xs.partition_point(|&xi| xi <= x).clamp(1, n - 1) - 1
}

fn check_nodes(xs: &[Real], ys: &[Real], min_points: usize) -> Result<()> {
    afd_core::ensure!(
        xs.len() >= min_points,
        "need at least {min_points} points for interpolation, got {}",
        xs.len()
    );
    afd_core::ensure!(
        xs.len() == ys.len(),
        "xs and ys must have the same length ({} vs {})",
        xs.len(),
        ys.len()
    );
    afd_core::ensure!(
        xs.windows(2).all(|w| w[1] > w[0]),
        "xs must be strictly increasing"
    );
    Ok(())
}

// ── Linear ────────────────────────────────────────────────────────────────────

/// Linear interpolation.
///
/// `f(x) = y[i] + (y[i+1] - y[i]) * (x - x[i]) / (x[i+1] - x[i])`
///
/// Returns the stored value exactly whenever `x` coincides with a node.
#[derive(Debug, Clone)]
pub struct LinearInterpolation<'a> {
    xs: &'a [Real],
    ys: &'a [Real],
}

impl<'a> LinearInterpolation<'a> {
    /// Construct a linear interpolation over sorted `xs` and matching `ys`.
    ///
    /// # Errors
    /// Returns an error if the slices have different lengths, hold fewer than
    /// 2 points, or `xs` is not strictly increasing.
    pub fn new(xs: &'a [Real], ys: &'a [Real]) -> Result<Self> {
        check_nodes(xs, ys, 2)?;
        Ok(Self { xs, ys })
    }
}

impl Interpolation1D for LinearInterpolation<'_> {
    fn x_min(&self) -> Real {
        self.xs[0]
    }

    fn x_max(&self) -> Real {
        self.xs[self.xs.len() - 1]
    }

    fn operator(&self, x: Real) -> Real {
        let i = locate(self.xs, x);
        if x == self.xs[i + 1] {
            return self.ys[i + 1];
        }
        let dx = self.xs[i + 1] - self.xs[i];
        self.ys[i] + (x - self.xs[i]) * (self.ys[i + 1] - self.ys[i]) / dx
    }
}

/// Carry values from one sorted node set onto another by linear
/// interpolation.
///
/// Target nodes that coincide with a source node receive the source value
/// bit-for-bit. Target nodes outside the source range are extrapolated from
/// the end segments.
pub fn resample_linear(xs: &[Real], ys: &[Real], targets: &[Real]) -> Result<Vec<Real>> {
    let interp = LinearInterpolation::new(xs, ys)?;
    let mut out = Vec::with_capacity(targets.len());
    let mut j = 0;
    for &x in targets {
        // targets are sorted, so the source cursor only moves forward
        while j < xs.len() && xs[j] < x {
            j += 1;
        }
        if j < xs.len() && xs[j] == x {
            out.push(ys[j]);
        } else {
            out.push(interp.operator(x));
        }
    }
    Ok(out)
}
