//! Non-uniform finite-difference discretisation of the Black-Scholes
//! generator.
//!
//! For an interior node `S_i` with gaps `h₋ = S_i − S_{i−1}` and
//! `h₊ = S_{i+1} − S_i` the three-point weights
//!
//! ```text
//! V''(S_i) ≈ 2/(h₋(h₋+h₊))·V_{i−1} − 2/(h₋h₊)·V_i + 2/(h₊(h₋+h₊))·V_{i+1}
//! V'(S_i)  ≈ −h₊/(h₋(h₋+h₊))·V_{i−1} + (h₊−h₋)/(h₋h₊)·V_i + h₋/(h₊(h₋+h₊))·V_{i+1}
//! ```
//!
//! are exact for quadratics. Row `i` of the operator is
//! `½σ²S_i²·V'' + rS_i·V' − rV_i`. The two boundary rows are zero; the edge
//! values are imposed by the boundary conditions.

use afd_core::{Rate, Real, Volatility};
use afd_math::TridiagonalOperator;

use super::grid::Grid;

/// Weights `(a, b, c)` with `a·V_{i−1} + b·V_i + c·V_{i+1} ≈ V''(S_i)`.
#[inline]
pub fn second_derivative_weights(h_m: Real, h_p: Real) -> (Real, Real, Real) {
    let sum = h_m + h_p;
    (2.0 / (h_m * sum), -2.0 / (h_m * h_p), 2.0 / (h_p * sum))
}

/// Weights `(a, b, c)` with `a·V_{i−1} + b·V_i + c·V_{i+1} ≈ V'(S_i)`.
#[inline]
pub fn first_derivative_weights(h_m: Real, h_p: Real) -> (Real, Real, Real) {
    let sum = h_m + h_p;
    (-h_p / (h_m * sum), (h_p - h_m) / (h_m * h_p), h_m / (h_p * sum))
}

/// The discretised generator `L` on one grid.
///
/// Built for exactly one grid snapshot; [`is_built_for`](Self::is_built_for)
/// tells the caller when it has gone stale.
#[derive(Debug, Clone)]
pub struct BlackScholesOperator {
    grid: Grid,
    volatility: Volatility,
    rate: Rate,
    op: TridiagonalOperator,
}

impl BlackScholesOperator {
    /// Assemble `L` on `grid`.
    pub fn build(grid: &Grid, volatility: Volatility, rate: Rate) -> Self {
        let s = grid.nodes();
        let n = s.len();
        let mut op = TridiagonalOperator::new(n);
        let half_var = 0.5 * volatility * volatility;

        for i in 1..n - 1 {
            let h_m = s[i] - s[i - 1];
            let h_p = s[i + 1] - s[i];
            let (d2_m, d2_0, d2_p) = second_derivative_weights(h_m, h_p);
            let (d1_m, d1_0, d1_p) = first_derivative_weights(h_m, h_p);

            let diffusion = half_var * s[i] * s[i];
            let drift = rate * s[i];

            op.lower[i] = diffusion * d2_m + drift * d1_m;
            op.diag[i] = diffusion * d2_0 + drift * d1_0 - rate;
            op.upper[i] = diffusion * d2_p + drift * d1_p;
        }

        Self {
            grid: grid.clone(),
            volatility,
            rate,
            op,
        }
    }

    /// `true` if this operator was assembled on `grid` with these parameters.
    pub fn is_built_for(&self, grid: &Grid, volatility: Volatility, rate: Rate) -> bool {
        self.grid.is_same(grid) && self.volatility == volatility && self.rate == rate
    }

    /// The grid the operator was built on.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Coefficient bands.
    pub fn tridiagonal(&self) -> &TridiagonalOperator {
        &self.op
    }

    /// Number of rows.
    pub fn size(&self) -> usize {
        self.op.size()
    }

    /// `y = L·v`.
    pub fn apply_into(&self, v: &[Real], y: &mut [Real]) {
        self.op.apply_into(v, y);
    }

    /// Largest stable explicit step on this grid:
    /// `C·min(h)² / (σ²·S_max²)`.
    pub fn explicit_stability_bound(&self, stability_constant: Real) -> Real {
        let h = self.grid.min_spacing();
        let s_max = self.grid.s_max();
        stability_constant * h * h / (self.volatility * self.volatility * s_max * s_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn skewed_grid() -> Grid {
        Grid::from_nodes(vec![0.0, 10.0, 35.0, 40.0, 41.0, 60.0, 100.0]).unwrap()
    }

    #[test]
    fn weights_exact_for_quadratics() {
        // f(x) = 3x² − 2x + 1 around x = 5 with h₋ = 0.7, h₊ = 2.3
        let f = |x: Real| 3.0 * x * x - 2.0 * x + 1.0;
        let (x, h_m, h_p) = (5.0, 0.7, 2.3);
        let (a, b, c) = second_derivative_weights(h_m, h_p);
        let d2 = a * f(x - h_m) + b * f(x) + c * f(x + h_p);
        assert_abs_diff_eq!(d2, 6.0, epsilon = 1e-10);

        let (a, b, c) = first_derivative_weights(h_m, h_p);
        let d1 = a * f(x - h_m) + b * f(x) + c * f(x + h_p);
        assert_abs_diff_eq!(d1, 6.0 * x - 2.0, epsilon = 1e-10);
    }

    #[test]
    fn generator_annihilates_discounted_forward() {
        // V = S solves the PDE: L·S = rS − rS = 0 at interior nodes
        let grid = skewed_grid();
        let op = BlackScholesOperator::build(&grid, 0.3, 0.04);
        let mut y = vec![0.0; grid.len()];
        op.apply_into(grid.nodes(), &mut y);
        for (i, yi) in y.iter().enumerate() {
            assert_abs_diff_eq!(*yi, 0.0, epsilon = 1e-10 * (1.0 + grid.node(i)));
        }
    }

    #[test]
    fn generator_on_quadratic() {
        // V = S²: L·V = σ²S² + 2rS² − rS² = (σ² + r)S²
        let grid = skewed_grid();
        let (sigma, r) = (0.25, 0.03);
        let op = BlackScholesOperator::build(&grid, sigma, r);
        let v: Vec<Real> = grid.nodes().iter().map(|s| s * s).collect();
        let y = op.tridiagonal().apply(&v);
        for i in 1..grid.len() - 1 {
            let s = grid.node(i);
            assert_abs_diff_eq!(y[i], (sigma * sigma + r) * s * s, epsilon = 1e-8 * s * s);
        }
    }

    #[test]
    fn boundary_rows_are_empty() {
        let grid = Grid::uniform(200.0, 10).unwrap();
        let op = BlackScholesOperator::build(&grid, 0.2, 0.05);
        let t = op.tridiagonal();
        let last = grid.len() - 1;
        assert_eq!((t.lower[0], t.diag[0], t.upper[0]), (0.0, 0.0, 0.0));
        assert_eq!((t.lower[last], t.diag[last], t.upper[last]), (0.0, 0.0, 0.0));
    }

    #[test]
    fn staleness_tracks_grid_identity() {
        let grid = Grid::uniform(200.0, 10).unwrap();
        let op = BlackScholesOperator::build(&grid, 0.2, 0.05);
        assert!(op.is_built_for(&grid, 0.2, 0.05));
        assert!(!op.is_built_for(&grid, 0.25, 0.05));

        let same_nodes = Grid::uniform(200.0, 10).unwrap();
        assert!(!op.is_built_for(&same_nodes, 0.2, 0.05));
    }

    #[test]
    fn stability_bound_formula() {
        let grid = Grid::uniform(200.0, 100).unwrap();
        let op = BlackScholesOperator::build(&grid, 0.2, 0.05);
        // 0.5 · 2² / (0.04 · 200²)
        assert_abs_diff_eq!(op.explicit_stability_bound(0.5), 1.25e-3, epsilon = 1e-15);
    }
}
