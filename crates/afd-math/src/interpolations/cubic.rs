//! Local cubic Hermite interpolation.
//!
//! Node slopes `f'(xᵢ)` are estimated from neighbouring data only:
//!
//! - **Parabolic**: distance-weighted average of adjacent secant slopes.
//! - **FritschButland**: weighted harmonic mean; the interpolant cannot
//!   introduce new extrema, so monotone price curves stay monotone.
//!
//! Both share the same piecewise polynomial once slopes are known.

use afd_core::{errors::Result, Real};

use super::{check_nodes, locate, Interpolation1D};

/// Slope estimate used by [`HermiteCubic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeMethod {
    /// Distance-weighted average of the adjacent secants.
    Parabolic,
    /// Fritsch-Butland monotone-preserving harmonic mean.
    #[default]
    FritschButland,
}

/// Piecewise cubic Hermite interpolation.
///
/// On `[x_i, x_{i+1}]`: `f(x) = y_i + dx*(a_i + dx*(b_i + dx*c_i))`
/// with `dx = x - x_i`.
#[derive(Debug, Clone)]
pub struct HermiteCubic<'a> {
    xs: &'a [Real],
    ys: &'a [Real],
    a: Vec<Real>,
    b: Vec<Real>,
    c: Vec<Real>,
}

impl<'a> HermiteCubic<'a> {
    /// Build the interpolant. Requires at least 3 points.
    pub fn new(xs: &'a [Real], ys: &'a [Real], method: SlopeMethod) -> Result<Self> {
        check_nodes(xs, ys, 3)?;
        let n = xs.len();

        let dx: Vec<Real> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let s: Vec<Real> = (0..n - 1).map(|i| (ys[i + 1] - ys[i]) / dx[i]).collect();

        let mut ts = vec![0.0; n];
        for i in 1..n - 1 {
            ts[i] = match method {
                SlopeMethod::Parabolic => {
                    (dx[i - 1] * s[i] + dx[i] * s[i - 1]) / (dx[i - 1] + dx[i])
                }
                SlopeMethod::FritschButland => {
                    if s[i - 1] * s[i] <= 0.0 {
                        0.0
                    } else {
                        let lo = s[i - 1].abs().min(s[i].abs());
                        let hi = s[i - 1].abs().max(s[i].abs());
                        s[i].signum() * 3.0 * lo * hi / (hi + 2.0 * lo)
                    }
                }
            };
        }

        // one-sided parabolic end slopes
        ts[0] = ((2.0 * dx[0] + dx[1]) * s[0] - dx[0] * s[1]) / (dx[0] + dx[1]);
        ts[n - 1] = ((2.0 * dx[n - 2] + dx[n - 3]) * s[n - 2] - dx[n - 2] * s[n - 3])
            / (dx[n - 2] + dx[n - 3]);
        if method == SlopeMethod::FritschButland {
            clip_end_slope(&mut ts[0], s[0]);
            clip_end_slope(&mut ts[n - 1], s[n - 2]);
        }

        let mut a = Vec::with_capacity(n - 1);
        let mut b = Vec::with_capacity(n - 1);
        let mut c = Vec::with_capacity(n - 1);
        for i in 0..n - 1 {
            a.push(ts[i]);
            b.push((3.0 * s[i] - ts[i + 1] - 2.0 * ts[i]) / dx[i]);
            c.push((ts[i + 1] + ts[i] - 2.0 * s[i]) / (dx[i] * dx[i]));
        }

        Ok(Self { xs, ys, a, b, c })
    }
}

/// Hyman end condition: same sign as the secant, magnitude at most `3|s|`.
fn clip_end_slope(t: &mut Real, s: Real) {
    if *t * s <= 0.0 {
        *t = 0.0;
    } else if t.abs() > 3.0 * s.abs() {
        *t = 3.0 * s;
    }
}

impl Interpolation1D for HermiteCubic<'_> {
    fn x_min(&self) -> Real {
        self.xs[0]
    }

    fn x_max(&self) -> Real {
        self.xs[self.xs.len() - 1]
    }

    fn operator(&self, x: Real) -> Real {
        let i = locate(self.xs, x);
        let dx = x - self.xs[i];
        self.ys[i] + dx * (self.a[i] + dx * (self.b[i] + dx * self.c[i]))
    }
}
