//! Tridiagonal matrix operator and Thomas-algorithm solver.

use afd_core::{errors::Error, errors::Result, Real};

/// Pivots at or below this magnitude are treated as singular.
pub const PIVOT_EPSILON: Real = 1e-14;

/// A tridiagonal matrix operator.
///
/// Stores the lower, diagonal, and upper bands, each of length `n`.
/// `lower[0]` and `upper[n-1]` are unused.
#[derive(Debug, Clone, PartialEq)]
pub struct TridiagonalOperator {
    /// Lower diagonal (index 0 unused).
    pub lower: Vec<Real>,
    /// Main diagonal.
    pub diag: Vec<Real>,
    /// Upper diagonal (last index unused).
    pub upper: Vec<Real>,
}

/// Scratch space for [`TridiagonalOperator::solve_into`].
///
/// Reusing one workspace across time steps keeps the solve allocation free.
#[derive(Debug, Clone, Default)]
pub struct ThomasWorkspace {
    c_prime: Vec<Real>,
    d_prime: Vec<Real>,
}

impl ThomasWorkspace {
    fn resize(&mut self, n: usize) {
        self.c_prime.resize(n, 0.0);
        self.d_prime.resize(n, 0.0);
    }
}

impl TridiagonalOperator {
    /// Create a zero tridiagonal operator of size `n`.
    pub fn new(n: usize) -> Self {
        Self {
            lower: vec![0.0; n],
            diag: vec![0.0; n],
            upper: vec![0.0; n],
        }
    }

    /// The identity operator of size `n`.
    pub fn identity(n: usize) -> Self {
        let mut op = Self::new(n);
        op.add_identity(1.0);
        op
    }

    /// Size (number of rows/columns).
    pub fn size(&self) -> usize {
        self.diag.len()
    }

    /// Apply the operator: `y = A · x`, writing into `y`.
    ///
    /// Rows are accumulated left to right.
    pub fn apply_into(&self, x: &[Real], y: &mut [Real]) {
        let n = self.size();
        assert_eq!(x.len(), n);
        assert_eq!(y.len(), n);
        if n == 1 {
            y[0] = self.diag[0] * x[0];
            return;
        }
        y[0] = self.diag[0] * x[0] + self.upper[0] * x[1];
        for i in 1..n - 1 {
            y[i] = self.lower[i] * x[i - 1] + self.diag[i] * x[i] + self.upper[i] * x[i + 1];
        }
        y[n - 1] = self.lower[n - 1] * x[n - 2] + self.diag[n - 1] * x[n - 1];
    }

    /// Apply the operator: `y = A · x`.
    pub fn apply(&self, x: &[Real]) -> Vec<Real> {
        let mut y = vec![0.0; self.size()];
        self.apply_into(x, &mut y);
        y
    }

    /// Solve `A · x = rhs` using the Thomas algorithm (forward elimination
    /// followed by back substitution), writing the solution into `x`.
    ///
    /// # Errors
    /// [`Error::SingularSystem`] carrying the row index if a pivot is
    /// (near-)zero or non-finite. The step index is left at zero for the
    /// caller to fill in with [`Error::at_step`].
    pub fn solve_into(
        &self,
        rhs: &[Real],
        x: &mut [Real],
        work: &mut ThomasWorkspace,
    ) -> Result<()> {
        let n = self.size();
        afd_core::ensure!(
            rhs.len() == n && x.len() == n,
            "tridiagonal solve: rhs/solution length must be {n}"
        );
        if n == 0 {
            return Ok(());
        }
        work.resize(n);
        let c_prime = &mut work.c_prime;
        let d_prime = &mut work.d_prime;

        // Forward sweep
        let m0 = self.diag[0];
        if !(m0.abs() > PIVOT_EPSILON) {
            return Err(Error::SingularSystem { node: 0, step: 0 });
        }
        c_prime[0] = if n > 1 { self.upper[0] / m0 } else { 0.0 };
        d_prime[0] = rhs[0] / m0;

        for i in 1..n {
            let m = self.diag[i] - self.lower[i] * c_prime[i - 1];
            if !(m.abs() > PIVOT_EPSILON) {
                return Err(Error::SingularSystem { node: i, step: 0 });
            }
            c_prime[i] = if i < n - 1 { self.upper[i] / m } else { 0.0 };
            d_prime[i] = (rhs[i] - self.lower[i] * d_prime[i - 1]) / m;
        }

        // Back substitution
        x[n - 1] = d_prime[n - 1];
        for i in (0..n - 1).rev() {
            x[i] = d_prime[i] - c_prime[i] * x[i + 1];
        }

        Ok(())
    }

    /// Solve `A · x = rhs`, returning the solution vector.
    pub fn solve(&self, rhs: &[Real]) -> Result<Vec<Real>> {
        let mut x = vec![0.0; self.size()];
        self.solve_into(rhs, &mut x, &mut ThomasWorkspace::default())?;
        Ok(x)
    }

    /// Scale all entries by a scalar.
    pub fn scale(&mut self, factor: Real) {
        for v in &mut self.lower {
            *v *= factor;
        }
        for v in &mut self.diag {
            *v *= factor;
        }
        for v in &mut self.upper {
            *v *= factor;
        }
    }

    /// Add the identity matrix scaled by `factor`: `A ← A + factor · I`.
    pub fn add_identity(&mut self, factor: Real) {
        for d in &mut self.diag {
            *d += factor;
        }
    }

    /// Replace row `i` with the corresponding identity row.
    pub fn set_identity_row(&mut self, i: usize) {
        self.lower[i] = 0.0;
        self.diag[i] = 1.0;
        self.upper[i] = 0.0;
    }
}
