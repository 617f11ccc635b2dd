//! Convergence tracking & tolerance checks for iterative solvers.

/// Stopping criteria: relative squared-residual test against the right-hand
/// side, `‖r‖² ≤ tol²·‖b‖²`.
pub struct Convergence<T> {
    pub tol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
}

impl<T: Copy + num_traits::Float> Convergence<T> {
    /// Squared stopping threshold for a right-hand side of squared norm
    /// `rhs_norm2`.
    pub fn target(&self, rhs_norm2: T) -> T {
        self.tol * self.tol * rhs_norm2
    }
}
