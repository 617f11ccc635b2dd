//! Conjugate Gradient (unpreconditioned) for self-adjoint positive operators.
//!
//! Works on anything satisfying the [`Field`] contract; the operator is only
//! touched through [`MatApply`]. The residual update is fused with the norm
//! computation (`axpy_norm`) so each iteration makes a single pass over the
//! residual.

use crate::core::traits::{Field, Scalar};
use crate::error::OpError;
use crate::solver::MatApply;
use crate::utils::convergence::{Convergence, SolveStats};

pub struct CgSolver<R> {
    pub conv: Convergence<R>,
    pub verbose: bool,
    pub monitor: Option<Box<dyn FnMut(usize, R)>>,
    pub residual_history: Vec<R>,
}

impl<R: num_traits::Float + std::fmt::LowerExp> CgSolver<R> {
    pub fn new(tol: R, max_iters: usize) -> Self {
        Self {
            conv: Convergence { tol, max_iters },
            verbose: false,
            monitor: None,
            residual_history: Vec::new(),
        }
    }

    pub fn with_verbose(mut self, flag: bool) -> Self {
        self.verbose = flag;
        self
    }

    pub fn with_monitor<G>(mut self, g: G) -> Self
    where
        G: FnMut(usize, R) + 'static,
    {
        self.monitor = Some(Box::new(g));
        self
    }

    pub fn clear_history(&mut self) {
        self.residual_history.clear();
    }

    /// Solve `mat·x = b`, using `x` both as initial guess and solution.
    ///
    /// Exhausting `max_iters` is not an error: the call returns `Ok` with
    /// `converged = false` and the final residual in the stats, so callers
    /// decide how to react. `Re⟨p, A·p⟩ ≤ 0` means `mat` is not positive
    /// definite and aborts with [`OpError::IndefiniteOperator`].
    pub fn solve<F, M>(&mut self, mat: &M, b: &F, x: &mut F) -> Result<SolveStats<R>, OpError>
    where
        F: Field,
        F::Scalar: Scalar<Real = R>,
        M: MatApply<F>,
    {
        let sc = <F::Scalar as Scalar>::from_real;
        let mut mmp = b.clone();
        mat.apply_op(&mut mmp, x);
        // r = b - A·x, respecting the caller's guess in x
        let mut r = b.clone();
        let mut cp = r.axpy_norm(sc(-R::one()), &mmp);
        let mut p = r.clone();
        let rsq = self.conv.target(b.norm2());
        self.residual_history.push(cp);
        if let Some(monitor) = self.monitor.as_mut() {
            monitor(0, cp);
        }
        let mut stats = SolveStats {
            iterations: 0,
            final_residual: cp.sqrt(),
            converged: false,
        };
        for k in 1..=self.conv.max_iters {
            let c = cp;
            if c == R::zero() {
                // exact solution reached; the direction update would divide by c
                if self.verbose {
                    println!("cg: converged in {} iterations", k);
                }
                return Ok(SolveStats {
                    iterations: k,
                    final_residual: R::zero(),
                    converged: true,
                });
            }
            mat.apply_op(&mut mmp, &p);
            let d = p.inner_product(&mmp).re();
            if d <= R::zero() {
                return Err(OpError::IndefiniteOperator);
            }
            let a = c / d;
            cp = r.axpy_norm(sc(-a), &mmp);
            let beta = cp / c;
            x.axpy(sc(a), &p);
            p.xpay(sc(beta), &r);
            self.residual_history.push(cp);
            if let Some(monitor) = self.monitor.as_mut() {
                monitor(k, cp);
            }
            if self.verbose {
                println!("cg: iter {} -> {:e}", k, cp);
            }
            stats = SolveStats {
                iterations: k,
                final_residual: cp.sqrt(),
                converged: cp <= rsq,
            };
            if cp <= rsq {
                if self.verbose {
                    println!("cg: converged in {} iterations", k);
                }
                return Ok(stats);
            }
        }
        // max_iters exhausted: caller inspects stats.converged / final_residual
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wrappers::DenseField;
    use crate::solver::ApplyFn;

    #[test]
    fn cg_solves_simple_spd() {
        // SPD system: [[4,1],[1,3]] x = [1,2]
        let a = [[4.0, 1.0], [1.0, 3.0]];
        let mat = ApplyFn(move |dst: &mut DenseField<f64>, src: &DenseField<f64>| {
            let s = src.as_slice();
            let d = dst.as_mut_slice();
            for i in 0..2 {
                d[i] = a[i][0] * s[0] + a[i][1] * s[1];
            }
        });
        let b = DenseField::from_vec(vec![1.0, 2.0]);
        let mut x = DenseField::zeros(2);
        let mut solver = CgSolver::new(1e-10, 20);
        let stats = solver.solve(&mat, &b, &mut x).unwrap();
        assert!(stats.converged, "CG did not converge");
        let expected = [0.09090909090909091, 0.6363636363636364];
        for (xi, ei) in x.as_slice().iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < 1e-8, "xi = {}, expected = {}", xi, ei);
        }
    }

    #[test]
    fn cg_reports_indefinite_operator() {
        let mat = ApplyFn(|dst: &mut DenseField<f64>, src: &DenseField<f64>| {
            for (d, s) in dst.as_mut_slice().iter_mut().zip(src.as_slice()) {
                *d = -s;
            }
        });
        let b = DenseField::from_vec(vec![1.0, 1.0]);
        let mut x = DenseField::zeros(2);
        let mut solver = CgSolver::new(1e-10, 20);
        let err = solver.solve(&mat, &b, &mut x).unwrap_err();
        assert!(matches!(err, OpError::IndefiniteOperator));
    }

    #[test]
    fn cg_returns_unconverged_stats_when_budget_runs_out() {
        // ill-conditioned diagonal, one iteration only
        let diag = [1.0, 1e6];
        let mat = ApplyFn(move |dst: &mut DenseField<f64>, src: &DenseField<f64>| {
            for (i, (d, s)) in dst.as_mut_slice().iter_mut().zip(src.as_slice()).enumerate() {
                *d = diag[i] * s;
            }
        });
        let b = DenseField::from_vec(vec![1.0, 1.0]);
        let mut x = DenseField::zeros(2);
        let mut solver = CgSolver::new(1e-14, 1);
        let stats = solver.solve(&mat, &b, &mut x).unwrap();
        assert!(!stats.converged);
        assert_eq!(stats.iterations, 1);
        assert!(stats.final_residual > 0.0);
    }
}
