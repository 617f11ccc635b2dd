//! Iterative solver interfaces.

use crate::core::traits::Field;
use crate::operator::LinearOperator;

/// Single-field apply seam consumed by the solvers: fill `dst` with `A·src`.
///
/// The solver treats the operator as an opaque linear map; it never inspects
/// structure beyond this call.
pub trait MatApply<F: Field> {
    fn apply_op(&self, dst: &mut F, src: &F);
}

impl<F: Field> MatApply<F> for LinearOperator<F> {
    fn apply_op(&self, dst: &mut F, src: &F) {
        self.apply(dst, src);
    }
}

/// Adapter for driving a solver with a bare `(dst, src)` closure.
pub struct ApplyFn<G>(pub G);

impl<F: Field, G: Fn(&mut F, &F)> MatApply<F> for ApplyFn<G> {
    fn apply_op(&self, dst: &mut F, src: &F) {
        (self.0)(dst, src);
    }
}

pub mod cg;
pub use cg::CgSolver;
