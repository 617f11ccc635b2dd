//! Dense-matrix operator factories on top of Faer.
//!
//! These wrap a `faer::Mat` (or a plain diagonal) as a [`LinearOperator`] over
//! [`DenseField`], giving the algebra and the solver a concrete operator to
//! act with: the forward action is the dense mat-vec, the adjoint the
//! transpose mat-vec.

use std::sync::Arc;

use faer::Mat;
use num_traits::{Float, FromPrimitive, ToPrimitive};

use crate::core::traits::{Precision, Scalar};
use crate::core::wrappers::{DenseField, DenseSpace};
use crate::operator::LinearOperator;

fn matvec<T: Float>(a: &Mat<T>, x: &DenseField<T>, y: &mut DenseField<T>) {
    assert_eq!(a.ncols(), x.len(), "input field has incorrect length");
    assert_eq!(a.nrows(), y.len(), "output field has incorrect length");
    let xs = x.as_slice();
    for i in 0..a.nrows() {
        let mut acc = T::zero();
        for j in 0..a.ncols() {
            acc = acc + a[(i, j)] * xs[j];
        }
        y.as_mut_slice()[i] = acc;
    }
}

fn mattransvec<T: Float>(a: &Mat<T>, x: &DenseField<T>, y: &mut DenseField<T>) {
    assert_eq!(a.nrows(), x.len(), "input field has incorrect length");
    assert_eq!(a.ncols(), y.len(), "output field has incorrect length");
    let xs = x.as_slice();
    for j in 0..a.ncols() {
        let mut acc = T::zero();
        for i in 0..a.nrows() {
            acc = acc + a[(i, j)] * xs[i];
        }
        y.as_mut_slice()[j] = acc;
    }
}

/// Wrap a dense matrix as an operator with forward and adjoint actions.
pub fn dense_operator<T>(a: Mat<T>) -> LinearOperator<DenseField<T>>
where
    T: Float + FromPrimitive + ToPrimitive + Scalar<Real = T> + Send + Sync + 'static,
{
    let (m, n) = (a.nrows(), a.ncols());
    let a = Arc::new(a);
    let fwd = a.clone();
    let adj = a;
    LinearOperator::builder()
        .codomain(DenseSpace {
            len: m,
            precision: Precision::Double,
        })
        .domain(DenseSpace {
            len: n,
            precision: Precision::Double,
        })
        .forward(move |dst: &mut DenseField<T>, src: &DenseField<T>| matvec(&fwd, src, dst))
        .adjoint(move |dst: &mut DenseField<T>, src: &DenseField<T>| mattransvec(&adj, src, dst))
        .build()
}

/// Wrap a diagonal as a self-adjoint operator with an exact inverse.
/// Diagonal entries must be nonzero.
pub fn diagonal_operator<T>(diag: Vec<T>) -> LinearOperator<DenseField<T>>
where
    T: Float + FromPrimitive + ToPrimitive + Scalar<Real = T> + Send + Sync + 'static,
{
    let n = diag.len();
    let space = DenseSpace {
        len: n,
        precision: Precision::Double,
    };
    let d = Arc::new(diag);
    let scale = |d: Arc<Vec<T>>| {
        move |dst: &mut DenseField<T>, src: &DenseField<T>| {
            for ((y, x), di) in dst.as_mut_slice().iter_mut().zip(src.as_slice()).zip(d.iter()) {
                *y = *di * *x;
            }
        }
    };
    let unscale = |d: Arc<Vec<T>>| {
        move |dst: &mut DenseField<T>, src: &DenseField<T>| {
            for ((y, x), di) in dst.as_mut_slice().iter_mut().zip(src.as_slice()).zip(d.iter()) {
                *y = *x / *di;
            }
        }
    };
    LinearOperator::builder()
        .space(space)
        .forward(scale(d.clone()))
        .adjoint(scale(d.clone()))
        .inverse(unscale(d.clone()))
        .adjoint_inverse(unscale(d))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Direction;

    #[test]
    fn dense_adjoint_is_the_transpose() {
        let a = Mat::from_fn(2, 3, |i, j| (i * 3 + j) as f64);
        let op = dense_operator(a);
        let x = DenseField::from_vec(vec![1.0, -1.0]);
        let mut y = DenseField::zeros(3);
        op.apply_dir(Direction::Adjoint, &mut y, &x);
        // A^T [1, -1] with A = [[0,1,2],[3,4,5]]
        assert_eq!(y.as_slice(), &[-3.0, -3.0, -3.0]);
    }

    #[test]
    fn diagonal_inverse_round_trips() {
        let op = diagonal_operator(vec![2.0, 4.0, 8.0]);
        let x = DenseField::from_vec(vec![1.0, 1.0, 1.0]);
        let y = op.inv().call(&op.call(&x));
        for (a, b) in y.as_slice().iter().zip(x.as_slice()) {
            assert!((a - b).abs() < 1e-14);
        }
    }
}
