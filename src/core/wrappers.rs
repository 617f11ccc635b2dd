//! Dense reference field backed by `Vec<T>`.
//!
//! This module provides `DenseField`, a process-local field implementation of
//! the [`Field`] contract, and its `DenseSpace` descriptor. It is the concrete
//! field used by the dense operator factories and by the solver tests; inner
//! products and norms use Rayon parallel iterators when the `rayon` feature is
//! enabled.
//!
//! A field may carry more data than a space's native length: a field whose
//! length is a whole multiple of the native length represents several stacked
//! partitions, and `DenseSpace::distribute` fans an apply over them one
//! native-length chunk at a time.

use crate::core::traits::{Field, FieldSpace, Precision, Scalar};
use num_traits::{Float, FromPrimitive, ToPrimitive};

/// Process-local dense field with a runtime precision tag.
///
/// Values are stored as `T`; a `Single`-tagged field holds values that have
/// been rounded through `f32`, which is how precision conversion is modeled
/// without changing the storage type.
#[derive(Clone, Debug)]
pub struct DenseField<T> {
    data: Vec<T>,
    precision: Precision,
}

/// Space descriptor for [`DenseField`]: logical length plus precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DenseSpace {
    pub len: usize,
    pub precision: Precision,
}

impl<T: Float> DenseField<T> {
    /// New zeroed double-precision field.
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![T::zero(); len],
            precision: Precision::Double,
        }
    }

    /// Wrap existing values as a double-precision field.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            data,
            precision: Precision::Double,
        }
    }

    /// Retag the field's precision. Values are not touched; conversion happens
    /// through [`Field::convert_from`].
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> Field for DenseField<T>
where
    T: Float + FromPrimitive + ToPrimitive + Scalar<Real = T> + Send + Sync + 'static,
{
    type Scalar = T;
    type Space = DenseSpace;

    fn space(&self) -> DenseSpace {
        DenseSpace {
            len: self.data.len(),
            precision: self.precision,
        }
    }

    fn set_zero(&mut self) {
        for v in &mut self.data {
            *v = T::zero();
        }
    }

    fn assign(&mut self, src: &Self) {
        assert_eq!(self.data.len(), src.data.len(), "fields must have the same length");
        self.data.copy_from_slice(&src.data);
    }

    fn norm2(&self) -> T {
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            self.data
                .par_iter()
                .map(|xi| *xi * *xi)
                .reduce(T::zero, |acc, v| acc + v)
        }
        #[cfg(not(feature = "rayon"))]
        {
            self.data
                .iter()
                .map(|xi| *xi * *xi)
                .fold(T::zero(), |acc, v| acc + v)
        }
    }

    fn inner_product(&self, other: &Self) -> T {
        assert_eq!(self.data.len(), other.data.len(), "fields must have the same length");
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            self.data
                .par_iter()
                .zip(other.data.par_iter())
                .map(|(xi, yi)| *xi * *yi)
                .reduce(T::zero, |acc, v| acc + v)
        }
        #[cfg(not(feature = "rayon"))]
        {
            self.data
                .iter()
                .zip(other.data.iter())
                .map(|(xi, yi)| *xi * *yi)
                .fold(T::zero(), |acc, v| acc + v)
        }
    }

    fn axpy(&mut self, a: T, x: &Self) {
        assert_eq!(self.data.len(), x.data.len(), "fields must have the same length");
        for (d, xi) in self.data.iter_mut().zip(x.data.iter()) {
            *d = *d + a * *xi;
        }
    }

    fn axpy_norm(&mut self, a: T, x: &Self) -> T {
        assert_eq!(self.data.len(), x.data.len(), "fields must have the same length");
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            self.data
                .par_iter_mut()
                .zip(x.data.par_iter())
                .map(|(d, xi)| {
                    *d = *d + a * *xi;
                    *d * *d
                })
                .reduce(T::zero, |acc, v| acc + v)
        }
        #[cfg(not(feature = "rayon"))]
        {
            let mut acc = T::zero();
            for (d, xi) in self.data.iter_mut().zip(x.data.iter()) {
                *d = *d + a * *xi;
                acc = acc + *d * *d;
            }
            acc
        }
    }

    fn xpay(&mut self, a: T, x: &Self) {
        assert_eq!(self.data.len(), x.data.len(), "fields must have the same length");
        for (d, xi) in self.data.iter_mut().zip(x.data.iter()) {
            *d = *xi + a * *d;
        }
    }

    fn convert_from(&mut self, src: &Self) {
        assert_eq!(self.data.len(), src.data.len(), "fields must have the same length");
        match self.precision {
            Precision::Double => self.data.copy_from_slice(&src.data),
            Precision::Single => {
                for (d, s) in self.data.iter_mut().zip(src.data.iter()) {
                    let rounded = s.to_f32().unwrap_or(0.0);
                    *d = T::from_f32(rounded).unwrap_or_else(T::zero);
                }
            }
        }
    }
}

impl<T> FieldSpace<DenseField<T>> for DenseSpace
where
    T: Float + FromPrimitive + ToPrimitive + Scalar<Real = T> + Send + Sync + 'static,
{
    fn matches(&self, field: &DenseField<T>) -> bool {
        field.data.len() == self.len
    }

    fn alloc_like(&self, _template: &DenseField<T>) -> DenseField<T> {
        DenseField {
            data: vec![T::zero(); self.len],
            precision: self.precision,
        }
    }

    fn converted(&self, precision: Precision) -> Self {
        DenseSpace {
            len: self.len,
            precision,
        }
    }

    fn distribute(
        &self,
        action: &mut dyn FnMut(&mut [DenseField<T>], &[DenseField<T>]),
        dst: &mut [DenseField<T>],
        src: &[DenseField<T>],
        zero_lhs: bool,
    ) {
        if dst.is_empty() || src.is_empty() {
            return;
        }
        let n = self.len;
        let total = src[0].data.len();
        assert!(
            n > 0 && total % n == 0,
            "source fields are not a whole number of native partitions"
        );
        let parts = total / n;
        let out_total = dst[0].data.len();
        assert!(
            out_total % parts == 0,
            "destination fields do not split across the native partitions"
        );
        let m = out_total / parts;
        for part in 0..parts {
            let sub_src: Vec<DenseField<T>> = src
                .iter()
                .map(|f| DenseField {
                    data: f.data[part * n..(part + 1) * n].to_vec(),
                    precision: f.precision,
                })
                .collect();
            let mut sub_dst: Vec<DenseField<T>> = dst
                .iter()
                .map(|f| {
                    let mut data = f.data[part * m..(part + 1) * m].to_vec();
                    if zero_lhs {
                        for v in &mut data {
                            *v = T::zero();
                        }
                    }
                    DenseField {
                        data,
                        precision: f.precision,
                    }
                })
                .collect();
            action(&mut sub_dst, &sub_src);
            for (f, sub) in dst.iter_mut().zip(sub_dst.iter()) {
                f.data[part * m..(part + 1) * m].copy_from_slice(&sub.data);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axpy_norm_matches_separate_ops() {
        let mut a: DenseField<f64> = DenseField::from_vec(vec![1.0, 2.0, 3.0]);
        let x = DenseField::from_vec(vec![4.0, 5.0, 6.0]);
        let mut b = a.clone();
        b.axpy(-0.5, &x);
        let n2 = a.axpy_norm(-0.5, &x);
        assert_eq!(a.as_slice(), b.as_slice());
        assert!((n2 - b.norm2()).abs() < 1e-12);
    }

    #[test]
    fn single_precision_conversion_rounds_through_f32() {
        let src = DenseField::from_vec(vec![std::f64::consts::PI]);
        let mut dst = DenseField::zeros(1).with_precision(Precision::Single);
        dst.convert_from(&src);
        assert_eq!(dst.as_slice()[0], std::f64::consts::PI as f32 as f64);
    }

    #[test]
    fn distribute_applies_per_partition() {
        let space = DenseSpace {
            len: 2,
            precision: Precision::Double,
        };
        let src = [DenseField::from_vec(vec![1.0, 2.0, 3.0, 4.0])];
        let mut dst = [DenseField::zeros(4)];
        space.distribute(
            &mut |d, s| {
                assert_eq!(s[0].len(), 2);
                for (dv, sv) in d[0].as_mut_slice().iter_mut().zip(s[0].as_slice()) {
                    *dv = 10.0 * sv;
                }
            },
            &mut dst,
            &src,
            false,
        );
        assert_eq!(dst[0].as_slice(), &[10.0, 20.0, 30.0, 40.0]);
    }
}
