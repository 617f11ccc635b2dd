//! Core field-algebra traits for opalg.

/// Runtime numerical precision of a field's element storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    Single,
    Double,
}

/// Arithmetic scalar of a field, with a real part for convergence tests.
///
/// Implemented here for `f32`/`f64`; complex element types can implement it
/// downstream as long as `re`/`conj` follow the usual conventions.
pub trait Scalar:
    Copy
    + PartialEq
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<Output = Self>
    + std::ops::Neg<Output = Self>
    + num_traits::Zero
    + num_traits::One
{
    /// Real type underlying this scalar.
    type Real: num_traits::Float;
    /// Embed a real value.
    fn from_real(re: Self::Real) -> Self;
    /// Real part.
    fn re(self) -> Self::Real;
    /// Complex conjugate (identity for real scalars).
    fn conj(self) -> Self;
}

impl Scalar for f64 {
    type Real = f64;
    fn from_real(re: f64) -> f64 {
        re
    }
    fn re(self) -> f64 {
        self
    }
    fn conj(self) -> f64 {
        self
    }
}

impl Scalar for f32 {
    type Real = f32;
    fn from_real(re: f32) -> f32 {
        re
    }
    fn re(self) -> f32 {
        self
    }
    fn conj(self) -> f32 {
        self
    }
}

/// Opaque numerical vector an operator acts on.
///
/// Operators never look inside a field; they only allocate, fill and combine
/// them through this contract. A field may be process-local or distributed —
/// from the operator's perspective every method is a single blocking call.
pub trait Field: Clone {
    /// Element scalar type.
    type Scalar: Scalar;
    /// Descriptor of this field's type/shape/partition.
    type Space: FieldSpace<Self>;

    /// The space this field lives in.
    fn space(&self) -> Self::Space;
    /// Overwrite with zeros.
    fn set_zero(&mut self);
    /// Overwrite with a copy of `src`.
    fn assign(&mut self, src: &Self);
    /// Squared norm `‖self‖²`.
    fn norm2(&self) -> <Self::Scalar as Scalar>::Real;
    /// Inner product `⟨self, other⟩` (first argument conjugated).
    fn inner_product(&self, other: &Self) -> Self::Scalar;
    /// `self ← a·x + self`.
    fn axpy(&mut self, a: Self::Scalar, x: &Self);
    /// Fused `self ← a·x + self` returning `‖self‖²` in the same pass.
    fn axpy_norm(&mut self, a: Self::Scalar, x: &Self) -> <Self::Scalar as Scalar>::Real;
    /// `self ← x + a·self`.
    fn xpay(&mut self, a: Self::Scalar, x: &Self);
    /// Overwrite with `src` converted to this field's precision.
    fn convert_from(&mut self, src: &Self);
}

/// Descriptor of the constraints a field must satisfy on one side of an
/// operator, plus the capabilities the operator core needs to allocate,
/// convert and redistribute fields of that type.
pub trait FieldSpace<F>: Clone {
    /// Whether `field` is structurally valid in this space.
    fn matches(&self, field: &F) -> bool;
    /// Allocate a new zeroed field in this space. Attributes the space leaves
    /// unconstrained are taken from `template`.
    fn alloc_like(&self, template: &F) -> F;
    /// The same space at a different numerical precision.
    fn converted(&self, precision: Precision) -> Self;
    /// Fan a logical apply across fields living on a different physical
    /// partition than this space's native one, reassembling results in order.
    /// `zero_lhs` requests zero-initialized per-partition destinations so a
    /// guess-accepting action sees a valid guess.
    ///
    /// Called by the operator core only when a space mismatch is detected;
    /// spaces without a redistribution story keep the default.
    fn distribute(
        &self,
        action: &mut dyn FnMut(&mut [F], &[F]),
        dst: &mut [F],
        src: &[F],
        zero_lhs: bool,
    ) {
        let _ = (action, dst, src, zero_lhs);
        panic!("field space declares no distribution capability");
    }
}
