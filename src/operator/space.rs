//! Vector-space descriptors for operator domains and codomains.

use crate::core::traits::{Field, FieldSpace, Precision};

/// Type constraint a field must satisfy on one side of an operator.
///
/// `Implicit` matches every field; it cannot allocate on its own and instead
/// falls back to the space of the actual input it is paired with.
#[derive(Clone)]
pub enum VectorSpace<F: Field> {
    Implicit,
    Concrete(F::Space),
}

impl<F: Field> VectorSpace<F> {
    pub fn is_implicit(&self) -> bool {
        matches!(self, VectorSpace::Implicit)
    }

    /// Whether `field` is structurally valid in this space.
    pub fn matches(&self, field: &F) -> bool {
        match self {
            VectorSpace::Implicit => true,
            VectorSpace::Concrete(s) => s.matches(field),
        }
    }

    /// Allocate a new zeroed field in this space, taking unconstrained
    /// attributes from `template`.
    pub fn alloc_like(&self, template: &F) -> F {
        match self {
            VectorSpace::Implicit => template.space().alloc_like(template),
            VectorSpace::Concrete(s) => s.alloc_like(template),
        }
    }

    /// The same space at a different numerical precision.
    pub fn converted(&self, precision: Precision) -> Self {
        match self {
            VectorSpace::Implicit => VectorSpace::Implicit,
            VectorSpace::Concrete(s) => VectorSpace::Concrete(s.converted(precision)),
        }
    }
}
