//! Core field and scalar contracts for opalg.

pub mod traits;
pub use traits::{Field, FieldSpace, Precision, Scalar};
pub mod wrappers;
pub use wrappers::{DenseField, DenseSpace};
