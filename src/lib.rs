//! opalg: composable linear-operator algebra with a conjugate-gradient solver
//!
//! This crate expresses linear maps over opaque "field" data as composable
//! operator objects. An operator bundles a forward action with optional
//! adjoint, inverse and adjoint-inverse actions; composition, adjunction,
//! inversion, precision conversion and batch grouping all return new operators
//! with the algebraic relationships propagated for you. The conjugate-gradient
//! solver drives any such operator (or any bare `(dst, src)` closure) to
//! convergence on `A x = b` for self-adjoint positive maps.
//!
//! The field representation stays abstract: anything implementing the
//! [`core::traits::Field`] contract can be acted on, including distributed
//! fields whose space provides a redistribution capability.

pub mod core;
pub mod error;
pub mod matrix;
pub mod operator;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use crate::core::*;
pub use error::*;
pub use matrix::*;
pub use operator::*;
pub use solver::*;
pub use utils::*;

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
