//! Shared solver utilities.

pub mod convergence;
pub use convergence::{Convergence, SolveStats};
