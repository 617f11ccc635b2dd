use thiserror::Error;

// Unified error type for opalg

#[derive(Error, Debug)]
pub enum OpError {
    #[error("indefinite operator detected (Re<p, A p> <= 0)")]
    IndefiniteOperator,
    #[error("solve error: {0}")]
    SolveError(String),
}
