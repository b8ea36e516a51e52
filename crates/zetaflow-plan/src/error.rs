//! Front-end error taxonomy.

use thiserror::Error;

/// Errors produced while parsing, simulating DDL, or planning a query.
///
/// `Unimplemented` marks constructs the front end recognizes but cannot yet
/// hand to the circuit compiler; `Unsupported` marks constructs it rejects
/// outright. Both carry a printed form of the offending construct so a
/// failure can be reproduced from the message alone.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("parse error: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    #[error("not yet implemented: {0}")]
    Unimplemented(String),

    #[error("not supported: {0}")]
    Unsupported(String),

    #[error("validation error: {0}")]
    Validate(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}
