//! Circuit-compiler error taxonomy.

use thiserror::Error;

/// Errors raised while building or lowering the circuit IR.
///
/// `Unimplemented` marks constructs the compiler recognizes but does not yet
/// lower; `Unsupported` marks constructs it rejects outright; `Invariant`
/// marks programmer errors (wrong arity, duplicate keys, dangling lookups).
/// Nothing is recovered inside the compiler: every error aborts the
/// compilation unit and the partially built circuit must be discarded.
#[derive(Debug, Error)]
pub enum IrError {
    #[error("not yet implemented: {0}")]
    Unimplemented(String),

    #[error("not supported: {0}")]
    Unsupported(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}
