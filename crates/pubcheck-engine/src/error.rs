//! Error types for the constraint encoder and the symbolic engine.

use thiserror::Error;

/// Failures lifting a path condition into solver assertions. Fatal to the
/// path being encoded; the caller continues with other paths.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A structured path-condition node used an operator other than `and`,
    /// `==`, or `!=`.
    #[error("unsupported path condition JSON op: {op}")]
    UnsupportedJsonOp { op: String },

    /// A structured `==`/`!=` node was missing its `lhs`/`rhs` string operands.
    #[error("malformed path condition JSON: {detail}")]
    MalformedJson { detail: String },

    /// A textual path-condition atom was neither `lhs==rhs` nor `lhs!=rhs`.
    #[error("unsupported path condition atom: '{atom}'")]
    UnsupportedAtom { atom: String },

    /// A compare operator outside `==`/`!=` reached the comparison builder.
    #[error("unsupported compare op: {op}")]
    UnsupportedCompareOp { op: String },
}

/// Failures standing up the solver itself. Fatal to the whole driver, not
/// just one path.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver initialization failed: {reason}")]
    InitializationFailed { reason: String },
}
