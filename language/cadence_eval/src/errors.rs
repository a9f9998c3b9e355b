//! Runtime errors.
//!
//! The interpreter surfaces exactly one error: the first that unwinds.
//! No error is catchable from within the language; the host rolls the
//! staged storage back on any of these.

use std::fmt;

/// Result alias used throughout the evaluator.
pub type EvalResult<T> = Result<T, RuntimeError>;

/// Every way a transaction can unwind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeError {
    // User aborts.
    /// `panic(message)`
    Panic(String),
    /// `assert(false, message: ...)`
    AssertionFailed(Option<String>),
    PreconditionFailed(Option<String>),
    PostconditionFailed(Option<String>),

    // Runtime type errors.
    Overflow { type_name: &'static str },
    Underflow { type_name: &'static str },
    DivisionByZero,
    /// Dereference of an invalidated or dangling reference.
    DereferenceFailed,
    /// `save` into an occupied storage slot.
    StorageSlotOccupied { path: String },
    /// Typed read found a value of an unexpected type.
    ForceCastFailed { expected: String, actual: String },
    /// Storage read expected a value that is not there.
    MissingStorageValue { path: String },
    /// Link chain exceeded the depth bound.
    NestedCapability { depth: u32 },
    /// Operation applied to the wrong path domain.
    InvalidPathDomain { expected: &'static str, actual: String },
    IndexOutOfBounds { index: i64, size: usize },
    KeyNotFound,
    /// Malformed RLP input or trailing bytes.
    RlpDecode(String),
    ForceUnwrapNil,
    EnumCaseNotFound(String),

    // Invariant violations: statically impossible if the checker is
    // sound, kept as defense in depth.
    UseAfterMoveRuntime,
    ResourceLostRuntime,
    Internal(String),

    // Metering exhaustion. Terminate unconditionally.
    ComputationLimitExceeded { limit: u64 },
    MemoryLimitExceeded { limit: u64 },
}

impl RuntimeError {
    /// Whether this error comes from a user-level abort rather than a
    /// broken invariant.
    pub fn is_user_abort(&self) -> bool {
        matches!(
            self,
            RuntimeError::Panic(_)
                | RuntimeError::AssertionFailed(_)
                | RuntimeError::PreconditionFailed(_)
                | RuntimeError::PostconditionFailed(_)
        )
    }

    /// Invariant violations indicate a checker bug, not a user error.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            RuntimeError::UseAfterMoveRuntime
                | RuntimeError::ResourceLostRuntime
                | RuntimeError::Internal(_)
        )
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Panic(message) => write!(f, "panic: {message}"),
            RuntimeError::AssertionFailed(Some(message)) => {
                write!(f, "assertion failed: {message}")
            }
            RuntimeError::AssertionFailed(None) => write!(f, "assertion failed"),
            RuntimeError::PreconditionFailed(Some(message)) => {
                write!(f, "precondition failed: {message}")
            }
            RuntimeError::PreconditionFailed(None) => write!(f, "precondition failed"),
            RuntimeError::PostconditionFailed(Some(message)) => {
                write!(f, "postcondition failed: {message}")
            }
            RuntimeError::PostconditionFailed(None) => write!(f, "postcondition failed"),
            RuntimeError::Overflow { type_name } => write!(f, "overflow in `{type_name}`"),
            RuntimeError::Underflow { type_name } => write!(f, "underflow in `{type_name}`"),
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::DereferenceFailed => write!(f, "dereference of invalid reference"),
            RuntimeError::StorageSlotOccupied { path } => {
                write!(f, "storage path {path} is already in use")
            }
            RuntimeError::ForceCastFailed { expected, actual } => {
                write!(f, "expected `{expected}`, got `{actual}`")
            }
            RuntimeError::MissingStorageValue { path } => {
                write!(f, "no value at storage path {path}")
            }
            RuntimeError::NestedCapability { depth } => {
                write!(f, "capability chain exceeds {depth} links")
            }
            RuntimeError::InvalidPathDomain { expected, actual } => {
                write!(f, "expected a /{expected}/ path, got {actual}")
            }
            RuntimeError::IndexOutOfBounds { index, size } => {
                write!(f, "index {index} out of bounds (size {size})")
            }
            RuntimeError::KeyNotFound => write!(f, "key not found"),
            RuntimeError::RlpDecode(message) => write!(f, "RLP decoding failed: {message}"),
            RuntimeError::ForceUnwrapNil => write!(f, "unexpectedly found nil"),
            RuntimeError::EnumCaseNotFound(name) => write!(f, "unknown enum case `{name}`"),
            RuntimeError::UseAfterMoveRuntime => {
                write!(f, "internal invariant violation: use after move")
            }
            RuntimeError::ResourceLostRuntime => {
                write!(f, "internal invariant violation: resource lost")
            }
            RuntimeError::Internal(message) => {
                write!(f, "internal invariant violation: {message}")
            }
            RuntimeError::ComputationLimitExceeded { limit } => {
                write!(f, "computation limit of {limit} exceeded")
            }
            RuntimeError::MemoryLimitExceeded { limit } => {
                write!(f, "memory limit of {limit} exceeded")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(RuntimeError::Panic("boom".into()).is_user_abort());
        assert!(RuntimeError::PostconditionFailed(None).is_user_abort());
        assert!(!RuntimeError::DivisionByZero.is_user_abort());
        assert!(RuntimeError::UseAfterMoveRuntime.is_invariant_violation());
        assert!(!RuntimeError::Overflow { type_name: "UInt8" }.is_invariant_violation());
    }
}
