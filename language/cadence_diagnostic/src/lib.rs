//! Diagnostic system for checker error reporting.
//!
//! - Error codes for searchability
//! - Clear messages (what went wrong)
//! - Primary span (where it went wrong)
//! - Context labels and notes (why it's wrong)
//!
//! The checker never aborts on the first error: diagnostics accumulate in
//! a [`Diagnostics`] queue and are reported en masse. The host decides
//! whether to proceed to execution (conventionally, only with zero
//! errors).

mod diagnostic;
mod error_code;
mod queue;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use queue::Diagnostics;
