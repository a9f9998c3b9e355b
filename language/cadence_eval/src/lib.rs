//! Cadence Eval - the tree-walking interpreter.
//!
//! Executes checked programs against the checker's elaboration while
//! upholding the resource invariants at runtime:
//!
//! - moves invalidate their source slot (and any ephemeral references)
//! - destruction is explicit and recursive
//! - all storage access is mediated by account values and typed,
//!   revocable capabilities
//!
//! The host drives transactions through [`Interpreter::invoke`] and
//! provides storage, crypto, UUIDs, and the event sink via the [`Host`]
//! trait; [`TestHost`] is the deterministic in-memory implementation.

mod builtins;
mod environment;
mod metering;

pub mod bridge;
pub mod errors;
pub mod host;
pub mod interpreter;
pub mod value;

pub use bridge::{export_value, import_value, BridgeValue, ExportedEvent};
pub use environment::Environment;
pub use errors::{EvalResult, RuntimeError};
pub use host::{HashAlgorithm, Host, SignatureAlgorithm, TestHost};
pub use interpreter::Interpreter;
pub use metering::{MemoryKind, MeterGauge};
pub use value::{
    ArrayValue, CapabilityValue, CompositeValue, DictionaryValue, FunctionValue, IntegerValue,
    LinkValue, PathValue, ReferenceValue, Value,
};
