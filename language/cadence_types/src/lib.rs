//! Cadence Types - the semantic type universe.
//!
//! All types in a checking run are interned into a [`TypePool`] and
//! referenced by [`TypeId`] (32-bit indices):
//! - O(1) type equality (index comparison)
//! - Automatic deduplication (each unique type stored once)
//! - Primitives pre-interned at fixed indices
//!
//! Nominal kinds (composites, interfaces) are identified by
//! `(Location, qualified name)`; the builtin location is `Location::Builtin`.
//!
//! The subtype, assignability, and least-common-supertype relations live
//! in [`subtype`] and operate over pool ids. [`StaticType`] is the
//! serializable mirror the interpreter and storage layer carry at runtime.

mod composite;
mod pool;
mod static_type;
mod subtype;
mod ty;

pub use composite::{
    CompositeData, CompositeId, FieldMember, FunctionMember, InterfaceData, InterfaceId,
};
pub use pool::TypePool;
pub use static_type::StaticType;
pub use ty::{NumericType, Primitive, TypeEntry, TypeId};
