//! Builtin contract implementations that run host-side.

pub mod rlp;
