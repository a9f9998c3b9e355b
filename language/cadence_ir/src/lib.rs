//! Cadence IR - AST and common data types
//!
//! This crate contains the core data structures shared by the checker and
//! the interpreter:
//! - Spans for source locations
//! - Names for interned identifiers
//! - Program locations (nominal type identity)
//! - Access modifiers
//! - AST nodes (declarations, statements, expressions)
//! - Arena allocation for expression and statement nodes
//!
//! The parser is an external collaborator: it produces the node shapes
//! defined here, positions included. Everything downstream consumes the
//! tree read-only.
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: Strings → `Name(u32)`
//! - **Flatten Everything**: No `Box<Expr>`, use `ExprId(u32)` indices

mod access;
mod arena;
pub mod ast;
mod builder;
mod interner;
mod location;
mod name;
mod span;

pub use access::Access;
pub use arena::NodeArena;
pub use ast::{
    Argument, BinaryOp, Block, CastKind, CompositeDeclaration, CompositeKind, Condition,
    ConditionKind, Declaration, EnumCase, Expr, ExprId, ExprKind, FieldDeclaration,
    FunctionDeclaration, ImportDeclaration, InterfaceDeclaration, Parameter, PathDomain, Program,
    SpecialFunction, Stmt, StmtId, StmtKind, Transfer, TypeAnnotation, TypeAnnotationKind, UnaryOp,
    VariableKind,
};
pub use builder::ProgramBuilder;
pub use interner::{SharedInterner, StringInterner};
pub use location::Location;
pub use name::Name;
pub use span::Span;

/// Trait for AST nodes that carry a source span.
pub trait Spanned {
    fn span(&self) -> Span;
}
