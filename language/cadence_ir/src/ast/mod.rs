//! AST node shapes.
//!
//! The parser is an external collaborator; these are the shapes it
//! produces and the checker and interpreter consume read-only. Every node
//! carries a [`Span`] for diagnostics. Expression and statement children
//! are arena ids ([`ExprId`] / [`StmtId`]), never boxes, so elaboration
//! side tables key off the same ids.

mod declaration;
mod expr;
mod stmt;
mod type_annotation;

pub use declaration::{
    CompositeDeclaration, CompositeKind, Condition, ConditionKind, Declaration, EnumCase,
    FieldDeclaration, FunctionDeclaration, ImportDeclaration, InterfaceDeclaration, Parameter,
    Program, SpecialFunction,
};
pub use expr::{
    Argument, ArgumentList, BinaryOp, CastKind, Expr, ExprId, ExprKind, PathDomain, UnaryOp,
};
pub use stmt::{Block, Stmt, StmtId, StmtKind, Transfer, VariableKind};
pub use type_annotation::{TypeAnnotation, TypeAnnotationKind};
