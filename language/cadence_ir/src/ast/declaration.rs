//! Top-level declarations.

use super::expr::ExprId;
use super::stmt::{Block, VariableKind};
use super::type_annotation::TypeAnnotation;
use crate::{Access, Location, Name, NodeArena, Span};

/// A complete program: one script or one contract source.
///
/// The arena owns every expression and statement node reachable from the
/// declarations.
#[derive(Debug, Clone)]
pub struct Program {
    pub location: Location,
    pub imports: Vec<ImportDeclaration>,
    pub declarations: Vec<Declaration>,
    pub arena: NodeArena,
}

/// `import X from 0x1`
#[derive(Debug, Clone)]
pub struct ImportDeclaration {
    pub identifiers: Vec<Name>,
    pub location: Location,
    pub span: Span,
}

/// Top-level declaration variants.
#[derive(Debug, Clone)]
pub enum Declaration {
    Composite(CompositeDeclaration),
    Interface(InterfaceDeclaration),
    Function(FunctionDeclaration),
}

/// The kind of a composite declaration.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CompositeKind {
    Structure,
    Resource,
    Contract,
    Event,
    Enum,
}

impl CompositeKind {
    /// Whether values of this kind obey move semantics.
    #[inline]
    pub fn is_resource(self) -> bool {
        matches!(self, CompositeKind::Resource)
    }

    /// Keyword as written in source.
    pub fn keyword(self) -> &'static str {
        match self {
            CompositeKind::Structure => "struct",
            CompositeKind::Resource => "resource",
            CompositeKind::Contract => "contract",
            CompositeKind::Event => "event",
            CompositeKind::Enum => "enum",
        }
    }
}

impl std::fmt::Display for CompositeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A composite declaration: struct, resource, contract, event, or enum.
#[derive(Debug, Clone)]
pub struct CompositeDeclaration {
    pub access: Access,
    pub kind: CompositeKind,
    pub name: Name,
    /// Interfaces this composite declares conformance to.
    pub conformances: Vec<Name>,
    pub fields: Vec<FieldDeclaration>,
    pub initializer: Option<SpecialFunction>,
    /// `destroy` body; only resources may declare one.
    pub destructor: Option<SpecialFunction>,
    pub functions: Vec<FunctionDeclaration>,
    /// Composites declared inside this one; only contracts nest.
    pub nested_composites: Vec<CompositeDeclaration>,
    /// Enum raw type, e.g. `enum E: UInt8`.
    pub enum_raw_type: Option<TypeAnnotation>,
    pub enum_cases: Vec<EnumCase>,
    pub span: Span,
}

/// One case of an enum declaration.
#[derive(Debug, Clone)]
pub struct EnumCase {
    pub name: Name,
    pub span: Span,
}

/// A field of a composite or interface.
#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub access: Access,
    pub kind: VariableKind,
    pub name: Name,
    pub type_annotation: TypeAnnotation,
    pub span: Span,
}

/// `init` and `destroy` blocks.
///
/// `destroy` takes no parameters; the parser guarantees the list is empty
/// for it.
#[derive(Debug, Clone)]
pub struct SpecialFunction {
    pub parameters: Vec<Parameter>,
    pub body: Block,
    pub span: Span,
}

/// A function declaration, top-level or member.
#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub access: Access,
    pub name: Name,
    pub parameters: Vec<Parameter>,
    /// `None` means `Void`.
    pub return_type: Option<TypeAnnotation>,
    pub preconditions: Vec<Condition>,
    pub postconditions: Vec<Condition>,
    /// `None` for interface requirements without a default body.
    pub body: Option<Block>,
    pub span: Span,
}

/// A function parameter: `label name: Type`.
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Call-site argument label; `None` means the parameter name doubles
    /// as the label.
    pub label: Option<Name>,
    pub name: Name,
    pub type_annotation: TypeAnnotation,
    pub span: Span,
}

/// Whether a condition is checked on entry or on exit.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConditionKind {
    Pre,
    Post,
}

/// One clause of a `pre { ... }` / `post { ... }` block.
#[derive(Debug, Clone)]
pub struct Condition {
    pub kind: ConditionKind,
    pub expr: ExprId,
    /// Optional failure message: `cond: "message"`.
    pub message: Option<ExprId>,
}

/// An interface declaration.
///
/// Functions with a body are default implementations; functions without
/// are requirements.
#[derive(Debug, Clone)]
pub struct InterfaceDeclaration {
    pub access: Access,
    pub kind: CompositeKind,
    pub name: Name,
    pub fields: Vec<FieldDeclaration>,
    pub functions: Vec<FunctionDeclaration>,
    pub span: Span,
}
