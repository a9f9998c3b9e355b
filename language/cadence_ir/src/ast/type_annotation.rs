//! Type annotations as written in source.
//!
//! Annotations are resolved to semantic types by the checker; the shapes
//! here only mirror the surface syntax. Unlike expressions they form an
//! owned tree: annotations are small and never shared between nodes.

use crate::{Name, Span};

/// A type annotation: `@R`, `[Int]`, `&AnyResource{Receiver}`, ...
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeAnnotation {
    /// `@` marker: the annotated type must be a resource kind.
    pub is_resource: bool,
    pub kind: TypeAnnotationKind,
    pub span: Span,
}

impl TypeAnnotation {
    pub fn new(kind: TypeAnnotationKind, span: Span) -> Self {
        TypeAnnotation {
            is_resource: false,
            kind,
            span,
        }
    }

    /// Mark with the `@` resource annotation.
    #[must_use]
    pub fn resource(mut self) -> Self {
        self.is_resource = true;
        self
    }
}

/// Annotation variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeAnnotationKind {
    /// A named type: `Int`, `String`, a composite, an interface.
    Nominal(Name),

    /// `T?`
    Optional(Box<TypeAnnotation>),

    /// `[T]`
    VariableArray(Box<TypeAnnotation>),

    /// `[T; N]`
    ConstantArray {
        element: Box<TypeAnnotation>,
        size: u64,
    },

    /// `{K: V}`
    Dictionary {
        key: Box<TypeAnnotation>,
        value: Box<TypeAnnotation>,
    },

    /// `&T` / `auth &T`
    Reference {
        authorized: bool,
        referenced: Box<TypeAnnotation>,
    },

    /// `((A, B): R)`
    Function {
        parameters: Vec<TypeAnnotation>,
        return_type: Box<TypeAnnotation>,
    },

    /// `T{I1, I2}` or `{I1, I2}` with an implicit Any base.
    Restricted {
        base: Option<Box<TypeAnnotation>>,
        interfaces: Vec<Name>,
    },

    /// `Capability<&T>`
    Capability { borrow: Box<TypeAnnotation> },
}
