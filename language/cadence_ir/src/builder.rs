//! Programmatic program construction.
//!
//! The parser is out of scope for this crate family; checker and
//! interpreter tests build their input programs through this API instead.
//! Spans are dummies unless a test cares about positions.

use num_bigint::BigInt;

use crate::ast::{
    Argument, BinaryOp, Block, CastKind, CompositeDeclaration, CompositeKind, Condition,
    ConditionKind, Declaration, Expr, ExprId, ExprKind, FieldDeclaration, FunctionDeclaration,
    ImportDeclaration, Parameter, PathDomain, Program, SpecialFunction, Stmt, StmtId, StmtKind,
    Transfer, TypeAnnotation, TypeAnnotationKind, UnaryOp, VariableKind,
};
use crate::{Access, Location, Name, NodeArena, SharedInterner, Span};

/// Builder for [`Program`] values.
pub struct ProgramBuilder {
    interner: SharedInterner,
    arena: NodeArena,
    location: Location,
    imports: Vec<ImportDeclaration>,
    declarations: Vec<Declaration>,
}

impl ProgramBuilder {
    pub fn new(interner: SharedInterner, location: Location) -> Self {
        ProgramBuilder {
            interner,
            arena: NodeArena::new(),
            location,
            imports: Vec::new(),
            declarations: Vec::new(),
        }
    }

    /// Builder for a standalone script with a fresh interner.
    pub fn script() -> Self {
        Self::new(SharedInterner::new(), Location::Script(0))
    }

    /// The interner used for every name in the program under construction.
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Intern a name.
    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// Finish, yielding the program.
    pub fn finish(self) -> Program {
        Program {
            location: self.location,
            imports: self.imports,
            declarations: self.declarations,
            arena: self.arena,
        }
    }

    // Declarations

    pub fn add_declaration(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }

    pub fn add_import(&mut self, identifiers: &[&str], location: Location) {
        let identifiers = identifiers.iter().map(|s| self.name(s)).collect();
        self.imports.push(ImportDeclaration {
            identifiers,
            location,
            span: Span::DUMMY,
        });
    }

    /// A `pub fun` with no conditions.
    pub fn function(
        &mut self,
        name: &str,
        parameters: Vec<Parameter>,
        return_type: Option<TypeAnnotation>,
        body: Block,
    ) -> FunctionDeclaration {
        FunctionDeclaration {
            access: Access::Public,
            name: self.name(name),
            parameters,
            return_type,
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            body: Some(body),
            span: Span::DUMMY,
        }
    }

    /// An empty composite declaration shell; tests fill in the members.
    pub fn composite(&self, kind: CompositeKind, name: &str) -> CompositeDeclaration {
        CompositeDeclaration {
            access: Access::Public,
            kind,
            name: self.name(name),
            conformances: Vec::new(),
            fields: Vec::new(),
            initializer: None,
            destructor: None,
            functions: Vec::new(),
            nested_composites: Vec::new(),
            enum_raw_type: None,
            enum_cases: Vec::new(),
            span: Span::DUMMY,
        }
    }

    pub fn field(
        &self,
        access: Access,
        kind: VariableKind,
        name: &str,
        ty: TypeAnnotation,
    ) -> FieldDeclaration {
        FieldDeclaration {
            access,
            kind,
            name: self.name(name),
            type_annotation: ty,
            span: Span::DUMMY,
        }
    }

    pub fn special_function(&self, parameters: Vec<Parameter>, body: Block) -> SpecialFunction {
        SpecialFunction {
            parameters,
            body,
            span: Span::DUMMY,
        }
    }

    pub fn parameter(&self, label: Option<&str>, name: &str, ty: TypeAnnotation) -> Parameter {
        Parameter {
            label: label.map(|l| self.name(l)),
            name: self.name(name),
            type_annotation: ty,
            span: Span::DUMMY,
        }
    }

    pub fn condition(&self, kind: ConditionKind, expr: ExprId, message: Option<ExprId>) -> Condition {
        Condition {
            kind,
            expr,
            message,
        }
    }

    // Type annotations

    pub fn nominal_type(&self, name: &str) -> TypeAnnotation {
        TypeAnnotation::new(TypeAnnotationKind::Nominal(self.name(name)), Span::DUMMY)
    }

    /// `@Name` - resource-annotated nominal type.
    pub fn resource_type(&self, name: &str) -> TypeAnnotation {
        self.nominal_type(name).resource()
    }

    pub fn optional_type(&self, inner: TypeAnnotation) -> TypeAnnotation {
        TypeAnnotation::new(
            TypeAnnotationKind::Optional(Box::new(inner)),
            Span::DUMMY,
        )
    }

    pub fn array_type(&self, element: TypeAnnotation) -> TypeAnnotation {
        TypeAnnotation::new(
            TypeAnnotationKind::VariableArray(Box::new(element)),
            Span::DUMMY,
        )
    }

    pub fn dictionary_type(&self, key: TypeAnnotation, value: TypeAnnotation) -> TypeAnnotation {
        TypeAnnotation::new(
            TypeAnnotationKind::Dictionary {
                key: Box::new(key),
                value: Box::new(value),
            },
            Span::DUMMY,
        )
    }

    pub fn reference_type(&self, authorized: bool, referenced: TypeAnnotation) -> TypeAnnotation {
        TypeAnnotation::new(
            TypeAnnotationKind::Reference {
                authorized,
                referenced: Box::new(referenced),
            },
            Span::DUMMY,
        )
    }

    pub fn restricted_type(
        &self,
        base: Option<TypeAnnotation>,
        interfaces: &[&str],
    ) -> TypeAnnotation {
        TypeAnnotation::new(
            TypeAnnotationKind::Restricted {
                base: base.map(Box::new),
                interfaces: interfaces.iter().map(|s| self.name(s)).collect(),
            },
            Span::DUMMY,
        )
    }

    pub fn capability_type(&self, borrow: TypeAnnotation) -> TypeAnnotation {
        TypeAnnotation::new(
            TypeAnnotationKind::Capability {
                borrow: Box::new(borrow),
            },
            Span::DUMMY,
        )
    }

    // Expressions

    fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.arena.alloc_expr(Expr::new(kind, Span::DUMMY))
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.expr(ExprKind::IntegerLiteral(BigInt::from(value)))
    }

    pub fn big_int(&mut self, value: BigInt) -> ExprId {
        self.expr(ExprKind::IntegerLiteral(value))
    }

    /// A fixed-point literal already scaled by 10^8.
    pub fn fixed_point(&mut self, scaled: i128) -> ExprId {
        self.expr(ExprKind::FixedPointLiteral { scaled })
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        let name = self.name(value);
        self.expr(ExprKind::StringLiteral(name))
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.expr(ExprKind::BoolLiteral(value))
    }

    pub fn nil(&mut self) -> ExprId {
        self.expr(ExprKind::NilLiteral)
    }

    pub fn address(&mut self, value: u64) -> ExprId {
        self.expr(ExprKind::AddressLiteral(value.to_be_bytes()))
    }

    pub fn path(&mut self, domain: PathDomain, identifier: &str) -> ExprId {
        let identifier = self.name(identifier);
        self.expr(ExprKind::PathLiteral { domain, identifier })
    }

    pub fn array(&mut self, elements: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::ArrayLiteral(elements))
    }

    pub fn dictionary(&mut self, entries: Vec<(ExprId, ExprId)>) -> ExprId {
        self.expr(ExprKind::DictionaryLiteral(entries))
    }

    pub fn ident(&mut self, name: &str) -> ExprId {
        let name = self.name(name);
        self.expr(ExprKind::Identifier(name))
    }

    pub fn member(&mut self, base: ExprId, name: &str) -> ExprId {
        let name = self.name(name);
        self.expr(ExprKind::Member { base, name })
    }

    pub fn index(&mut self, base: ExprId, index: ExprId) -> ExprId {
        self.expr(ExprKind::Index { base, index })
    }

    pub fn arg(&self, value: ExprId) -> Argument {
        Argument { label: None, value }
    }

    pub fn labeled_arg(&self, label: &str, value: ExprId) -> Argument {
        Argument {
            label: Some(self.name(label)),
            value,
        }
    }

    pub fn call(
        &mut self,
        callee: ExprId,
        type_arguments: Vec<TypeAnnotation>,
        arguments: Vec<Argument>,
    ) -> ExprId {
        self.expr(ExprKind::Invocation {
            callee,
            type_arguments,
            arguments: arguments.into(),
        })
    }

    /// Shorthand: invoke a named function with positional arguments.
    pub fn call_named(&mut self, function: &str, arguments: Vec<Argument>) -> ExprId {
        let callee = self.ident(function);
        self.call(callee, Vec::new(), arguments)
    }

    pub fn create(&mut self, invocation: ExprId) -> ExprId {
        self.expr(ExprKind::Create { invocation })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.expr(ExprKind::Unary { op, operand })
    }

    /// `<-e`
    pub fn move_expr(&mut self, operand: ExprId) -> ExprId {
        self.unary(UnaryOp::Move, operand)
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.expr(ExprKind::Binary { op, left, right })
    }

    pub fn cast(&mut self, operand: ExprId, kind: CastKind, target: TypeAnnotation) -> ExprId {
        self.expr(ExprKind::Cast {
            operand,
            kind,
            target,
        })
    }

    /// `&e as &T`
    pub fn reference(&mut self, operand: ExprId, target: TypeAnnotation) -> ExprId {
        self.expr(ExprKind::Reference { operand, target })
    }

    pub fn force_unwrap(&mut self, operand: ExprId) -> ExprId {
        self.expr(ExprKind::ForceUnwrap { operand })
    }

    pub fn conditional(
        &mut self,
        condition: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    ) -> ExprId {
        self.expr(ExprKind::Conditional {
            condition,
            then_expr,
            else_expr,
        })
    }

    // Statements

    fn stmt(&mut self, kind: StmtKind) -> StmtId {
        self.arena.alloc_stmt(Stmt::new(kind, Span::DUMMY))
    }

    pub fn variable(
        &mut self,
        kind: VariableKind,
        name: &str,
        type_annotation: Option<TypeAnnotation>,
        transfer: Transfer,
        value: ExprId,
    ) -> StmtId {
        let name = self.name(name);
        self.stmt(StmtKind::VariableDeclaration {
            kind,
            name,
            type_annotation,
            transfer,
            value,
        })
    }

    /// `let name = value`
    pub fn let_copy(&mut self, name: &str, value: ExprId) -> StmtId {
        self.variable(VariableKind::Let, name, None, Transfer::Copy, value)
    }

    /// `let name <- value`
    pub fn let_move(&mut self, name: &str, value: ExprId) -> StmtId {
        self.variable(VariableKind::Let, name, None, Transfer::Move, value)
    }

    pub fn assign(&mut self, target: ExprId, transfer: Transfer, value: ExprId) -> StmtId {
        self.stmt(StmtKind::Assignment {
            target,
            transfer,
            value,
        })
    }

    pub fn if_stmt(
        &mut self,
        condition: ExprId,
        then_block: Block,
        else_block: Option<Block>,
    ) -> StmtId {
        self.stmt(StmtKind::If {
            condition,
            then_block,
            else_block,
        })
    }

    pub fn while_stmt(&mut self, condition: ExprId, block: Block) -> StmtId {
        self.stmt(StmtKind::While { condition, block })
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> StmtId {
        self.stmt(StmtKind::Return { value })
    }

    pub fn destroy(&mut self, expr: ExprId) -> StmtId {
        self.stmt(StmtKind::Destroy { expr })
    }

    pub fn emit(&mut self, invocation: ExprId) -> StmtId {
        self.stmt(StmtKind::Emit { invocation })
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.stmt(StmtKind::Expression { expr })
    }

    pub fn block(&self, statements: Vec<StmtId>) -> Block {
        Block::new(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_allocates_into_arena() {
        let mut builder = ProgramBuilder::script();
        let one = builder.int(1);
        let two = builder.int(2);
        let sum = builder.binary(BinaryOp::Add, one, two);
        let program = builder.finish();

        assert_eq!(program.arena.expr_count(), 3);
        match &program.arena.expr(sum).kind {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(*op, BinaryOp::Add);
                assert_eq!(*left, one);
                assert_eq!(*right, two);
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_interns_identifiers() {
        let mut builder = ProgramBuilder::script();
        let a = builder.ident("x");
        let b = builder.ident("x");
        let program = builder.finish();

        let (a, b) = match (&program.arena.expr(a).kind, &program.arena.expr(b).kind) {
            (ExprKind::Identifier(a), ExprKind::Identifier(b)) => (*a, *b),
            _ => panic!("expected identifiers"),
        };
        assert_eq!(a, b);
    }
}
