//! Expression elaboration.
//!
//! `check_expr` computes a type for every expression and records it in
//! the elaboration. `expected` carries the contextual type downward; it
//! types integer literals and empty container literals, nothing else is
//! inferred from it.

use cadence_diagnostic::ErrorCode;
use cadence_ir::{
    Argument, BinaryOp, CastKind, CompositeKind, ConditionKind, ExprId, ExprKind, Name, PathDomain,
    Span, UnaryOp,
};
use cadence_types::{NumericType, TypeEntry, TypeId};
use num_bigint::BigInt;

use crate::resources::ResourceState;

use super::Checker;

/// What kind of site an invocation appears in.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum InvocationContext {
    Normal,
    /// Inside `create ...`.
    Create,
    /// Inside `emit ...`.
    Emit,
}

impl Checker<'_> {
    pub(crate) fn check_expr(&mut self, id: ExprId, expected: Option<TypeId>) -> TypeId {
        let expr = self.program.arena.expr(id).clone();
        let span = expr.span;
        let ty = match &expr.kind {
            ExprKind::IntegerLiteral(value) => self.check_integer_literal(value, expected, span),
            ExprKind::FixedPointLiteral { scaled } => {
                self.check_fixed_point_literal(*scaled, expected, span)
            }
            ExprKind::StringLiteral(_) => TypeId::STRING,
            ExprKind::BoolLiteral(_) => TypeId::BOOL,
            ExprKind::NilLiteral => self.pool.optional(TypeId::NEVER),
            ExprKind::AddressLiteral(_) => TypeId::ADDRESS,
            ExprKind::PathLiteral { domain, .. } => match domain {
                PathDomain::Storage => TypeId::STORAGE_PATH,
                PathDomain::Private => TypeId::PRIVATE_PATH,
                PathDomain::Public => TypeId::PUBLIC_PATH,
            },
            ExprKind::ArrayLiteral(elements) => self.check_array_literal(elements, expected, span),
            ExprKind::DictionaryLiteral(entries) => {
                self.check_dictionary_literal(entries, expected, span)
            }
            ExprKind::Identifier(name) => self.check_identifier(id, *name, span),
            ExprKind::Member { base, name } => self.check_member_expr(id, *base, *name, span),
            ExprKind::Index { base, index } => self.check_index_expr(*base, *index, span),
            ExprKind::Invocation {
                callee,
                type_arguments,
                arguments,
            } => self.check_invocation(
                id,
                *callee,
                type_arguments,
                arguments,
                span,
                InvocationContext::Normal,
            ),
            ExprKind::Create { invocation } => self.check_create(*invocation, span),
            ExprKind::Unary { op, operand } => self.check_unary(*op, *operand, span),
            ExprKind::Binary { op, left, right } => {
                self.check_binary(*op, *left, *right, expected, span)
            }
            ExprKind::Cast {
                operand,
                kind,
                target,
            } => self.check_cast(id, *operand, *kind, target, span),
            ExprKind::Reference { operand, target } => {
                self.check_reference(id, *operand, target, span)
            }
            ExprKind::ForceUnwrap { operand } => {
                let operand_ty = self.check_expr(*operand, None);
                match self.pool.entry(operand_ty) {
                    TypeEntry::Optional(inner) => *inner,
                    _ if operand_ty == TypeId::INVALID => TypeId::INVALID,
                    _ => {
                        self.report(
                            ErrorCode::C2001,
                            span,
                            format!(
                                "cannot force-unwrap non-optional `{}`",
                                self.display(operand_ty)
                            ),
                        );
                        TypeId::INVALID
                    }
                }
            }
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expect_type(*condition, TypeId::BOOL);
                let then_ty = self.check_expr(*then_expr, expected);
                let else_ty = self.check_expr(*else_expr, expected);
                self.pool.least_common_supertype(&[then_ty, else_ty])
            }
        };
        self.elaboration.expr_types.insert(id, ty);
        ty
    }

    /// Check an expression against a required type, reporting a mismatch.
    pub(crate) fn expect_type(&mut self, id: ExprId, required: TypeId) -> TypeId {
        let span = self.program.arena.expr(id).span;
        let ty = self.check_expr(id, Some(required));
        if !self.pool.is_assignable(ty, required) {
            self.report(
                ErrorCode::C2001,
                span,
                format!(
                    "expected `{}`, found `{}`",
                    self.display(required),
                    self.display(ty)
                ),
            );
        }
        ty
    }

    fn check_integer_literal(
        &mut self,
        value: &BigInt,
        expected: Option<TypeId>,
        span: Span,
    ) -> TypeId {
        let target = expected
            .map(|e| self.unwrap_optional(e))
            .and_then(|e| self.pool.numeric(e).map(|n| (e, n)))
            .filter(|(_, n)| !n.is_fixed_point());
        let Some((ty, numeric)) = target else {
            return TypeId::INT;
        };
        if let Some((min, max)) = numeric.integer_range() {
            if value < &min || value > &max {
                self.report(
                    ErrorCode::C2001,
                    span,
                    format!("literal `{value}` is out of range for `{numeric}`"),
                );
            }
        } else if numeric == NumericType::UInt && value.sign() == num_bigint::Sign::Minus {
            self.report(
                ErrorCode::C2001,
                span,
                format!("literal `{value}` is out of range for `UInt`"),
            );
        }
        ty
    }

    fn check_fixed_point_literal(
        &mut self,
        scaled: i128,
        expected: Option<TypeId>,
        span: Span,
    ) -> TypeId {
        let unsigned = expected
            .map(|e| self.unwrap_optional(e))
            .and_then(|e| self.pool.numeric(e))
            == Some(NumericType::UFix64);
        if unsigned {
            if scaled < 0 {
                self.report(
                    ErrorCode::C2001,
                    span,
                    "negative literal is out of range for `UFix64`".to_string(),
                );
            }
            TypeId::UFIX64
        } else {
            TypeId::FIX64
        }
    }

    fn unwrap_optional(&self, ty: TypeId) -> TypeId {
        match self.pool.entry(ty) {
            TypeEntry::Optional(inner) => *inner,
            _ => ty,
        }
    }

    fn check_array_literal(
        &mut self,
        elements: &[ExprId],
        expected: Option<TypeId>,
        _span: Span,
    ) -> TypeId {
        let expected_element = expected.and_then(|e| match self.pool.entry(self.unwrap_optional(e)) {
            TypeEntry::VariableArray(element) => Some(*element),
            TypeEntry::ConstantArray { element, .. } => Some(*element),
            _ => None,
        });
        let mut element_types = Vec::with_capacity(elements.len());
        for &element in elements {
            let ty = self.check_expr(element, expected_element);
            self.require_resource_rvalue(element, ty);
            element_types.push(ty);
        }
        let element_ty = match expected_element {
            Some(e) => e,
            None => self.pool.least_common_supertype(&element_types),
        };
        self.pool.variable_array(element_ty)
    }

    fn check_dictionary_literal(
        &mut self,
        entries: &[(ExprId, ExprId)],
        expected: Option<TypeId>,
        span: Span,
    ) -> TypeId {
        let expected_pair = expected.and_then(|e| match self.pool.entry(self.unwrap_optional(e)) {
            TypeEntry::Dictionary { key, value } => Some((*key, *value)),
            _ => None,
        });
        let mut key_types = Vec::with_capacity(entries.len());
        let mut value_types = Vec::with_capacity(entries.len());
        for &(key, value) in entries {
            key_types.push(self.check_expr(key, expected_pair.map(|(k, _)| k)));
            let value_ty = self.check_expr(value, expected_pair.map(|(_, v)| v));
            self.require_resource_rvalue(value, value_ty);
            value_types.push(value_ty);
        }
        let (key_ty, value_ty) = match expected_pair {
            Some(pair) => pair,
            None => (
                self.pool.least_common_supertype(&key_types),
                self.pool.least_common_supertype(&value_types),
            ),
        };
        if key_ty != TypeId::INVALID && !self.pool.is_hashable_key(key_ty) {
            self.report(
                ErrorCode::C2007,
                span,
                format!("`{}` cannot be a dictionary key", self.display(key_ty)),
            );
        }
        self.pool.dictionary(key_ty, value_ty)
    }

    fn check_identifier(&mut self, id: ExprId, name: Name, span: Span) -> TypeId {
        if name == self.names.self_ {
            return match self.current_composite {
                Some(ty) => ty,
                None => {
                    self.report(
                        ErrorCode::C1001,
                        span,
                        "`self` is only available inside a composite".to_string(),
                    );
                    TypeId::INVALID
                }
            };
        }

        if let Some(variable) = self.activations.lookup(name) {
            let ty = variable.ty;
            // Use-after-move / use-after-destroy.
            match self.resources.state(name) {
                Some(ResourceState::Moved) => {
                    self.report(
                        ErrorCode::C3002,
                        span,
                        format!("resource `{}` was moved", self.interner.lookup(name)),
                    );
                }
                Some(ResourceState::Destroyed) => {
                    self.report(
                        ErrorCode::C3003,
                        span,
                        format!("resource `{}` was destroyed", self.interner.lookup(name)),
                    );
                }
                _ => {}
            }
            return ty;
        }

        // Not a value: maybe a type name (enum case access, constructor).
        if let Some(contract) = self.current_contract {
            let qualified = self.qualified(contract, name);
            if let Some(ty) = self.resolve_nominal(qualified) {
                self.type_references.insert(id, ty);
                return ty;
            }
        }
        if let Some(ty) = self.resolve_nominal(name) {
            self.type_references.insert(id, ty);
            return ty;
        }

        self.report(
            ErrorCode::C1001,
            span,
            format!("cannot find `{}` in this scope", self.interner.lookup(name)),
        );
        TypeId::INVALID
    }

    fn check_index_expr(&mut self, base: ExprId, index: ExprId, span: Span) -> TypeId {
        let base_ty = self.check_expr(base, None);
        let effective = self.deref(base_ty);
        match self.pool.entry(effective).clone() {
            TypeEntry::VariableArray(element) | TypeEntry::ConstantArray { element, .. } => {
                let index_ty = self.check_expr(index, Some(TypeId::INT));
                let is_integer = self
                    .pool
                    .numeric(index_ty)
                    .is_some_and(|n| !n.is_fixed_point());
                if index_ty != TypeId::INVALID && !is_integer {
                    self.report(
                        ErrorCode::C2001,
                        span,
                        format!("array index must be an integer, found `{}`", self.display(index_ty)),
                    );
                }
                element
            }
            TypeEntry::Dictionary { key, value } => {
                self.expect_type(index, key);
                self.pool.optional(value)
            }
            _ if effective == TypeId::INVALID => TypeId::INVALID,
            _ => {
                self.report(
                    ErrorCode::C2012,
                    span,
                    format!("`{}` cannot be indexed", self.display(effective)),
                );
                TypeId::INVALID
            }
        }
    }

    fn check_create(&mut self, invocation: ExprId, span: Span) -> TypeId {
        let expr = self.program.arena.expr(invocation).clone();
        let ExprKind::Invocation {
            callee,
            type_arguments,
            arguments,
        } = &expr.kind
        else {
            self.report(
                ErrorCode::C2013,
                span,
                "`create` requires a constructor invocation".to_string(),
            );
            return TypeId::INVALID;
        };
        let ty = self.check_invocation(
            invocation,
            *callee,
            type_arguments,
            arguments,
            expr.span,
            InvocationContext::Create,
        );
        self.elaboration.expr_types.insert(invocation, ty);
        if ty != TypeId::INVALID && !self.pool.is_resource(ty) {
            self.report(
                ErrorCode::C3004,
                span,
                "`create` is only valid for resource types".to_string(),
            );
        }
        ty
    }

    fn check_unary(&mut self, op: UnaryOp, operand: ExprId, span: Span) -> TypeId {
        match op {
            UnaryOp::Minus => {
                let ty = self.check_expr(operand, None);
                let signed = self.pool.numeric(ty).is_some_and(NumericType::is_signed);
                if ty != TypeId::INVALID && !signed {
                    self.report(
                        ErrorCode::C2004,
                        span,
                        format!("cannot negate `{}`", self.display(ty)),
                    );
                }
                ty
            }
            UnaryOp::Not => {
                self.expect_type(operand, TypeId::BOOL);
                TypeId::BOOL
            }
            UnaryOp::Move => self.check_move(operand, span),
        }
    }

    /// `<-x`: the move operator. Only whole variables move; a resource
    /// inside a composite or container must leave through its owner's
    /// API, not through a field access.
    fn check_move(&mut self, operand: ExprId, span: Span) -> TypeId {
        let ty = self.check_expr(operand, None);
        if ty != TypeId::INVALID && !self.pool.is_resource(ty) {
            self.report(
                ErrorCode::C3004,
                span,
                format!("cannot move non-resource `{}`", self.display(ty)),
            );
            return ty;
        }
        match &self.program.arena.expr(operand).kind {
            ExprKind::Identifier(name) => {
                let name = *name;
                if self.resources.state(name) == Some(ResourceState::Owned) {
                    self.resources.transition(name, ResourceState::Moved);
                }
            }
            ExprKind::Member { .. } | ExprKind::Index { .. } => {
                self.report(
                    ErrorCode::C3011,
                    span,
                    "cannot move a resource out of a containing value".to_string(),
                );
            }
            _ => {}
        }
        ty
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
        expected: Option<TypeId>,
        span: Span,
    ) -> TypeId {
        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let left_ty = self.check_expr(left, expected);
                let right_ty = self.check_expr(right, Some(left_ty));
                // String concatenation shares `+` with the numeric family.
                if op == BinaryOp::Add && left_ty == TypeId::STRING {
                    self.expect_operand(right, right_ty, TypeId::STRING, span);
                    return TypeId::STRING;
                }
                if self.pool.numeric(left_ty).is_none() && left_ty != TypeId::INVALID {
                    self.report(
                        ErrorCode::C2004,
                        span,
                        format!("`{}` is not numeric", self.display(left_ty)),
                    );
                    return TypeId::INVALID;
                }
                // No implicit widening between distinct widths.
                self.expect_operand(right, right_ty, left_ty, span);
                left_ty
            }
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                let left_ty = self.check_expr(left, None);
                let right_ty = self.check_expr(right, Some(left_ty));
                if self.pool.numeric(left_ty).is_none() && left_ty != TypeId::INVALID {
                    self.report(
                        ErrorCode::C2004,
                        span,
                        format!("`{}` cannot be ordered", self.display(left_ty)),
                    );
                }
                self.expect_operand(right, right_ty, left_ty, span);
                TypeId::BOOL
            }
            BinaryOp::Equal | BinaryOp::NotEqual => {
                let left_ty = self.check_expr(left, None);
                let right_ty = self.check_expr(right, Some(left_ty));
                if self.pool.is_resource(left_ty) || self.pool.is_resource(right_ty) {
                    self.report(
                        ErrorCode::C2004,
                        span,
                        "resources cannot be compared".to_string(),
                    );
                }
                let comparable = self.pool.is_assignable(left_ty, right_ty)
                    || self.pool.is_assignable(right_ty, left_ty);
                if !comparable {
                    self.report(
                        ErrorCode::C2004,
                        span,
                        format!(
                            "cannot compare `{}` with `{}`",
                            self.display(left_ty),
                            self.display(right_ty)
                        ),
                    );
                }
                TypeId::BOOL
            }
            BinaryOp::And | BinaryOp::Or => {
                self.expect_type(left, TypeId::BOOL);
                self.expect_type(right, TypeId::BOOL);
                TypeId::BOOL
            }
            BinaryOp::NilCoalesce => {
                let left_ty = self.check_expr(left, None);
                let TypeEntry::Optional(inner) = self.pool.entry(left_ty) else {
                    if left_ty != TypeId::INVALID {
                        self.report(
                            ErrorCode::C2004,
                            span,
                            format!("`??` requires an optional, found `{}`", self.display(left_ty)),
                        );
                    }
                    return self.check_expr(right, None);
                };
                let inner = *inner;
                let right_ty = self.check_expr(right, Some(inner));
                if !self.pool.is_assignable(right_ty, inner)
                    && !self.pool.is_assignable(right_ty, left_ty)
                {
                    self.report(
                        ErrorCode::C2001,
                        span,
                        format!(
                            "`??` fallback `{}` does not match `{}`",
                            self.display(right_ty),
                            self.display(inner)
                        ),
                    );
                }
                inner
            }
        }
    }

    fn expect_operand(&mut self, _expr: ExprId, found: TypeId, required: TypeId, span: Span) {
        if !self.pool.is_assignable(found, required) {
            self.report(
                ErrorCode::C2001,
                span,
                format!(
                    "mismatched operand: expected `{}`, found `{}`",
                    self.display(required),
                    self.display(found)
                ),
            );
        }
    }

    fn check_cast(
        &mut self,
        id: ExprId,
        operand: ExprId,
        kind: CastKind,
        target: &cadence_ir::TypeAnnotation,
        span: Span,
    ) -> TypeId {
        let target_ty = self.resolve_annotation(target);
        let operand_ty = self.check_expr(operand, Some(target_ty));
        match kind {
            CastKind::Static => {
                if !self.pool.is_assignable(operand_ty, target_ty) {
                    self.report(
                        ErrorCode::C2006,
                        span,
                        format!(
                            "cannot cast `{}` to `{}`",
                            self.display(operand_ty),
                            self.display(target_ty)
                        ),
                    );
                }
                target_ty
            }
            CastKind::Failable => {
                self.elaboration.cast_targets.insert(id, target_ty);
                self.pool.optional(target_ty)
            }
            CastKind::Force => {
                self.elaboration.cast_targets.insert(id, target_ty);
                target_ty
            }
        }
    }

    fn check_reference(
        &mut self,
        id: ExprId,
        operand: ExprId,
        target: &cadence_ir::TypeAnnotation,
        span: Span,
    ) -> TypeId {
        let target_ty = self.resolve_annotation(target);
        let TypeEntry::Reference { referenced, .. } = self.pool.entry(target_ty) else {
            if target_ty != TypeId::INVALID {
                self.report(
                    ErrorCode::C2001,
                    span,
                    format!(
                        "a reference expression requires a reference type, found `{}`",
                        self.display(target_ty)
                    ),
                );
            }
            return TypeId::INVALID;
        };
        let referenced = *referenced;
        let operand_ty = self.check_expr(operand, None);
        if !self.pool.is_assignable(operand_ty, referenced) {
            self.report(
                ErrorCode::C2003,
                span,
                format!(
                    "cannot borrow `{}` as `{}`",
                    self.display(operand_ty),
                    self.display(referenced)
                ),
            );
        }
        self.elaboration.reference_types.insert(id, target_ty);
        target_ty
    }

    /// A resource crossing into a slot (argument, container element,
    /// binding) must arrive through the move operator or be a fresh
    /// rvalue; a bare variable read would silently copy.
    pub(crate) fn require_resource_rvalue(&mut self, expr: ExprId, ty: TypeId) {
        if !self.pool.is_resource(ty) {
            return;
        }
        let node = self.program.arena.expr(expr);
        if matches!(node.kind, ExprKind::Identifier(_)) {
            self.report(
                ErrorCode::C3005,
                node.span,
                "resource requires the move operator `<-`".to_string(),
            );
        }
    }

    // Invocations

    pub(crate) fn check_invocation(
        &mut self,
        expr_id: ExprId,
        callee: ExprId,
        type_arguments: &[cadence_ir::TypeAnnotation],
        arguments: &[Argument],
        span: Span,
        context: InvocationContext,
    ) -> TypeId {
        // Builtin identifier callees.
        if let ExprKind::Identifier(name) = self.program.arena.expr(callee).kind {
            if name == self.names.type_ {
                return self.check_type_constructor(expr_id, type_arguments, arguments, span);
            }
            if name == self.names.before {
                return self.check_before(expr_id, arguments, span);
            }
            if name == self.names.panic {
                self.check_argument_values(&[TypeId::STRING], arguments, span);
                return TypeId::NEVER;
            }
            if name == self.names.assert {
                if arguments.is_empty() || arguments.len() > 2 {
                    self.report(
                        ErrorCode::C2005,
                        span,
                        format!("`assert` takes 1 or 2 arguments, found {}", arguments.len()),
                    );
                } else {
                    self.expect_type(arguments[0].value, TypeId::BOOL);
                    if let Some(message) = arguments.get(1) {
                        self.expect_type(message.value, TypeId::STRING);
                    }
                }
                return TypeId::VOID;
            }
            if name == self.names.unsafe_random {
                self.check_argument_values(&[], arguments, span);
                return TypeId::UINT64;
            }
        }

        // Member callees with special typing: the storage API (generic
        // over a type argument) and reflection.
        if let ExprKind::Member { base, name } = self.program.arena.expr(callee).kind {
            if let Some(ty) =
                self.check_special_member_call(expr_id, base, name, type_arguments, arguments, span)
            {
                return ty;
            }
        }

        let callee_ty = self.check_expr(callee, None);

        // Constructor invocation: the callee names a composite type.
        if let Some(&constructed) = self.type_references.get(&callee) {
            return self.check_constructor_call(constructed, arguments, span, context);
        }

        match self.pool.entry(callee_ty).clone() {
            TypeEntry::Function {
                parameters,
                return_type,
            } => {
                self.check_argument_values(&parameters, arguments, span);
                return_type
            }
            _ if callee_ty == TypeId::INVALID => TypeId::INVALID,
            _ => {
                self.report(
                    ErrorCode::C2013,
                    span,
                    format!("`{}` is not callable", self.display(callee_ty)),
                );
                TypeId::INVALID
            }
        }
    }

    fn check_type_constructor(
        &mut self,
        expr_id: ExprId,
        type_arguments: &[cadence_ir::TypeAnnotation],
        arguments: &[Argument],
        span: Span,
    ) -> TypeId {
        if type_arguments.len() != 1 {
            self.report(
                ErrorCode::C2017,
                span,
                "`Type` requires exactly one type argument".to_string(),
            );
            return TypeId::INVALID;
        }
        if !arguments.is_empty() {
            self.report(
                ErrorCode::C2005,
                span,
                "`Type` takes no value arguments".to_string(),
            );
        }
        let ty = self.resolve_annotation(&type_arguments[0]);
        self.elaboration.type_arguments.insert(expr_id, vec![ty]);
        TypeId::META_TYPE
    }

    fn check_before(&mut self, expr_id: ExprId, arguments: &[Argument], span: Span) -> TypeId {
        if self.condition_context != Some(ConditionKind::Post) {
            self.report(
                ErrorCode::C2010,
                span,
                "`before` is only valid in postconditions".to_string(),
            );
            return TypeId::INVALID;
        }
        if arguments.len() != 1 {
            self.report(
                ErrorCode::C2005,
                span,
                format!("`before` takes 1 argument, found {}", arguments.len()),
            );
            return TypeId::INVALID;
        }
        let argument = arguments[0].value;
        let ty = self.check_expr(argument, None);
        if self.pool.is_resource(ty) {
            self.report(
                ErrorCode::C2010,
                span,
                "`before` cannot snapshot a resource".to_string(),
            );
        }
        let snapshot_id = self.next_snapshot_id;
        self.next_snapshot_id += 1;
        self.elaboration.snapshot_ids.insert(expr_id, snapshot_id);
        if let Some(key) = self.current_function {
            self.elaboration
                .snapshots
                .entry(key)
                .or_default()
                .push((snapshot_id, argument));
        }
        ty
    }

    /// Storage API, capability, and reflection member calls that cannot
    /// be expressed as plain member function types.
    fn check_special_member_call(
        &mut self,
        expr_id: ExprId,
        base: ExprId,
        name: Name,
        type_arguments: &[cadence_ir::TypeAnnotation],
        arguments: &[Argument],
        span: Span,
    ) -> Option<TypeId> {
        let n = &self.names;
        let (save, load, copy, borrow, link, unlink, get_capability) = (
            n.save,
            n.load,
            n.copy,
            n.borrow,
            n.link,
            n.unlink,
            n.get_capability,
        );
        let (get_type, is_instance, is_subtype, check) =
            (n.get_type, n.is_instance, n.is_subtype, n.check);

        // Only these member names have special typing; everything else
        // goes through ordinary member resolution (and its single base
        // elaboration).
        let special = name == get_type
            || name == is_instance
            || name == is_subtype
            || name == check
            || name == save
            || name == load
            || name == copy
            || name == borrow
            || name == link
            || name == unlink
            || name == get_capability;
        if !special {
            return None;
        }

        // Reflection members exist on every value.
        if name == get_type && type_arguments.is_empty() {
            self.check_expr(base, None);
            self.check_argument_values(&[], arguments, span);
            return Some(TypeId::META_TYPE);
        }
        if name == is_instance {
            self.check_expr(base, None);
            self.check_argument_values(&[TypeId::META_TYPE], arguments, span);
            return Some(TypeId::BOOL);
        }

        let base_ty = self.check_expr(base, None);
        let effective = self.deref(base_ty);

        if effective == TypeId::META_TYPE && name == is_subtype {
            self.check_argument_values(&[TypeId::META_TYPE], arguments, span);
            return Some(TypeId::BOOL);
        }

        // Capability members share names with the storage API.
        if let TypeEntry::Capability { borrow: borrow_ty } = self.pool.entry(effective) {
            let borrow_ty = *borrow_ty;
            if name == borrow {
                self.check_argument_values(&[], arguments, span);
                return Some(self.pool.optional(borrow_ty));
            }
            if name == check {
                self.check_argument_values(&[], arguments, span);
                return Some(TypeId::BOOL);
            }
        }

        let is_auth_account = effective == self.builtins.auth_account;
        let is_public_account = effective == self.builtins.public_account;
        if !is_auth_account && !is_public_account {
            return None;
        }

        if name == unlink && is_auth_account {
            self.check_argument_values(&[TypeId::CAPABILITY_PATH], arguments, span);
            return Some(TypeId::VOID);
        }
        if name == get_capability {
            let borrow_ty = self.require_reference_argument(expr_id, type_arguments, span)?;
            let path_ty = if is_public_account {
                TypeId::PUBLIC_PATH
            } else {
                TypeId::CAPABILITY_PATH
            };
            self.check_argument_values(&[path_ty], arguments, span);
            return Some(self.pool.capability(borrow_ty));
        }
        if !is_auth_account {
            return None;
        }

        if name == save {
            let ty = self.require_type_argument(expr_id, type_arguments, span)?;
            self.check_argument_values(&[ty, TypeId::STORAGE_PATH], arguments, span);
            if !self.pool.is_storable(ty) {
                self.report(
                    ErrorCode::C2001,
                    span,
                    format!("`{}` cannot be stored", self.display(ty)),
                );
            }
            return Some(TypeId::VOID);
        }
        if name == load {
            let ty = self.require_type_argument(expr_id, type_arguments, span)?;
            self.check_argument_values(&[TypeId::STORAGE_PATH], arguments, span);
            return Some(self.pool.optional(ty));
        }
        if name == copy {
            let ty = self.require_type_argument(expr_id, type_arguments, span)?;
            self.check_argument_values(&[TypeId::STORAGE_PATH], arguments, span);
            if self.pool.is_resource(ty) {
                self.report(
                    ErrorCode::C3004,
                    span,
                    "resources cannot be copied out of storage".to_string(),
                );
            }
            return Some(self.pool.optional(ty));
        }
        if name == borrow {
            let ty = self.require_reference_argument(expr_id, type_arguments, span)?;
            self.check_argument_values(&[TypeId::STORAGE_PATH], arguments, span);
            let reference = ty;
            return Some(self.pool.optional(reference));
        }
        if name == link {
            let ty = self.require_reference_argument(expr_id, type_arguments, span)?;
            self.check_argument_values(&[TypeId::CAPABILITY_PATH, TypeId::PATH], arguments, span);
            let capability = self.pool.capability(ty);
            return Some(self.pool.optional(capability));
        }

        None
    }

    fn require_type_argument(
        &mut self,
        expr_id: ExprId,
        type_arguments: &[cadence_ir::TypeAnnotation],
        span: Span,
    ) -> Option<TypeId> {
        if type_arguments.len() != 1 {
            self.report(
                ErrorCode::C2017,
                span,
                "this call requires exactly one type argument".to_string(),
            );
            return None;
        }
        let ty = self.resolve_annotation(&type_arguments[0]);
        self.elaboration.type_arguments.insert(expr_id, vec![ty]);
        Some(ty)
    }

    fn require_reference_argument(
        &mut self,
        expr_id: ExprId,
        type_arguments: &[cadence_ir::TypeAnnotation],
        span: Span,
    ) -> Option<TypeId> {
        let ty = self.require_type_argument(expr_id, type_arguments, span)?;
        if !matches!(self.pool.entry(ty), TypeEntry::Reference { .. }) {
            self.report(
                ErrorCode::C2008,
                span,
                format!("expected a reference type argument, found `{}`", self.display(ty)),
            );
            return None;
        }
        Some(ty)
    }

    fn check_constructor_call(
        &mut self,
        constructed: TypeId,
        arguments: &[Argument],
        span: Span,
        context: InvocationContext,
    ) -> TypeId {
        let Some(cid) = self.pool.as_composite(constructed) else {
            self.report(
                ErrorCode::C2013,
                span,
                format!("`{}` cannot be constructed", self.display(constructed)),
            );
            return TypeId::INVALID;
        };
        let kind = self.pool.composite_data(cid).kind;
        match kind {
            CompositeKind::Resource if context != InvocationContext::Create => {
                self.report(
                    ErrorCode::C3004,
                    span,
                    "resource constructors must be invoked with `create`".to_string(),
                );
            }
            CompositeKind::Event if context != InvocationContext::Emit => {
                self.report(
                    ErrorCode::C2013,
                    span,
                    "events can only be invoked by `emit`".to_string(),
                );
            }
            CompositeKind::Enum => {
                self.report(
                    ErrorCode::C2013,
                    span,
                    "enums are not constructible; reference a case".to_string(),
                );
                return TypeId::INVALID;
            }
            CompositeKind::Contract if context == InvocationContext::Normal => {
                self.report(
                    ErrorCode::C2013,
                    span,
                    "contracts are instantiated at deployment".to_string(),
                );
                return TypeId::INVALID;
            }
            _ => {}
        }

        let Some(&ctor_ty) = self.elaboration.constructor_types.get(&constructed) else {
            self.check_argument_values(&[], arguments, span);
            return constructed;
        };
        if let TypeEntry::Function { parameters, .. } = self.pool.entry(ctor_ty).clone() {
            self.check_argument_values(&parameters, arguments, span);
        }
        constructed
    }

    /// Check argument count and types against parameter types.
    pub(crate) fn check_argument_values(
        &mut self,
        parameters: &[TypeId],
        arguments: &[Argument],
        span: Span,
    ) {
        if parameters.len() != arguments.len() {
            self.report(
                ErrorCode::C2005,
                span,
                format!(
                    "expected {} argument(s), found {}",
                    parameters.len(),
                    arguments.len()
                ),
            );
        }
        for (&parameter, argument) in parameters.iter().zip(arguments) {
            let ty = self.expect_type(argument.value, parameter);
            self.require_resource_rvalue(argument.value, ty);
        }
    }
}
