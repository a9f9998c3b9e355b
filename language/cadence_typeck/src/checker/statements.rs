//! Statement and function body checking.

use cadence_diagnostic::ErrorCode;
use cadence_ir::{
    Block, CompositeDeclaration, CompositeKind, ConditionKind, Declaration, ExprId, ExprKind,
    FunctionDeclaration, Name, SpecialFunction, Span, StmtId, StmtKind, Transfer, VariableKind,
};
use cadence_types::{TypeEntry, TypeId};

use crate::elaboration::FunctionKey;
use crate::resources::ResourceState;

use super::expressions::InvocationContext;
use super::Checker;

impl Checker<'_> {
    /// Phase 2: walk every function body.
    pub(crate) fn elaborate_bodies(&mut self) {
        let program = self.program;
        for declaration in &program.declarations {
            match declaration {
                Declaration::Function(decl) => {
                    self.check_function(decl, FunctionKey::global(decl.name), None);
                }
                Declaration::Composite(decl) => self.check_composite_bodies(decl, None),
                Declaration::Interface(decl) => self.check_interface_bodies(decl),
            }
        }
    }

    fn check_composite_bodies(&mut self, decl: &CompositeDeclaration, outer: Option<Name>) {
        let name = match outer {
            Some(outer) => self.qualified(outer, decl.name),
            None => decl.name,
        };
        let Some(self_ty) = self.resolve_nominal(name) else {
            return;
        };

        let saved_composite = self.current_composite.replace(self_ty);
        let saved_contract = self.current_contract;
        if decl.kind == CompositeKind::Contract {
            self.current_contract = Some(decl.name);
        } else if outer.is_some() {
            self.current_contract = outer;
        }

        if let Some(init) = &decl.initializer {
            self.check_initializer(decl, init, self_ty);
        }
        if let Some(destructor) = &decl.destructor {
            self.check_destructor(destructor);
        }
        for function in &decl.functions {
            self.check_function(function, FunctionKey::member(name, function.name), Some(self_ty));
        }
        if decl.kind == CompositeKind::Contract {
            for nested in &decl.nested_composites {
                self.check_composite_bodies(nested, Some(decl.name));
            }
        }

        self.current_composite = saved_composite;
        self.current_contract = saved_contract;
    }

    fn check_interface_bodies(&mut self, decl: &cadence_ir::InterfaceDeclaration) {
        let Some(self_ty) = self.resolve_nominal(decl.name) else {
            return;
        };
        let saved = self.current_composite.replace(self_ty);
        for function in &decl.functions {
            if function.body.is_some() {
                self.check_function(
                    function,
                    FunctionKey::member(decl.name, function.name),
                    Some(self_ty),
                );
            }
        }
        self.current_composite = saved;
    }

    fn check_initializer(
        &mut self,
        decl: &CompositeDeclaration,
        init: &SpecialFunction,
        _self_ty: TypeId,
    ) {
        self.in_initializer = true;
        self.initialized_fields.clear();

        self.activations.push();
        self.resources.push();
        self.declare_parameters(&init.parameters);
        self.check_block_statements(&init.body);
        self.finish_scope(init.span);
        self.in_initializer = false;

        // Every field must be assigned by the initializer.
        let field_names: Vec<(Name, Span)> = decl.fields.iter().map(|f| (f.name, f.span)).collect();
        for (field, span) in field_names {
            if !self.initialized_fields.contains(&field) {
                self.report(
                    ErrorCode::C1006,
                    span,
                    format!(
                        "field `{}` is not initialized",
                        self.interner.lookup(field)
                    ),
                );
            }
        }
    }

    fn check_destructor(&mut self, destructor: &SpecialFunction) {
        self.activations.push();
        self.resources.push();
        self.check_block_statements(&destructor.body);
        self.finish_scope(destructor.span);
    }

    pub(crate) fn check_function(
        &mut self,
        decl: &FunctionDeclaration,
        key: FunctionKey,
        self_ty: Option<TypeId>,
    ) {
        let Some(body) = &decl.body else {
            return;
        };

        let return_type = decl
            .return_type
            .as_ref()
            .map_or(TypeId::VOID, |annotation| self.resolve_annotation(annotation));

        let saved_return = self.current_return_type.replace(return_type);
        let saved_function = self.current_function.replace(key);
        let saved_composite = match self_ty {
            Some(ty) => self.current_composite.replace(ty),
            None => self.current_composite,
        };

        self.activations.push();
        self.resources.push();
        self.declare_parameters(&decl.parameters);

        self.condition_context = Some(ConditionKind::Pre);
        for condition in &decl.preconditions {
            self.check_condition(condition);
        }
        self.condition_context = None;

        let exits = self.check_block_statements(body);

        self.condition_context = Some(ConditionKind::Post);
        if !decl.postconditions.is_empty() {
            // Postconditions see the returned value as `result`.
            self.activations.push();
            if return_type != TypeId::VOID {
                let result = self.names.result;
                self.activations.declare(result, return_type, VariableKind::Let);
            }
            for condition in &decl.postconditions {
                self.check_condition(condition);
            }
            self.activations.pop();
        }
        self.condition_context = None;

        self.finish_scope(decl.span);

        if !exits && return_type != TypeId::VOID && return_type != TypeId::INVALID {
            self.report(
                ErrorCode::C2011,
                decl.span,
                format!(
                    "missing return of `{}` on some paths",
                    self.display(return_type)
                ),
            );
        }

        self.current_return_type = saved_return;
        self.current_function = saved_function;
        self.current_composite = saved_composite;
    }

    fn check_condition(&mut self, condition: &cadence_ir::Condition) {
        let span = self.program.arena.expr(condition.expr).span;
        let ty = self.check_expr(condition.expr, Some(TypeId::BOOL));
        if !self.pool.is_assignable(ty, TypeId::BOOL) {
            self.report(
                ErrorCode::C2009,
                span,
                format!("condition must be `Bool`, found `{}`", self.display(ty)),
            );
        }
        if let Some(message) = condition.message {
            let message_ty = self.check_expr(message, Some(TypeId::STRING));
            if !self.pool.is_assignable(message_ty, TypeId::STRING) {
                let span = self.program.arena.expr(message).span;
                self.report(
                    ErrorCode::C2009,
                    span,
                    format!(
                        "condition message must be `String`, found `{}`",
                        self.display(message_ty)
                    ),
                );
            }
        }
    }

    fn declare_parameters(&mut self, parameters: &[cadence_ir::Parameter]) {
        for parameter in parameters {
            let ty = self.resolve_annotation(&parameter.type_annotation);
            if !self
                .activations
                .declare(parameter.name, ty, VariableKind::Let)
            {
                self.report(
                    ErrorCode::C1002,
                    parameter.span,
                    format!(
                        "parameter `{}` is already declared",
                        self.interner.lookup(parameter.name)
                    ),
                );
            }
            if self.pool.is_resource(ty) {
                self.resources.declare(parameter.name);
                self.resource_spans.insert(parameter.name, parameter.span);
            }
        }
    }

    /// Pop the current activation and report resource losses.
    fn finish_scope(&mut self, fallback_span: Span) {
        self.activations.pop();
        let lost = self.resources.pop();
        for name in lost {
            let span = self
                .resource_spans
                .get(&name)
                .copied()
                .unwrap_or(fallback_span);
            self.report(
                ErrorCode::C3001,
                span,
                format!(
                    "resource `{}` is neither moved nor destroyed",
                    self.interner.lookup(name)
                ),
            );
        }
    }

    /// Check the statements of a block in a fresh scope. Returns whether
    /// the block definitely exits (every path returns or aborts).
    pub(crate) fn check_block(&mut self, block: &Block, span: Span) -> bool {
        self.activations.push();
        self.resources.push();
        let exits = self.check_block_statements(block);
        self.finish_scope(span);
        exits
    }

    fn check_block_statements(&mut self, block: &Block) -> bool {
        let mut exits = false;
        for &stmt in &block.statements {
            exits |= self.check_stmt(stmt);
        }
        exits
    }

    /// Returns whether the statement definitely exits the function.
    fn check_stmt(&mut self, id: StmtId) -> bool {
        let stmt = self.program.arena.stmt(id).clone();
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::VariableDeclaration {
                kind,
                name,
                type_annotation,
                transfer,
                value,
            } => {
                self.check_variable_declaration(
                    id,
                    *kind,
                    *name,
                    type_annotation.as_ref(),
                    *transfer,
                    *value,
                    span,
                );
                false
            }
            StmtKind::Assignment {
                target,
                transfer,
                value,
            } => {
                self.check_assignment(*target, *transfer, *value, span);
                false
            }
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                self.expect_type(*condition, TypeId::BOOL);

                let before = self.resources.snapshot();
                let then_exits = self.check_block(then_block, span);
                let then_states = self.resources.snapshot();

                self.resources.restore(before.clone());
                let else_exits = match else_block {
                    Some(block) => self.check_block(block, span),
                    None => false,
                };
                let else_states = self.resources.snapshot();

                let disagreements =
                    self.resources
                        .join(then_states, else_states, then_exits, else_exits);
                for name in disagreements {
                    self.report(
                        ErrorCode::C3007,
                        span,
                        format!(
                            "branches leave resource `{}` in different states",
                            self.interner.lookup(name)
                        ),
                    );
                }
                then_exits && else_exits
            }
            StmtKind::While { condition, block } => {
                self.expect_type(*condition, TypeId::BOOL);
                let before = self.resources.snapshot();
                self.check_block(block, span);
                // A resource declared outside the loop must not change
                // state inside it: the next iteration would observe a
                // moved slot.
                let after = self.resources.snapshot();
                for (before_scope, after_scope) in before.iter().zip(&after) {
                    for (&name, &before_state) in before_scope {
                        let after_state = after_scope.get(&name).copied().unwrap_or(before_state);
                        if before_state == ResourceState::Owned
                            && after_state != ResourceState::Owned
                        {
                            self.report(
                                ErrorCode::C3008,
                                span,
                                format!(
                                    "resource `{}` is consumed inside a loop",
                                    self.interner.lookup(name)
                                ),
                            );
                        }
                    }
                }
                false
            }
            StmtKind::Return { value } => {
                self.check_return(*value, span);
                true
            }
            StmtKind::Destroy { expr } => {
                self.check_destroy(*expr, span);
                false
            }
            StmtKind::Emit { invocation } => {
                self.check_emit(*invocation, span);
                false
            }
            StmtKind::Expression { expr } => {
                let ty = self.check_expr(*expr, None);
                if self.pool.is_resource(ty) {
                    self.report(
                        ErrorCode::C3001,
                        span,
                        "resource result of this expression is lost".to_string(),
                    );
                }
                // `panic(...)` and other `Never` results end the path.
                ty == TypeId::NEVER
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_variable_declaration(
        &mut self,
        id: StmtId,
        kind: VariableKind,
        name: Name,
        type_annotation: Option<&cadence_ir::TypeAnnotation>,
        transfer: Transfer,
        value: ExprId,
        span: Span,
    ) {
        let annotated = type_annotation.map(|annotation| self.resolve_annotation(annotation));
        let value_ty = self.check_expr(value, annotated);
        let ty = annotated.unwrap_or(value_ty);

        if !self.pool.is_assignable(value_ty, ty) {
            self.report(
                ErrorCode::C2003,
                span,
                format!(
                    "cannot bind `{}` to `{}`",
                    self.display(value_ty),
                    self.display(ty)
                ),
            );
        }
        self.check_transfer(transfer, value, value_ty, span);

        if !self.activations.declare(name, ty, kind) {
            self.report(
                ErrorCode::C1002,
                span,
                format!("`{}` is already declared", self.interner.lookup(name)),
            );
            return;
        }
        self.elaboration.variable_types.insert(id, ty);
        if self.pool.is_resource(ty) {
            self.resources.declare(name);
            self.resource_spans.insert(name, span);
        }
    }

    /// Transfer discipline: resources move, non-resources copy. A moved
    /// identifier source transitions to the moved state.
    fn check_transfer(&mut self, transfer: Transfer, value: ExprId, value_ty: TypeId, span: Span) {
        let is_resource = self.pool.is_resource(value_ty);
        match (transfer, is_resource) {
            (Transfer::Copy, true) => self.report(
                ErrorCode::C3005,
                span,
                "resource requires the move operator `<-`".to_string(),
            ),
            (Transfer::Move, false) if value_ty != TypeId::INVALID => self.report(
                ErrorCode::C3004,
                span,
                format!("cannot move non-resource `{}`", self.display(value_ty)),
            ),
            (Transfer::Move, true) => {
                if let ExprKind::Identifier(source) = self.program.arena.expr(value).kind {
                    if self.resources.state(source) == Some(ResourceState::Owned) {
                        self.resources.transition(source, ResourceState::Moved);
                    }
                }
            }
            _ => {}
        }
    }

    fn check_assignment(&mut self, target: ExprId, transfer: Transfer, value: ExprId, span: Span) {
        let target_kind = self.program.arena.expr(target).kind.clone();
        match &target_kind {
            ExprKind::Identifier(name) => {
                let name = *name;
                let Some(variable) = self.activations.lookup(name) else {
                    self.report(
                        ErrorCode::C1001,
                        span,
                        format!("cannot find `{}` in this scope", self.interner.lookup(name)),
                    );
                    self.check_expr(value, None);
                    return;
                };
                let (ty, var_kind) = (variable.ty, variable.kind);
                if var_kind == VariableKind::Let {
                    self.report(
                        ErrorCode::C4003,
                        span,
                        format!("cannot assign to `let` binding `{}`", self.interner.lookup(name)),
                    );
                }
                // Overwriting a live resource would lose it.
                if self.resources.state(name) == Some(ResourceState::Owned) {
                    self.report(
                        ErrorCode::C3001,
                        span,
                        format!(
                            "assignment would lose the resource in `{}`",
                            self.interner.lookup(name)
                        ),
                    );
                }
                let value_ty = self.check_expr(value, Some(ty));
                if !self.pool.is_assignable(value_ty, ty) {
                    self.report(
                        ErrorCode::C2003,
                        span,
                        format!(
                            "cannot assign `{}` to `{}`",
                            self.display(value_ty),
                            self.display(ty)
                        ),
                    );
                }
                self.check_transfer(transfer, value, value_ty, span);
                if self.pool.is_resource(ty) {
                    self.resources.transition(name, ResourceState::Owned);
                }
                self.elaboration.expr_types.insert(target, ty);
            }
            ExprKind::Member { base, name } => {
                self.check_member_assignment(target, *base, *name, transfer, value, span);
            }
            ExprKind::Index { base, index } => {
                // Mutating a container slot: external-mutation discipline
                // applies to the container expression.
                let element_ty = self.check_index_target(*base, *index, span);
                self.check_container_mutation(*base, span);
                let value_ty = self.check_expr(value, Some(element_ty));
                if !self.pool.is_assignable(value_ty, element_ty) {
                    self.report(
                        ErrorCode::C2003,
                        span,
                        format!(
                            "cannot assign `{}` to `{}`",
                            self.display(value_ty),
                            self.display(element_ty)
                        ),
                    );
                }
                self.check_transfer(transfer, value, value_ty, span);
            }
            _ => {
                self.report(
                    ErrorCode::C2003,
                    span,
                    "invalid assignment target".to_string(),
                );
                self.check_expr(value, None);
            }
        }
    }

    /// The element type a `base[index]` assignment writes. Unlike a read,
    /// a dictionary write takes the plain value type.
    fn check_index_target(&mut self, base: ExprId, index: ExprId, span: Span) -> TypeId {
        let base_ty = self.check_expr(base, None);
        let effective = self.deref(base_ty);
        match self.pool.entry(effective).clone() {
            TypeEntry::VariableArray(element) | TypeEntry::ConstantArray { element, .. } => {
                self.check_expr(index, Some(TypeId::INT));
                element
            }
            TypeEntry::Dictionary { key, value } => {
                self.expect_type(index, key);
                value
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

    fn check_member_assignment(
        &mut self,
        target: ExprId,
        base: ExprId,
        name: Name,
        transfer: Transfer,
        value: ExprId,
        span: Span,
    ) {
        let member_ty = self.check_member_expr(target, base, name, span);
        self.elaboration.expr_types.insert(target, member_ty);

        // Fields are assignable only by their own composite's code. For
        // contract fields, any code in the same contract qualifies.
        let base_is_self = self.is_self_expr(base);
        let base_ty = self.deref(self.elaboration.expr_type(base));
        let in_own_contract = self
            .current_contract
            .and_then(|contract| self.resolve_nominal(contract))
            .is_some_and(|contract_ty| contract_ty == base_ty);
        if !base_is_self && !in_own_contract {
            self.report(
                ErrorCode::C4001,
                span,
                format!(
                    "field `{}` can only be assigned by its owner",
                    self.interner.lookup(name)
                ),
            );
        }

        if let Some(info) = self.elaboration.member_info.get(&target) {
            if info.field_kind == Some(VariableKind::Let) && !self.in_initializer {
                self.report(
                    ErrorCode::C4003,
                    span,
                    format!(
                        "cannot assign to `let` field `{}` outside the initializer",
                        self.interner.lookup(name)
                    ),
                );
            }
        }

        if self.in_initializer && base_is_self {
            self.initialized_fields.push(name);
        }

        let value_ty = self.check_expr(value, Some(member_ty));
        if !self.pool.is_assignable(value_ty, member_ty) {
            self.report(
                ErrorCode::C2003,
                span,
                format!(
                    "cannot assign `{}` to `{}`",
                    self.display(value_ty),
                    self.display(member_ty)
                ),
            );
        }
        self.check_transfer(transfer, value, value_ty, span);
    }

    fn check_return(&mut self, value: Option<ExprId>, span: Span) {
        let return_type = self.current_return_type.unwrap_or(TypeId::VOID);
        match value {
            Some(value) => {
                let ty = self.check_expr(value, Some(return_type));
                if return_type == TypeId::VOID {
                    self.report(
                        ErrorCode::C2011,
                        span,
                        "this function does not return a value".to_string(),
                    );
                } else if !self.pool.is_assignable(ty, return_type) {
                    self.report(
                        ErrorCode::C2011,
                        span,
                        format!(
                            "expected `{}`, found `{}`",
                            self.display(return_type),
                            self.display(ty)
                        ),
                    );
                }
                self.require_resource_rvalue(value, ty);
            }
            None => {
                if return_type != TypeId::VOID && return_type != TypeId::INVALID {
                    self.report(
                        ErrorCode::C2011,
                        span,
                        format!("expected a `{}` return value", self.display(return_type)),
                    );
                }
            }
        }

        // Returning with a live resource anywhere in the function loses it.
        for name in self.resources.owned_anywhere() {
            let resource_span = self.resource_spans.get(&name).copied().unwrap_or(span);
            self.report(
                ErrorCode::C3001,
                resource_span,
                format!(
                    "resource `{}` is neither moved nor destroyed before this return",
                    self.interner.lookup(name)
                ),
            );
        }
    }

    fn check_destroy(&mut self, expr: ExprId, span: Span) {
        let ty = self.check_expr(expr, None);
        if ty != TypeId::INVALID && !self.pool.is_resource(ty) {
            self.report(
                ErrorCode::C3010,
                span,
                format!("cannot destroy non-resource `{}`", self.display(ty)),
            );
            return;
        }
        if let ExprKind::Identifier(name) = self.program.arena.expr(expr).kind {
            if self.resources.state(name).is_some() {
                self.resources.transition(name, ResourceState::Destroyed);
            }
        }
    }

    fn check_emit(&mut self, invocation: ExprId, span: Span) {
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
                "`emit` requires an event invocation".to_string(),
            );
            return;
        };
        let ty = self.check_invocation(
            invocation,
            *callee,
            type_arguments,
            arguments,
            expr.span,
            InvocationContext::Emit,
        );
        self.elaboration.expr_types.insert(invocation, ty);
        let is_event = self
            .pool
            .as_composite(ty)
            .map(|cid| self.pool.composite_data(cid).kind == CompositeKind::Event)
            .unwrap_or(false);
        if ty != TypeId::INVALID && !is_event {
            self.report(
                ErrorCode::C2013,
                span,
                format!("`emit` requires an event, found `{}`", self.display(ty)),
            );
        }
    }
}
