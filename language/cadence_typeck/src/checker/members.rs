//! Member access resolution and access-control enforcement.
//!
//! Covers composite fields and functions, restricted-type member
//! narrowing, the builtin members of arrays, dictionaries, strings,
//! capabilities, and enums, and nested-type access on contracts.

use cadence_diagnostic::ErrorCode;
use cadence_ir::{Access, CompositeKind, ExprId, ExprKind, Location, Name, Span};
use cadence_types::{TypeEntry, TypeId};

use crate::elaboration::MemberInfo;

use super::Checker;

impl Checker<'_> {
    /// Check a `base.name` expression, returning its type.
    pub(crate) fn check_member_expr(
        &mut self,
        expr_id: ExprId,
        base: ExprId,
        name: Name,
        span: Span,
    ) -> TypeId {
        let base_ty = self.check_expr(base, None);
        if base_ty == TypeId::INVALID {
            return TypeId::INVALID;
        }

        // `EnumType.case` and `Contract.NestedType`: the base names a type.
        if let Some(&referenced) = self.type_references.get(&base) {
            if let Some(ty) = self.type_member(referenced, name, span) {
                return ty;
            }
        }

        // References auto-dereference for member reads.
        let effective = self.deref(base_ty);

        match self.pool.entry(effective).clone() {
            TypeEntry::Composite(cid) => {
                self.composite_member(expr_id, base, effective, cid, name, span)
            }
            TypeEntry::Restricted { interfaces, .. } => {
                // A restricted type exposes only the members the listed
                // interfaces declare.
                for iid in interfaces {
                    let data = self.pool.interface_data(iid);
                    if let Some(field) = data.field(name) {
                        let info = MemberInfo {
                            owner: effective,
                            ty: field.ty,
                            access: field.access,
                            field_kind: Some(field.kind),
                        };
                        self.elaboration.member_info.insert(expr_id, info);
                        return field.ty;
                    }
                    if let Some(function) = data.function(name) {
                        let info = MemberInfo {
                            owner: effective,
                            ty: function.ty,
                            access: function.access,
                            field_kind: None,
                        };
                        self.elaboration.member_info.insert(expr_id, info);
                        return function.ty;
                    }
                }
                self.unknown_member(effective, name, span)
            }
            TypeEntry::VariableArray(element) | TypeEntry::ConstantArray { element, .. } => {
                self.array_member(element, name, span)
            }
            TypeEntry::Dictionary { key, value } => self.dictionary_member(key, value, name, span),
            TypeEntry::Primitive(cadence_types::Primitive::String) => {
                self.string_member(name, span)
            }
            TypeEntry::Capability { borrow } => self.capability_member(borrow, name, span),
            _ => self.unknown_member(effective, name, span),
        }
    }

    /// Strip one reference layer; reads reach through references.
    pub(crate) fn deref(&self, ty: TypeId) -> TypeId {
        match self.pool.entry(ty) {
            TypeEntry::Reference { referenced, .. } => *referenced,
            _ => ty,
        }
    }

    /// Member access where the base is a type name, not a value.
    fn type_member(&mut self, referenced: TypeId, name: Name, span: Span) -> Option<TypeId> {
        let cid = self.pool.as_composite(referenced)?;
        let data = self.pool.composite_data(cid);
        match data.kind {
            CompositeKind::Enum => {
                if data.case_names.contains(&name) {
                    Some(referenced)
                } else {
                    Some(self.unknown_member(referenced, name, span))
                }
            }
            _ => None,
        }
    }

    fn composite_member(
        &mut self,
        expr_id: ExprId,
        base: ExprId,
        owner: TypeId,
        cid: cadence_types::CompositeId,
        name: Name,
        span: Span,
    ) -> TypeId {
        let data = self.pool.composite_data(cid);

        // Enum instances expose their raw value.
        if data.kind == CompositeKind::Enum && name == self.names.raw_value {
            return data.raw_type.unwrap_or(TypeId::INVALID);
        }

        if let Some(field) = data.field(name) {
            let info = MemberInfo {
                owner,
                ty: field.ty,
                access: field.access,
                field_kind: Some(field.kind),
            };
            let (ty, access) = (field.ty, field.access);
            self.elaboration.member_info.insert(expr_id, info);
            self.check_read_access(access, owner, base, name, span);
            return ty;
        }
        if let Some(function) = data.function(name) {
            let info = MemberInfo {
                owner,
                ty: function.ty,
                access: function.access,
                field_kind: None,
            };
            let (ty, access) = (function.ty, function.access);
            self.elaboration.member_info.insert(expr_id, info);
            self.check_read_access(access, owner, base, name, span);
            return ty;
        }

        // Contracts expose nested declarations: `C.Foo`.
        if data.kind == CompositeKind::Contract {
            let contract_name = data.name;
            let qualified = self.qualified(contract_name, name);
            let location = data.location.clone();
            if let Some(nested) = self.pool.lookup_nominal(&location, qualified) {
                self.type_references.insert(expr_id, nested);
                return nested;
            }
        }

        self.unknown_member(owner, name, span)
    }

    fn array_member(&mut self, element: TypeId, name: Name, span: Span) -> TypeId {
        let n = &self.names;
        if name == n.length {
            return TypeId::INT;
        }
        if name == n.append {
            return self.pool.function(vec![element], TypeId::VOID);
        }
        if name == n.concat {
            let array = self.pool.variable_array(element);
            return self.pool.function(vec![array], array);
        }
        if name == n.contains {
            return self.pool.function(vec![element], TypeId::BOOL);
        }
        if name == n.remove {
            return self.pool.function(vec![TypeId::INT], element);
        }
        if name == n.insert {
            return self.pool.function(vec![TypeId::INT, element], TypeId::VOID);
        }
        let array = self.pool.variable_array(element);
        self.unknown_member(array, name, span)
    }

    fn dictionary_member(&mut self, key: TypeId, value: TypeId, name: Name, span: Span) -> TypeId {
        let n = &self.names;
        if name == n.length {
            return TypeId::INT;
        }
        if name == n.keys {
            return self.pool.variable_array(key);
        }
        if name == n.values {
            return self.pool.variable_array(value);
        }
        if name == n.insert {
            let optional_value = self.pool.optional(value);
            return self.pool.function(vec![key, value], optional_value);
        }
        if name == n.remove {
            let optional_value = self.pool.optional(value);
            return self.pool.function(vec![key], optional_value);
        }
        if name == n.contains_key {
            return self.pool.function(vec![key], TypeId::BOOL);
        }
        let dict = self.pool.dictionary(key, value);
        self.unknown_member(dict, name, span)
    }

    fn string_member(&mut self, name: Name, span: Span) -> TypeId {
        let n = &self.names;
        if name == n.length {
            return TypeId::INT;
        }
        if name == n.concat {
            return self.pool.function(vec![TypeId::STRING], TypeId::STRING);
        }
        if name == self.interner.intern("utf8") {
            return self.pool.variable_array(TypeId::UINT8);
        }
        self.unknown_member(TypeId::STRING, name, span)
    }

    fn capability_member(&mut self, borrow: TypeId, name: Name, span: Span) -> TypeId {
        let n = &self.names;
        if name == n.borrow {
            let optional = self.pool.optional(borrow);
            return self.pool.function(vec![], optional);
        }
        if name == n.check {
            return self.pool.function(vec![], TypeId::BOOL);
        }
        if name == n.address {
            return TypeId::ADDRESS;
        }
        let capability = self.pool.capability(borrow);
        self.unknown_member(capability, name, span)
    }

    fn unknown_member(&mut self, owner: TypeId, name: Name, span: Span) -> TypeId {
        self.report(
            ErrorCode::C1001,
            span,
            format!(
                "`{}` has no member `{}`",
                self.display(owner),
                self.interner.lookup(name)
            ),
        );
        TypeId::INVALID
    }

    /// Whether an expression is the `self` identifier.
    pub(crate) fn is_self_expr(&self, expr: ExprId) -> bool {
        matches!(
            self.program.arena.expr(expr).kind,
            ExprKind::Identifier(name) if name == self.names.self_
        )
    }

    /// Enforce read access on a resolved composite member.
    fn check_read_access(
        &mut self,
        access: Access,
        owner: TypeId,
        base: ExprId,
        name: Name,
        span: Span,
    ) {
        if self.may_access(access, owner, base) {
            return;
        }
        self.report(
            ErrorCode::C4001,
            span,
            format!(
                "member `{}` has {} access",
                self.interner.lookup(name),
                access
            ),
        );
    }

    pub(crate) fn may_access(&self, access: Access, owner: TypeId, base: ExprId) -> bool {
        if self.is_self_expr(base) || Some(owner) == self.current_composite {
            return true;
        }
        match access {
            Access::Public => true,
            Access::SelfOnly => false,
            Access::Contract => self.in_same_contract(owner),
            Access::Account => self.in_same_account(owner),
        }
    }

    /// Whether the code being checked lives in the same contract as the
    /// owner type (the contract itself or a declaration nested in it).
    fn in_same_contract(&self, owner: TypeId) -> bool {
        let Some(contract) = self.current_contract else {
            return false;
        };
        let Some(cid) = self.pool.as_composite(owner) else {
            return false;
        };
        let data = self.pool.composite_data(cid);
        if data.location != self.program.location {
            return false;
        }
        if data.name == contract {
            return true;
        }
        let owner_name = self.interner.lookup(data.name);
        let prefix = format!("{}.", self.interner.lookup(contract));
        owner_name.starts_with(&prefix)
    }

    fn in_same_account(&self, owner: TypeId) -> bool {
        let Some(cid) = self.pool.as_composite(owner) else {
            return false;
        };
        let owner_location = &self.pool.composite_data(cid).location;
        match (&self.program.location, owner_location) {
            (
                Location::AddressContract { address: a, .. },
                Location::AddressContract { address: b, .. },
            ) => a == b,
            (a, b) => a == b,
        }
    }

    /// The external-mutation rule: a container reached through a member
    /// access may only be mutated by its owning composite's own code or
    /// through an authorized reference.
    ///
    /// `container` is the expression the mutation applies to (the indexed
    /// base or the receiver of a mutating member function). Applies
    /// recursively: `self.a.b[0] = v` mutates a container owned by the
    /// type of `self.a`, not by `self`.
    pub(crate) fn check_container_mutation(&mut self, container: ExprId, span: Span) {
        let container_expr = self.program.arena.expr(container);
        match &container_expr.kind {
            ExprKind::Member { base, .. } => {
                let base = *base;
                if self.is_self_expr(base) {
                    return;
                }
                // Mutation through an authorized reference is the owner
                // delegating mutability.
                let base_ty = self.elaboration.expr_type(base);
                if matches!(
                    self.pool.entry(base_ty),
                    TypeEntry::Reference {
                        authorized: true,
                        ..
                    }
                ) {
                    return;
                }
                self.report(
                    ErrorCode::C4002,
                    span,
                    "cannot mutate a container owned by another value".to_string(),
                );
            }
            // Direct mutation through a reference requires authorization.
            _ => {
                let ty = self.elaboration.expr_type(container);
                if matches!(
                    self.pool.entry(ty),
                    TypeEntry::Reference {
                        authorized: false,
                        ..
                    }
                ) {
                    self.report(
                        ErrorCode::C4002,
                        span,
                        "cannot mutate through a non-auth reference".to_string(),
                    );
                }
            }
        }
    }
}
