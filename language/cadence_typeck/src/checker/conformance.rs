//! Finalization: conformance witnesses and whole-declaration checks.

use cadence_diagnostic::ErrorCode;
use cadence_ir::{CompositeDeclaration, CompositeKind, Declaration, Name};
use cadence_types::TypeId;

use super::Checker;

impl Checker<'_> {
    /// Phase 3: checks that need the fully elaborated program.
    pub(crate) fn finalize(&mut self) {
        let program = self.program;
        for declaration in &program.declarations {
            if let Declaration::Composite(decl) = declaration {
                self.finalize_composite(decl, None);
            }
        }
    }

    fn finalize_composite(&mut self, decl: &CompositeDeclaration, outer: Option<Name>) {
        let name = match outer {
            Some(outer) => self.qualified(outer, decl.name),
            None => decl.name,
        };
        let Some(ty) = self.resolve_nominal(name) else {
            return;
        };
        let Some(cid) = self.pool.as_composite(ty) else {
            return;
        };

        // Composites with fields need an initializer to establish them.
        let needs_initializer = !decl.fields.is_empty()
            && decl.initializer.is_none()
            && !matches!(decl.kind, CompositeKind::Event | CompositeKind::Enum);
        if needs_initializer {
            self.report(
                ErrorCode::C1004,
                decl.span,
                format!(
                    "`{}` has fields and needs an initializer",
                    self.interner.lookup(decl.name)
                ),
            );
        }

        let conformances = self.pool.composite_data(cid).conformances.clone();
        for iid in conformances {
            self.check_conformance(decl, ty, cid, iid);
        }

        if decl.kind == CompositeKind::Contract {
            for nested in &decl.nested_composites {
                self.finalize_composite(nested, Some(decl.name));
            }
        }
    }

    /// Witness a declared conformance member by member.
    ///
    /// Field types are invariant. Function signatures relate by function
    /// subtyping (contravariant parameters, covariant return). Access may
    /// not narrow.
    fn check_conformance(
        &mut self,
        decl: &CompositeDeclaration,
        composite_ty: TypeId,
        cid: cadence_types::CompositeId,
        iid: cadence_types::InterfaceId,
    ) {
        let interface = self.pool.interface_data(iid).clone();
        let interface_name = self.interner.lookup(interface.name);

        for required in &interface.fields {
            let Some(field) = self.pool.composite_data(cid).field(required.name).cloned() else {
                self.report(
                    ErrorCode::C5001,
                    decl.span,
                    format!(
                        "`{}` is missing field `{}` required by `{interface_name}`",
                        self.interner.lookup(decl.name),
                        self.interner.lookup(required.name),
                    ),
                );
                continue;
            };
            if field.ty != required.ty
                && field.ty != TypeId::INVALID
                && required.ty != TypeId::INVALID
            {
                self.report(
                    ErrorCode::C5002,
                    decl.span,
                    format!(
                        "field `{}` is `{}`, but `{interface_name}` requires `{}`",
                        self.interner.lookup(required.name),
                        self.display(field.ty),
                        self.display(required.ty),
                    ),
                );
            }
            if !field.access.is_at_least_as_permissive(required.access) {
                self.report(
                    ErrorCode::C5003,
                    decl.span,
                    format!(
                        "field `{}` is {}, but `{interface_name}` declares {}",
                        self.interner.lookup(required.name),
                        field.access,
                        required.access,
                    ),
                );
            }
        }

        for required in &interface.functions {
            let member = self.pool.composite_data(cid).function(required.name).cloned();
            let Some(function) = member else {
                if interface.has_default(required.name) {
                    // The interface's default body stands in.
                    let interface_ty = self.interface_type_id(iid);
                    self.elaboration
                        .default_implementations
                        .insert((composite_ty, required.name), interface_ty);
                    continue;
                }
                self.report(
                    ErrorCode::C5001,
                    decl.span,
                    format!(
                        "`{}` is missing function `{}` required by `{interface_name}`",
                        self.interner.lookup(decl.name),
                        self.interner.lookup(required.name),
                    ),
                );
                continue;
            };
            if !self.pool.is_subtype(function.ty, required.ty)
                && function.ty != TypeId::INVALID
                && required.ty != TypeId::INVALID
            {
                self.report(
                    ErrorCode::C5002,
                    decl.span,
                    format!(
                        "function `{}` is `{}`, incompatible with `{}` from `{interface_name}`",
                        self.interner.lookup(required.name),
                        self.display(function.ty),
                        self.display(required.ty),
                    ),
                );
            }
            if !function.access.is_at_least_as_permissive(required.access) {
                self.report(
                    ErrorCode::C5003,
                    decl.span,
                    format!(
                        "function `{}` is {}, but `{interface_name}` declares {}",
                        self.interner.lookup(required.name),
                        function.access,
                        required.access,
                    ),
                );
            }
        }
    }

    /// The interned type id of an interface, for the elaboration table.
    fn interface_type_id(&mut self, iid: cadence_types::InterfaceId) -> TypeId {
        let data = self.pool.interface_data(iid);
        let (location, name) = (data.location.clone(), data.name);
        self.pool
            .lookup_nominal(&location, name)
            .unwrap_or(TypeId::INVALID)
    }
}
