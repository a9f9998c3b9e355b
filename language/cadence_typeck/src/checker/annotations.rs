//! Resolution of source type annotations to pool types.

use cadence_diagnostic::ErrorCode;
use cadence_ir::{Span, TypeAnnotation, TypeAnnotationKind};
use cadence_types::{TypeEntry, TypeId};

use super::Checker;

impl Checker<'_> {
    /// Resolve an annotation, enforcing the `@` resource marker at the
    /// outermost position: a resource-kinded type must carry it, a
    /// non-resource type must not.
    pub(crate) fn resolve_annotation(&mut self, annotation: &TypeAnnotation) -> TypeId {
        let ty = self.resolve_annotation_kind(&annotation.kind, annotation.span);
        if ty == TypeId::INVALID {
            return ty;
        }
        let is_resource = self.pool.is_resource(ty);
        if annotation.is_resource && !is_resource {
            self.report(
                ErrorCode::C3009,
                annotation.span,
                format!("`{}` is not a resource type", self.display(ty)),
            );
        } else if !annotation.is_resource && is_resource {
            self.report(
                ErrorCode::C3009,
                annotation.span,
                format!("resource type `{}` must be annotated with @", self.display(ty)),
            );
        }
        ty
    }

    /// Resolve a nested annotation without the marker check; inner
    /// positions (array elements, reference targets) carry no `@`.
    pub(crate) fn resolve_annotation_inner(&mut self, annotation: &TypeAnnotation) -> TypeId {
        self.resolve_annotation_kind(&annotation.kind, annotation.span)
    }

    fn resolve_annotation_kind(&mut self, kind: &TypeAnnotationKind, span: Span) -> TypeId {
        match kind {
            TypeAnnotationKind::Nominal(name) => {
                // Primitive names are reserved and resolve first.
                if let Some(&ty) = self.primitive_types.get(name) {
                    return ty;
                }
                // Inside a contract, nested declarations resolve
                // unqualified first.
                if let Some(contract) = self.current_contract {
                    let qualified = self.qualified(contract, *name);
                    if let Some(ty) = self.resolve_nominal(qualified) {
                        return ty;
                    }
                }
                if let Some(ty) = self.resolve_nominal(*name) {
                    return ty;
                }
                self.report(
                    ErrorCode::C2002,
                    span,
                    format!("unknown type `{}`", self.interner.lookup(*name)),
                );
                TypeId::INVALID
            }
            TypeAnnotationKind::Optional(inner) => {
                let inner = self.resolve_annotation_inner(inner);
                self.pool.optional(inner)
            }
            TypeAnnotationKind::VariableArray(element) => {
                let element = self.resolve_annotation_inner(element);
                self.pool.variable_array(element)
            }
            TypeAnnotationKind::ConstantArray { element, size } => {
                let element = self.resolve_annotation_inner(element);
                self.pool.constant_array(element, *size)
            }
            TypeAnnotationKind::Dictionary { key, value } => {
                let key_ty = self.resolve_annotation_inner(key);
                let value_ty = self.resolve_annotation_inner(value);
                if key_ty != TypeId::INVALID && !self.pool.is_hashable_key(key_ty) {
                    self.report(
                        ErrorCode::C2007,
                        key.span,
                        format!("`{}` cannot be a dictionary key", self.display(key_ty)),
                    );
                }
                self.pool.dictionary(key_ty, value_ty)
            }
            TypeAnnotationKind::Reference {
                authorized,
                referenced,
            } => {
                let referenced = self.resolve_annotation_inner(referenced);
                self.pool.reference(*authorized, referenced)
            }
            TypeAnnotationKind::Function {
                parameters,
                return_type,
            } => {
                let parameters = parameters
                    .iter()
                    .map(|p| self.resolve_annotation_inner(p))
                    .collect();
                let return_type = self.resolve_annotation_inner(return_type);
                self.pool.function(parameters, return_type)
            }
            TypeAnnotationKind::Restricted { base, interfaces } => {
                self.resolve_restricted(base.as_deref(), interfaces, span)
            }
            TypeAnnotationKind::Capability { borrow } => {
                let borrow_ty = self.resolve_annotation_inner(borrow);
                if borrow_ty != TypeId::INVALID
                    && !matches!(self.pool.entry(borrow_ty), TypeEntry::Reference { .. })
                {
                    self.report(
                        ErrorCode::C2008,
                        borrow.span,
                        format!(
                            "capability type must wrap a reference, found `{}`",
                            self.display(borrow_ty)
                        ),
                    );
                    return TypeId::INVALID;
                }
                self.pool.capability(borrow_ty)
            }
        }
    }

    fn resolve_restricted(
        &mut self,
        base: Option<&TypeAnnotation>,
        interfaces: &[cadence_ir::Name],
        span: Span,
    ) -> TypeId {
        let mut interface_ids = Vec::with_capacity(interfaces.len());
        let mut any_resource_interface = false;
        for &name in interfaces {
            let Some(ty) = self.resolve_nominal(name) else {
                self.report(
                    ErrorCode::C2002,
                    span,
                    format!("unknown type `{}`", self.interner.lookup(name)),
                );
                continue;
            };
            let Some(iid) = self.pool.as_interface(ty) else {
                self.report(
                    ErrorCode::C5004,
                    span,
                    format!("`{}` is not an interface", self.display(ty)),
                );
                continue;
            };
            any_resource_interface |= self.pool.interface_data(iid).kind.is_resource();
            interface_ids.push(iid);
        }

        let base_ty = match base {
            Some(annotation) => {
                let base_ty = self.resolve_annotation_inner(annotation);
                // The base must satisfy every named restriction.
                if let Some(cid) = self.pool.as_composite(base_ty) {
                    for &iid in &interface_ids {
                        if !self.pool.conforms(cid, iid) {
                            let interface_name =
                                self.interner.lookup(self.pool.interface_data(iid).name);
                            self.report(
                                ErrorCode::C2016,
                                annotation.span,
                                format!(
                                    "`{}` does not conform to `{interface_name}`",
                                    self.display(base_ty)
                                ),
                            );
                        }
                    }
                }
                base_ty
            }
            // `{I, J}`: the base is the hierarchy top matching the
            // interfaces' kind.
            None if any_resource_interface => TypeId::ANY_RESOURCE,
            None => TypeId::ANY_STRUCT,
        };
        self.pool.restricted(base_ty, interface_ids)
    }
}
