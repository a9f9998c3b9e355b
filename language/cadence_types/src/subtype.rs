//! Subtyping, assignability, and least common supertypes.
//!
//! The relations operate over pool ids. Identity is interned, so the
//! reflexive case is a single integer comparison.

use crate::composite::{CompositeId, InterfaceId};
use crate::pool::TypePool;
use crate::ty::{TypeEntry, TypeId};

impl TypePool {
    /// The subtype relation.
    ///
    /// - every type is a subtype of itself
    /// - `Never <: T` for all `T`; `Never` is uninhabited
    /// - `T <: T?`, and `T? <: U?` iff `T <: U`
    /// - `AnyStruct` tops the non-resource hierarchy, `AnyResource` the
    ///   resource hierarchy; the two never cross
    /// - `&T <: &U` iff `T <: U`; `auth &T <: &T`, never the converse
    /// - arrays and dictionaries are invariant in their parameters
    /// - functions are contravariant in parameters, covariant in return
    /// - the invalid type relates to nothing (see [`TypePool::is_assignable`])
    pub fn is_subtype(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        if a == TypeId::INVALID || b == TypeId::INVALID {
            return false;
        }
        if a == TypeId::NEVER {
            return true;
        }

        // Optional target: T <: U? iff T <: U; T? <: U? iff T <: U.
        if let TypeEntry::Optional(inner_b) = self.entry(b) {
            let inner_b = *inner_b;
            return match self.entry(a) {
                TypeEntry::Optional(inner_a) => self.is_subtype(*inner_a, inner_b),
                _ => self.is_subtype(a, inner_b),
            };
        }

        // Hierarchy tops.
        if b == TypeId::ANY_STRUCT {
            return !self.is_resource(a);
        }
        if b == TypeId::ANY_RESOURCE {
            return self.is_resource(a);
        }

        // Path hierarchy: StoragePath and CapabilityPath sit under Path;
        // private and public paths under CapabilityPath.
        if b == TypeId::PATH {
            return matches!(
                a,
                TypeId::STORAGE_PATH
                    | TypeId::CAPABILITY_PATH
                    | TypeId::PRIVATE_PATH
                    | TypeId::PUBLIC_PATH
            );
        }
        if b == TypeId::CAPABILITY_PATH {
            return matches!(a, TypeId::PRIVATE_PATH | TypeId::PUBLIC_PATH);
        }

        match (self.entry(a), self.entry(b)) {
            (
                TypeEntry::Reference {
                    authorized: auth_a,
                    referenced: ref_a,
                },
                TypeEntry::Reference {
                    authorized: auth_b,
                    referenced: ref_b,
                },
            ) => {
                // Authorization is never implicitly added.
                if *auth_b && !*auth_a {
                    return false;
                }
                self.is_subtype(*ref_a, *ref_b)
            }

            (
                TypeEntry::Function {
                    parameters: params_a,
                    return_type: ret_a,
                },
                TypeEntry::Function {
                    parameters: params_b,
                    return_type: ret_b,
                },
            ) => {
                params_a.len() == params_b.len()
                    && params_b
                        .iter()
                        .zip(params_a.iter())
                        .all(|(&pb, &pa)| self.is_subtype(pb, pa))
                    && self.is_subtype(*ret_a, *ret_b)
            }

            (TypeEntry::Composite(cid), TypeEntry::Interface(iid)) => self.conforms(*cid, *iid),

            (TypeEntry::Composite(_), TypeEntry::Restricted { base, interfaces }) => {
                let (base, interfaces) = (*base, interfaces.clone());
                self.is_subtype(a, base)
                    && interfaces.iter().all(|&iid| {
                        self.as_composite(a)
                            .is_some_and(|cid| self.conforms(cid, iid))
                    })
            }

            (
                TypeEntry::Restricted {
                    base: base_a,
                    interfaces: ifs_a,
                },
                TypeEntry::Restricted {
                    base: base_b,
                    interfaces: ifs_b,
                },
            ) => {
                // T{I...} <: U{J...} iff T <: U and {J} ⊆ {I}: widening the
                // base is fine, the restriction set may only shrink.
                self.is_subtype(*base_a, *base_b)
                    && ifs_b.iter().all(|iid| ifs_a.contains(iid))
            }

            (TypeEntry::Capability { borrow: borrow_a }, TypeEntry::Capability { borrow: borrow_b }) => {
                self.is_subtype(*borrow_a, *borrow_b)
            }

            _ => false,
        }
    }

    /// Whether a composite declares conformance to an interface.
    pub fn conforms(&self, composite: CompositeId, interface: InterfaceId) -> bool {
        self.composite_data(composite)
            .conformances
            .contains(&interface)
    }

    /// Assignability: the subtype relation, with the invalid type
    /// assignable in both directions so one error does not cascade.
    pub fn is_assignable(&self, source: TypeId, target: TypeId) -> bool {
        if source == TypeId::INVALID || target == TypeId::INVALID {
            return true;
        }
        self.is_subtype(source, target)
    }

    /// The unique smallest type bounding the inputs.
    ///
    /// Falls back to `AnyStruct`/`AnyResource` per kind homogeneity; a set
    /// that crosses the struct/resource boundary yields the invalid type
    /// and the caller signals the error.
    pub fn least_common_supertype(&mut self, types: &[TypeId]) -> TypeId {
        let mut iter = types.iter().copied();
        let Some(mut result) = iter.next() else {
            return TypeId::NEVER;
        };
        for ty in iter {
            result = self.pair_supertype(result, ty);
            if result == TypeId::INVALID {
                break;
            }
        }
        result
    }

    fn pair_supertype(&mut self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        if a == TypeId::INVALID || b == TypeId::INVALID {
            return TypeId::INVALID;
        }
        if a == TypeId::NEVER {
            return b;
        }
        if b == TypeId::NEVER {
            return a;
        }
        if self.is_subtype(a, b) {
            return b;
        }
        if self.is_subtype(b, a) {
            return a;
        }

        // An optional on either side lifts the join of the inners.
        let inner_a = match self.entry(a) {
            TypeEntry::Optional(inner) => Some(*inner),
            _ => None,
        };
        let inner_b = match self.entry(b) {
            TypeEntry::Optional(inner) => Some(*inner),
            _ => None,
        };
        if inner_a.is_some() || inner_b.is_some() {
            let joined =
                self.pair_supertype(inner_a.unwrap_or(a), inner_b.unwrap_or(b));
            if joined == TypeId::INVALID {
                return TypeId::INVALID;
            }
            return self.optional(joined);
        }

        match (self.is_resource(a), self.is_resource(b)) {
            (true, true) => TypeId::ANY_RESOURCE,
            (false, false) => TypeId::ANY_STRUCT,
            _ => TypeId::INVALID,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_ir::{Access, CompositeKind, Location, SharedInterner, VariableKind};
    use proptest::prelude::*;

    use crate::composite::{CompositeData, FieldMember, InterfaceData};

    struct Fixture {
        pool: TypePool,
        resource: TypeId,
        structure: TypeId,
        interface: TypeId,
    }

    /// A resource `R` conforming to interface `I`, and a struct `S`.
    fn fixture() -> Fixture {
        let interner = SharedInterner::new();
        let mut pool = TypePool::new(interner.clone());

        let interface = pool.declare_interface(InterfaceData {
            location: Location::Script(0),
            name: interner.intern("I"),
            kind: CompositeKind::Resource,
            fields: vec![],
            functions: vec![],
            default_functions: Default::default(),
        });
        let iid = pool.as_interface(interface).unwrap();

        let resource = pool.declare_composite(CompositeData {
            location: Location::Script(0),
            name: interner.intern("R"),
            kind: CompositeKind::Resource,
            fields: vec![FieldMember {
                name: interner.intern("id"),
                access: Access::Public,
                kind: VariableKind::Let,
                ty: TypeId::UINT64,
            }],
            functions: vec![],
            conformances: vec![iid],
            raw_type: None,
            case_names: vec![],
        });

        let structure = pool.declare_composite(CompositeData {
            location: Location::Script(0),
            name: interner.intern("S"),
            kind: CompositeKind::Structure,
            fields: vec![],
            functions: vec![],
            conformances: vec![],
            raw_type: None,
            case_names: vec![],
        });

        Fixture {
            pool,
            resource,
            structure,
            interface,
        }
    }

    #[test]
    fn test_optional_subtyping() {
        let mut pool = TypePool::new(SharedInterner::new());
        let int_opt = pool.optional(TypeId::INT);
        assert!(pool.is_subtype(TypeId::INT, int_opt));
        assert!(!pool.is_subtype(int_opt, TypeId::INT));
        assert!(pool.is_subtype(int_opt, int_opt));

        let bool_opt = pool.optional(TypeId::BOOL);
        assert!(!pool.is_subtype(int_opt, bool_opt));
    }

    #[test]
    fn test_never_is_bottom() {
        let mut pool = TypePool::new(SharedInterner::new());
        let int_opt = pool.optional(TypeId::INT);
        assert!(pool.is_subtype(TypeId::NEVER, TypeId::INT));
        assert!(pool.is_subtype(TypeId::NEVER, int_opt));
        assert!(!pool.is_subtype(TypeId::INT, TypeId::NEVER));
    }

    #[test]
    fn test_hierarchies_never_cross() {
        let f = fixture();
        assert!(f.pool.is_subtype(f.resource, TypeId::ANY_RESOURCE));
        assert!(!f.pool.is_subtype(f.resource, TypeId::ANY_STRUCT));
        assert!(f.pool.is_subtype(f.structure, TypeId::ANY_STRUCT));
        assert!(!f.pool.is_subtype(f.structure, TypeId::ANY_RESOURCE));
        assert!(!f.pool.is_subtype(TypeId::ANY_RESOURCE, TypeId::ANY_STRUCT));
        assert!(!f.pool.is_subtype(TypeId::ANY_STRUCT, TypeId::ANY_RESOURCE));
    }

    #[test]
    fn test_auth_reference_strictly_stronger() {
        let mut pool = TypePool::new(SharedInterner::new());
        let auth_ref = pool.reference(true, TypeId::INT);
        let plain_ref = pool.reference(false, TypeId::INT);
        assert!(pool.is_subtype(auth_ref, plain_ref));
        assert!(!pool.is_subtype(plain_ref, auth_ref));
    }

    #[test]
    fn test_reference_covariant_in_referenced() {
        let mut pool = TypePool::new(SharedInterner::new());
        let int_opt = pool.optional(TypeId::INT);
        let ref_int = pool.reference(false, TypeId::INT);
        let ref_opt = pool.reference(false, int_opt);
        assert!(pool.is_subtype(ref_int, ref_opt));
        assert!(!pool.is_subtype(ref_opt, ref_int));
    }

    #[test]
    fn test_composite_conformance() {
        let f = fixture();
        assert!(f.pool.is_subtype(f.resource, f.interface));
        assert!(!f.pool.is_subtype(f.structure, f.interface));
    }

    #[test]
    fn test_restricted_subtyping() {
        let mut f = fixture();
        let iid = f.pool.as_interface(f.interface).unwrap();
        let restricted = f.pool.restricted(f.resource, vec![iid]);
        let any_restricted = f.pool.restricted(TypeId::ANY_RESOURCE, vec![iid]);
        let unrestricted_any = f.pool.restricted(TypeId::ANY_RESOURCE, vec![]);

        // Concrete restriction widens to an Any-based one.
        assert!(f.pool.is_subtype(restricted, any_restricted));
        // Dropping interfaces from the set is a widening too.
        assert!(f.pool.is_subtype(any_restricted, unrestricted_any));
        assert!(!f.pool.is_subtype(unrestricted_any, any_restricted));
        // A composite moves into a restricted type it satisfies.
        assert!(f.pool.is_subtype(f.resource, restricted));
        assert!(f.pool.is_subtype(f.resource, any_restricted));
    }

    #[test]
    fn test_function_variance() {
        let mut pool = TypePool::new(SharedInterner::new());
        let int_opt = pool.optional(TypeId::INT);
        // (Int?): Int  <:  (Int): Int?   (params contra, return co)
        let wide = pool.function(vec![int_opt], TypeId::INT);
        let narrow = pool.function(vec![TypeId::INT], int_opt);
        assert!(pool.is_subtype(wide, narrow));
        assert!(!pool.is_subtype(narrow, wide));
    }

    #[test]
    fn test_path_hierarchy() {
        let pool = TypePool::new(SharedInterner::new());
        assert!(pool.is_subtype(TypeId::STORAGE_PATH, TypeId::PATH));
        assert!(pool.is_subtype(TypeId::PUBLIC_PATH, TypeId::CAPABILITY_PATH));
        assert!(pool.is_subtype(TypeId::PUBLIC_PATH, TypeId::PATH));
        assert!(!pool.is_subtype(TypeId::STORAGE_PATH, TypeId::CAPABILITY_PATH));
        assert!(!pool.is_subtype(TypeId::PATH, TypeId::STORAGE_PATH));
    }

    #[test]
    fn test_least_common_supertype() {
        let mut f = fixture();
        let int_opt = f.pool.optional(TypeId::INT);
        assert_eq!(
            f.pool.least_common_supertype(&[TypeId::INT, TypeId::INT]),
            TypeId::INT
        );
        assert_eq!(
            f.pool.least_common_supertype(&[TypeId::INT, int_opt]),
            int_opt
        );
        assert_eq!(
            f.pool.least_common_supertype(&[TypeId::INT, TypeId::STRING]),
            TypeId::ANY_STRUCT
        );
        // Crossing the kind boundary is invalid.
        assert_eq!(
            f.pool
                .least_common_supertype(&[f.resource, f.structure]),
            TypeId::INVALID
        );
        assert_eq!(f.pool.least_common_supertype(&[]), TypeId::NEVER);
    }

    #[test]
    fn test_invalid_assignable_both_ways() {
        let pool = TypePool::new(SharedInterner::new());
        assert!(pool.is_assignable(TypeId::INVALID, TypeId::INT));
        assert!(pool.is_assignable(TypeId::INT, TypeId::INVALID));
        assert!(!pool.is_subtype(TypeId::INVALID, TypeId::INT));
    }

    /// A small closed universe for the relation laws.
    fn universe(pool: &mut TypePool) -> Vec<TypeId> {
        let int_opt = pool.optional(TypeId::INT);
        let int_opt_arr = pool.variable_array(int_opt);
        let ref_int = pool.reference(false, TypeId::INT);
        let auth_ref_int = pool.reference(true, TypeId::INT);
        let any_struct_opt = pool.optional(TypeId::ANY_STRUCT);
        vec![
            TypeId::NEVER,
            TypeId::INT,
            TypeId::UINT8,
            TypeId::BOOL,
            TypeId::STRING,
            TypeId::ANY_STRUCT,
            TypeId::ANY_RESOURCE,
            TypeId::PATH,
            TypeId::STORAGE_PATH,
            int_opt,
            int_opt_arr,
            ref_int,
            auth_ref_int,
            any_struct_opt,
        ]
    }

    proptest! {
        #[test]
        fn prop_subtype_reflexive(index in 0usize..14) {
            let mut pool = TypePool::new(SharedInterner::new());
            let types = universe(&mut pool);
            let t = types[index];
            prop_assert!(pool.is_subtype(t, t));
        }

        #[test]
        fn prop_subtype_transitive(i in 0usize..14, j in 0usize..14, k in 0usize..14) {
            let mut pool = TypePool::new(SharedInterner::new());
            let types = universe(&mut pool);
            let (t, u, v) = (types[i], types[j], types[k]);
            if pool.is_subtype(t, u) && pool.is_subtype(u, v) {
                prop_assert!(pool.is_subtype(t, v));
            }
        }
    }
}
