//! Static types: the serializable mirror of the semantic universe.
//!
//! The interpreter and the storage layer cannot carry pool ids across
//! program boundaries; nominal identity must survive serialization. A
//! `StaticType` is an owned tree whose nominal leaves carry
//! `(Location, qualified name string)` and which converts losslessly to
//! and from pool ids within any pool that knows those nominals.

use std::fmt;

use cadence_ir::{CompositeKind, Location};

use crate::pool::TypePool;
use crate::ty::{Primitive, TypeEntry, TypeId};

/// A serializable type.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum StaticType {
    Primitive(Primitive),
    Optional(Box<StaticType>),
    VariableArray(Box<StaticType>),
    ConstantArray {
        element: Box<StaticType>,
        size: u64,
    },
    Dictionary {
        key: Box<StaticType>,
        value: Box<StaticType>,
    },
    Reference {
        authorized: bool,
        referenced: Box<StaticType>,
    },
    Function {
        parameters: Vec<StaticType>,
        return_type: Box<StaticType>,
    },
    Composite {
        location: Location,
        name: Box<str>,
        kind: CompositeKind,
    },
    Interface {
        location: Location,
        name: Box<str>,
        kind: CompositeKind,
    },
    Restricted {
        base: Box<StaticType>,
        /// Interface identities, sorted for canonical form.
        interfaces: Vec<(Location, Box<str>)>,
    },
    Capability {
        borrow: Box<StaticType>,
    },
}

impl StaticType {
    /// Capture the static form of a pool type.
    pub fn from_type(pool: &TypePool, id: TypeId) -> StaticType {
        match pool.entry(id) {
            TypeEntry::Primitive(primitive) => StaticType::Primitive(*primitive),
            TypeEntry::Optional(inner) => {
                StaticType::Optional(Box::new(Self::from_type(pool, *inner)))
            }
            TypeEntry::VariableArray(element) => {
                StaticType::VariableArray(Box::new(Self::from_type(pool, *element)))
            }
            TypeEntry::ConstantArray { element, size } => StaticType::ConstantArray {
                element: Box::new(Self::from_type(pool, *element)),
                size: *size,
            },
            TypeEntry::Dictionary { key, value } => StaticType::Dictionary {
                key: Box::new(Self::from_type(pool, *key)),
                value: Box::new(Self::from_type(pool, *value)),
            },
            TypeEntry::Reference {
                authorized,
                referenced,
            } => StaticType::Reference {
                authorized: *authorized,
                referenced: Box::new(Self::from_type(pool, *referenced)),
            },
            TypeEntry::Function {
                parameters,
                return_type,
            } => StaticType::Function {
                parameters: parameters
                    .iter()
                    .map(|&p| Self::from_type(pool, p))
                    .collect(),
                return_type: Box::new(Self::from_type(pool, *return_type)),
            },
            TypeEntry::Composite(cid) => {
                let data = pool.composite_data(*cid);
                StaticType::Composite {
                    location: data.location.clone(),
                    name: pool.interner().lookup(data.name).into(),
                    kind: data.kind,
                }
            }
            TypeEntry::Interface(iid) => {
                let data = pool.interface_data(*iid);
                StaticType::Interface {
                    location: data.location.clone(),
                    name: pool.interner().lookup(data.name).into(),
                    kind: data.kind,
                }
            }
            TypeEntry::Restricted { base, interfaces } => {
                let mut interfaces: Vec<_> = interfaces
                    .iter()
                    .map(|&iid| {
                        let data = pool.interface_data(iid);
                        (
                            data.location.clone(),
                            pool.interner().lookup(data.name).into(),
                        )
                    })
                    .collect();
                interfaces.sort();
                StaticType::Restricted {
                    base: Box::new(Self::from_type(pool, *base)),
                    interfaces,
                }
            }
            TypeEntry::Capability { borrow } => StaticType::Capability {
                borrow: Box::new(Self::from_type(pool, *borrow)),
            },
        }
    }

    /// Resolve back into a pool.
    ///
    /// `None` when a nominal identity is unknown to this pool: an unknown
    /// static type is never a subtype or instance of anything, so callers
    /// map `None` to a universally-false predicate.
    pub fn to_type(&self, pool: &mut TypePool) -> Option<TypeId> {
        match self {
            StaticType::Primitive(primitive) => Some(primitive_id(pool, *primitive)),
            StaticType::Optional(inner) => {
                let inner = inner.to_type(pool)?;
                Some(pool.optional(inner))
            }
            StaticType::VariableArray(element) => {
                let element = element.to_type(pool)?;
                Some(pool.variable_array(element))
            }
            StaticType::ConstantArray { element, size } => {
                let element = element.to_type(pool)?;
                Some(pool.constant_array(element, *size))
            }
            StaticType::Dictionary { key, value } => {
                let key = key.to_type(pool)?;
                let value = value.to_type(pool)?;
                Some(pool.dictionary(key, value))
            }
            StaticType::Reference {
                authorized,
                referenced,
            } => {
                let referenced = referenced.to_type(pool)?;
                Some(pool.reference(*authorized, referenced))
            }
            StaticType::Function {
                parameters,
                return_type,
            } => {
                let parameters = parameters
                    .iter()
                    .map(|p| p.to_type(pool))
                    .collect::<Option<Vec<_>>>()?;
                let return_type = return_type.to_type(pool)?;
                Some(pool.function(parameters, return_type))
            }
            StaticType::Composite { location, name, .. }
            | StaticType::Interface { location, name, .. } => {
                let name = pool.interner().intern(name);
                pool.lookup_nominal(location, name)
            }
            StaticType::Restricted { base, interfaces } => {
                let base = base.to_type(pool)?;
                let interfaces = interfaces
                    .iter()
                    .map(|(location, name)| {
                        let name = pool.interner().intern(name);
                        let id = pool.lookup_nominal(location, name)?;
                        pool.as_interface(id)
                    })
                    .collect::<Option<Vec<_>>>()?;
                Some(pool.restricted(base, interfaces))
            }
            StaticType::Capability { borrow } => {
                let borrow = borrow.to_type(pool)?;
                Some(pool.capability(borrow))
            }
        }
    }

    /// Whether values of this type are resources.
    ///
    /// Static mirror of the pool's deep query; resolvable without a pool
    /// because nominal kinds are carried inline.
    pub fn is_resource(&self) -> bool {
        match self {
            StaticType::Primitive(Primitive::AnyResource) => true,
            StaticType::Primitive(_) => false,
            StaticType::Optional(inner) => inner.is_resource(),
            StaticType::VariableArray(element) => element.is_resource(),
            StaticType::ConstantArray { element, .. } => element.is_resource(),
            StaticType::Dictionary { value, .. } => value.is_resource(),
            StaticType::Reference { .. } => false,
            StaticType::Function { .. } => false,
            StaticType::Composite { kind, .. } | StaticType::Interface { kind, .. } => {
                kind.is_resource()
            }
            StaticType::Restricted { base, .. } => base.is_resource(),
            StaticType::Capability { .. } => false,
        }
    }
}

fn primitive_id(pool: &TypePool, primitive: Primitive) -> TypeId {
    match primitive {
        Primitive::Invalid => TypeId::INVALID,
        Primitive::Never => TypeId::NEVER,
        Primitive::Void => TypeId::VOID,
        Primitive::Bool => TypeId::BOOL,
        Primitive::String => TypeId::STRING,
        Primitive::Character => TypeId::CHARACTER,
        Primitive::Address => TypeId::ADDRESS,
        Primitive::Path => TypeId::PATH,
        Primitive::StoragePath => TypeId::STORAGE_PATH,
        Primitive::CapabilityPath => TypeId::CAPABILITY_PATH,
        Primitive::PrivatePath => TypeId::PRIVATE_PATH,
        Primitive::PublicPath => TypeId::PUBLIC_PATH,
        Primitive::AnyStruct => TypeId::ANY_STRUCT,
        Primitive::AnyResource => TypeId::ANY_RESOURCE,
        Primitive::MetaType => TypeId::META_TYPE,
        Primitive::Numeric(numeric) => pool.numeric_id(numeric),
    }
}

impl fmt::Debug for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticType::Primitive(p) => write!(f, "{p}"),
            StaticType::Optional(inner) => write!(f, "{inner:?}?"),
            StaticType::VariableArray(element) => write!(f, "[{element:?}]"),
            StaticType::ConstantArray { element, size } => write!(f, "[{element:?}; {size}]"),
            StaticType::Dictionary { key, value } => write!(f, "{{{key:?}: {value:?}}}"),
            StaticType::Reference {
                authorized,
                referenced,
            } => {
                if *authorized {
                    write!(f, "auth &{referenced:?}")
                } else {
                    write!(f, "&{referenced:?}")
                }
            }
            StaticType::Function {
                parameters,
                return_type,
            } => {
                write!(f, "((")?;
                for (i, p) in parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p:?}")?;
                }
                write!(f, "): {return_type:?})")
            }
            StaticType::Composite { location, name, .. }
            | StaticType::Interface { location, name, .. } => {
                if location.is_builtin() {
                    write!(f, "{name}")
                } else {
                    write!(f, "{location}.{name}")
                }
            }
            StaticType::Restricted { base, interfaces } => {
                write!(f, "{base:?}{{")?;
                for (i, (_, name)) in interfaces.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}")?;
                }
                write!(f, "}}")
            }
            StaticType::Capability { borrow } => write!(f, "Capability<{borrow:?}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_ir::SharedInterner;

    #[test]
    fn test_round_trip_structural() {
        let interner = SharedInterner::new();
        let mut pool = TypePool::new(interner);
        let int_opt = pool.optional(TypeId::INT);
        let dict = pool.dictionary(TypeId::STRING, int_opt);
        let reference = pool.reference(true, dict);

        let static_ty = StaticType::from_type(&pool, reference);
        let back = static_ty.to_type(&mut pool).unwrap();
        assert_eq!(back, reference);
    }

    #[test]
    fn test_unknown_nominal_does_not_resolve() {
        let mut pool = TypePool::new(SharedInterner::new());
        let unknown = StaticType::Composite {
            location: Location::Script(9),
            name: "Ghost".into(),
            kind: CompositeKind::Resource,
        };
        assert_eq!(unknown.to_type(&mut pool), None);
        assert!(unknown.is_resource());
    }
}
