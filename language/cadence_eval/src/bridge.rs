//! The value bridge: translation between interpreter values and the
//! host-side mirror hierarchy.
//!
//! Export walks a value into an owned, interpreter-independent tree;
//! cycles through ephemeral references terminate with nil, and a storage
//! reference is dereferenced exactly once. Import validates nominal
//! identity against the pool and rejects malformed composites and
//! capabilities.

use std::collections::HashSet;

use cadence_ir::{CompositeKind, Location, PathDomain, StringInterner};
use cadence_types::{NumericType, Primitive, StaticType, TypeEntry, TypeId, TypePool};
use num_bigint::BigInt;

use crate::errors::{EvalResult, RuntimeError};
use crate::host::Host;
use crate::value::{CompositeValue, IntegerValue, PathValue, ReferenceValue, Value};

/// The host-side value mirror.
#[derive(Clone, Debug, PartialEq)]
pub enum BridgeValue {
    Void,
    Bool(bool),
    Character(char),
    String(String),
    Address([u8; 8]),
    Number {
        kind: NumericType,
        /// Scaled by 10^8 for the fixed-point kinds.
        value: BigInt,
    },
    Optional(Option<Box<BridgeValue>>),
    Array(Vec<BridgeValue>),
    Dictionary(Vec<(BridgeValue, BridgeValue)>),
    Composite {
        location: Location,
        qualified_name: String,
        kind: CompositeKind,
        /// Declared field order.
        fields: Vec<(String, BridgeValue)>,
    },
    Path {
        domain: PathDomain,
        identifier: String,
    },
    TypeValue(Option<StaticType>),
    Capability {
        address: [u8; 8],
        domain: PathDomain,
        identifier: String,
        borrow_type: StaticType,
    },
    Link {
        target_domain: PathDomain,
        target_identifier: String,
        borrow_type: StaticType,
    },
}

/// An event as it leaves the interpreter.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportedEvent {
    /// `location.EventName`
    pub type_identifier: String,
    pub fields: Vec<(String, BridgeValue)>,
}

/// Export an interpreter value.
pub fn export_value(
    value: &Value,
    interner: &StringInterner,
    host: &dyn Host,
) -> EvalResult<BridgeValue> {
    let mut visited = HashSet::new();
    export_inner(value, interner, host, &mut visited)
}

fn export_inner(
    value: &Value,
    interner: &StringInterner,
    host: &dyn Host,
    visited: &mut HashSet<usize>,
) -> EvalResult<BridgeValue> {
    Ok(match value {
        Value::Void => BridgeValue::Void,
        Value::Bool(b) => BridgeValue::Bool(*b),
        Value::Character(c) => BridgeValue::Character(*c),
        Value::String(s) => BridgeValue::String(s.to_string()),
        Value::Address(address) => BridgeValue::Address(*address),
        Value::Integer(integer) => BridgeValue::Number {
            kind: integer.kind(),
            value: integer.value().clone(),
        },
        Value::Nil => BridgeValue::Optional(None),
        Value::Some(inner) => {
            BridgeValue::Optional(Some(Box::new(export_inner(inner, interner, host, visited)?)))
        }
        Value::Array(array) => {
            let pointer = std::rc::Rc::as_ptr(array) as usize;
            if !visited.insert(pointer) {
                return Ok(BridgeValue::Optional(None));
            }
            let array = array.borrow();
            let elements = array
                .iter()
                .map(|element| export_inner(element, interner, host, visited))
                .collect::<EvalResult<Vec<_>>>()?;
            visited.remove(&pointer);
            BridgeValue::Array(elements)
        }
        Value::Dictionary(dictionary) => {
            let pointer = std::rc::Rc::as_ptr(dictionary) as usize;
            if !visited.insert(pointer) {
                return Ok(BridgeValue::Optional(None));
            }
            let dictionary = dictionary.borrow();
            let entries = dictionary
                .iter()
                .map(|(key, value)| {
                    Ok((
                        export_inner(key, interner, host, visited)?,
                        export_inner(value, interner, host, visited)?,
                    ))
                })
                .collect::<EvalResult<Vec<_>>>()?;
            visited.remove(&pointer);
            BridgeValue::Dictionary(entries)
        }
        Value::Composite(composite) => {
            let pointer = std::rc::Rc::as_ptr(composite) as usize;
            if !visited.insert(pointer) {
                return Ok(BridgeValue::Optional(None));
            }
            let composite = composite.borrow();
            let fields = composite
                .iterate_fields()
                .map(|(name, value)| {
                    Ok((
                        interner.lookup(name),
                        export_inner(value, interner, host, visited)?,
                    ))
                })
                .collect::<EvalResult<Vec<_>>>()?;
            visited.remove(&pointer);
            BridgeValue::Composite {
                location: composite.location.clone(),
                qualified_name: composite.qualified_name.to_string(),
                kind: composite.kind,
                fields,
            }
        }
        Value::Reference(ReferenceValue::Ephemeral { target, .. }) => {
            export_inner(target, interner, host, visited)?
        }
        Value::Reference(ReferenceValue::Storage { address, path, .. }) => {
            // Dereferenced once; absent targets export as nil.
            match host.storage_read(*address, path.domain, &path.identifier) {
                Some(stored) => export_inner(&stored, interner, host, visited)?,
                None => BridgeValue::Optional(None),
            }
        }
        Value::Capability(capability) => BridgeValue::Capability {
            address: capability.address,
            domain: capability.path.domain,
            identifier: capability.path.identifier.to_string(),
            borrow_type: capability.borrow_type.clone(),
        },
        Value::Link(link) => BridgeValue::Link {
            target_domain: link.target.domain,
            target_identifier: link.target.identifier.to_string(),
            borrow_type: link.borrow_type.clone(),
        },
        Value::Path(path) => BridgeValue::Path {
            domain: path.domain,
            identifier: path.identifier.to_string(),
        },
        Value::TypeValue(ty) => BridgeValue::TypeValue(ty.clone()),
        Value::Function(_) => {
            return Err(RuntimeError::Internal(
                "function values cannot cross the bridge".to_string(),
            ))
        }
        Value::InvalidatedResource => return Err(RuntimeError::UseAfterMoveRuntime),
    })
}

/// Import a host value, validating nominal identities against the pool.
pub fn import_value(
    bridge: &BridgeValue,
    pool: &mut TypePool,
    interner: &StringInterner,
) -> EvalResult<Value> {
    Ok(match bridge {
        BridgeValue::Void => Value::Void,
        BridgeValue::Bool(b) => Value::Bool(*b),
        BridgeValue::Character(c) => Value::Character(*c),
        BridgeValue::String(s) => Value::string(s.as_str()),
        BridgeValue::Address(address) => Value::Address(*address),
        BridgeValue::Number { kind, value } => {
            Value::Integer(IntegerValue::new(*kind, value.clone())?)
        }
        BridgeValue::Optional(None) => Value::Nil,
        BridgeValue::Optional(Some(inner)) => Value::some(import_value(inner, pool, interner)?),
        BridgeValue::Array(elements) => {
            let imported = elements
                .iter()
                .map(|element| import_value(element, pool, interner))
                .collect::<EvalResult<Vec<_>>>()?;
            let element_type = common_static_type(&imported);
            Value::array(StaticType::VariableArray(Box::new(element_type)), imported)
        }
        BridgeValue::Dictionary(entries) => {
            let imported = entries
                .iter()
                .map(|(key, value)| {
                    Ok((
                        import_value(key, pool, interner)?,
                        import_value(value, pool, interner)?,
                    ))
                })
                .collect::<EvalResult<Vec<_>>>()?;
            let key_type = common_static_type_of(imported.iter().map(|(k, _)| k));
            let value_type = common_static_type_of(imported.iter().map(|(_, v)| v));
            Value::dictionary(
                StaticType::Dictionary {
                    key: Box::new(key_type),
                    value: Box::new(value_type),
                },
                imported,
            )
        }
        BridgeValue::Composite {
            location,
            qualified_name,
            kind,
            fields,
        } => {
            let name = interner.intern(qualified_name);
            let Some(type_id) = pool.lookup_nominal(location, name) else {
                return Err(RuntimeError::ForceCastFailed {
                    expected: "a known composite type".to_string(),
                    actual: qualified_name.clone(),
                });
            };
            let mut imported_fields = Vec::with_capacity(fields.len());
            for (field_name, field_value) in fields {
                imported_fields.push((
                    interner.intern(field_name),
                    import_value(field_value, pool, interner)?,
                ));
            }
            Value::composite(CompositeValue::new(
                location.clone(),
                qualified_name.as_str(),
                *kind,
                type_id,
                imported_fields,
            ))
        }
        BridgeValue::Path { domain, identifier } => {
            Value::Path(PathValue::new(*domain, identifier.as_str()))
        }
        BridgeValue::TypeValue(ty) => Value::TypeValue(ty.clone()),
        BridgeValue::Capability {
            address,
            domain,
            identifier,
            borrow_type,
        } => {
            if !matches!(borrow_type, StaticType::Reference { .. }) {
                return Err(RuntimeError::ForceCastFailed {
                    expected: "a reference borrow type".to_string(),
                    actual: format!("{borrow_type:?}"),
                });
            }
            Value::Capability(crate::value::CapabilityValue {
                address: *address,
                path: PathValue::new(*domain, identifier.as_str()),
                borrow_type: borrow_type.clone(),
            })
        }
        BridgeValue::Link {
            target_domain,
            target_identifier,
            borrow_type,
        } => Value::Link(crate::value::LinkValue {
            target: PathValue::new(*target_domain, target_identifier.as_str()),
            borrow_type: borrow_type.clone(),
        }),
    })
}

fn common_static_type(values: &[Value]) -> StaticType {
    common_static_type_of(values.iter())
}

/// The common element type of imported containers; heterogeneous input
/// widens to the top of its kind.
fn common_static_type_of<'a>(mut values: impl Iterator<Item = &'a Value>) -> StaticType {
    let Some(first) = values.next() else {
        return StaticType::Primitive(Primitive::Never);
    };
    let first_ty = first.dynamic_type();
    let mut result = first_ty;
    for value in values {
        let ty = value.dynamic_type();
        if ty != result {
            return if result.is_resource() && ty.is_resource() {
                StaticType::Primitive(Primitive::AnyResource)
            } else {
                StaticType::Primitive(Primitive::AnyStruct)
            };
        }
    }
    result
}

/// Interned pool view of a static type, for subtype checks at the
/// boundary. `None` means the nominal identity is unknown here.
pub fn static_type_to_id(ty: &StaticType, pool: &mut TypePool) -> Option<TypeId> {
    ty.to_type(pool)
}

/// Whether a runtime value satisfies an expected pool type.
pub fn value_satisfies(value: &Value, expected: TypeId, pool: &mut TypePool) -> bool {
    if expected == TypeId::INVALID {
        return false;
    }
    // Expected optionals accept nil outright.
    if matches!(value, Value::Nil) {
        return matches!(pool.entry(expected), TypeEntry::Optional(_));
    }
    let Some(actual) = value.dynamic_type().to_type(pool) else {
        return false;
    };
    pool.is_subtype(actual, expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TestHost;
    use cadence_ir::SharedInterner;

    #[test]
    fn test_export_import_round_trip() {
        let interner = SharedInterner::new();
        let mut pool = TypePool::new(interner.clone());
        let host = TestHost::new();

        let original = Value::some(Value::array(
            StaticType::VariableArray(Box::new(StaticType::Primitive(Primitive::Numeric(
                NumericType::Int,
            )))),
            vec![Value::int(1), Value::int(2)],
        ));

        let exported = export_value(&original, &interner, &host).unwrap();
        let imported = import_value(&exported, &mut pool, &interner).unwrap();
        assert!(imported.equals(&original));

        let re_exported = export_value(&imported, &interner, &host).unwrap();
        assert_eq!(exported, re_exported);
    }

    #[test]
    fn test_import_unknown_composite_rejected() {
        let interner = SharedInterner::new();
        let mut pool = TypePool::new(interner.clone());
        let ghost = BridgeValue::Composite {
            location: Location::Script(1),
            qualified_name: "Ghost".to_string(),
            kind: CompositeKind::Structure,
            fields: vec![],
        };
        assert!(import_value(&ghost, &mut pool, &interner).is_err());
    }

    #[test]
    fn test_import_capability_requires_reference_type() {
        let interner = SharedInterner::new();
        let mut pool = TypePool::new(interner.clone());
        let bad = BridgeValue::Capability {
            address: [0; 8],
            domain: PathDomain::Public,
            identifier: "p".to_string(),
            borrow_type: StaticType::Primitive(Primitive::Bool),
        };
        assert!(import_value(&bad, &mut pool, &interner).is_err());
    }
}
