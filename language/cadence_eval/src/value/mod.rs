//! Runtime values.
//!
//! Values mirror the static type universe. Containers and composites sit
//! behind `Rc<RefCell<...>>` so references alias their referent;
//! everything else is inline. Execution is single-threaded per
//! transaction, so `Rc`, not `Arc`.
//!
//! Heap values are only constructed through the factory methods on
//! [`Value`]; the evaluator meters each construction through them.

mod composite;
mod integer;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use cadence_ir::{CompositeKind, PathDomain};
use cadence_types::{NumericType, Primitive, StaticType};
use num_bigint::BigInt;

pub use composite::{
    ArrayValue, CapabilityValue, CompositeValue, DictionaryValue, FunctionValue, LinkValue,
    PathValue, ReferenceValue,
};
pub use integer::{IntegerValue, FIXED_POINT_SCALE};

use crate::errors::EvalResult;

/// A runtime value.
#[derive(Clone, Debug)]
pub enum Value {
    Void,
    Bool(bool),
    Character(char),
    String(Rc<str>),
    Address([u8; 8]),
    Integer(IntegerValue),
    /// The `nil` case of every optional.
    Nil,
    /// The some-case of an optional.
    Some(Box<Value>),
    Array(Rc<RefCell<ArrayValue>>),
    Dictionary(Rc<RefCell<DictionaryValue>>),
    Composite(Rc<RefCell<CompositeValue>>),
    Reference(ReferenceValue),
    Capability(CapabilityValue),
    Link(LinkValue),
    Path(PathValue),
    /// A reified type; `None` is the unknown type, which no predicate
    /// accepts.
    TypeValue(Option<StaticType>),
    Function(Box<FunctionValue>),
    /// Sentinel written over every moved-from resource slot.
    InvalidatedResource,
}

// Factory methods.

impl Value {
    pub fn integer(kind: NumericType, value: BigInt) -> EvalResult<Value> {
        Ok(Value::Integer(IntegerValue::new(kind, value)?))
    }

    pub fn int(value: i64) -> Value {
        Value::Integer(IntegerValue::raw(NumericType::Int, BigInt::from(value)))
    }

    pub fn string(value: impl Into<Rc<str>>) -> Value {
        Value::String(value.into())
    }

    pub fn some(value: Value) -> Value {
        Value::Some(Box::new(value))
    }

    /// Wrap an optional result: `None` becomes `nil`.
    pub fn optional(value: Option<Value>) -> Value {
        match value {
            Some(value) => Value::some(value),
            None => Value::Nil,
        }
    }

    pub fn array(static_type: StaticType, elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(ArrayValue::new(static_type, elements))))
    }

    pub fn dictionary(static_type: StaticType, entries: Vec<(Value, Value)>) -> Value {
        Value::Dictionary(Rc::new(RefCell::new(DictionaryValue::new(
            static_type,
            entries,
        ))))
    }

    pub fn composite(value: CompositeValue) -> Value {
        Value::Composite(Rc::new(RefCell::new(value)))
    }

    pub fn function(value: FunctionValue) -> Value {
        Value::Function(Box::new(value))
    }
}

// Queries.

impl Value {
    /// Whether this value is (or transitively contains) a resource, for
    /// move-versus-copy transfer decisions.
    pub fn is_resource_kinded(&self) -> bool {
        match self {
            Value::Composite(composite) => composite.borrow().kind.is_resource(),
            Value::Array(array) => array.borrow().static_type.is_resource(),
            Value::Dictionary(dictionary) => dictionary.borrow().static_type.is_resource(),
            Value::Some(inner) => inner.is_resource_kinded(),
            _ => false,
        }
    }

    /// The runtime type of this value.
    pub fn dynamic_type(&self) -> StaticType {
        match self {
            Value::Void => StaticType::Primitive(Primitive::Void),
            Value::Bool(_) => StaticType::Primitive(Primitive::Bool),
            Value::Character(_) => StaticType::Primitive(Primitive::Character),
            Value::String(_) => StaticType::Primitive(Primitive::String),
            Value::Address(_) => StaticType::Primitive(Primitive::Address),
            Value::Integer(integer) => {
                StaticType::Primitive(Primitive::Numeric(integer.kind()))
            }
            Value::Nil => StaticType::Optional(Box::new(StaticType::Primitive(Primitive::Never))),
            Value::Some(inner) => StaticType::Optional(Box::new(inner.dynamic_type())),
            Value::Array(array) => array.borrow().static_type.clone(),
            Value::Dictionary(dictionary) => dictionary.borrow().static_type.clone(),
            Value::Composite(composite) => composite.borrow().static_type(),
            Value::Reference(reference) => reference.borrow_type().clone(),
            Value::Capability(capability) => StaticType::Capability {
                borrow: Box::new(capability.borrow_type.clone()),
            },
            // Links are not first-class; their type only matters to the
            // capability resolver.
            Value::Link(link) => link.borrow_type.clone(),
            Value::Path(path) => StaticType::Primitive(match path.domain {
                PathDomain::Storage => Primitive::StoragePath,
                PathDomain::Private => Primitive::PrivatePath,
                PathDomain::Public => Primitive::PublicPath,
            }),
            Value::TypeValue(_) => StaticType::Primitive(Primitive::MetaType),
            Value::Function(_) => StaticType::Function {
                parameters: Vec::new(),
                return_type: Box::new(StaticType::Primitive(Primitive::Never)),
            },
            Value::InvalidatedResource => StaticType::Primitive(Primitive::Never),
        }
    }

    /// Structural equality.
    ///
    /// Resources and plain composites are never equal; enum cases
    /// compare by type identity and raw value. Reified types compare by
    /// static type equality, with the unknown type equal to nothing.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Character(a), Value::Character(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Address(a), Value::Address(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a.compare(b) == Some(std::cmp::Ordering::Equal),
            (Value::Some(a), Value::Some(b)) => a.equals(b),
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::TypeValue(Some(a)), Value::TypeValue(Some(b))) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.count() == b.count() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Dictionary(a), Value::Dictionary(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.count() == b.count()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|bv| v.equals(bv)))
            }
            (Value::Composite(a), Value::Composite(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                if a.kind != CompositeKind::Enum || b.kind != CompositeKind::Enum {
                    return false;
                }
                a.location == b.location
                    && a.qualified_name == b.qualified_name
                    && match (a.iterate_fields().next(), b.iterate_fields().next()) {
                        (Some((_, raw_a)), Some((_, raw_b))) => raw_a.equals(raw_b),
                        _ => false,
                    }
            }
            _ => false,
        }
    }

    /// Deep copy for non-resource value semantics: binding or passing a
    /// struct, array, or dictionary copies it.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Some(inner) => Value::some(inner.deep_copy()),
            Value::Array(array) => {
                let array = array.borrow();
                Value::array(
                    array.static_type.clone(),
                    array.iter().map(Value::deep_copy).collect(),
                )
            }
            Value::Dictionary(dictionary) => {
                let dictionary = dictionary.borrow();
                Value::dictionary(
                    dictionary.static_type.clone(),
                    dictionary
                        .iter()
                        .map(|(k, v)| (k.deep_copy(), v.deep_copy()))
                        .collect(),
                )
            }
            Value::Composite(composite) => {
                let composite = composite.borrow();
                let fields = composite
                    .iterate_fields()
                    .map(|(name, value)| (name, value.deep_copy()))
                    .collect();
                let mut copy = CompositeValue::new(
                    composite.location.clone(),
                    composite.qualified_name.clone(),
                    composite.kind,
                    composite.type_id,
                    fields,
                );
                copy.uuid = composite.uuid;
                Value::composite(copy)
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Character(c) => write!(f, "{c}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Address(address) => {
                write!(f, "0x")?;
                for byte in address {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Integer(integer) => write!(f, "{integer}"),
            Value::Nil => write!(f, "nil"),
            Value::Some(inner) => write!(f, "{inner}"),
            Value::Array(array) => {
                write!(f, "[")?;
                for (i, element) in array.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            Value::Dictionary(dictionary) => {
                write!(f, "{{")?;
                for (i, (key, value)) in dictionary.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Composite(composite) => {
                let composite = composite.borrow();
                write!(f, "{}(", composite.qualified_name)?;
                for (i, (_, value)) in composite.iterate_fields().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            Value::Reference(_) => write!(f, "<reference>"),
            Value::Capability(capability) => {
                write!(f, "Capability({})", capability.path)
            }
            Value::Link(link) => write!(f, "Link({})", link.target),
            Value::Path(path) => write!(f, "{path}"),
            Value::TypeValue(Some(ty)) => write!(f, "Type<{ty:?}>"),
            Value::TypeValue(None) => write!(f, "Type<?>"),
            Value::Function(_) => write!(f, "<function>"),
            Value::InvalidatedResource => write!(f, "<moved>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_ir::Location;
    use cadence_types::TypeId;

    #[test]
    fn test_structural_equality() {
        assert!(Value::int(42).equals(&Value::int(42)));
        assert!(!Value::int(42).equals(&Value::int(43)));
        assert!(Value::Nil.equals(&Value::Nil));
        assert!(Value::string("a").equals(&Value::string("a")));
        assert!(!Value::string("a").equals(&Value::int(1)));
        assert!(Value::some(Value::Bool(true)).equals(&Value::some(Value::Bool(true))));
    }

    #[test]
    fn test_unknown_type_value_never_equal() {
        assert!(!Value::TypeValue(None).equals(&Value::TypeValue(None)));
        let int_ty = StaticType::Primitive(Primitive::Numeric(NumericType::Int));
        assert!(Value::TypeValue(Some(int_ty.clone())).equals(&Value::TypeValue(Some(int_ty))));
    }

    #[test]
    fn test_composites_not_equal_unless_enum() {
        let make = || {
            Value::composite(CompositeValue::new(
                Location::Script(0),
                "S",
                CompositeKind::Structure,
                TypeId::INVALID,
                vec![],
            ))
        };
        assert!(!make().equals(&make()));
    }

    #[test]
    fn test_deep_copy_detaches_containers() {
        let int_array = StaticType::VariableArray(Box::new(StaticType::Primitive(
            Primitive::Numeric(NumericType::Int),
        )));
        let original = Value::array(int_array, vec![Value::int(1)]);
        let copy = original.deep_copy();

        if let Value::Array(array) = &original {
            array.borrow_mut().append(Value::int(2));
        }
        if let (Value::Array(original), Value::Array(copy)) = (&original, &copy) {
            assert_eq!(original.borrow().count(), 2);
            assert_eq!(copy.borrow().count(), 1);
        } else {
            panic!("expected arrays");
        }
    }

    #[test]
    fn test_dynamic_type_of_optionals() {
        let ty = Value::some(Value::int(1)).dynamic_type();
        assert_eq!(
            ty,
            StaticType::Optional(Box::new(StaticType::Primitive(Primitive::Numeric(
                NumericType::Int
            ))))
        );
        assert!(matches!(Value::Nil.dynamic_type(), StaticType::Optional(_)));
    }
}
