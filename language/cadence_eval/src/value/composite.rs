//! Container and composite runtime values.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use cadence_ir::{CompositeKind, Location, Name, PathDomain};
use cadence_types::{StaticType, TypeId};
use cadence_typeck::FunctionKey;

use crate::errors::{EvalResult, RuntimeError};
use crate::value::Value;

/// A composite instance: struct, resource, contract, event, or enum case.
///
/// Host-provided "simple" composites (`PublicKey`, the key list types)
/// use the same representation with the builtin location; the evaluator
/// never branches on which flavor it holds.
#[derive(Debug)]
pub struct CompositeValue {
    pub location: Location,
    pub qualified_name: Box<str>,
    pub kind: CompositeKind,
    /// The type in the current run's pool.
    pub type_id: TypeId,
    /// Ordered by declaration; destruction and export both iterate this.
    fields: Vec<(Name, Value)>,
    /// Host-allocated identity; present on resources only.
    pub uuid: Option<u64>,
    /// Set once `destroy` has consumed this value.
    pub destroyed: bool,
    /// Incremented on every move; outstanding references check it.
    pub transfer_count: u32,
    /// The account this value is persisted under, if any.
    pub owner: Option<[u8; 8]>,
}

impl CompositeValue {
    pub fn new(
        location: Location,
        qualified_name: impl Into<Box<str>>,
        kind: CompositeKind,
        type_id: TypeId,
        fields: Vec<(Name, Value)>,
    ) -> Self {
        CompositeValue {
            location,
            qualified_name: qualified_name.into(),
            kind,
            type_id,
            fields,
            uuid: None,
            destroyed: false,
            transfer_count: 0,
            owner: None,
        }
    }

    pub fn get_field(&self, name: Name) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Set a field, returning the previous value if the field existed.
    pub fn set_field(&mut self, name: Name, value: Value) -> Option<Value> {
        for (field, slot) in &mut self.fields {
            if *field == name {
                return Some(std::mem::replace(slot, value));
            }
        }
        self.fields.push((name, value));
        None
    }

    /// Take a field's value out, leaving the invalidated sentinel.
    pub fn take_field(&mut self, name: Name) -> Option<Value> {
        for (field, slot) in &mut self.fields {
            if *field == name {
                return Some(std::mem::replace(slot, Value::InvalidatedResource));
            }
        }
        None
    }

    pub fn iterate_fields(&self) -> impl Iterator<Item = (Name, &Value)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    pub fn static_type(&self) -> StaticType {
        StaticType::Composite {
            location: self.location.clone(),
            name: self.qualified_name.clone(),
            kind: self.kind,
        }
    }
}

/// An array value; both transient and account-owned arrays share this
/// shape, the owner field distinguishes them.
#[derive(Debug)]
pub struct ArrayValue {
    /// The full array type (`[T]` or `[T; N]`).
    pub static_type: StaticType,
    elements: Vec<Value>,
    pub transfer_count: u32,
}

impl ArrayValue {
    pub fn new(static_type: StaticType, elements: Vec<Value>) -> Self {
        ArrayValue {
            static_type,
            elements,
            transfer_count: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.elements.len()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.elements.get(index)
    }

    pub fn set(&mut self, index: usize, value: Value) -> EvalResult<Value> {
        let size = self.elements.len();
        match self.elements.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(RuntimeError::IndexOutOfBounds {
                index: index as i64,
                size,
            }),
        }
    }

    pub fn append(&mut self, value: Value) {
        self.elements.push(value);
    }

    pub fn insert(&mut self, index: usize, value: Value) -> EvalResult<()> {
        if index > self.elements.len() {
            return Err(RuntimeError::IndexOutOfBounds {
                index: index as i64,
                size: self.elements.len(),
            });
        }
        self.elements.insert(index, value);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> EvalResult<Value> {
        if index >= self.elements.len() {
            return Err(RuntimeError::IndexOutOfBounds {
                index: index as i64,
                size: self.elements.len(),
            });
        }
        Ok(self.elements.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.elements.iter()
    }
}

/// A dictionary value. Iteration order is insertion order; key equality
/// is the canonical structural equality of the hashable key family.
#[derive(Debug)]
pub struct DictionaryValue {
    /// The full dictionary type (`{K: V}`).
    pub static_type: StaticType,
    entries: Vec<(Value, Value)>,
    pub transfer_count: u32,
}

impl DictionaryValue {
    pub fn new(static_type: StaticType, entries: Vec<(Value, Value)>) -> Self {
        DictionaryValue {
            static_type,
            entries,
            transfer_count: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.equals(key))
            .map(|(_, v)| v)
    }

    /// Insert, returning the previous value for the key if present.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        for (k, v) in &mut self.entries {
            if k.equals(&key) {
                return Some(std::mem::replace(v, value));
            }
        }
        self.entries.push((key, value));
        None
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k.equals(key))?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.entries.iter().any(|(k, _)| k.equals(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

/// A path value: `/domain/identifier`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PathValue {
    pub domain: PathDomain,
    pub identifier: Rc<str>,
}

impl PathValue {
    pub fn new(domain: PathDomain, identifier: impl Into<Rc<str>>) -> Self {
        PathValue {
            domain,
            identifier: identifier.into(),
        }
    }
}

impl fmt::Debug for PathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.domain, self.identifier)
    }
}

impl fmt::Display for PathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.domain, self.identifier)
    }
}

/// A non-owning reference.
#[derive(Clone, Debug)]
pub enum ReferenceValue {
    /// Points at an in-memory value within the current execution. The
    /// version pins the referent's transfer count at borrow time; a
    /// moved or destroyed referent invalidates the reference.
    Ephemeral {
        target: Box<Value>,
        version: u32,
        /// The full reference type this was borrowed at.
        borrow_type: StaticType,
    },
    /// Re-reads through the storage layer on every access; the borrow
    /// type is enforced against the current stored value each time.
    Storage {
        address: [u8; 8],
        path: PathValue,
        borrow_type: StaticType,
    },
}

impl ReferenceValue {
    pub fn borrow_type(&self) -> &StaticType {
        match self {
            ReferenceValue::Ephemeral { borrow_type, .. }
            | ReferenceValue::Storage { borrow_type, .. } => borrow_type,
        }
    }
}

/// An unforgeable typed handle to a storage path.
#[derive(Clone, Debug)]
pub struct CapabilityValue {
    pub address: [u8; 8],
    pub path: PathValue,
    /// Always a reference type.
    pub borrow_type: StaticType,
}

/// A persisted redirect from one path to another typed target.
#[derive(Clone, Debug)]
pub struct LinkValue {
    pub target: PathValue,
    pub borrow_type: StaticType,
}

/// A first-class function value.
#[derive(Clone, Debug)]
pub enum FunctionValue {
    /// A declared function, optionally bound to a receiver.
    Declared {
        key: FunctionKey,
        self_value: Option<Rc<RefCell<CompositeValue>>>,
        /// Interned function type, for reflection.
        ty: TypeId,
    },
    /// A composite constructor.
    Constructor { type_id: TypeId },
}
