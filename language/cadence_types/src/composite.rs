//! Composite and interface type data.

use std::fmt;

use cadence_ir::{Access, CompositeKind, Location, Name, VariableKind};
use rustc_hash::FxHashSet;

use crate::TypeId;

/// Index of a composite's data in the pool's side table.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct CompositeId(u32);

impl CompositeId {
    #[inline]
    pub(crate) const fn new(index: u32) -> Self {
        CompositeId(index)
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeId({})", self.0)
    }
}

/// Index of an interface's data in the pool's side table.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct InterfaceId(u32);

impl InterfaceId {
    #[inline]
    pub(crate) const fn new(index: u32) -> Self {
        InterfaceId(index)
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceId({})", self.0)
    }
}

/// A field member of a composite or interface.
#[derive(Clone, Debug)]
pub struct FieldMember {
    pub name: Name,
    pub access: Access,
    pub kind: VariableKind,
    pub ty: TypeId,
}

/// A function member of a composite or interface.
#[derive(Clone, Debug)]
pub struct FunctionMember {
    pub name: Name,
    pub access: Access,
    /// The interned function type.
    pub ty: TypeId,
}

/// The declared shape of a composite type.
///
/// Field order is declaration order; destruction and the value bridge
/// both iterate it.
#[derive(Clone, Debug)]
pub struct CompositeData {
    pub location: Location,
    pub name: Name,
    pub kind: CompositeKind,
    pub fields: Vec<FieldMember>,
    pub functions: Vec<FunctionMember>,
    pub conformances: Vec<InterfaceId>,
    /// Enum raw type.
    pub raw_type: Option<TypeId>,
    /// Enum case names, in declaration order.
    pub case_names: Vec<Name>,
}

impl CompositeData {
    pub fn field(&self, name: Name) -> Option<&FieldMember> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn function(&self, name: Name) -> Option<&FunctionMember> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// The declared shape of an interface type.
#[derive(Clone, Debug)]
pub struct InterfaceData {
    pub location: Location,
    pub name: Name,
    pub kind: CompositeKind,
    pub fields: Vec<FieldMember>,
    pub functions: Vec<FunctionMember>,
    /// Functions the interface provides a default body for.
    pub default_functions: FxHashSet<Name>,
}

impl InterfaceData {
    pub fn field(&self, name: Name) -> Option<&FieldMember> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn function(&self, name: Name) -> Option<&FunctionMember> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn has_default(&self, name: Name) -> bool {
        self.default_functions.contains(&name)
    }
}
