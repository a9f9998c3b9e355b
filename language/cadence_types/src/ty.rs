//! Type ids, primitives, and the type entry representation.

use std::fmt;

use num_bigint::BigInt;
use smallvec::SmallVec;

use crate::composite::{CompositeId, InterfaceId};

/// Index of a type in the [`TypePool`](crate::TypePool).
///
/// Equality of ids is equality of types: the pool deduplicates on intern.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // Primitives are pre-interned at fixed indices, in this exact order.
    pub const INVALID: TypeId = TypeId(0);
    pub const NEVER: TypeId = TypeId(1);
    pub const VOID: TypeId = TypeId(2);
    pub const BOOL: TypeId = TypeId(3);
    pub const STRING: TypeId = TypeId(4);
    pub const CHARACTER: TypeId = TypeId(5);
    pub const ADDRESS: TypeId = TypeId(6);
    pub const PATH: TypeId = TypeId(7);
    pub const STORAGE_PATH: TypeId = TypeId(8);
    pub const CAPABILITY_PATH: TypeId = TypeId(9);
    pub const PRIVATE_PATH: TypeId = TypeId(10);
    pub const PUBLIC_PATH: TypeId = TypeId(11);
    pub const ANY_STRUCT: TypeId = TypeId(12);
    pub const ANY_RESOURCE: TypeId = TypeId(13);
    pub const META_TYPE: TypeId = TypeId(14);
    pub const INT: TypeId = TypeId(15);
    pub const UINT: TypeId = TypeId(16);
    pub const INT8: TypeId = TypeId(17);
    pub const INT16: TypeId = TypeId(18);
    pub const INT32: TypeId = TypeId(19);
    pub const INT64: TypeId = TypeId(20);
    pub const INT128: TypeId = TypeId(21);
    pub const INT256: TypeId = TypeId(22);
    pub const UINT8: TypeId = TypeId(23);
    pub const UINT16: TypeId = TypeId(24);
    pub const UINT32: TypeId = TypeId(25);
    pub const UINT64: TypeId = TypeId(26);
    pub const UINT128: TypeId = TypeId(27);
    pub const UINT256: TypeId = TypeId(28);
    pub const WORD8: TypeId = TypeId(29);
    pub const WORD16: TypeId = TypeId(30);
    pub const WORD32: TypeId = TypeId(31);
    pub const WORD64: TypeId = TypeId(32);
    pub const FIX64: TypeId = TypeId(33);
    pub const UFIX64: TypeId = TypeId(34);

    /// First index available for dynamically interned types.
    pub(crate) const FIRST_DYNAMIC: u32 = 35;

    #[inline]
    pub(crate) const fn new(index: u32) -> Self {
        TypeId(index)
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// The numeric family.
///
/// `Int` and `UInt` are arbitrary precision; the suffixed members are
/// bounded; `Word*` wrap modulo 2ⁿ; `Fix64`/`UFix64` are fixed-point with
/// 8 fractional decimal digits.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NumericType {
    Int,
    UInt,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Word8,
    Word16,
    Word32,
    Word64,
    Fix64,
    UFix64,
}

impl NumericType {
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            NumericType::Int
                | NumericType::Int8
                | NumericType::Int16
                | NumericType::Int32
                | NumericType::Int64
                | NumericType::Int128
                | NumericType::Int256
                | NumericType::Fix64
        )
    }

    pub fn is_fixed_point(self) -> bool {
        matches!(self, NumericType::Fix64 | NumericType::UFix64)
    }

    /// Wrapping (modular) arithmetic, no overflow errors.
    pub fn is_word(self) -> bool {
        matches!(
            self,
            NumericType::Word8 | NumericType::Word16 | NumericType::Word32 | NumericType::Word64
        )
    }

    /// Bit width of bounded members; `None` for `Int`/`UInt`.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            NumericType::Int | NumericType::UInt => None,
            NumericType::Int8 | NumericType::UInt8 | NumericType::Word8 => Some(8),
            NumericType::Int16 | NumericType::UInt16 | NumericType::Word16 => Some(16),
            NumericType::Int32 | NumericType::UInt32 | NumericType::Word32 => Some(32),
            NumericType::Int64 | NumericType::UInt64 | NumericType::Word64 => Some(64),
            NumericType::Int128 | NumericType::UInt128 => Some(128),
            NumericType::Int256 | NumericType::UInt256 => Some(256),
            NumericType::Fix64 | NumericType::UFix64 => Some(64),
        }
    }

    /// Inclusive value range of bounded integer members, `None` for the
    /// arbitrary-precision and fixed-point members.
    pub fn integer_range(self) -> Option<(BigInt, BigInt)> {
        let width = self.bit_width()?;
        if self.is_fixed_point() {
            return None;
        }
        let range = if self.is_signed() {
            let max = (BigInt::from(1) << (width - 1)) - 1;
            let min = -(BigInt::from(1) << (width - 1));
            (min, max)
        } else {
            let max = (BigInt::from(1) << width) - 1;
            (BigInt::from(0), max)
        };
        Some(range)
    }

    pub fn name(self) -> &'static str {
        match self {
            NumericType::Int => "Int",
            NumericType::UInt => "UInt",
            NumericType::Int8 => "Int8",
            NumericType::Int16 => "Int16",
            NumericType::Int32 => "Int32",
            NumericType::Int64 => "Int64",
            NumericType::Int128 => "Int128",
            NumericType::Int256 => "Int256",
            NumericType::UInt8 => "UInt8",
            NumericType::UInt16 => "UInt16",
            NumericType::UInt32 => "UInt32",
            NumericType::UInt64 => "UInt64",
            NumericType::UInt128 => "UInt128",
            NumericType::UInt256 => "UInt256",
            NumericType::Word8 => "Word8",
            NumericType::Word16 => "Word16",
            NumericType::Word32 => "Word32",
            NumericType::Word64 => "Word64",
            NumericType::Fix64 => "Fix64",
            NumericType::UFix64 => "UFix64",
        }
    }

    /// All members, in pre-interning order.
    pub const ALL: [NumericType; 20] = [
        NumericType::Int,
        NumericType::UInt,
        NumericType::Int8,
        NumericType::Int16,
        NumericType::Int32,
        NumericType::Int64,
        NumericType::Int128,
        NumericType::Int256,
        NumericType::UInt8,
        NumericType::UInt16,
        NumericType::UInt32,
        NumericType::UInt64,
        NumericType::UInt128,
        NumericType::UInt256,
        NumericType::Word8,
        NumericType::Word16,
        NumericType::Word32,
        NumericType::Word64,
        NumericType::Fix64,
        NumericType::UFix64,
    ];
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Leaf builtin types.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Primitive {
    /// Error-recovery sentinel; assignable both ways, subtype of nothing.
    Invalid,
    /// The uninhabited bottom type.
    Never,
    Void,
    Bool,
    String,
    Character,
    Address,
    /// Supertype of all path types.
    Path,
    StoragePath,
    /// Supertype of private and public paths.
    CapabilityPath,
    PrivatePath,
    PublicPath,
    /// Top of the non-resource hierarchy.
    AnyStruct,
    /// Top of the resource hierarchy.
    AnyResource,
    /// The reified type of types, `Type`.
    MetaType,
    Numeric(NumericType),
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Invalid => "<<invalid>>",
            Primitive::Never => "Never",
            Primitive::Void => "Void",
            Primitive::Bool => "Bool",
            Primitive::String => "String",
            Primitive::Character => "Character",
            Primitive::Address => "Address",
            Primitive::Path => "Path",
            Primitive::StoragePath => "StoragePath",
            Primitive::CapabilityPath => "CapabilityPath",
            Primitive::PrivatePath => "PrivatePath",
            Primitive::PublicPath => "PublicPath",
            Primitive::AnyStruct => "AnyStruct",
            Primitive::AnyResource => "AnyResource",
            Primitive::MetaType => "Type",
            Primitive::Numeric(n) => n.name(),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One interned type.
///
/// Children are [`TypeId`]s into the same pool; nominal kinds index the
/// pool's side tables.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeEntry {
    Primitive(Primitive),
    Optional(TypeId),
    VariableArray(TypeId),
    ConstantArray { element: TypeId, size: u64 },
    Dictionary { key: TypeId, value: TypeId },
    Reference { authorized: bool, referenced: TypeId },
    Function {
        parameters: SmallVec<[TypeId; 4]>,
        return_type: TypeId,
    },
    Composite(CompositeId),
    Interface(InterfaceId),
    /// Interface list is sorted and deduplicated on intern.
    Restricted { base: TypeId, interfaces: Vec<InterfaceId> },
    Capability { borrow: TypeId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_ranges() {
        let (min, max) = NumericType::UInt8.integer_range().unwrap();
        assert_eq!(min, BigInt::from(0));
        assert_eq!(max, BigInt::from(255));

        let (min, max) = NumericType::Int8.integer_range().unwrap();
        assert_eq!(min, BigInt::from(-128));
        assert_eq!(max, BigInt::from(127));

        let (_, max) = NumericType::UInt256.integer_range().unwrap();
        assert_eq!(max, (BigInt::from(1) << 256) - 1);

        assert!(NumericType::Int.integer_range().is_none());
        assert!(NumericType::Fix64.integer_range().is_none());
    }

    #[test]
    fn test_word_types_wrap() {
        assert!(NumericType::Word8.is_word());
        assert!(!NumericType::UInt8.is_word());
    }
}
