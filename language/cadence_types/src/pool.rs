//! The unified type pool - single source of truth for all types.
//!
//! Every type in a checking run is stored here and referenced by
//! [`TypeId`]. Hash-based deduplication ensures each unique type exists
//! once; primitives are pre-interned at fixed indices for O(1) lookup.

use cadence_ir::{CompositeKind, Location, Name, SharedInterner};
use rustc_hash::FxHashMap;

use crate::composite::{CompositeData, CompositeId, InterfaceData, InterfaceId};
use crate::ty::{NumericType, Primitive, TypeEntry, TypeId};

/// The type pool.
pub struct TypePool {
    /// All type entries; `TypeId` indexes this.
    items: Vec<TypeEntry>,
    /// Entry -> id mapping for deduplication.
    intern_map: FxHashMap<TypeEntry, TypeId>,
    /// Composite side table.
    composites: Vec<CompositeData>,
    /// Interface side table.
    interfaces: Vec<InterfaceData>,
    /// Nominal resolution: `(location, qualified name)` -> type.
    nominal: FxHashMap<(Location, Name), TypeId>,
    /// Shared identifier interner, used for rendering type names.
    interner: SharedInterner,
}

impl TypePool {
    /// Create a new pool with pre-interned primitives.
    pub fn new(interner: SharedInterner) -> Self {
        let mut pool = TypePool {
            items: Vec::with_capacity(64),
            intern_map: FxHashMap::default(),
            composites: Vec::new(),
            interfaces: Vec::new(),
            nominal: FxHashMap::default(),
            interner,
        };
        pool.intern_primitives();
        pool
    }

    /// Pre-intern all primitive types at their fixed indices.
    fn intern_primitives(&mut self) {
        use Primitive::*;
        let fixed = [
            Invalid,
            Never,
            Void,
            Bool,
            String,
            Character,
            Address,
            Path,
            StoragePath,
            CapabilityPath,
            PrivatePath,
            PublicPath,
            AnyStruct,
            AnyResource,
            MetaType,
        ];
        for primitive in fixed {
            self.push(TypeEntry::Primitive(primitive));
        }
        for numeric in NumericType::ALL {
            self.push(TypeEntry::Primitive(Numeric(numeric)));
        }
        debug_assert_eq!(self.items.len() as u32, TypeId::FIRST_DYNAMIC);
    }

    fn push(&mut self, entry: TypeEntry) -> TypeId {
        let id = TypeId::new(u32::try_from(self.items.len()).expect("type pool overflow"));
        self.intern_map.insert(entry.clone(), id);
        self.items.push(entry);
        id
    }

    /// Intern an entry, deduplicating.
    fn intern(&mut self, entry: TypeEntry) -> TypeId {
        if let Some(&id) = self.intern_map.get(&entry) {
            return id;
        }
        self.push(entry)
    }

    /// The entry for an id.
    #[inline]
    pub fn entry(&self, id: TypeId) -> &TypeEntry {
        &self.items[id.index()]
    }

    /// The identifier interner shared with the program.
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    // Constructors

    pub fn optional(&mut self, inner: TypeId) -> TypeId {
        // Flatten T?? to T?; an optional of an optional adds no information
        // to the nil case and the runtime representation is single-level.
        if matches!(self.entry(inner), TypeEntry::Optional(_)) {
            return inner;
        }
        self.intern(TypeEntry::Optional(inner))
    }

    pub fn variable_array(&mut self, element: TypeId) -> TypeId {
        self.intern(TypeEntry::VariableArray(element))
    }

    pub fn constant_array(&mut self, element: TypeId, size: u64) -> TypeId {
        self.intern(TypeEntry::ConstantArray { element, size })
    }

    pub fn dictionary(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.intern(TypeEntry::Dictionary { key, value })
    }

    pub fn reference(&mut self, authorized: bool, referenced: TypeId) -> TypeId {
        self.intern(TypeEntry::Reference {
            authorized,
            referenced,
        })
    }

    pub fn function(&mut self, parameters: Vec<TypeId>, return_type: TypeId) -> TypeId {
        self.intern(TypeEntry::Function {
            parameters: parameters.into(),
            return_type,
        })
    }

    pub fn restricted(&mut self, base: TypeId, mut interfaces: Vec<InterfaceId>) -> TypeId {
        interfaces.sort_unstable();
        interfaces.dedup();
        self.intern(TypeEntry::Restricted { base, interfaces })
    }

    pub fn capability(&mut self, borrow: TypeId) -> TypeId {
        self.intern(TypeEntry::Capability { borrow })
    }

    // Nominal declarations

    /// Declare a composite type. Members may be filled in afterwards via
    /// [`TypePool::composite_data_mut`]; self-referential member types
    /// need the id first.
    pub fn declare_composite(&mut self, data: CompositeData) -> TypeId {
        let key = (data.location.clone(), data.name);
        let composite_id = CompositeId::new(
            u32::try_from(self.composites.len()).expect("composite table overflow"),
        );
        self.composites.push(data);
        let id = self.intern(TypeEntry::Composite(composite_id));
        self.nominal.insert(key, id);
        id
    }

    /// Declare an interface type.
    pub fn declare_interface(&mut self, data: InterfaceData) -> TypeId {
        let key = (data.location.clone(), data.name);
        let interface_id = InterfaceId::new(
            u32::try_from(self.interfaces.len()).expect("interface table overflow"),
        );
        self.interfaces.push(data);
        let id = self.intern(TypeEntry::Interface(interface_id));
        self.nominal.insert(key, id);
        id
    }

    /// Resolve a nominal type by identity.
    pub fn lookup_nominal(&self, location: &Location, name: Name) -> Option<TypeId> {
        self.nominal.get(&(location.clone(), name)).copied()
    }

    pub fn composite_data(&self, id: CompositeId) -> &CompositeData {
        &self.composites[id.index()]
    }

    pub fn composite_data_mut(&mut self, id: CompositeId) -> &mut CompositeData {
        &mut self.composites[id.index()]
    }

    pub fn interface_data(&self, id: InterfaceId) -> &InterfaceData {
        &self.interfaces[id.index()]
    }

    pub fn interface_data_mut(&mut self, id: InterfaceId) -> &mut InterfaceData {
        &mut self.interfaces[id.index()]
    }

    /// The composite id behind a type, if it is a composite.
    pub fn as_composite(&self, id: TypeId) -> Option<CompositeId> {
        match self.entry(id) {
            TypeEntry::Composite(cid) => Some(*cid),
            _ => None,
        }
    }

    /// The interface id behind a type, if it is an interface.
    pub fn as_interface(&self, id: TypeId) -> Option<InterfaceId> {
        match self.entry(id) {
            TypeEntry::Interface(iid) => Some(*iid),
            _ => None,
        }
    }

    // Queries

    /// The numeric type behind an id, if it is numeric.
    pub fn numeric(&self, id: TypeId) -> Option<NumericType> {
        match self.entry(id) {
            TypeEntry::Primitive(Primitive::Numeric(n)) => Some(*n),
            _ => None,
        }
    }

    /// The pre-interned id of a numeric type.
    pub fn numeric_id(&self, numeric: NumericType) -> TypeId {
        let offset = NumericType::ALL
            .iter()
            .position(|&n| n == numeric)
            .expect("numeric family member");
        TypeId::new(TypeId::INT.index() as u32 + offset as u32)
    }

    /// Deep resource-kind query.
    ///
    /// Containers over resources are resource-kinded for linearity:
    /// moving `[@R]` moves the resources inside it.
    pub fn is_resource(&self, id: TypeId) -> bool {
        match self.entry(id) {
            TypeEntry::Primitive(Primitive::AnyResource) => true,
            TypeEntry::Primitive(_) => false,
            TypeEntry::Optional(inner) => self.is_resource(*inner),
            TypeEntry::VariableArray(element) => self.is_resource(*element),
            TypeEntry::ConstantArray { element, .. } => self.is_resource(*element),
            TypeEntry::Dictionary { value, .. } => self.is_resource(*value),
            TypeEntry::Reference { .. } => false,
            TypeEntry::Function { .. } => false,
            TypeEntry::Composite(cid) => self.composite_data(*cid).kind.is_resource(),
            TypeEntry::Interface(iid) => self.interface_data(*iid).kind.is_resource(),
            TypeEntry::Restricted { base, .. } => self.is_resource(*base),
            TypeEntry::Capability { .. } => false,
        }
    }

    /// Whether a type may key a dictionary.
    ///
    /// Keys are restricted to the hashable primitive subfamily: integers,
    /// fixed-point numbers, bool, string, character, address, paths, and
    /// enums (their raw values are integers).
    pub fn is_hashable_key(&self, id: TypeId) -> bool {
        match self.entry(id) {
            TypeEntry::Primitive(primitive) => matches!(
                primitive,
                Primitive::Bool
                    | Primitive::String
                    | Primitive::Character
                    | Primitive::Address
                    | Primitive::Path
                    | Primitive::StoragePath
                    | Primitive::CapabilityPath
                    | Primitive::PrivatePath
                    | Primitive::PublicPath
                    | Primitive::Numeric(_)
            ),
            TypeEntry::Composite(cid) => {
                self.composite_data(*cid).kind == CompositeKind::Enum
            }
            _ => false,
        }
    }

    /// Whether values of this type may be persisted to account storage.
    ///
    /// References and functions are transient; everything else storable
    /// is built from storable parts.
    pub fn is_storable(&self, id: TypeId) -> bool {
        match self.entry(id) {
            TypeEntry::Primitive(primitive) => !matches!(
                primitive,
                Primitive::Invalid | Primitive::Never | Primitive::AnyStruct | Primitive::AnyResource
            ),
            TypeEntry::Optional(inner) => self.is_storable(*inner),
            TypeEntry::VariableArray(element) => self.is_storable(*element),
            TypeEntry::ConstantArray { element, .. } => self.is_storable(*element),
            TypeEntry::Dictionary { key, value } => {
                self.is_storable(*key) && self.is_storable(*value)
            }
            TypeEntry::Reference { .. } | TypeEntry::Function { .. } => false,
            TypeEntry::Composite(cid) => {
                // Events are not storable; contracts live in accounts but
                // not under user paths.
                !matches!(
                    self.composite_data(*cid).kind,
                    CompositeKind::Event | CompositeKind::Contract
                )
            }
            TypeEntry::Interface(_) => false,
            TypeEntry::Restricted { base, .. } => self.is_storable(*base),
            TypeEntry::Capability { .. } => true,
        }
    }

    // Rendering

    /// Human-readable rendering for diagnostics.
    pub fn display(&self, id: TypeId) -> String {
        match self.entry(id) {
            TypeEntry::Primitive(primitive) => primitive.name().to_string(),
            TypeEntry::Optional(inner) => format!("{}?", self.display(*inner)),
            TypeEntry::VariableArray(element) => format!("[{}]", self.display(*element)),
            TypeEntry::ConstantArray { element, size } => {
                format!("[{}; {}]", self.display(*element), size)
            }
            TypeEntry::Dictionary { key, value } => {
                format!("{{{}: {}}}", self.display(*key), self.display(*value))
            }
            TypeEntry::Reference {
                authorized,
                referenced,
            } => {
                let auth = if *authorized { "auth " } else { "" };
                format!("{auth}&{}", self.display(*referenced))
            }
            TypeEntry::Function {
                parameters,
                return_type,
            } => {
                let params: Vec<_> = parameters.iter().map(|&p| self.display(p)).collect();
                format!("(({}): {})", params.join(", "), self.display(*return_type))
            }
            TypeEntry::Composite(cid) => {
                self.interner.lookup(self.composite_data(*cid).name)
            }
            TypeEntry::Interface(iid) => {
                self.interner.lookup(self.interface_data(*iid).name)
            }
            TypeEntry::Restricted { base, interfaces } => {
                let names: Vec<_> = interfaces
                    .iter()
                    .map(|&iid| self.interner.lookup(self.interface_data(iid).name))
                    .collect();
                format!("{}{{{}}}", self.display(*base), names.join(", "))
            }
            TypeEntry::Capability { borrow } => {
                format!("Capability<{}>", self.display(*borrow))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> TypePool {
        TypePool::new(SharedInterner::new())
    }

    #[test]
    fn test_primitives_at_fixed_indices() {
        let pool = pool();
        assert!(matches!(
            pool.entry(TypeId::BOOL),
            TypeEntry::Primitive(Primitive::Bool)
        ));
        assert!(matches!(
            pool.entry(TypeId::UINT8),
            TypeEntry::Primitive(Primitive::Numeric(NumericType::UInt8))
        ));
        assert_eq!(pool.numeric_id(NumericType::UInt8), TypeId::UINT8);
        assert_eq!(pool.numeric_id(NumericType::UFix64), TypeId::UFIX64);
    }

    #[test]
    fn test_intern_dedup() {
        let mut pool = pool();
        let a = pool.optional(TypeId::INT);
        let b = pool.optional(TypeId::INT);
        let c = pool.optional(TypeId::BOOL);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_optional_flattens() {
        let mut pool = pool();
        let opt = pool.optional(TypeId::INT);
        let opt_opt = pool.optional(opt);
        assert_eq!(opt, opt_opt);
    }

    #[test]
    fn test_display() {
        let mut pool = pool();
        let arr = pool.variable_array(TypeId::INT);
        let opt = pool.optional(arr);
        assert_eq!(pool.display(opt), "[Int]?");

        let reference = pool.reference(true, TypeId::STRING);
        assert_eq!(pool.display(reference), "auth &String");

        let dict = pool.dictionary(TypeId::STRING, TypeId::INT);
        assert_eq!(pool.display(dict), "{String: Int}");
    }

    #[test]
    fn test_hashable_keys() {
        let mut pool = pool();
        assert!(pool.is_hashable_key(TypeId::STRING));
        assert!(pool.is_hashable_key(TypeId::UINT64));
        assert!(pool.is_hashable_key(TypeId::ADDRESS));
        let arr = pool.variable_array(TypeId::INT);
        assert!(!pool.is_hashable_key(arr));
        assert!(!pool.is_hashable_key(TypeId::ANY_STRUCT));
    }
}
