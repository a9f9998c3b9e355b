//! String interner for identifier storage.
//!
//! Provides O(1) interning and lookup. Execution is strictly
//! single-threaded per transaction, so the shared handle is `Rc`, not
//! `Arc`, and interior mutability is a `RefCell`.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::Name;

#[derive(Default)]
struct InternerState {
    /// Map from string content to index.
    map: FxHashMap<Box<str>, u32>,
    /// Storage for string contents, indexed by `Name::raw`.
    strings: Vec<Box<str>>,
}

/// String interner.
///
/// `Name::EMPTY` (index 0) is pre-interned so that `Name::default()` always
/// resolves to the empty string.
pub struct StringInterner {
    state: RefCell<InternerState>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned.
    pub fn new() -> Self {
        let interner = StringInterner {
            state: RefCell::new(InternerState::default()),
        };
        let empty = interner.intern("");
        debug_assert_eq!(empty, Name::EMPTY);
        interner
    }

    /// Intern a string, returning its `Name`.
    ///
    /// Interning the same content twice returns the same `Name`.
    pub fn intern(&self, s: &str) -> Name {
        let mut state = self.state.borrow_mut();
        if let Some(&index) = state.map.get(s) {
            return Name::from_raw(index);
        }
        let index = u32::try_from(state.strings.len()).expect("interner overflow");
        let content: Box<str> = s.into();
        state.map.insert(content.clone(), index);
        state.strings.push(content);
        Name::from_raw(index)
    }

    /// Look up the string for a `Name`.
    ///
    /// Names are only produced by `intern`, so a miss means the `Name` came
    /// from a different interner; resolve to the empty string rather than
    /// panicking inside diagnostics formatting.
    pub fn lookup(&self, name: Name) -> String {
        self.state
            .borrow()
            .strings
            .get(name.raw() as usize)
            .map(|s| s.to_string())
            .unwrap_or_default()
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.state.borrow().strings.len()
    }

    /// Whether only the pre-interned empty string is present.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringInterner({} strings)", self.len())
    }
}

/// Shared handle to a [`StringInterner`].
///
/// Cloning shares the underlying interner. Single-threaded by design.
#[derive(Clone)]
pub struct SharedInterner(Rc<StringInterner>);

impl SharedInterner {
    pub fn new() -> Self {
        SharedInterner(Rc::new(StringInterner::new()))
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for SharedInterner {
    type Target = StringInterner;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for SharedInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let interner = StringInterner::new();
        let a = interner.intern("hello");
        let b = interner.intern("hello");
        let c = interner.intern("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_lookup_round_trip() {
        let interner = StringInterner::new();
        let name = interner.intern("vault");
        assert_eq!(interner.lookup(name), "vault");
        assert_eq!(interner.lookup(Name::EMPTY), "");
    }

    #[test]
    fn test_shared_interner_shares_state() {
        let shared = SharedInterner::new();
        let clone = shared.clone();
        let a = shared.intern("x");
        let b = clone.intern("x");
        assert_eq!(a, b);
    }
}
