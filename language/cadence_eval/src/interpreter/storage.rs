//! Account storage access and capability resolution.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_ir::{Argument, ExprId, Name, PathDomain};
use cadence_types::{StaticType, TypeId};
use rustc_hash::FxHashSet;

use crate::bridge::value_satisfies;
use crate::errors::{EvalResult, RuntimeError};
use crate::host::Host;
use crate::metering::MemoryKind;
use crate::value::{CapabilityValue, CompositeValue, LinkValue, PathValue, ReferenceValue, Value};

use super::Interpreter;

/// Link chains longer than this fail the borrow outright.
const CAPABILITY_DEPTH_LIMIT: u32 = 100;

impl<H: Host> Interpreter<'_, H> {
    /// Dispatch a storage-API call on an account value.
    pub(crate) fn account_call(
        &mut self,
        account: &Rc<RefCell<CompositeValue>>,
        name: Name,
        invocation: ExprId,
        arguments: &[Argument],
    ) -> EvalResult<Value> {
        let address = {
            let account = account.borrow();
            match account.get_field(self.names.address) {
                Some(Value::Address(address)) => *address,
                _ => return Err(RuntimeError::Internal("account without address".to_string())),
            }
        };

        let n = &self.names;
        let (save, load, copy, borrow, link, unlink, get_capability) = (
            n.save,
            n.load,
            n.copy,
            n.borrow,
            n.link,
            n.unlink,
            n.get_capability,
        );

        if name == save {
            let value = {
                let v = self.eval_expr(arguments[0].value)?;
                self.transferred(v)
            };
            let path = self.eval_path_argument(&arguments[1])?;
            return self.storage_save(address, value, path);
        }
        if name == load {
            let path = self.eval_path_argument(&arguments[0])?;
            let expected = self.invocation_type_argument(invocation)?;
            return self.storage_load(address, path, expected);
        }
        if name == copy {
            let path = self.eval_path_argument(&arguments[0])?;
            let expected = self.invocation_type_argument(invocation)?;
            let loaded = self.read_checked(address, &path, expected)?;
            return Ok(Value::optional(loaded.map(|value| value.deep_copy())));
        }
        if name == borrow {
            let path = self.eval_path_argument(&arguments[0])?;
            let expected = self.invocation_type_argument(invocation)?;
            return self.storage_borrow(address, path, expected);
        }
        if name == link {
            let new_path = self.eval_path_argument(&arguments[0])?;
            let target = self.eval_path_argument(&arguments[1])?;
            let borrow_ty = self.invocation_type_argument(invocation)?;
            return self.storage_link(address, new_path, target, borrow_ty);
        }
        if name == unlink {
            let path = self.eval_path_argument(&arguments[0])?;
            self.host
                .storage_write(address, path.domain, &path.identifier, None);
            return Ok(Value::Void);
        }
        if name == get_capability {
            let path = self.eval_path_argument(&arguments[0])?;
            let borrow_ty = self.invocation_type_argument(invocation)?;
            let borrow_type = self.static_type_of(borrow_ty);
            self.gauge.use_memory(MemoryKind::Capability, 1)?;
            // Never validated here; `borrow` does the work.
            return Ok(Value::Capability(CapabilityValue {
                address,
                path,
                borrow_type,
            }));
        }
        Err(RuntimeError::Internal(format!(
            "unknown account member `{}`",
            self.interner.lookup(name)
        )))
    }

    fn eval_path_argument(&mut self, argument: &Argument) -> EvalResult<PathValue> {
        match self.eval_expr(argument.value)? {
            Value::Path(path) => Ok(path),
            other => Err(RuntimeError::Internal(format!("expected a path, got {other}"))),
        }
    }

    fn invocation_type_argument(&mut self, invocation: ExprId) -> EvalResult<TypeId> {
        self.elaboration
            .type_arguments
            .get(&invocation)
            .and_then(|args| args.first())
            .copied()
            .ok_or_else(|| RuntimeError::Internal("missing type argument".to_string()))
    }

    /// `save<T>(value, to:)`: the target must be in the storage domain
    /// and vacant.
    fn storage_save(&mut self, address: [u8; 8], value: Value, path: PathValue) -> EvalResult<Value> {
        if path.domain != PathDomain::Storage {
            return Err(RuntimeError::InvalidPathDomain {
                expected: "storage",
                actual: path.to_string(),
            });
        }
        if self
            .host
            .storage_read(address, path.domain, &path.identifier)
            .is_some()
        {
            return Err(RuntimeError::StorageSlotOccupied {
                path: path.to_string(),
            });
        }
        // Persisting is a move: the value gains an owner and any
        // outstanding ephemeral references die.
        self.bump_transfer(&value);
        if let Value::Composite(composite) = &value {
            composite.borrow_mut().owner = Some(address);
        }
        self.host
            .storage_write(address, path.domain, &path.identifier, Some(value));
        Ok(Value::Void)
    }

    /// `load<T>(from:)`: remove and return, checked against T.
    fn storage_load(
        &mut self,
        address: [u8; 8],
        path: PathValue,
        expected: TypeId,
    ) -> EvalResult<Value> {
        let Some(value) = self.read_checked(address, &path, expected)? else {
            return Ok(Value::Nil);
        };
        self.host
            .storage_write(address, path.domain, &path.identifier, None);
        self.bump_transfer(&value);
        if let Value::Composite(composite) = &value {
            composite.borrow_mut().owner = None;
        }
        Ok(Value::some(value))
    }

    /// `borrow<T>(from:)`: a storage reference into the slot.
    fn storage_borrow(
        &mut self,
        address: [u8; 8],
        path: PathValue,
        expected: TypeId,
    ) -> EvalResult<Value> {
        let referenced = self.referenced_type(expected)?;
        let Some(stored) = self
            .host
            .storage_read(address, path.domain, &path.identifier)
        else {
            return Ok(Value::Nil);
        };
        if !value_satisfies(&stored, referenced, &mut self.pool) {
            return Err(RuntimeError::ForceCastFailed {
                expected: self.pool.display(referenced),
                actual: format!("{:?}", stored.dynamic_type()),
            });
        }
        self.gauge.use_memory(MemoryKind::Reference, 1)?;
        Ok(Value::some(Value::Reference(ReferenceValue::Storage {
            address,
            path,
            borrow_type: self.static_type_of(expected),
        })))
    }

    /// `link<T>(newPath, target:)`: install a typed redirect. Linking in
    /// the storage domain is an error; an occupied path yields nil.
    fn storage_link(
        &mut self,
        address: [u8; 8],
        new_path: PathValue,
        target: PathValue,
        borrow_ty: TypeId,
    ) -> EvalResult<Value> {
        if new_path.domain == PathDomain::Storage {
            return Err(RuntimeError::InvalidPathDomain {
                expected: "private or public",
                actual: new_path.to_string(),
            });
        }
        if self
            .host
            .storage_read(address, new_path.domain, &new_path.identifier)
            .is_some()
        {
            return Ok(Value::Nil);
        }
        let borrow_type = self.static_type_of(borrow_ty);
        self.host.storage_write(
            address,
            new_path.domain,
            &new_path.identifier,
            Some(Value::Link(LinkValue {
                target,
                borrow_type: borrow_type.clone(),
            })),
        );
        self.gauge.use_memory(MemoryKind::Capability, 1)?;
        Ok(Value::some(Value::Capability(CapabilityValue {
            address,
            path: new_path,
            borrow_type,
        })))
    }

    /// The referent type behind an interned reference type.
    fn referenced_type(&mut self, reference: TypeId) -> EvalResult<TypeId> {
        match self.pool.entry(reference) {
            cadence_types::TypeEntry::Reference { referenced, .. } => Ok(*referenced),
            _ => Err(RuntimeError::Internal("expected a reference type".to_string())),
        }
    }

    fn read_checked(
        &mut self,
        address: [u8; 8],
        path: &PathValue,
        expected: TypeId,
    ) -> EvalResult<Option<Value>> {
        let Some(value) = self
            .host
            .storage_read(address, path.domain, &path.identifier)
        else {
            return Ok(None);
        };
        if !value_satisfies(&value, expected, &mut self.pool) {
            return Err(RuntimeError::ForceCastFailed {
                expected: self.pool.display(expected),
                actual: format!("{:?}", value.dynamic_type()),
            });
        }
        Ok(Some(value))
    }

    /// `cap.borrow()`: walk the link chain, checking each hop's declared
    /// type, and borrow the final value at the capability's type.
    /// Returns nil for missing targets, incompatible hops, and cycles.
    pub(crate) fn capability_borrow(&mut self, capability: &CapabilityValue) -> EvalResult<Value> {
        let StaticType::Reference { referenced, .. } = &capability.borrow_type else {
            return Ok(Value::Nil);
        };
        let Some(requested) = capability.borrow_type.to_type(&mut self.pool) else {
            return Ok(Value::Nil);
        };
        let Some(referenced) = referenced.to_type(&mut self.pool) else {
            return Ok(Value::Nil);
        };

        let mut current = capability.path.clone();
        let mut visited: FxHashSet<(PathDomain, String)> = FxHashSet::default();
        let mut depth: u32 = 0;
        loop {
            if !visited.insert((current.domain, current.identifier.to_string())) {
                // Link cycle.
                return Ok(Value::Nil);
            }
            depth += 1;
            if depth > CAPABILITY_DEPTH_LIMIT {
                return Err(RuntimeError::NestedCapability {
                    depth: CAPABILITY_DEPTH_LIMIT,
                });
            }
            self.gauge.use_computation(1)?;

            let Some(value) = self.host.storage_read(
                capability.address,
                current.domain,
                &current.identifier,
            ) else {
                return Ok(Value::Nil);
            };
            match value {
                Value::Link(link) => {
                    // Each hop must be at least as capable as requested.
                    let Some(hop) = link.borrow_type.to_type(&mut self.pool) else {
                        return Ok(Value::Nil);
                    };
                    if !self.pool.is_subtype(hop, requested) {
                        return Ok(Value::Nil);
                    }
                    current = link.target;
                }
                stored => {
                    if !value_satisfies(&stored, referenced, &mut self.pool) {
                        return Ok(Value::Nil);
                    }
                    self.gauge.use_memory(MemoryKind::Reference, 1)?;
                    return Ok(Value::some(Value::Reference(ReferenceValue::Storage {
                        address: capability.address,
                        path: current,
                        borrow_type: capability.borrow_type.clone(),
                    })));
                }
            }
        }
    }
}
