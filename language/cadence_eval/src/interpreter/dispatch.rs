//! Invocation dispatch.
//!
//! Mirrors the checker's invocation analysis: builtin identifier
//! callees, storage-API and reflection member calls, builtin container
//! members, composite methods, and finally first-class function values.

use cadence_ir::{Argument, ExprId, ExprKind, Location, Name};
use cadence_types::NumericType;
use num_bigint::BigInt;

use crate::builtins::rlp;
use crate::errors::{EvalResult, RuntimeError};
use crate::host::{HashAlgorithm, Host, SignatureAlgorithm};
use crate::value::{FunctionValue, IntegerValue, Value};

use super::Interpreter;

impl<H: Host> Interpreter<'_, H> {
    pub(crate) fn eval_invocation(
        &mut self,
        id: ExprId,
        callee: ExprId,
        arguments: &[Argument],
    ) -> EvalResult<Value> {
        // Builtin identifier callees.
        if let ExprKind::Identifier(name) = self.program.arena.expr(callee).kind {
            if name == self.names.panic {
                let message = self.eval_string_argument(arguments, 0)?;
                return Err(RuntimeError::Panic(message));
            }
            if name == self.names.assert {
                let Some(condition) = arguments.first() else {
                    return Err(RuntimeError::Internal("assert without condition".to_string()));
                };
                if self.eval_bool(condition.value)? {
                    return Ok(Value::Void);
                }
                let message = match arguments.get(1) {
                    Some(argument) => Some(self.eval_string_argument_at(argument)?),
                    None => None,
                };
                return Err(RuntimeError::AssertionFailed(message));
            }
            if name == self.names.unsafe_random {
                let value = self.host.unsafe_random();
                return Ok(self.uint64_value(value));
            }
            if name == self.names.type_ {
                let ty = self
                    .elaboration
                    .type_arguments
                    .get(&id)
                    .and_then(|args| args.first())
                    .copied();
                return Ok(Value::TypeValue(ty.map(|ty| self.static_type_of(ty))));
            }
            if name == self.names.before {
                return self.snapshot_value(id);
            }
        }

        // Member callees.
        if let ExprKind::Member { base, name } = self.program.arena.expr(callee).kind {
            return self.eval_member_call(id, callee, base, name, arguments);
        }

        // Constructor named directly.
        if let Some(&type_id) = self.elaboration.type_references.get(&callee) {
            let arguments = self.eval_arguments(arguments)?;
            return self.construct_composite(type_id, arguments);
        }

        // First-class function value.
        let callee_value = self.eval_expr(callee)?;
        let arguments = self.eval_arguments(arguments)?;
        match callee_value {
            Value::Function(function) => match *function {
                FunctionValue::Declared {
                    key, self_value, ..
                } => {
                    let Some(decl) = self.functions.get(&key).copied() else {
                        return Err(RuntimeError::Internal("dangling function value".to_string()));
                    };
                    self.call_declared(decl, key, self_value, arguments)
                }
                FunctionValue::Constructor { type_id } => {
                    self.construct_composite(type_id, arguments)
                }
            },
            other => Err(RuntimeError::Internal(format!("{other} is not callable"))),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn eval_member_call(
        &mut self,
        id: ExprId,
        callee: ExprId,
        base: ExprId,
        name: Name,
        arguments: &[Argument],
    ) -> EvalResult<Value> {
        let n = &self.names;
        let (get_type, is_instance, is_subtype) = (n.get_type, n.is_instance, n.is_subtype);

        // Reflection members exist on every value.
        if name == get_type {
            let value = self.eval_expr(base)?;
            return Ok(Value::TypeValue(Some(value.dynamic_type())));
        }
        if name == is_instance {
            let value = self.eval_expr(base)?;
            let ty = self.eval_expr(arguments[0].value)?;
            return Ok(Value::Bool(self.type_predicate(
                Some(value.dynamic_type()),
                ty,
            )));
        }

        // Nested-type constructors: `Contract.NestedType(...)`.
        if let Some(&type_id) = self.elaboration.type_references.get(&callee) {
            let arguments = self.eval_arguments(arguments)?;
            return self.construct_composite(type_id, arguments);
        }

        let base_value = self.eval_expr(base)?;
        let base_value = self.deref_if_reference(base_value)?;

        match &base_value {
            Value::TypeValue(ty) if name == is_subtype => {
                let other = self.eval_expr(arguments[0].value)?;
                Ok(Value::Bool(self.type_predicate(ty.clone(), other)))
            }

            Value::Capability(capability) => {
                if name == self.names.borrow {
                    let capability = capability.clone();
                    return self.capability_borrow(&capability);
                }
                if name == self.names.check {
                    let capability = capability.clone();
                    let resolved = self.capability_borrow(&capability)?;
                    return Ok(Value::Bool(!matches!(resolved, Value::Nil)));
                }
                Err(self.not_callable(name))
            }

            Value::Array(array) => {
                let array = array.clone();
                let (append, concat, contains, remove, insert) = (
                    self.names.append,
                    self.names.concat,
                    self.names.contains,
                    self.names.remove,
                    self.names.insert,
                );
                if name == append {
                    let value = self.eval_argument(&arguments[0])?;
                    array.borrow_mut().append(value);
                    return Ok(Value::Void);
                }
                if name == concat {
                    let other = self.eval_expr(arguments[0].value)?;
                    let Value::Array(other) = self.deref_if_reference(other)? else {
                        return Err(RuntimeError::Internal("concat expects an array".to_string()));
                    };
                    let (static_type, mut elements) = {
                        let array = array.borrow();
                        (
                            array.static_type.clone(),
                            array.iter().cloned().collect::<Vec<_>>(),
                        )
                    };
                    elements.extend(other.borrow().iter().cloned());
                    return Ok(Value::array(static_type, elements));
                }
                if name == contains {
                    let value = self.eval_expr(arguments[0].value)?;
                    let found = array.borrow().iter().any(|element| element.equals(&value));
                    return Ok(Value::Bool(found));
                }
                if name == remove {
                    let index_value = self.eval_expr(arguments[0].value)?;
                    let index = self.expect_index(&index_value)?;
                    return array.borrow_mut().remove(index);
                }
                if name == insert {
                    let index_value = self.eval_expr(arguments[0].value)?;
                    let index = self.expect_index(&index_value)?;
                    let value = self.eval_argument(&arguments[1])?;
                    array.borrow_mut().insert(index, value)?;
                    return Ok(Value::Void);
                }
                Err(self.not_callable(name))
            }

            Value::Dictionary(dictionary) => {
                let dictionary = dictionary.clone();
                let (insert, remove, contains_key) = (
                    self.names.insert,
                    self.names.remove,
                    self.names.contains_key,
                );
                if name == insert {
                    let key = self.eval_expr(arguments[0].value)?;
                    let value = self.eval_argument(&arguments[1])?;
                    let old = dictionary.borrow_mut().insert(key, value);
                    return Ok(Value::optional(old));
                }
                if name == remove {
                    let key = self.eval_expr(arguments[0].value)?;
                    let old = dictionary.borrow_mut().remove(&key);
                    return Ok(Value::optional(old));
                }
                if name == contains_key {
                    let key = self.eval_expr(arguments[0].value)?;
                    return Ok(Value::Bool(dictionary.borrow().contains_key(&key)));
                }
                Err(self.not_callable(name))
            }

            Value::String(receiver) => {
                if name == self.names.concat {
                    let other = self.eval_expr(arguments[0].value)?;
                    let Value::String(other) = other else {
                        return Err(RuntimeError::Internal("concat expects a string".to_string()));
                    };
                    return Ok(Value::string(format!("{receiver}{other}")));
                }
                Err(self.not_callable(name))
            }

            Value::Composite(composite) => {
                let composite = composite.clone();
                let (qualified, location, type_id) = {
                    let composite = composite.borrow();
                    (
                        composite.qualified_name.to_string(),
                        composite.location.clone(),
                        composite.type_id,
                    )
                };

                if location == Location::Builtin {
                    match qualified.as_str() {
                        "AuthAccount" | "PublicAccount" => {
                            return self.account_call(&composite, name, id, arguments);
                        }
                        "RLP" => return self.rlp_call(name, arguments),
                        "BLS" => return self.bls_call(name, arguments),
                        "PublicKey" => return self.public_key_call(&composite, name, arguments),
                        "Crypto.KeyList" => {
                            return self.key_list_call(&composite, name, arguments)
                        }
                        _ => {}
                    }
                }

                // User method, own declaration first, interface default
                // otherwise.
                let qualified_name = self.interner.intern(&qualified);
                let key = cadence_typeck::FunctionKey::member(qualified_name, name);
                if let Some(decl) = self.functions.get(&key).copied() {
                    let arguments = self.eval_arguments(arguments)?;
                    return self.call_declared(decl, key, Some(composite), arguments);
                }
                if let Some(&interface_ty) = self
                    .elaboration
                    .default_implementations
                    .get(&(type_id, name))
                {
                    if let Some(iid) = self.pool.as_interface(interface_ty) {
                        let interface_name = self.pool.interface_data(iid).name;
                        let key = cadence_typeck::FunctionKey::member(interface_name, name);
                        if let Some(decl) = self.functions.get(&key).copied() {
                            let arguments = self.eval_arguments(arguments)?;
                            return self.call_declared(decl, key, Some(composite), arguments);
                        }
                    }
                }
                Err(self.not_callable(name))
            }

            other => Err(RuntimeError::Internal(format!(
                "cannot call member on {other}"
            ))),
        }
    }

    /// Evaluate arguments in order; moves inside the argument
    /// expressions consume their sources.
    pub(crate) fn eval_arguments(&mut self, arguments: &[Argument]) -> EvalResult<Vec<Value>> {
        arguments
            .iter()
            .map(|argument| self.eval_argument(argument))
            .collect()
    }

    fn eval_argument(&mut self, argument: &Argument) -> EvalResult<Value> {
        let value = self.eval_expr(argument.value)?;
        Ok(self.transferred(value))
    }

    fn eval_string_argument(&mut self, arguments: &[Argument], index: usize) -> EvalResult<String> {
        let Some(argument) = arguments.get(index) else {
            return Err(RuntimeError::Internal("missing argument".to_string()));
        };
        self.eval_string_argument_at(argument)
    }

    fn eval_string_argument_at(&mut self, argument: &Argument) -> EvalResult<String> {
        match self.eval_expr(argument.value)? {
            Value::String(s) => Ok(s.to_string()),
            Value::Some(inner) => match *inner {
                Value::String(s) => Ok(s.to_string()),
                other => Ok(other.to_string()),
            },
            other => Ok(other.to_string()),
        }
    }

    /// `isSubtype(of:)` / `isInstance(_:)`: unknown types answer false.
    fn type_predicate(
        &mut self,
        actual: Option<cadence_types::StaticType>,
        other: Value,
    ) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let Value::TypeValue(Some(target)) = other else {
            return false;
        };
        let Some(actual) = actual.to_type(&mut self.pool) else {
            return false;
        };
        let Some(target) = target.to_type(&mut self.pool) else {
            return false;
        };
        self.pool.is_subtype(actual, target)
    }

    fn not_callable(&self, name: Name) -> RuntimeError {
        RuntimeError::Internal(format!(
            "`{}` is not callable here",
            self.interner.lookup(name)
        ))
    }

    // Builtin contract implementations.

    fn rlp_call(&mut self, name: Name, arguments: &[Argument]) -> EvalResult<Value> {
        let input_value = self.eval_expr(arguments[0].value)?;
        let input = self.value_to_bytes(&input_value)?;
        if name == self.names.decode_string {
            let decoded = rlp::decode_string(&input)?;
            return Ok(self.bytes_value(&decoded));
        }
        if name == self.names.decode_list {
            let elements = rlp::decode_list(&input)?;
            let values: Vec<Value> = elements
                .iter()
                .map(|element| self.bytes_value(element))
                .collect();
            let bytes_type = self.bytes_static_type();
            return Ok(Value::array(
                cadence_types::StaticType::VariableArray(Box::new(bytes_type)),
                values,
            ));
        }
        Err(self.not_callable(name))
    }

    fn bls_call(&mut self, name: Name, arguments: &[Argument]) -> EvalResult<Value> {
        if name == self.names.aggregate_signatures {
            let list = self.eval_expr(arguments[0].value)?;
            let Value::Array(list) = list else {
                return Err(RuntimeError::Internal("expected a signature list".to_string()));
            };
            let signatures = list
                .borrow()
                .iter()
                .map(|signature| self.value_to_bytes(signature))
                .collect::<EvalResult<Vec<_>>>()?;
            let aggregated = self.host.bls_aggregate_signatures(&signatures);
            return Ok(Value::optional(
                aggregated.map(|bytes| self.bytes_value(&bytes)),
            ));
        }
        if name == self.names.aggregate_public_keys {
            let list = self.eval_expr(arguments[0].value)?;
            let Value::Array(list) = list else {
                return Err(RuntimeError::Internal("expected a key list".to_string()));
            };
            let keys = list
                .borrow()
                .iter()
                .map(|key| self.public_key_bytes(key))
                .collect::<EvalResult<Vec<_>>>()?;
            let Some(aggregated) = self.host.bls_aggregate_public_keys(&keys) else {
                return Ok(Value::Nil);
            };
            let aggregated_value = self.bytes_value(&aggregated);
            let algorithm = self.signature_algorithm_case(SignatureAlgorithm::BlsBls12381)?;
            let key = self.make_public_key(aggregated_value, algorithm)?;
            return Ok(Value::some(key));
        }
        Err(self.not_callable(name))
    }

    fn public_key_call(
        &mut self,
        receiver: &std::rc::Rc<std::cell::RefCell<crate::value::CompositeValue>>,
        name: Name,
        arguments: &[Argument],
    ) -> EvalResult<Value> {
        if name != self.names.verify {
            return Err(self.not_callable(name));
        }
        let signature = {
            let v = self.eval_expr(arguments[0].value)?;
            self.value_to_bytes(&v)?
        };
        let signed_data = {
            let v = self.eval_expr(arguments[1].value)?;
            self.value_to_bytes(&v)?
        };
        let domain_tag = self.eval_string_argument(arguments, 2)?;
        let hash_raw = {
            let v = self.eval_expr(arguments[3].value)?;
            self.enum_raw_u8(&v)?
        };
        let (key_bytes, signature_raw) = {
            let receiver = receiver.borrow();
            let key = receiver
                .get_field(self.names.public_key)
                .cloned()
                .unwrap_or(Value::Nil);
            let algorithm = receiver
                .get_field(self.names.signature_algorithm)
                .cloned()
                .unwrap_or(Value::Nil);
            (key, algorithm)
        };
        let key_bytes = self.value_to_bytes(&key_bytes)?;
        let signature_raw = self.enum_raw_u8(&signature_raw)?;

        let signature_algorithm = SignatureAlgorithm::from_raw(signature_raw)
            .ok_or_else(|| RuntimeError::Internal("bad signature algorithm".to_string()))?;
        let hash_algorithm = HashAlgorithm::from_raw(hash_raw)
            .ok_or_else(|| RuntimeError::Internal("bad hash algorithm".to_string()))?;

        Ok(Value::Bool(self.host.verify_signature(
            signature_algorithm,
            hash_algorithm,
            &key_bytes,
            &signature,
            &signed_data,
            &domain_tag,
        )))
    }

    fn key_list_call(
        &mut self,
        receiver: &std::rc::Rc<std::cell::RefCell<crate::value::CompositeValue>>,
        name: Name,
        arguments: &[Argument],
    ) -> EvalResult<Value> {
        let entries = {
            let receiver = receiver.borrow();
            match receiver.get_field(self.names.entries) {
                Some(Value::Array(entries)) => entries.clone(),
                _ => return Err(RuntimeError::Internal("key list without entries".to_string())),
            }
        };

        let (add, get, revoke, verify) = (
            self.names.add,
            self.names.get,
            self.names.revoke,
            self.names.verify,
        );
        if name == add {
            let public_key = self.eval_expr(arguments[0].value)?;
            let hash_algorithm = self.eval_expr(arguments[1].value)?;
            let weight = self.eval_expr(arguments[2].value)?;
            let key_index = entries.borrow().count() as i64;
            let entry = self.make_key_list_entry(
                key_index,
                public_key,
                hash_algorithm,
                weight,
            )?;
            entries.borrow_mut().append(entry.clone());
            return Ok(entry);
        }
        if name == get {
            let index_value = self.eval_expr(arguments[0].value)?;
            let index = self.expect_index(&index_value)?;
            let entry = entries.borrow().get(index).cloned();
            return Ok(Value::optional(entry));
        }
        if name == revoke {
            let index_value = self.eval_expr(arguments[0].value)?;
            let index = self.expect_index(&index_value)?;
            let entry = entries.borrow().get(index).cloned();
            if let Some(Value::Composite(entry)) = entry {
                entry
                    .borrow_mut()
                    .set_field(self.names.is_revoked, Value::Bool(true));
            }
            return Ok(Value::Void);
        }
        if name == verify {
            return self.key_list_verify(&entries, arguments);
        }
        Err(self.not_callable(name))
    }

    fn key_list_verify(
        &mut self,
        entries: &std::rc::Rc<std::cell::RefCell<crate::value::ArrayValue>>,
        arguments: &[Argument],
    ) -> EvalResult<Value> {
        let signature_set = self.eval_expr(arguments[0].value)?;
        let signed_data = {
            let v = self.eval_expr(arguments[1].value)?;
            self.value_to_bytes(&v)?
        };
        let Value::Array(signatures) = signature_set else {
            return Err(RuntimeError::Internal("expected a signature set".to_string()));
        };

        let mut total_weight = BigInt::from(0);
        let signatures: Vec<Value> = signatures.borrow().iter().cloned().collect();
        for signature in signatures {
            let Value::Composite(signature) = signature else {
                return Ok(Value::Bool(false));
            };
            let (key_index, signature_bytes) = {
                let signature = signature.borrow();
                let index = signature
                    .get_field(self.names.key_index)
                    .cloned()
                    .unwrap_or(Value::Nil);
                let bytes = signature
                    .get_field(self.names.signature)
                    .cloned()
                    .unwrap_or(Value::Nil);
                (index, bytes)
            };
            let index = self.expect_index(&key_index)?;
            let signature_bytes = self.value_to_bytes(&signature_bytes)?;

            let entry = entries.borrow().get(index).cloned();
            let Some(Value::Composite(entry)) = entry else {
                return Ok(Value::Bool(false));
            };
            let (revoked, public_key, hash_raw, weight) = {
                let entry = entry.borrow();
                (
                    matches!(entry.get_field(self.names.is_revoked), Some(Value::Bool(true))),
                    entry.get_field(self.names.public_key).cloned(),
                    entry.get_field(self.names.hash_algorithm).cloned(),
                    entry.get_field(self.names.weight).cloned(),
                )
            };
            if revoked {
                return Ok(Value::Bool(false));
            }
            let Some(Value::Composite(public_key)) = public_key else {
                return Ok(Value::Bool(false));
            };
            let (key_bytes, signature_raw) = {
                let public_key = public_key.borrow();
                (
                    public_key.get_field(self.names.public_key).cloned(),
                    public_key.get_field(self.names.signature_algorithm).cloned(),
                )
            };
            let key_bytes = self.value_to_bytes(&key_bytes.unwrap_or(Value::Nil))?;
            let signature_algorithm = SignatureAlgorithm::from_raw(
                self.enum_raw_u8(&signature_raw.unwrap_or(Value::Nil))?,
            )
            .ok_or_else(|| RuntimeError::Internal("bad signature algorithm".to_string()))?;
            let hash_algorithm =
                HashAlgorithm::from_raw(self.enum_raw_u8(&hash_raw.unwrap_or(Value::Nil))?)
                    .ok_or_else(|| RuntimeError::Internal("bad hash algorithm".to_string()))?;

            let verified = self.host.verify_signature(
                signature_algorithm,
                hash_algorithm,
                &key_bytes,
                &signature_bytes,
                &signed_data,
                "FLOW-V0.0-user",
            );
            if !verified {
                return Ok(Value::Bool(false));
            }
            if let Some(Value::Integer(weight)) = weight {
                total_weight += weight.value();
            }
        }

        // The verifying keys' weights must reach full weight (1.0).
        Ok(Value::Bool(
            total_weight >= BigInt::from(crate::value::FIXED_POINT_SCALE),
        ))
    }

    // Shared conversions.

    pub(crate) fn value_to_bytes(&self, value: &Value) -> EvalResult<Vec<u8>> {
        let Value::Array(array) = value else {
            return Err(RuntimeError::Internal("expected a byte array".to_string()));
        };
        array
            .borrow()
            .iter()
            .map(|element| match element {
                Value::Integer(integer) => integer
                    .value()
                    .try_into()
                    .map_err(|_| RuntimeError::Internal("byte out of range".to_string())),
                _ => Err(RuntimeError::Internal("expected a byte".to_string())),
            })
            .collect()
    }

    pub(crate) fn bytes_value(&self, bytes: &[u8]) -> Value {
        let values: Vec<Value> = bytes
            .iter()
            .map(|&byte| {
                Value::Integer(IntegerValue::raw(NumericType::UInt8, BigInt::from(byte)))
            })
            .collect();
        Value::array(self.bytes_static_type(), values)
    }

    fn bytes_static_type(&self) -> cadence_types::StaticType {
        cadence_types::StaticType::VariableArray(Box::new(cadence_types::StaticType::Primitive(
            cadence_types::Primitive::Numeric(NumericType::UInt8),
        )))
    }

    fn public_key_bytes(&mut self, value: &Value) -> EvalResult<Vec<u8>> {
        let Value::Composite(key) = value else {
            return Err(RuntimeError::Internal("expected a public key".to_string()));
        };
        let bytes = key
            .borrow()
            .get_field(self.names.public_key)
            .cloned()
            .unwrap_or(Value::Nil);
        self.value_to_bytes(&bytes)
    }

    pub(crate) fn enum_raw_u8(&self, value: &Value) -> EvalResult<u8> {
        let Value::Composite(case) = value else {
            return Err(RuntimeError::Internal("expected an enum case".to_string()));
        };
        let raw = case
            .borrow()
            .get_field(self.names.raw_value)
            .cloned()
            .unwrap_or(Value::Nil);
        match raw {
            Value::Integer(integer) => integer
                .value()
                .try_into()
                .map_err(|_| RuntimeError::Internal("raw value out of range".to_string())),
            _ => Err(RuntimeError::Internal("enum case without raw value".to_string())),
        }
    }

    fn signature_algorithm_case(&mut self, algorithm: SignatureAlgorithm) -> EvalResult<Value> {
        let name = self.interner.intern("SignatureAlgorithm");
        let Some(enum_ty) = self.pool.lookup_nominal(&Location::Builtin, name) else {
            return Err(RuntimeError::Internal("missing SignatureAlgorithm".to_string()));
        };
        let case_name = match algorithm {
            SignatureAlgorithm::EcdsaP256 => "ECDSA_P256",
            SignatureAlgorithm::EcdsaSecp256k1 => "ECDSA_secp256k1",
            SignatureAlgorithm::BlsBls12381 => "BLS_BLS12_381",
        };
        let case = self.interner.intern(case_name);
        self.enum_case_value(enum_ty, case)?
            .ok_or_else(|| RuntimeError::Internal("missing enum case".to_string()))
    }

    fn make_public_key(&mut self, key_bytes: Value, algorithm: Value) -> EvalResult<Value> {
        let name = self.interner.intern("PublicKey");
        let Some(type_id) = self.pool.lookup_nominal(&Location::Builtin, name) else {
            return Err(RuntimeError::Internal("missing PublicKey".to_string()));
        };
        self.construct_composite(type_id, vec![key_bytes, algorithm])
    }

    fn make_key_list_entry(
        &mut self,
        key_index: i64,
        public_key: Value,
        hash_algorithm: Value,
        weight: Value,
    ) -> EvalResult<Value> {
        let name = self.interner.intern("Crypto.KeyListEntry");
        let Some(type_id) = self.pool.lookup_nominal(&Location::Builtin, name) else {
            return Err(RuntimeError::Internal("missing KeyListEntry".to_string()));
        };
        self.construct_composite(
            type_id,
            vec![
                Value::int(key_index),
                public_key,
                hash_algorithm,
                weight,
                Value::Bool(false),
            ],
        )
    }

}
