//! Expression evaluation.

use cadence_ir::{BinaryOp, CastKind, CompositeKind, ExprId, ExprKind, Name, UnaryOp};
use cadence_types::NumericType;
use num_bigint::BigInt;

use crate::bridge::value_satisfies;
use crate::errors::{EvalResult, RuntimeError};
use crate::host::Host;
use crate::metering::MemoryKind;
use crate::value::{
    CompositeValue, IntegerValue, PathValue, ReferenceValue, Value,
};

use super::Interpreter;

impl<H: Host> Interpreter<'_, H> {
    pub(crate) fn eval_expr(&mut self, id: ExprId) -> EvalResult<Value> {
        self.gauge.use_computation(1)?;
        let expr = self.program.arena.expr(id).clone();
        match &expr.kind {
            ExprKind::IntegerLiteral(value) => {
                let kind = self
                    .pool
                    .numeric(self.elaboration.expr_type(id))
                    .unwrap_or(NumericType::Int);
                self.gauge.use_memory(MemoryKind::Primitive, 1)?;
                Value::integer(kind, value.clone())
            }
            ExprKind::FixedPointLiteral { scaled } => {
                let kind = self
                    .pool
                    .numeric(self.elaboration.expr_type(id))
                    .unwrap_or(NumericType::Fix64);
                self.gauge.use_memory(MemoryKind::Primitive, 1)?;
                Value::integer(kind, BigInt::from(*scaled))
            }
            ExprKind::StringLiteral(name) => {
                self.gauge.use_memory(MemoryKind::String, 1)?;
                Ok(Value::string(self.interner.lookup(*name).as_str()))
            }
            ExprKind::BoolLiteral(value) => Ok(Value::Bool(*value)),
            ExprKind::NilLiteral => Ok(Value::Nil),
            ExprKind::AddressLiteral(address) => Ok(Value::Address(*address)),
            ExprKind::PathLiteral { domain, identifier } => {
                let identifier = self.interner.lookup(*identifier);
                Ok(Value::Path(PathValue::new(*domain, identifier.as_str())))
            }
            ExprKind::ArrayLiteral(elements) => {
                self.gauge.use_computation(elements.len() as u64)?;
                self.gauge.use_memory(MemoryKind::Array, 1 + elements.len() as u64)?;
                let values = elements
                    .iter()
                    .map(|&element| {
                        let value = self.eval_expr(element)?;
                        Ok(self.transferred_unless_resource(value))
                    })
                    .collect::<EvalResult<Vec<_>>>()?;
                let static_type = self.static_type_of(self.elaboration.expr_type(id));
                Ok(Value::array(static_type, values))
            }
            ExprKind::DictionaryLiteral(entries) => {
                self.gauge.use_computation(entries.len() as u64)?;
                self.gauge
                    .use_memory(MemoryKind::Dictionary, 1 + entries.len() as u64)?;
                let mut values = Vec::with_capacity(entries.len());
                for &(key, value) in entries {
                    let key = self.eval_expr(key)?;
                    let value = self.eval_expr(value)?;
                    let value = self.transferred_unless_resource(value);
                    values.push((key, value));
                }
                let static_type = self.static_type_of(self.elaboration.expr_type(id));
                Ok(Value::dictionary(static_type, values))
            }
            ExprKind::Identifier(name) => self.eval_identifier(id, *name),
            ExprKind::Member { base, name } => self.eval_member(id, *base, *name),
            ExprKind::Index { base, index } => self.eval_index(*base, *index),
            ExprKind::Invocation {
                callee, arguments, ..
            } => self.eval_invocation(id, *callee, arguments),
            ExprKind::Create { invocation } => self.eval_expr(*invocation),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, *operand),
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, *left, *right),
            ExprKind::Cast {
                operand,
                kind,
                ..
            } => self.eval_cast(id, *operand, *kind),
            ExprKind::Reference { operand, .. } => self.eval_reference(id, *operand),
            ExprKind::ForceUnwrap { operand } => match self.eval_expr(*operand)? {
                Value::Some(inner) => Ok(*inner),
                Value::Nil => Err(RuntimeError::ForceUnwrapNil),
                other => Ok(other),
            },
            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.eval_bool(*condition)? {
                    self.eval_expr(*then_expr)
                } else {
                    self.eval_expr(*else_expr)
                }
            }
        }
    }

    fn transferred_unless_resource(&self, value: Value) -> Value {
        if value.is_resource_kinded() {
            value
        } else {
            self.transferred(value)
        }
    }

    fn eval_identifier(&mut self, _id: ExprId, name: Name) -> EvalResult<Value> {
        if let Ok(value) = self.environment.lookup(name) {
            return Ok(value);
        }
        if let Some(value) = self.globals.get(&name) {
            return Ok(value.clone());
        }
        // A bare global function name is a first-class function value.
        let key = cadence_typeck::FunctionKey::global(name);
        if self.functions.contains_key(&key) {
            let ty = self
                .elaboration
                .function_types
                .get(&name)
                .copied()
                .unwrap_or(cadence_types::TypeId::INVALID);
            return Ok(Value::function(crate::value::FunctionValue::Declared {
                key,
                self_value: None,
                ty,
            }));
        }
        // The environment reports invalidated slots itself; reaching here
        // with a tracked name means a moved slot.
        self.environment.lookup(name)
    }

    pub(crate) fn eval_member(&mut self, id: ExprId, base: ExprId, name: Name) -> EvalResult<Value> {
        // `Contract.NestedType` and `EnumType.case`.
        if let Some(&nested) = self.elaboration.type_references.get(&id) {
            return Ok(Value::function(crate::value::FunctionValue::Constructor {
                type_id: nested,
            }));
        }
        if let Some(&base_ty) = self.elaboration.type_references.get(&base) {
            if let Some(case) = self.enum_case_value(base_ty, name)? {
                return Ok(case);
            }
        }

        let base_value = self.eval_expr(base)?;
        let base_value = self.deref_if_reference(base_value)?;
        self.gauge.use_computation(1)?;

        match &base_value {
            Value::Composite(composite) => {
                let (qualified, type_id) = {
                    let composite = composite.borrow();
                    if name == self.names.uuid {
                        if let Some(uuid) = composite.uuid {
                            return Value::integer(NumericType::UInt64, BigInt::from(uuid));
                        }
                    }
                    if let Some(value) = composite.get_field(name) {
                        if matches!(value, Value::InvalidatedResource) {
                            return Err(RuntimeError::UseAfterMoveRuntime);
                        }
                        return Ok(value.clone());
                    }
                    (
                        self.interner.intern(&composite.qualified_name),
                        composite.type_id,
                    )
                };
                // A method accessed as a value binds its receiver.
                let key = cadence_typeck::FunctionKey::member(qualified, name);
                if self.functions.contains_key(&key) {
                    return Ok(Value::function(crate::value::FunctionValue::Declared {
                        key,
                        self_value: Some(composite.clone()),
                        ty: cadence_types::TypeId::INVALID,
                    }));
                }
                if let Some(&interface_ty) = self
                    .elaboration
                    .default_implementations
                    .get(&(type_id, name))
                {
                    if let Some(iid) = self.pool.as_interface(interface_ty) {
                        let interface_name = self.pool.interface_data(iid).name;
                        let key = cadence_typeck::FunctionKey::member(interface_name, name);
                        return Ok(Value::function(crate::value::FunctionValue::Declared {
                            key,
                            self_value: Some(composite.clone()),
                            ty: cadence_types::TypeId::INVALID,
                        }));
                    }
                }
                Err(RuntimeError::Internal(format!(
                    "no member `{}`",
                    self.interner.lookup(name)
                )))
            }
            Value::Array(array) => {
                if name == self.names.length {
                    return Ok(Value::int(array.borrow().count() as i64));
                }
                Err(self.unknown_runtime_member(name))
            }
            Value::Dictionary(dictionary) => {
                let n = &self.names;
                if name == n.length {
                    return Ok(Value::int(dictionary.borrow().count() as i64));
                }
                if name == n.keys {
                    let dictionary = dictionary.borrow();
                    let keys: Vec<Value> = dictionary.keys().cloned().collect();
                    let key_type = match &dictionary.static_type {
                        cadence_types::StaticType::Dictionary { key, .. } => (**key).clone(),
                        _ => cadence_types::StaticType::Primitive(cadence_types::Primitive::Never),
                    };
                    return Ok(Value::array(
                        cadence_types::StaticType::VariableArray(Box::new(key_type)),
                        keys,
                    ));
                }
                if name == n.values {
                    let dictionary = dictionary.borrow();
                    let values: Vec<Value> = dictionary.values().cloned().collect();
                    let value_type = match &dictionary.static_type {
                        cadence_types::StaticType::Dictionary { value, .. } => (**value).clone(),
                        _ => cadence_types::StaticType::Primitive(cadence_types::Primitive::Never),
                    };
                    return Ok(Value::array(
                        cadence_types::StaticType::VariableArray(Box::new(value_type)),
                        values,
                    ));
                }
                Err(self.unknown_runtime_member(name))
            }
            Value::String(s) => {
                if name == self.names.length {
                    return Ok(Value::int(s.chars().count() as i64));
                }
                if name == self.names.utf8 {
                    let bytes: Vec<Value> = s
                        .as_bytes()
                        .iter()
                        .map(|&b| {
                            Value::Integer(IntegerValue::raw(NumericType::UInt8, BigInt::from(b)))
                        })
                        .collect();
                    return Ok(Value::array(
                        cadence_types::StaticType::VariableArray(Box::new(
                            cadence_types::StaticType::Primitive(
                                cadence_types::Primitive::Numeric(NumericType::UInt8),
                            ),
                        )),
                        bytes,
                    ));
                }
                Err(self.unknown_runtime_member(name))
            }
            Value::Capability(capability) => {
                if name == self.names.address {
                    return Ok(Value::Address(capability.address));
                }
                Err(self.unknown_runtime_member(name))
            }
            _ => Err(self.unknown_runtime_member(name)),
        }
    }

    fn unknown_runtime_member(&self, name: Name) -> RuntimeError {
        RuntimeError::Internal(format!(
            "no runtime member `{}`",
            self.interner.lookup(name)
        ))
    }

    /// Construct an enum case value.
    pub(crate) fn enum_case_value(
        &mut self,
        enum_ty: cadence_types::TypeId,
        case: Name,
    ) -> EvalResult<Option<Value>> {
        let Some(cid) = self.pool.as_composite(enum_ty) else {
            return Ok(None);
        };
        let data = self.pool.composite_data(cid);
        if data.kind != CompositeKind::Enum {
            return Ok(None);
        }
        let Some(index) = data.case_names.iter().position(|&c| c == case) else {
            return Err(RuntimeError::EnumCaseNotFound(self.interner.lookup(case)));
        };
        let raw_kind = data
            .raw_type
            .and_then(|raw| self.pool.numeric(raw))
            .unwrap_or(NumericType::UInt8);
        let (location, qualified_name) = (
            data.location.clone(),
            self.interner.lookup(data.name),
        );
        let raw_value = Value::Integer(IntegerValue::raw(raw_kind, BigInt::from(index)));
        Ok(Some(Value::composite(CompositeValue::new(
            location,
            qualified_name.as_str(),
            CompositeKind::Enum,
            enum_ty,
            vec![(self.names.raw_value, raw_value)],
        ))))
    }

    fn eval_index(&mut self, base: ExprId, index: ExprId) -> EvalResult<Value> {
        let base_value = self.eval_expr(base)?;
        let base_value = self.deref_if_reference(base_value)?;
        let index_value = self.eval_expr(index)?;
        self.gauge.use_computation(1)?;
        match base_value {
            Value::Array(array) => {
                let index = self.expect_index(&index_value)?;
                let array = array.borrow();
                match array.get(index) {
                    Some(Value::InvalidatedResource) => Err(RuntimeError::UseAfterMoveRuntime),
                    Some(value) => Ok(value.clone()),
                    None => Err(RuntimeError::IndexOutOfBounds {
                        index: index as i64,
                        size: array.count(),
                    }),
                }
            }
            Value::Dictionary(dictionary) => {
                let dictionary = dictionary.borrow();
                Ok(Value::optional(dictionary.get(&index_value).cloned()))
            }
            other => Err(RuntimeError::Internal(format!("cannot index {other}"))),
        }
    }

    pub(crate) fn expect_index(&self, value: &Value) -> EvalResult<usize> {
        let Value::Integer(integer) = value else {
            return Err(RuntimeError::Internal("non-integer index".to_string()));
        };
        integer.to_usize().ok_or(RuntimeError::IndexOutOfBounds {
            index: -1,
            size: 0,
        })
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: ExprId) -> EvalResult<Value> {
        match op {
            UnaryOp::Move => self.eval_move_source(operand),
            UnaryOp::Not => {
                let value = self.eval_bool(operand)?;
                Ok(Value::Bool(!value))
            }
            UnaryOp::Minus => match self.eval_expr(operand)? {
                Value::Integer(integer) => Ok(Value::Integer(integer.checked_neg()?)),
                other => Err(RuntimeError::Internal(format!("cannot negate {other}"))),
            },
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> EvalResult<Value> {
        // Short-circuiting operators evaluate the right side lazily.
        match op {
            BinaryOp::And => {
                return Ok(Value::Bool(
                    self.eval_bool(left)? && self.eval_bool(right)?,
                ));
            }
            BinaryOp::Or => {
                return Ok(Value::Bool(
                    self.eval_bool(left)? || self.eval_bool(right)?,
                ));
            }
            BinaryOp::NilCoalesce => {
                return match self.eval_expr(left)? {
                    Value::Some(inner) => Ok(*inner),
                    Value::Nil => self.eval_expr(right),
                    other => Ok(other),
                };
            }
            _ => {}
        }

        let left_value = self.eval_expr(left)?;
        let right_value = self.eval_expr(right)?;
        self.gauge.use_computation(1)?;

        match op {
            BinaryOp::Equal => Ok(Value::Bool(left_value.equals(&right_value))),
            BinaryOp::NotEqual => Ok(Value::Bool(!left_value.equals(&right_value))),
            BinaryOp::Add if matches!(left_value, Value::String(_)) => {
                match (left_value, right_value) {
                    (Value::String(a), Value::String(b)) => {
                        self.gauge.use_memory(MemoryKind::String, 1)?;
                        Ok(Value::string(format!("{a}{b}")))
                    }
                    _ => Err(RuntimeError::Internal("mixed concatenation".to_string())),
                }
            }
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod => {
                let (Value::Integer(a), Value::Integer(b)) = (&left_value, &right_value) else {
                    return Err(RuntimeError::Internal(format!(
                        "arithmetic on {left_value} and {right_value}"
                    )));
                };
                let result = match op {
                    BinaryOp::Add => a.checked_add(b)?,
                    BinaryOp::Sub => a.checked_sub(b)?,
                    BinaryOp::Mul => a.checked_mul(b)?,
                    BinaryOp::Div => a.checked_div(b)?,
                    BinaryOp::Mod => a.checked_rem(b)?,
                    _ => unreachable!(),
                };
                Ok(Value::Integer(result))
            }
            BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => {
                let (Value::Integer(a), Value::Integer(b)) = (&left_value, &right_value) else {
                    return Err(RuntimeError::Internal("unordered operands".to_string()));
                };
                let Some(ordering) = a.compare(b) else {
                    return Err(RuntimeError::Internal("mixed numeric kinds".to_string()));
                };
                let result = match op {
                    BinaryOp::Less => ordering.is_lt(),
                    BinaryOp::LessEqual => ordering.is_le(),
                    BinaryOp::Greater => ordering.is_gt(),
                    BinaryOp::GreaterEqual => ordering.is_ge(),
                    _ => unreachable!(),
                };
                Ok(Value::Bool(result))
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::NilCoalesce => unreachable!(),
        }
    }

    fn eval_cast(&mut self, id: ExprId, operand: ExprId, kind: CastKind) -> EvalResult<Value> {
        let value = self.eval_expr(operand)?;
        match kind {
            // The checker proved static casts.
            CastKind::Static => Ok(value),
            CastKind::Failable | CastKind::Force => {
                let target = self
                    .elaboration
                    .cast_targets
                    .get(&id)
                    .copied()
                    .unwrap_or(cadence_types::TypeId::INVALID);
                let satisfied = value_satisfies(&value, target, &mut self.pool);
                match (kind, satisfied) {
                    (CastKind::Failable, true) => Ok(Value::some(value)),
                    (CastKind::Failable, false) => Ok(Value::Nil),
                    (CastKind::Force, true) => Ok(value),
                    (CastKind::Force, false) => Err(RuntimeError::ForceCastFailed {
                        expected: self.pool.display(target),
                        actual: format!("{:?}", value.dynamic_type()),
                    }),
                    (CastKind::Static, _) => unreachable!(),
                }
            }
        }
    }

    fn eval_reference(&mut self, id: ExprId, operand: ExprId) -> EvalResult<Value> {
        let target = self.eval_expr(operand)?;
        let version = match &target {
            Value::Composite(composite) => composite.borrow().transfer_count,
            Value::Array(array) => array.borrow().transfer_count,
            Value::Dictionary(dictionary) => dictionary.borrow().transfer_count,
            _ => 0,
        };
        let borrow_type = self
            .elaboration
            .reference_types
            .get(&id)
            .copied()
            .map(|ty| self.static_type_of(ty))
            .unwrap_or_else(|| target.dynamic_type());
        self.gauge.use_memory(MemoryKind::Reference, 1)?;
        Ok(Value::Reference(ReferenceValue::Ephemeral {
            target: Box::new(target),
            version,
            borrow_type,
        }))
    }

    /// Reach through a reference, enforcing liveness (ephemeral) or the
    /// borrow type against the current stored value (storage).
    pub(crate) fn deref_if_reference(&mut self, value: Value) -> EvalResult<Value> {
        let Value::Reference(reference) = value else {
            return Ok(value);
        };
        self.deref_reference(&reference)
    }

    pub(crate) fn deref_reference(&mut self, reference: &ReferenceValue) -> EvalResult<Value> {
        match reference {
            ReferenceValue::Ephemeral {
                target, version, ..
            } => {
                let live = match &**target {
                    Value::Composite(composite) => {
                        let composite = composite.borrow();
                        !composite.destroyed && composite.transfer_count == *version
                    }
                    Value::Array(array) => array.borrow().transfer_count == *version,
                    Value::Dictionary(dictionary) => {
                        dictionary.borrow().transfer_count == *version
                    }
                    _ => true,
                };
                if !live {
                    return Err(RuntimeError::DereferenceFailed);
                }
                Ok((**target).clone())
            }
            ReferenceValue::Storage {
                address,
                path,
                borrow_type,
            } => {
                let Some(stored) =
                    self.host
                        .storage_read(*address, path.domain, &path.identifier)
                else {
                    return Err(RuntimeError::DereferenceFailed);
                };
                // The borrow type is enforced on every access.
                let referenced = match borrow_type {
                    cadence_types::StaticType::Reference { referenced, .. } => referenced,
                    other => other,
                };
                let Some(expected) = referenced.to_type(&mut self.pool) else {
                    return Err(RuntimeError::DereferenceFailed);
                };
                if !value_satisfies(&stored, expected, &mut self.pool) {
                    return Err(RuntimeError::ForceCastFailed {
                        expected: self.pool.display(expected),
                        actual: format!("{:?}", stored.dynamic_type()),
                    });
                }
                Ok(stored)
            }
        }
    }
}
