//! Function calls, conditions, snapshots, construction, destruction.

use std::cell::RefCell;
use std::rc::Rc;

use cadence_ir::{Condition, ExprId, FunctionDeclaration, SpecialFunction};
use cadence_typeck::FunctionKey;
use cadence_types::TypeId;
use num_bigint::BigInt;
use rustc_hash::FxHashMap;

use crate::environment::Environment;
use crate::errors::{EvalResult, RuntimeError};
use crate::host::Host;
use crate::metering::MemoryKind;
use crate::value::{CompositeValue, IntegerValue, Value};

use super::stmt::Control;
use super::Interpreter;

impl<H: Host> Interpreter<'_, H> {
    /// Call a declared function: new activation, bind arguments, run the
    /// `pre` clauses, capture `before(...)` snapshots, evaluate the
    /// body, then run the `post` clauses with `result` bound.
    pub(crate) fn call_declared(
        &mut self,
        decl: &FunctionDeclaration,
        key: FunctionKey,
        self_value: Option<Rc<RefCell<CompositeValue>>>,
        arguments: Vec<Value>,
    ) -> EvalResult<Value> {
        let Some(body) = &decl.body else {
            return Err(RuntimeError::Internal(format!(
                "`{}` has no body",
                self.interner.lookup(decl.name)
            )));
        };

        let saved = std::mem::replace(&mut self.environment, Environment::new());
        self.environment.push();
        self.bind_arguments(&decl.parameters, arguments);
        if let Some(self_value) = self_value {
            self.environment
                .declare(self.names.self_, Value::Composite(self_value));
        }

        for condition in &decl.preconditions {
            self.check_runtime_condition(condition, true)?;
        }

        // Snapshots for `before(...)` are captured at entry, after the
        // preconditions held.
        let mut frame = FxHashMap::default();
        if let Some(snapshots) = self.elaboration.snapshots.get(&key).cloned() {
            for (snapshot_id, expr) in snapshots {
                let value = self.eval_expr(expr)?;
                frame.insert(snapshot_id, value);
            }
        }
        self.snapshots.push(frame);

        let control = self.exec_statements(body)?;
        let result = match control {
            Control::Return(value) => value,
            Control::Normal => Value::Void,
        };

        if !decl.postconditions.is_empty() {
            self.environment.push();
            self.environment
                .declare(self.names.result, result.clone());
            for condition in &decl.postconditions {
                self.check_runtime_condition(condition, false)?;
            }
            self.environment.pop();
        }

        self.snapshots.pop();
        self.environment = saved;
        Ok(result)
    }

    fn bind_arguments(&mut self, parameters: &[cadence_ir::Parameter], arguments: Vec<Value>) {
        for (parameter, argument) in parameters.iter().zip(arguments) {
            let value = self.transferred(argument);
            self.environment.declare(parameter.name, value);
        }
    }

    fn check_runtime_condition(&mut self, condition: &Condition, entry: bool) -> EvalResult<()> {
        if self.eval_bool(condition.expr)? {
            return Ok(());
        }
        let message = match condition.message {
            Some(expr) => match self.eval_expr(expr)? {
                Value::String(s) => Some(s.to_string()),
                other => Some(other.to_string()),
            },
            None => None,
        };
        Err(if entry {
            RuntimeError::PreconditionFailed(message)
        } else {
            RuntimeError::PostconditionFailed(message)
        })
    }

    /// The captured value of a `before(...)` snapshot.
    pub(crate) fn snapshot_value(&mut self, invocation: ExprId) -> EvalResult<Value> {
        let Some(&snapshot_id) = self.elaboration.snapshot_ids.get(&invocation) else {
            return Err(RuntimeError::Internal(
                "before() without a recorded snapshot".to_string(),
            ));
        };
        self.snapshots
            .last()
            .and_then(|frame| frame.get(&snapshot_id))
            .cloned()
            .ok_or_else(|| RuntimeError::Internal("missing snapshot frame".to_string()))
    }

    /// `create T(...)`, event construction, and contract instantiation.
    ///
    /// Allocates the composite with every declared field invalidated,
    /// assigns the uuid for resources, then runs the user initializer.
    pub(crate) fn construct_composite(
        &mut self,
        type_id: TypeId,
        arguments: Vec<Value>,
    ) -> EvalResult<Value> {
        let Some(cid) = self.pool.as_composite(type_id) else {
            return Err(RuntimeError::Internal("constructing a non-composite".to_string()));
        };
        self.gauge.use_computation(1)?;
        self.gauge.use_memory(MemoryKind::Composite, 1)?;

        let (location, qualified, kind, field_names) = {
            let data = self.pool.composite_data(cid);
            (
                data.location.clone(),
                self.interner.lookup(data.name),
                data.kind,
                data.fields.iter().map(|f| f.name).collect::<Vec<_>>(),
            )
        };
        let name = self.interner.intern(&qualified);

        let mut fields: Vec<(cadence_ir::Name, Value)> = field_names
            .iter()
            .map(|&field| (field, Value::InvalidatedResource))
            .collect();

        let declaration = self.composites.get(&name).copied();
        match declaration {
            Some(decl) if decl.initializer.is_some() => {}
            _ => {
                // No user initializer: events and builtin composites take
                // their fields positionally.
                for (slot, argument) in fields.iter_mut().zip(arguments.iter()) {
                    slot.1 = argument.clone();
                }
                // Builtins with internal state.
                if &*qualified == "Crypto.KeyList" {
                    fields.push((
                        self.names.entries,
                        Value::array(
                            cadence_types::StaticType::Primitive(
                                cadence_types::Primitive::AnyStruct,
                            ),
                            Vec::new(),
                        ),
                    ));
                }
            }
        }

        let mut composite = CompositeValue::new(location, qualified.as_str(), kind, type_id, fields);
        if kind.is_resource() {
            composite.uuid = Some(self.host.next_uuid());
        }
        let value = Value::composite(composite);

        if let Some(decl) = declaration {
            if let Some(initializer) = &decl.initializer {
                let Value::Composite(rc) = &value else {
                    unreachable!()
                };
                self.call_special(initializer, rc.clone(), arguments)?;
            }
        }
        Ok(value)
    }

    /// Run `init` or `destroy`: same activation discipline as a call,
    /// no conditions.
    pub(crate) fn call_special(
        &mut self,
        special: &SpecialFunction,
        self_value: Rc<RefCell<CompositeValue>>,
        arguments: Vec<Value>,
    ) -> EvalResult<()> {
        let saved = std::mem::replace(&mut self.environment, Environment::new());
        self.environment.push();
        self.bind_arguments(&special.parameters, arguments);
        self.environment
            .declare(self.names.self_, Value::Composite(self_value));
        self.exec_statements(&special.body)?;
        self.environment = saved;
        Ok(())
    }

    /// `destroy x`: run the user `destroy` body, recursively consume
    /// resource fields in declaration order, then invalidate the value.
    pub(crate) fn destroy_value(&mut self, value: Value) -> EvalResult<()> {
        self.gauge.use_computation(1)?;
        match value {
            Value::Composite(composite) => {
                {
                    let borrowed = composite.borrow();
                    if !borrowed.kind.is_resource() {
                        return Err(RuntimeError::Internal(
                            "destroy of non-resource".to_string(),
                        ));
                    }
                    if borrowed.destroyed {
                        return Err(RuntimeError::UseAfterMoveRuntime);
                    }
                }

                let name = {
                    let borrowed = composite.borrow();
                    self.interner.intern(&borrowed.qualified_name)
                };
                if let Some(decl) = self.composites.get(&name).copied() {
                    if let Some(destructor) = &decl.destructor {
                        self.call_special(destructor, composite.clone(), Vec::new())?;
                    }
                }

                // Consume owned resource fields, declaration order.
                let field_names: Vec<_> = composite
                    .borrow()
                    .iterate_fields()
                    .map(|(field, _)| field)
                    .collect();
                for field in field_names {
                    let field_value = composite.borrow_mut().take_field(field);
                    if let Some(field_value) = field_value {
                        if field_value.is_resource_kinded() {
                            self.destroy_value(field_value)?;
                        }
                    }
                }

                composite.borrow_mut().destroyed = true;
                Ok(())
            }
            Value::Array(array) => {
                let elements: Vec<Value> = array.borrow().iter().cloned().collect();
                for element in elements {
                    if element.is_resource_kinded() {
                        self.destroy_value(element)?;
                    }
                }
                Ok(())
            }
            Value::Dictionary(dictionary) => {
                let values: Vec<Value> = dictionary.borrow().values().cloned().collect();
                for value in values {
                    if value.is_resource_kinded() {
                        self.destroy_value(value)?;
                    }
                }
                Ok(())
            }
            Value::Some(inner) => self.destroy_value(*inner),
            Value::Nil => Ok(()),
            Value::InvalidatedResource => Err(RuntimeError::UseAfterMoveRuntime),
            _ => Err(RuntimeError::Internal("destroy of non-resource".to_string())),
        }
    }

    /// Emit an event value to the host sink.
    pub(crate) fn emit_event(&mut self, event: Value) -> EvalResult<()> {
        let Value::Composite(composite) = &event else {
            return Err(RuntimeError::Internal("emit of non-event".to_string()));
        };
        let (type_identifier, field_names) = {
            let composite = composite.borrow();
            let identifier = if composite.location.is_builtin() {
                composite.qualified_name.to_string()
            } else {
                format!("{}.{}", composite.location, composite.qualified_name)
            };
            (
                identifier,
                composite
                    .iterate_fields()
                    .map(|(name, _)| name)
                    .collect::<Vec<_>>(),
            )
        };

        let mut fields = Vec::with_capacity(field_names.len());
        for field in field_names {
            let value = composite
                .borrow()
                .get_field(field)
                .cloned()
                .unwrap_or(Value::Void);
            let exported = crate::bridge::export_value(&value, &self.interner, &self.host)?;
            fields.push((self.interner.lookup(field), exported));
        }

        self.host.emit_event(crate::bridge::ExportedEvent {
            type_identifier,
            fields,
        });
        Ok(())
    }

    /// The `UInt64` value of a host-provided id.
    pub(crate) fn uint64_value(&self, value: u64) -> Value {
        Value::Integer(IntegerValue::raw(
            cadence_types::NumericType::UInt64,
            BigInt::from(value),
        ))
    }
}
