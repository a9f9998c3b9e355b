//! Statement execution and control flow.

use cadence_ir::{Block, ExprId, ExprKind, StmtId, StmtKind, Transfer};

use crate::errors::{EvalResult, RuntimeError};
use crate::host::Host;
use crate::value::Value;

use super::Interpreter;

/// How a statement left the surrounding block.
#[derive(Debug)]
pub(crate) enum Control {
    Normal,
    Return(Value),
}

impl<H: Host> Interpreter<'_, H> {
    pub(crate) fn exec_block(&mut self, block: &Block) -> EvalResult<Control> {
        self.environment.push();
        let result = self.exec_statements(block);
        self.environment.pop();
        result
    }

    pub(crate) fn exec_statements(&mut self, block: &Block) -> EvalResult<Control> {
        for &stmt in &block.statements {
            if let Control::Return(value) = self.exec_stmt(stmt)? {
                return Ok(Control::Return(value));
            }
        }
        Ok(Control::Normal)
    }

    fn exec_stmt(&mut self, id: StmtId) -> EvalResult<Control> {
        self.gauge.use_computation(1)?;
        let stmt = self.program.arena.stmt(id).clone();
        match &stmt.kind {
            StmtKind::VariableDeclaration {
                name,
                transfer,
                value,
                ..
            } => {
                let value = self.eval_transfer_source(*value, *transfer)?;
                let value = if *transfer == Transfer::Copy {
                    self.transferred(value)
                } else {
                    value
                };
                self.environment.declare(*name, value);
                Ok(Control::Normal)
            }

            StmtKind::Assignment {
                target,
                transfer,
                value,
            } => {
                self.exec_assignment(*target, *transfer, *value)?;
                Ok(Control::Normal)
            }

            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                if self.eval_bool(*condition)? {
                    self.exec_block(then_block)
                } else if let Some(else_block) = else_block {
                    self.exec_block(else_block)
                } else {
                    Ok(Control::Normal)
                }
            }

            StmtKind::While { condition, block } => {
                while self.eval_bool(*condition)? {
                    if let Control::Return(value) = self.exec_block(block)? {
                        return Ok(Control::Return(value));
                    }
                }
                Ok(Control::Normal)
            }

            StmtKind::Return { value } => {
                let value = match value {
                    Some(expr) => self.eval_expr(*expr)?,
                    None => Value::Void,
                };
                Ok(Control::Return(value))
            }

            StmtKind::Destroy { expr } => {
                let value = self.eval_move_source(*expr)?;
                self.destroy_value(value)?;
                Ok(Control::Normal)
            }

            StmtKind::Emit { invocation } => {
                let event = self.eval_expr(*invocation)?;
                self.emit_event(event)?;
                Ok(Control::Normal)
            }

            StmtKind::Expression { expr } => {
                self.eval_expr(*expr)?;
                Ok(Control::Normal)
            }
        }
    }

    fn exec_assignment(&mut self, target: ExprId, transfer: Transfer, value: ExprId) -> EvalResult<()> {
        let target_kind = self.program.arena.expr(target).kind.clone();
        match &target_kind {
            ExprKind::Identifier(name) => {
                let new_value = self.eval_transfer_source(value, transfer)?;
                let new_value = if transfer == Transfer::Copy {
                    self.transferred(new_value)
                } else {
                    new_value
                };
                self.environment.assign(*name, new_value)
            }

            ExprKind::Member { base, name } => {
                let base_value = self.eval_expr(*base)?;
                let base_value = self.deref_if_reference(base_value)?;
                let new_value = self.eval_transfer_source(value, transfer)?;
                let new_value = if transfer == Transfer::Copy {
                    self.transferred(new_value)
                } else {
                    new_value
                };
                let Value::Composite(composite) = base_value else {
                    return Err(RuntimeError::Internal(
                        "member assignment on non-composite".to_string(),
                    ));
                };
                let old = composite.borrow_mut().set_field(*name, new_value);
                self.check_discarded(old)
            }

            ExprKind::Index { base, index } => {
                let base_value = self.eval_expr(*base)?;
                let base_value = self.deref_if_reference(base_value)?;
                let index_value = self.eval_expr(*index)?;
                let new_value = self.eval_transfer_source(value, transfer)?;
                let new_value = if transfer == Transfer::Copy {
                    self.transferred(new_value)
                } else {
                    new_value
                };
                match base_value {
                    Value::Array(array) => {
                        let index = self.expect_index(&index_value)?;
                        let old = array.borrow_mut().set(index, new_value)?;
                        self.check_discarded(Some(old))
                    }
                    Value::Dictionary(dictionary) => {
                        let old = dictionary.borrow_mut().insert(index_value, new_value);
                        self.check_discarded(old)
                    }
                    _ => Err(RuntimeError::Internal(
                        "index assignment on non-container".to_string(),
                    )),
                }
            }

            _ => Err(RuntimeError::Internal(
                "invalid assignment target".to_string(),
            )),
        }
    }

    /// Overwriting a live resource would lose it. The checker prevents
    /// this; the runtime keeps the check as defense in depth.
    pub(crate) fn check_discarded(&self, old: Option<Value>) -> EvalResult<()> {
        match old {
            Some(Value::Composite(composite)) => {
                let composite = composite.borrow();
                if composite.kind.is_resource() && !composite.destroyed {
                    return Err(RuntimeError::ResourceLostRuntime);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Evaluate the right-hand side of a binding or assignment. A move
    /// transfer from a bare identifier consumes the slot directly.
    pub(crate) fn eval_transfer_source(
        &mut self,
        value: ExprId,
        transfer: Transfer,
    ) -> EvalResult<Value> {
        if transfer == Transfer::Move {
            if let ExprKind::Identifier(name) = self.program.arena.expr(value).kind {
                let moved = self.environment.take_for_move(name)?;
                self.bump_transfer(&moved);
                return Ok(moved);
            }
        }
        self.eval_expr(value)
    }

    /// Evaluate a move operand: `<-x` and `destroy x` consume identifier
    /// slots; everything else must produce a fresh value.
    pub(crate) fn eval_move_source(&mut self, expr: ExprId) -> EvalResult<Value> {
        if let ExprKind::Identifier(name) = self.program.arena.expr(expr).kind {
            let moved = self.environment.take_for_move(name)?;
            self.bump_transfer(&moved);
            return Ok(moved);
        }
        self.eval_expr(expr)
    }

    pub(crate) fn eval_bool(&mut self, expr: ExprId) -> EvalResult<bool> {
        match self.eval_expr(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::Internal(format!(
                "expected a boolean, got {other}"
            ))),
        }
    }
}
