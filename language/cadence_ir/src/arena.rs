//! Arena allocation for AST nodes.
//!
//! Expressions and statements are stored in contiguous arrays and
//! referenced by 32-bit indices. Child links in the AST are ids, not
//! boxes, so side tables (the checker's elaboration) can key off the same
//! ids.

use crate::ast::{Expr, ExprId, Stmt, StmtId};

/// Arena holding every expression and statement node of one program.
#[derive(Debug, Default, Clone)]
pub struct NodeArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an expression, returning its id.
    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(u32::try_from(self.exprs.len()).expect("expression arena overflow"));
        self.exprs.push(expr);
        id
    }

    /// Allocate a statement, returning its id.
    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId::new(u32::try_from(self.stmts.len()).expect("statement arena overflow"));
        self.stmts.push(stmt);
        id
    }

    /// Get the expression for an id.
    ///
    /// Ids are only minted by `alloc_expr`, so indexing cannot fail for ids
    /// of the same program.
    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    /// Get the statement for an id.
    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    /// Number of allocated expressions.
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Number of allocated statements.
    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }
}
