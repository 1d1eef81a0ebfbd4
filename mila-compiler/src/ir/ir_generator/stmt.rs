use tracing::{debug, trace};

use super::context::Gen;
use crate::ir::ast::{Expr, Program, Stmt};
use crate::ir::error_utils::make_semantic_error;
use crate::ir::*;
use crate::{CompileError, SemanticErrorKind};

impl Gen<'_> {
    pub fn lower_program(&mut self, p: &Program) -> Result<(), CompileError> {
        debug!(program = %p.name, globals = self.symbols.len(), "lowering program");
        self.materialize_globals();

        let entry = self.builder.append_block("entry");
        self.builder.position_at_end(entry);

        self.emit_block(&p.body)?;

        // Control that falls off the end of the body exits with status 0.
        self.builder.build_return(Some(Value::ConstInt(0)))?;
        Ok(())
    }

    /// Lower a statement list in order, sharing the insertion point.
    pub fn emit_block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        for s in stmts {
            self.lower_stmt(s)?;
        }
        Ok(())
    }

    /// Lower one statement; a fault is tagged with the statement's pre-order
    /// index.
    pub fn lower_stmt(&mut self, s: &Stmt) -> Result<(), CompileError> {
        let index = self.statements_seen;
        self.statements_seen += 1;
        self.lower_stmt_kind(s).map_err(|e| e.in_statement(index))
    }

    fn lower_stmt_kind(&mut self, s: &Stmt) -> Result<(), CompileError> {
        match s {
            Stmt::Assign { target, value } => self.lower_assign(target, value),
            Stmt::Read { target } => self.lower_read(target),
            Stmt::Write { value } => self.lower_write(value),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.lower_if(condition, then_branch, else_branch.as_deref()),
            Stmt::While { condition, body } => self.lower_while(condition, body),
            Stmt::Break => self.lower_break(),
            Stmt::Block(stmts) => self.emit_block(stmts),
        }
    }

    /// Reject mutation of a `const` before any code for the statement exists.
    fn guard_mutable(&self, target: &Expr) -> Result<(), CompileError> {
        match target.reference_name() {
            Some(name) if self.symbols.is_const(name) => Err(make_semantic_error(
                SemanticErrorKind::AssignToConstant,
                format!("Cannot assign to constant '{}'", name),
            )),
            _ => Ok(()),
        }
    }

    fn lower_assign(&mut self, target: &Expr, value: &Expr) -> Result<(), CompileError> {
        self.guard_mutable(target)?;
        trace!(target = ?target.reference_name(), "assign");
        let v = self.lower_int(value)?;
        let ptr = self.lower_place(target)?;
        self.builder.build_store(v, ptr)?;
        Ok(())
    }

    fn lower_read(&mut self, target: &Expr) -> Result<(), CompileError> {
        self.guard_mutable(target)?;
        let ptr = self.lower_place(target)?;
        let scanf = self.scanf();
        let fmt = self.scan_format();
        self.builder
            .build_call(scanf, Type::I32, vec![fmt, ptr], "scanfCall")?;
        Ok(())
    }

    fn lower_write(&mut self, value: &Expr) -> Result<(), CompileError> {
        let v = self.lower_int(value)?;
        let printf = self.printf();
        let fmt = self.print_format();
        self.builder
            .build_call(printf, Type::I32, vec![fmt, v], "printfCall")?;
        Ok(())
    }

    fn lower_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<(), CompileError> {
        let cond = self.lower_cond(condition)?;

        let then_bb = self.builder.append_block("then");
        let else_bb = self.builder.create_block("else");
        let merge_bb = self.builder.create_block("ifcont");
        debug!(?then_bb, ?else_bb, ?merge_bb, "conditional blocks");

        self.builder.build_cond_br(cond, then_bb, else_bb)?;

        self.builder.position_at_end(then_bb);
        self.lower_stmt(then_branch)?;
        // The then-branch may have moved the insertion point.
        self.builder.build_br(merge_bb)?;

        self.builder.attach_block(else_bb);
        self.builder.position_at_end(else_bb);
        if let Some(else_branch) = else_branch {
            self.lower_stmt(else_branch)?;
        }
        self.builder.build_br(merge_bb)?;

        self.builder.attach_block(merge_bb);
        self.builder.position_at_end(merge_bb);
        Ok(())
    }

    fn lower_while(&mut self, condition: &Expr, body: &Stmt) -> Result<(), CompileError> {
        let cond = self.lower_cond(condition)?;

        let loop_bb = self.builder.append_block("loop");
        let after_bb = self.builder.create_block("after");
        debug!(?loop_bb, ?after_bb, "loop blocks");

        self.builder.build_cond_br(cond, loop_bb, after_bb)?;

        self.with_break_target(after_bb, |g| {
            g.builder.position_at_end(loop_bb);
            g.lower_stmt(body)?;
            let again = g.lower_cond(condition)?;
            g.builder.build_cond_br(again, loop_bb, after_bb)?;
            Ok::<(), CompileError>(())
        })?;

        self.builder.attach_block(after_bb);
        self.builder.position_at_end(after_bb);
        Ok(())
    }

    fn lower_break(&mut self) -> Result<(), CompileError> {
        let Some(target) = self.break_target else {
            return Err(make_semantic_error(
                SemanticErrorKind::BreakOutsideLoop,
                "'break' used outside of a loop".to_string(),
            ));
        };
        self.builder.build_br(target)?;
        // Statements after the break still need a block to live in.
        let cont = self.builder.append_block("aftbreak");
        self.builder.position_at_end(cont);
        Ok(())
    }
}
