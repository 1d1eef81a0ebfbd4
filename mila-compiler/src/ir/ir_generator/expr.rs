use tracing::trace;

use super::bindings::{Shape, Storage};
use super::context::Gen;
use crate::ir::ast::{Access, BinOp as AstBinOp, Expr};
use crate::ir::error_utils::{make_semantic_error, unbound};
use crate::ir::*;
use crate::{CompileError, SemanticErrorKind};

impl Gen<'_> {
    /// Lower an expression to a value: `i32` for arithmetic, loads and
    /// literals, `i1` for comparisons, `ptr` for lvalue references.
    pub fn lower_expr(&mut self, e: &Expr) -> Result<Value, CompileError> {
        match e {
            Expr::Number(n) => Ok(Value::ConstInt(*n)),
            Expr::Variable { name, access } => self.lower_variable(name, *access),
            Expr::Index {
                name,
                index,
                access,
            } => self.lower_element(name, index, *access),
            Expr::Neg(operand) => {
                let v = self.lower_int(operand)?;
                Ok(self.builder.build_neg(v, "minus")?)
            }
            Expr::Binary { op, left, right } => self.lower_binary(*op, left, right),
        }
    }

    /// Lower an expression where an integer is required.
    pub fn lower_int(&mut self, e: &Expr) -> Result<Value, CompileError> {
        let v = self.lower_expr(e)?;
        self.as_int(v)
    }

    /// Lower an expression where a branch condition is required.
    pub fn lower_cond(&mut self, e: &Expr) -> Result<Value, CompileError> {
        let v = self.lower_expr(e)?;
        self.as_condition(v)
    }

    /// Address of an assignment or `readln` target.
    pub fn lower_place(&mut self, target: &Expr) -> Result<Value, CompileError> {
        match target {
            Expr::Variable { name, .. } => self.lower_variable(name, Access::Lvalue),
            Expr::Index { name, index, .. } => self.lower_element(name, index, Access::Lvalue),
            other => Err(make_semantic_error(
                SemanticErrorKind::UnresolvedOperand,
                format!("{} cannot be assigned to", describe(other)),
            )),
        }
    }

    fn storage(&self, name: &str) -> Result<Storage, CompileError> {
        self.bindings.get(name).ok_or_else(|| unbound(name))
    }

    fn lower_variable(&mut self, name: &str, access: Access) -> Result<Value, CompileError> {
        let storage = self.storage(name)?;
        if let Shape::Array { .. } = storage.shape {
            return Err(make_semantic_error(
                SemanticErrorKind::UnresolvedOperand,
                format!("Array '{}' used without an index", name),
            ));
        }
        let ptr = Value::Global(storage.global);
        match access {
            Access::Lvalue => Ok(ptr),
            Access::Rvalue => Ok(self.builder.build_load(ptr, name)?),
        }
    }

    fn lower_element(
        &mut self,
        name: &str,
        index: &Expr,
        access: Access,
    ) -> Result<Value, CompileError> {
        let storage = self.storage(name)?;
        let Shape::Array { len, origin } = storage.shape else {
            return Err(make_semantic_error(
                SemanticErrorKind::UnresolvedOperand,
                format!("'{}' is not an array and cannot be indexed", name),
            ));
        };
        let mut idx = self.lower_int(index)?;
        if origin != 0 {
            idx = self.builder.build_binary(
                BinaryOp::Sub,
                idx,
                Value::ConstInt(origin),
                "rebased",
            )?;
        }
        trace!(array = name, len, origin, "element address");
        let ptr = self
            .builder
            .build_element_ptr(Value::Global(storage.global), len, idx, "elemptr")?;
        match access {
            Access::Lvalue => Ok(ptr),
            Access::Rvalue => Ok(self.builder.build_load(ptr, "elem")?),
        }
    }

    fn lower_binary(
        &mut self,
        op: AstBinOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Value, CompileError> {
        // Both operands are always evaluated, left first.
        let mut l = self.lower_expr(left)?;
        let mut r = self.lower_expr(right)?;

        if let Some(pred) = map_rel(op) {
            let l = self.as_int(l)?;
            let r = self.as_int(r)?;
            return Ok(self.builder.build_icmp(pred, l, r, rel_name(pred))?);
        }

        let Some(bin) = map_arith(op) else {
            return Err(make_semantic_error(
                SemanticErrorKind::UnresolvedOperand,
                format!("Operator {:?} has no instruction form", op),
            ));
        };
        let keep_i1 = matches!(bin, BinaryOp::And | BinaryOp::Or)
            && self.builder.value_type(&l) == Type::I1
            && self.builder.value_type(&r) == Type::I1;
        if !keep_i1 {
            l = self.as_int(l)?;
            r = self.as_int(r)?;
        }
        Ok(self.builder.build_binary(bin, l, r, arith_name(bin))?)
    }
}

/// Map a non-comparison AST operator to its IR instruction.
pub fn map_arith(op: AstBinOp) -> Option<BinaryOp> {
    match op {
        AstBinOp::Add => Some(BinaryOp::Add),
        AstBinOp::Sub => Some(BinaryOp::Sub),
        AstBinOp::Mul => Some(BinaryOp::Mul),
        AstBinOp::Div => Some(BinaryOp::SDiv),
        AstBinOp::Mod => Some(BinaryOp::SRem),
        AstBinOp::And => Some(BinaryOp::And),
        AstBinOp::Or => Some(BinaryOp::Or),
        _ => None,
    }
}

pub fn map_rel(op: AstBinOp) -> Option<IntPredicate> {
    match op {
        AstBinOp::Lt => Some(IntPredicate::Slt),
        AstBinOp::Le => Some(IntPredicate::Sle),
        AstBinOp::Gt => Some(IntPredicate::Sgt),
        AstBinOp::Ge => Some(IntPredicate::Sge),
        AstBinOp::Eq => Some(IntPredicate::Eq),
        AstBinOp::Ne => Some(IntPredicate::Ne),
        _ => None,
    }
}

fn arith_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "addtmp",
        BinaryOp::Sub => "subtmp",
        BinaryOp::Mul => "multmp",
        BinaryOp::SDiv => "divtmp",
        BinaryOp::SRem => "modtmp",
        BinaryOp::And => "andtmp",
        BinaryOp::Or => "ortmp",
    }
}

fn rel_name(pred: IntPredicate) -> &'static str {
    match pred {
        IntPredicate::Slt => "lttmp",
        IntPredicate::Sle => "letmp",
        IntPredicate::Sgt => "gttmp",
        IntPredicate::Sge => "getmp",
        IntPredicate::Eq => "eqtmp",
        IntPredicate::Ne => "netmp",
    }
}

fn describe(e: &Expr) -> &'static str {
    match e {
        Expr::Number(_) => "A literal",
        Expr::Neg(_) => "A negation",
        Expr::Binary { .. } => "A binary expression",
        Expr::Variable { .. } | Expr::Index { .. } => "A reference",
    }
}
