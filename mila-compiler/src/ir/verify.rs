//! Structural and type checks over a finished module.

use std::collections::HashSet;

use thiserror::Error;

use super::ir::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("symbol '@{name}' is defined more than once")]
    DuplicateSymbol { name: String },

    #[error("function '{function}' has no blocks")]
    EmptyFunction { function: String },

    #[error("block '{block}' in '{function}' has no terminator")]
    MissingTerminator { function: String, block: String },

    #[error("block '{block}' in '{function}' branches to '{target}', which is not laid out")]
    DetachedTarget {
        function: String,
        block: String,
        target: String,
    },

    #[error("in '{function}', block '{block}': {what} expects {expected}, found {found}")]
    TypeMismatch {
        function: String,
        block: String,
        what: String,
        expected: Type,
        found: Type,
    },

    #[error("in '{function}', block '{block}': operand refers to an undefined or void value")]
    BadOperand { function: String, block: String },

    #[error("call to '{callee}' passes {got} argument(s), signature needs {expected}")]
    ArgumentCount {
        callee: String,
        expected: usize,
        got: usize,
    },
}

pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    verify_symbols(module)?;
    for func in &module.functions {
        verify_function(module, func)?;
    }
    Ok(())
}

/// Globals, strings, declarations and functions share one namespace.
fn verify_symbols(module: &Module) -> Result<(), VerifyError> {
    let names = module
        .globals
        .iter()
        .map(|g| &g.name)
        .chain(module.strings.iter().map(|s| &s.name))
        .chain(module.declarations.iter().map(|d| &d.name))
        .chain(module.functions.iter().map(|f| &f.name));

    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(VerifyError::DuplicateSymbol { name: name.clone() });
        }
    }
    Ok(())
}

fn verify_function(module: &Module, func: &Function) -> Result<(), VerifyError> {
    if func.layout.is_empty() {
        return Err(VerifyError::EmptyFunction {
            function: func.name.clone(),
        });
    }

    for &id in &func.layout {
        let block = func.block(id);
        let cx = Cx { func, block };

        for &inst_id in &block.insts {
            cx.inst(module, func.inst(inst_id))?;
        }

        let Some(term) = &block.terminator else {
            return Err(VerifyError::MissingTerminator {
                function: func.name.clone(),
                block: block.label.clone(),
            });
        };
        for target in term.successors() {
            if !func.is_attached(target) {
                return Err(VerifyError::DetachedTarget {
                    function: func.name.clone(),
                    block: block.label.clone(),
                    target: func.block(target).label.clone(),
                });
            }
        }
        match term {
            Terminator::CondBr { cond, .. } => cx.expect(cond, Type::I1, "br condition")?,
            Terminator::Ret(Some(v)) => cx.expect(v, func.ret, "ret")?,
            Terminator::Ret(None) => {
                if func.ret != Type::Void {
                    return Err(cx.mismatch("ret", func.ret, Type::Void));
                }
            }
            Terminator::Br(_) => {}
        }
    }
    Ok(())
}

struct Cx<'a> {
    func: &'a Function,
    block: &'a Block,
}

impl Cx<'_> {
    fn mismatch(&self, what: &str, expected: Type, found: Type) -> VerifyError {
        VerifyError::TypeMismatch {
            function: self.func.name.clone(),
            block: self.block.label.clone(),
            what: what.to_string(),
            expected,
            found,
        }
    }

    fn operand(&self, v: &Value) -> Result<Type, VerifyError> {
        if let Value::Inst(id) = v {
            let defined = self.func.insts.get(id.0).is_some_and(|i| i.ty != Type::Void);
            if !defined {
                return Err(VerifyError::BadOperand {
                    function: self.func.name.clone(),
                    block: self.block.label.clone(),
                });
            }
        }
        Ok(self.func.value_type(v))
    }

    fn expect(&self, v: &Value, expected: Type, what: &str) -> Result<(), VerifyError> {
        let found = self.operand(v)?;
        if found != expected {
            return Err(self.mismatch(what, expected, found));
        }
        Ok(())
    }

    fn inst(&self, module: &Module, inst: &Inst) -> Result<(), VerifyError> {
        match &inst.kind {
            InstKind::Load { ptr } => self.expect(ptr, Type::Ptr, "load address"),
            InstKind::Store { value, ptr } => {
                self.expect(value, Type::I32, "stored value")?;
                self.expect(ptr, Type::Ptr, "store address")
            }
            InstKind::Binary { op, lhs, rhs } => {
                let lt = self.operand(lhs)?;
                let allowed = match op {
                    BinaryOp::And | BinaryOp::Or => lt == Type::I32 || lt == Type::I1,
                    _ => lt == Type::I32,
                };
                if !allowed {
                    return Err(self.mismatch(&format!("{op} operand"), Type::I32, lt));
                }
                self.expect(rhs, lt, &format!("{op} operand"))?;
                if inst.ty != lt {
                    return Err(self.mismatch(&format!("{op} result"), lt, inst.ty));
                }
                Ok(())
            }
            InstKind::ICmp { lhs, rhs, .. } => {
                self.expect(lhs, Type::I32, "icmp operand")?;
                self.expect(rhs, Type::I32, "icmp operand")
            }
            InstKind::ZExt { value } => self.expect(value, Type::I1, "zext operand"),
            InstKind::ElementPtr { base, index, .. } => {
                self.expect(base, Type::Ptr, "getelementptr base")?;
                self.expect(index, Type::I32, "getelementptr index")
            }
            InstKind::Call { callee, args } => {
                let decl = module.declaration(*callee);
                let enough = if decl.variadic {
                    args.len() >= decl.params.len()
                } else {
                    args.len() == decl.params.len()
                };
                if !enough {
                    return Err(VerifyError::ArgumentCount {
                        callee: decl.name.clone(),
                        expected: decl.params.len(),
                        got: args.len(),
                    });
                }
                for (arg, ty) in args.iter().zip(&decl.params) {
                    self.expect(arg, *ty, &format!("argument of @{}", decl.name))?;
                }
                for arg in args.iter().skip(decl.params.len()) {
                    self.operand(arg)?;
                }
                Ok(())
            }
        }
    }
}
