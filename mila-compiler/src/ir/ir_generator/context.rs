use super::bindings::Bindings;
use crate::ir::builder::Builder;
use crate::ir::symbol_table::SymbolTable;
use crate::ir::*;
use crate::{CodegenOptions, CompileError};

pub const SCAN_FORMAT: &str = "%d";
pub const PRINT_FORMAT: &str = "%d\n";

/// Names the emitted module defines or links against. User globals that
/// collide with these are renamed.
pub const RUNTIME_SYMBOLS: [&str; 3] = ["main", "printf", "scanf"];

/// Traversal state for one program: the module under construction, the
/// builder (which owns the insertion point) and the active loop exit target.
pub struct Gen<'a> {
    pub module: Module,
    pub builder: Builder,
    pub symbols: &'a SymbolTable,
    pub bindings: Bindings,
    pub options: &'a CodegenOptions,
    /// Block a `break` jumps to; `None` outside of any loop.
    pub break_target: Option<BlockId>,
    /// Statements entered so far, counted in pre-order.
    pub statements_seen: usize,
}

impl<'a> Gen<'a> {
    pub fn new(symbols: &'a SymbolTable, options: &'a CodegenOptions) -> Self {
        let mut module = Module::new(options.module_name.clone());
        for name in RUNTIME_SYMBOLS {
            module.reserve_symbol(name);
        }
        Self {
            module,
            builder: Builder::new(Function::new("main", Type::I32)),
            symbols,
            bindings: Bindings::new(),
            options,
            break_target: None,
            statements_seen: 0,
        }
    }

    pub fn finish(mut self) -> Module {
        self.module.add_function(self.builder.finish());
        self.module
    }

    /// Run `f` with `target` as the loop exit, restoring the enclosing target
    /// afterwards whether or not `f` succeeded.
    pub fn with_break_target<F, R>(&mut self, target: BlockId, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let prev = self.break_target.replace(target);
        let result = f(self);
        self.break_target = prev;
        result
    }

    /// Widen a comparison result to `i32`; integers pass through.
    pub fn as_int(&mut self, v: Value) -> Result<Value, CompileError> {
        match self.builder.value_type(&v) {
            Type::I1 => Ok(self.builder.build_zext(v, "booltmp")?),
            _ => Ok(v),
        }
    }

    /// Turn a value into a branch condition: `i32` is tested against zero.
    pub fn as_condition(&mut self, v: Value) -> Result<Value, CompileError> {
        match self.builder.value_type(&v) {
            Type::I32 => Ok(self.builder.build_icmp(
                IntPredicate::Ne,
                v,
                Value::ConstInt(0),
                "tobool",
            )?),
            _ => Ok(v),
        }
    }

    pub fn scanf(&mut self) -> DeclId {
        self.module
            .get_or_insert_function("scanf", Type::I32, &[Type::Ptr], true)
    }

    pub fn printf(&mut self) -> DeclId {
        self.module
            .get_or_insert_function("printf", Type::I32, &[Type::Ptr], true)
    }

    pub fn scan_format(&mut self) -> Value {
        Value::Str(self.module.intern_string(".fmt.scan", SCAN_FORMAT))
    }

    pub fn print_format(&mut self) -> Value {
        Value::Str(self.module.intern_string(".fmt.print", PRINT_FORMAT))
    }
}
