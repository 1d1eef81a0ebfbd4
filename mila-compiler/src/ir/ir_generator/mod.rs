//! AST to IR lowering module.
//!
//! This module handles the translation of the AST into a block-structured IR
//! module with a single `main` function.

pub mod bindings;
pub mod context;
pub mod expr;
pub mod stmt;

use crate::ir::ast::Program;
use crate::ir::symbol_table::SymbolTable;
use crate::ir::Module;
use crate::{CodegenOptions, CompileError};

/// The main Gen struct that orchestrates the lowering process.
pub use context::Gen;

/// Entry point for lowering an AST Program to an IR Module.
pub fn lower(
    program: &Program,
    symbols: &SymbolTable,
    options: &CodegenOptions,
) -> Result<Module, CompileError> {
    let mut g = Gen::new(symbols, options);
    g.lower_program(program)?;
    Ok(g.finish())
}
