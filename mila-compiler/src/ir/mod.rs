//! Intermediate Representation (IR) module.
//!
//! This module contains the AST and symbol table consumed by code generation,
//! the IR definitions with their builder, printer and verifier, the
//! AST-to-IR generator, and a reference interpreter.

pub mod ir;
pub use ir::*;
pub mod ast;
pub mod builder;
pub mod error_utils;
pub mod interp;
pub mod ir_generator;
pub mod printer;
pub mod symbol_table;
pub mod verify;
