//! Mila frontend: a logos lexer feeding a LALRPOP-generated parser.

pub mod lexer;
pub mod parser;

lalrpop_util::lalrpop_mod!(pub grammar, "/frontend/grammar.rs");

pub use parser::ParsedProgram;

use crate::CompileError;

/// Parse Mila source into an AST plus its symbol table.
pub fn parse(source: &str) -> Result<ParsedProgram, CompileError> {
    parser::parse_program(source)
}
