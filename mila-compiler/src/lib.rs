pub mod frontend;
pub mod ir;
pub mod options;

use thiserror::Error;

pub use options::{ArrayIndexing, CodegenOptions};

use ir::ast::Program;
use ir::builder::BuilderError;
use ir::symbol_table::SymbolTable;
use ir::verify::VerifyError;
use ir::Module;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexical error: {0}")]
    Lexical(#[from] frontend::lexer::LexicalError),

    #[error("Parse error at line {line}, column {col}: {message}\n  Context: {context}")]
    Parse {
        line: usize,
        col: usize,
        context: String,
        message: String,
    },

    #[error("SemanticError:{kind}{} - {message}", location_suffix(.location))]
    Semantic {
        kind: SemanticErrorKind,
        message: String,
        /// Pre-order index of the innermost statement being lowered.
        statement: Option<usize>,
        /// Known only when the program was parsed from source.
        location: Option<SourceLocation>,
    },

    #[error("IR builder error: {0}")]
    Builder(#[from] BuilderError),

    #[error("IR verification failed: {0}")]
    Verify(#[from] VerifyError),
}

impl CompileError {
    /// Kind of a generation fault, if this is one.
    pub fn semantic_kind(&self) -> Option<SemanticErrorKind> {
        match self {
            CompileError::Semantic { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Tag a generation fault with the statement it came from, unless a
    /// nested statement already did.
    pub fn in_statement(self, index: usize) -> Self {
        match self {
            CompileError::Semantic {
                kind,
                message,
                statement: None,
                location,
            } => CompileError::Semantic {
                kind,
                message,
                statement: Some(index),
                location,
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourceLocation {
    pub fn at(source: &str, offset: usize) -> Self {
        let (line, column) = frontend::lexer::position_to_line_col(source, offset);
        Self {
            line,
            column,
            offset,
        }
    }
}

fn location_suffix(location: &Option<SourceLocation>) -> String {
    location
        .as_ref()
        .map(|l| format!(" ({}:{})", l.line, l.column))
        .unwrap_or_default()
}

/// Faults raised while translating the AST into IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    UnboundIdentifier,
    AssignToConstant,
    UnresolvedOperand,
    BreakOutsideLoop,
}

impl std::fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SemanticErrorKind::UnboundIdentifier => write!(f, "UnboundIdentifier"),
            SemanticErrorKind::AssignToConstant => write!(f, "AssignToConstant"),
            SemanticErrorKind::UnresolvedOperand => write!(f, "UnresolvedOperand"),
            SemanticErrorKind::BreakOutsideLoop => write!(f, "BreakOutsideLoop"),
        }
    }
}

/// Translate an AST and its symbol table into an IR module.
///
/// Globals are materialized first, then the statement list is lowered into
/// `main`. The first fault stops generation and is returned as-is.
pub fn generate(
    program: &Program,
    symbols: &SymbolTable,
    options: &CodegenOptions,
) -> Result<Module, CompileError> {
    let module = ir::ir_generator::lower(program, symbols, options)?;
    if options.verify {
        ir::verify::verify_module(&module)?;
    }
    Ok(module)
}

pub fn compile_to_ir(source: &str) -> Result<Module, CompileError> {
    compile_to_ir_with(source, &CodegenOptions::default())
}

pub fn compile_to_ir_with(source: &str, options: &CodegenOptions) -> Result<Module, CompileError> {
    let parsed = frontend::parse(source)?;
    generate(&parsed.program, &parsed.symbols, options).map_err(|e| parsed.locate(source, e))
}

/// Compile source text directly to textual IR.
pub fn compile_to_text(source: &str) -> Result<String, CompileError> {
    Ok(compile_to_ir(source)?.to_string())
}
