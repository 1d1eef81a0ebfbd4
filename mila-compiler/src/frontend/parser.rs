//! Driver around the generated Mila grammar.
//!
//! Declarations go straight into a [`SymbolTable`] while parsing; the
//! statement part becomes the body of an [`ast::Program`]. Statement spans are
//! kept so generation faults can be pointed back at the source.
//!
//! [`ast::Program`]: crate::ir::ast::Program

use std::cell::RefCell;

use lalrpop_util::ParseError;
use tracing::trace;

use super::grammar;
use super::lexer::{self, get_error_context, position_to_line_col, LexicalError, Token};
use crate::ir::ast::{Program, Stmt};
use crate::ir::symbol_table::{Symbol, SymbolTable};
use crate::{CompileError, SourceLocation};

/// A parsed program together with the globals its declarations introduce.
#[derive(Debug, Clone)]
pub struct ParsedProgram {
    pub program: Program,
    pub symbols: SymbolTable,
    /// `(start, end)` byte span of every statement, in pre-order.
    pub statement_spans: Vec<(usize, usize)>,
}

impl ParsedProgram {
    /// Attach a source position to a generation fault raised for this
    /// program. Other errors pass through.
    pub fn locate(&self, source: &str, err: CompileError) -> CompileError {
        match err {
            CompileError::Semantic {
                kind,
                message,
                statement: Some(index),
                location: None,
            } => {
                let location = self
                    .statement_spans
                    .get(index)
                    .map(|&(start, _)| SourceLocation::at(source, start));
                CompileError::Semantic {
                    kind,
                    message,
                    statement: Some(index),
                    location,
                }
            }
            other => other,
        }
    }
}

/// Errors raised from inside the grammar, on top of the lexer's own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    Lexical(LexicalError),
    Redeclared { location: usize, name: String },
    OutOfRange { location: usize, value: i64 },
}

impl From<LexicalError> for SyntaxError {
    fn from(e: LexicalError) -> Self {
        SyntaxError::Lexical(e)
    }
}

type GrammarError = ParseError<usize, Token, SyntaxError>;

/// Statement spans in reduction order. A statement is reduced after
/// everything nested in it, so the order is fixed up in [`Self::into_preorder`].
#[derive(Debug, Default)]
pub struct StatementSpans {
    spans: Vec<(usize, usize)>,
}

impl StatementSpans {
    pub fn add(&mut self, start: usize, end: usize, stmt: Stmt) -> Stmt {
        self.spans.push((start, end));
        stmt
    }

    /// Statement spans nest and siblings are disjoint, so ordering by start
    /// (outermost first on ties) is the pre-order of the tree.
    pub fn into_preorder(mut self) -> Vec<(usize, usize)> {
        self.spans
            .sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));
        self.spans
    }
}

pub(crate) fn declare(
    symbols: &RefCell<SymbolTable>,
    location: usize,
    symbol: Symbol,
) -> Result<(), GrammarError> {
    let name = symbol.name.clone();
    symbols
        .borrow_mut()
        .declare(symbol)
        .map_err(|_| ParseError::User {
            error: SyntaxError::Redeclared { location, name },
        })
}

/// Range-check a literal once its sign is known.
pub(crate) fn literal(location: usize, value: i64) -> Result<i32, GrammarError> {
    i32::try_from(value).map_err(|_| ParseError::User {
        error: SyntaxError::OutOfRange { location, value },
    })
}

pub fn parse_program(source: &str) -> Result<ParsedProgram, CompileError> {
    let symbols = RefCell::new(SymbolTable::new());
    let spans = RefCell::new(StatementSpans::default());
    let tokens = lexer::lex_adapter(source).map(|t| t.map_err(SyntaxError::from));

    let program = grammar::ProgramParser::new()
        .parse(&symbols, &spans, tokens)
        .map_err(|e| {
            /// Build a friendly comma-separated "expected" list
            fn fmt_expected(expected: &[String]) -> String {
                expected
                    .iter()
                    .map(|s| lexer::friendly_token_name(s))
                    .collect::<Vec<_>>()
                    .join(", ")
            }

            /// Helper: create CompileError::Parse with line/col from byte position
            fn make_parse_error(source: &str, position: usize, message: String) -> CompileError {
                let (line, col) = position_to_line_col(source, position);
                let context = get_error_context(source, position);
                CompileError::Parse {
                    line,
                    col,
                    context,
                    message,
                }
            }

            match e {
                ParseError::InvalidToken { location } => {
                    make_parse_error(source, location, "Invalid token".to_string())
                }
                ParseError::UnrecognizedEof { location, expected } => make_parse_error(
                    source,
                    location,
                    format!(
                        "Unexpected end of input. Expected one of: {}",
                        fmt_expected(&expected)
                    ),
                ),
                ParseError::UnrecognizedToken {
                    token: (start, tok, _end),
                    expected,
                } => make_parse_error(
                    source,
                    start,
                    format!(
                        "Unexpected {}. Expected one of: {}",
                        tok,
                        fmt_expected(&expected)
                    ),
                ),
                ParseError::ExtraToken {
                    token: (start, tok, _end),
                } => make_parse_error(source, start, format!("Unexpected {} after end of program", tok)),
                ParseError::User { error } => match error {
                    // Lexical errors already carry line/col
                    SyntaxError::Lexical(e) => CompileError::Lexical(e),
                    SyntaxError::Redeclared { location, name } => make_parse_error(
                        source,
                        location,
                        format!("identifier '{}' is already declared", name),
                    ),
                    SyntaxError::OutOfRange { location, value } => make_parse_error(
                        source,
                        location,
                        format!("integer {} is out of range", value),
                    ),
                },
            }
        })?;

    trace!(name = %program.name, "parsed program");
    Ok(ParsedProgram {
        program,
        symbols: symbols.into_inner(),
        statement_spans: spans.into_inner().into_preorder(),
    })
}
