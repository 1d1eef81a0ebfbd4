use logos::Logos;
use std::fmt;

fn radix(lex: &logos::Lexer<Token>, skip: usize, radix: u32) -> Option<i64> {
    i64::from_str_radix(&lex.slice()[skip..], radix).ok()
}

#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\r\n]+")] // Whitespace
#[logos(skip r"\{[^}]*\}")] // Pascal-style block comments
#[logos(skip r"//[^\n]*")] // Line comments
pub enum Token {
    // --- Keywords ---
    #[token("program")]
    Program,
    #[token("const")]
    Const,
    #[token("var")]
    Var,
    #[token("begin")]
    Begin,
    #[token("end")]
    End,
    #[token("integer")]
    Integer,
    #[token("array")]
    Array,
    #[token("of")]
    Of,

    #[token("readln")]
    Readln,
    #[token("writeln")]
    Writeln,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("break")]
    Break,

    #[token("div")]
    Div,
    #[token("mod")]
    Mod,
    #[token("and")]
    And,
    #[token("or")]
    Or,

    // --- Identifiers and Numbers ---
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// Unsigned magnitude; range is checked by the parser once the sign is known.
    #[regex(r"[0-9]+", |lex| radix(lex, 0, 10))]
    #[regex(r"\$[0-9A-Fa-f]+", |lex| radix(lex, 1, 16))]
    #[regex(r"&[0-7]+", |lex| radix(lex, 1, 8))]
    Number(i64),

    // --- Operators ---
    #[token(":=")]
    Assign,
    #[token("=")]
    Eq,
    #[token("<>")]
    Neq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Mul,

    // --- Punctuation
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Program => write!(f, "'program'"),
            Token::Const => write!(f, "'const'"),
            Token::Var => write!(f, "'var'"),
            Token::Begin => write!(f, "'begin'"),
            Token::End => write!(f, "'end'"),
            Token::Integer => write!(f, "'integer'"),
            Token::Array => write!(f, "'array'"),
            Token::Of => write!(f, "'of'"),
            Token::Readln => write!(f, "'readln'"),
            Token::Writeln => write!(f, "'writeln'"),
            Token::If => write!(f, "'if'"),
            Token::Then => write!(f, "'then'"),
            Token::Else => write!(f, "'else'"),
            Token::While => write!(f, "'while'"),
            Token::Do => write!(f, "'do'"),
            Token::Break => write!(f, "'break'"),
            Token::Div => write!(f, "'div'"),
            Token::Mod => write!(f, "'mod'"),
            Token::And => write!(f, "'and'"),
            Token::Or => write!(f, "'or'"),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Assign => write!(f, "':='"),
            Token::Eq => write!(f, "'='"),
            Token::Neq => write!(f, "'<>'"),
            Token::Lt => write!(f, "'<'"),
            Token::Le => write!(f, "'<='"),
            Token::Gt => write!(f, "'>'"),
            Token::Ge => write!(f, "'>='"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Mul => write!(f, "'*'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
            Token::Colon => write!(f, "':'"),
            Token::Semicolon => write!(f, "';'"),
            Token::DotDot => write!(f, "'..'"),
            Token::Dot => write!(f, "'.'"),
        }
    }
}

/// Readable name for a terminal in a parser "expected" list.
pub fn friendly_token_name(name: &str) -> String {
    // LALRPOP wraps literal terminals in quotes
    match name {
        "Ident" => "identifier".into(),
        "Number" => "number".into(),
        other => format!("'{}'", other.trim_matches('"')),
    }
}

/// Custom error type for lexical errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalError {
    pub location: usize,
    pub line: usize,
    pub column: usize,
    pub unexpected_char: char,
    pub context: String,
}

impl fmt::Display for LexicalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unexpected character '{}' at line {}, column {} (position {})\n  Context: {}",
            self.unexpected_char, self.line, self.column, self.location, self.context
        )
    }
}

impl std::error::Error for LexicalError {}

/// Convert a byte position to line and column numbers (1-based)
pub fn position_to_line_col(source: &str, position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= position {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Get context around an error position (the line containing the error)
pub fn get_error_context(source: &str, position: usize) -> String {
    let position = position.min(source.len());
    let line_start = source[..position]
        .rfind('\n')
        .map(|pos| pos + 1)
        .unwrap_or(0);

    let line_end = source[position..]
        .find('\n')
        .map(|pos| position + pos)
        .unwrap_or(source.len());

    source[line_start..line_end].trim().to_string()
}

fn create_lexical_error(source: &str, position: usize) -> LexicalError {
    let (line, column) = position_to_line_col(source, position);
    let unexpected_char = source
        .get(position..)
        .and_then(|rest| rest.chars().next())
        .unwrap_or('\0');
    let context = get_error_context(source, position);

    LexicalError {
        location: position,
        line,
        column,
        unexpected_char,
        context,
    }
}

/// `(start, token, end)` byte span triple.
pub type Spanned<Tok, Loc, Error> = Result<(Loc, Tok, Loc), Error>;

pub struct LexerAdapter<'source> {
    source: &'source str,
    lexer: logos::Lexer<'source, Token>,
}

impl<'source> LexerAdapter<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            lexer: Token::lexer(source),
        }
    }
}

impl Iterator for LexerAdapter<'_> {
    type Item = Spanned<Token, usize, LexicalError>;

    fn next(&mut self) -> Option<Self::Item> {
        let token_result = self.lexer.next()?;
        let span = self.lexer.span();

        Some(match token_result {
            Ok(token) => Ok((span.start, token, span.end)),
            Err(_) => Err(create_lexical_error(self.source, span.start)),
        })
    }
}

pub fn lex_adapter(source: &str) -> LexerAdapter<'_> {
    LexerAdapter::new(source)
}

/// Tokenize a whole source, stopping at the first lexical error.
pub fn tokenize(source: &str) -> Result<Vec<(usize, Token, usize)>, LexicalError> {
    lex_adapter(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        tokenize(src)
            .expect("lexes")
            .into_iter()
            .map(|(_, t, _)| t)
            .collect()
    }

    #[test]
    fn number_radixes() {
        assert_eq!(
            tokens("42 $1F &17"),
            vec![Token::Number(42), Token::Number(31), Token::Number(15)]
        );
    }

    #[test]
    fn compound_operators_win_over_prefixes() {
        assert_eq!(
            tokens("x := a <> b <= c .. ."),
            vec![
                Token::Ident("x".into()),
                Token::Assign,
                Token::Ident("a".into()),
                Token::Neq,
                Token::Ident("b".into()),
                Token::Le,
                Token::Ident("c".into()),
                Token::DotDot,
                Token::Dot,
            ]
        );
    }

    #[test]
    fn keywords_are_not_identifier_prefixes() {
        assert_eq!(
            tokens("end ending do done"),
            vec![
                Token::End,
                Token::Ident("ending".into()),
                Token::Do,
                Token::Ident("done".into()),
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            tokens("{ block\n comment } x // trailing\n y"),
            vec![Token::Ident("x".into()), Token::Ident("y".into())]
        );
    }

    #[test]
    fn expected_names_are_readable() {
        assert_eq!(friendly_token_name("\":=\""), "':='");
        assert_eq!(friendly_token_name("Ident"), "identifier");
        assert_eq!(friendly_token_name("Number"), "number");
    }

    #[test]
    fn bad_character_reports_position() {
        let err = tokenize("begin\n  x := 1 ? 2").unwrap_err();
        assert_eq!(err.unexpected_char, '?');
        assert_eq!((err.line, err.column), (2, 10));
        assert_eq!(err.context, "x := 1 ? 2");
    }
}
