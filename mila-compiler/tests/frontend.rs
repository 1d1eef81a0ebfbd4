use mila_compiler::frontend::lexer::{tokenize, Token};
use mila_compiler::frontend::parse;
use mila_compiler::ir::ast::{Access, BinOp, Expr, Program, Stmt};
use mila_compiler::ir::interp::run_with_input;
use mila_compiler::ir::symbol_table::{Symbol, SymbolKind, SymbolTable};
use mila_compiler::{compile_to_ir, generate, CodegenOptions};

// ── Parsing ──────────────────────────────────────────────────────────────

#[test]
fn targets_are_lvalues_and_operands_are_rvalues() {
    let parsed = parse("program p; var x: integer; a: array [0 .. 3] of integer; begin a[x] := x; readln(x) end.")
        .expect("parses");
    match &parsed.program.body[..] {
        [Stmt::Assign { target, value }, Stmt::Read { target: read }] => {
            let Expr::Index { index, access, .. } = target else {
                panic!("expected element target, got {target:?}");
            };
            assert_eq!(*access, Access::Lvalue);
            assert_eq!(**index, Expr::var("x"));
            assert_eq!(*value, Expr::var("x"));
            assert_eq!(*read, Expr::place("x"));
        }
        other => panic!("unexpected body: {other:?}"),
    }
}

#[test]
fn multiple_declaration_sections() {
    let parsed = parse(
        "program p; var a: integer; const c = 2; var b, d: integer; begin end.",
    )
    .unwrap();
    let kinds: Vec<_> = parsed
        .symbols
        .globals()
        .map(|s| (s.name.as_str(), s.kind))
        .collect();
    assert_eq!(
        kinds,
        [
            ("a", SymbolKind::Var),
            ("c", SymbolKind::Const),
            ("b", SymbolKind::Var),
            ("d", SymbolKind::Var),
        ]
    );
}

#[test]
fn unary_minus_nests() {
    let parsed = parse("program p; begin writeln(- -3) end.").unwrap();
    assert_eq!(
        parsed.program.body,
        vec![Stmt::Write {
            value: Expr::neg(Expr::neg(Expr::Number(3)))
        }]
    );
}

#[test]
fn or_is_loosest() {
    let parsed = parse("program p; begin writeln(1 or 2 and 3) end.").unwrap();
    let Stmt::Write { value } = &parsed.program.body[0] else {
        panic!("expected writeln");
    };
    assert_eq!(
        *value,
        Expr::binary(
            BinOp::Or,
            Expr::Number(1),
            Expr::binary(BinOp::And, Expr::Number(2), Expr::Number(3)),
        )
    );
}

#[test]
fn token_stream_of_a_declaration() {
    let tokens: Vec<Token> = tokenize("a: array [-1 .. $A] of integer;")
        .unwrap()
        .into_iter()
        .map(|(_, t, _)| t)
        .collect();
    assert_eq!(
        tokens,
        vec![
            Token::Ident("a".into()),
            Token::Colon,
            Token::Array,
            Token::LBracket,
            Token::Minus,
            Token::Number(1),
            Token::DotDot,
            Token::Number(10),
            Token::RBracket,
            Token::Of,
            Token::Integer,
            Token::Semicolon,
        ]
    );
}

// ── JSON interchange ─────────────────────────────────────────────────────
// An externally produced AST arrives as JSON and goes through `generate`.

#[test]
fn ast_json_drives_generation() {
    let json = r#"{
        "name": "json",
        "body": [
            { "assign": { "target": { "variable": { "name": "x", "access": "lvalue" } },
                          "value": { "binary": { "op": "mul",
                                                 "left": { "number": 6 },
                                                 "right": { "number": 7 } } } } },
            { "write": { "value": { "variable": { "name": "x" } } } }
        ]
    }"#;
    let program: Program = serde_json::from_str(json).expect("valid AST JSON");
    let symbols: Vec<Symbol> =
        serde_json::from_str(r#"[{ "name": "x", "kind": "var" }]"#).expect("valid symbols");
    let symbols = SymbolTable::from_symbols(symbols).unwrap();

    let module = generate(&program, &symbols, &CodegenOptions::default()).unwrap();
    assert_eq!(run_with_input(&module, "").unwrap(), "42\n");
}

#[test]
fn parsed_ast_survives_json() {
    let source = std::fs::read_to_string("../samples/primes.mila").unwrap();
    let parsed = parse(&source).unwrap();
    let json = serde_json::to_string(&parsed.program).unwrap();
    let back: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(back, parsed.program);

    let direct = compile_to_ir(&source).unwrap().to_string();
    let via_json = generate(&back, &parsed.symbols, &CodegenOptions::default())
        .unwrap()
        .to_string();
    assert_eq!(direct, via_json);
}
