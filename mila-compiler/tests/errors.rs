use mila_compiler::ir::ast::{Expr, Program, Stmt};
use mila_compiler::ir::symbol_table::{Symbol, SymbolTable};
use mila_compiler::ir::Module;
use mila_compiler::{compile_to_ir, generate, CodegenOptions, CompileError, SemanticErrorKind};

// ── Generation fault detection ───────────────────────────────────────────
// Each test verifies that an invalid program produces the correct error kind.

#[test]
fn undeclared_identifier_in_expression() {
    let source = "program p; begin writeln(nope) end.";
    assert_semantic_error(compile_to_ir(source), SemanticErrorKind::UnboundIdentifier);
}

#[test]
fn undeclared_assignment_target() {
    let source = "program p; begin nope := 1 end.";
    assert_semantic_error(compile_to_ir(source), SemanticErrorKind::UnboundIdentifier);
}

#[test]
fn undeclared_identifier_halts_before_later_statements() {
    // The later statement would raise a different fault if it were reached.
    let source = "program p; const k = 1; begin writeln(missing); k := 2 end.";
    let err = compile_to_ir(source).unwrap_err();
    assert_eq!(err.semantic_kind(), Some(SemanticErrorKind::UnboundIdentifier));
    assert!(err.to_string().contains("'missing'"), "{err}");
}

#[test]
fn assign_to_constant() {
    let source = "program p; const k = 1; begin k := 2 end.";
    assert_semantic_error(compile_to_ir(source), SemanticErrorKind::AssignToConstant);
}

#[test]
fn read_into_constant() {
    let source = "program p; const k = 1; begin readln(k) end.";
    assert_semantic_error(compile_to_ir(source), SemanticErrorKind::AssignToConstant);
}

#[test]
fn constant_guard_runs_before_the_value_is_lowered() {
    // `nope` is unbound, but the constant target is reported first.
    let source = "program p; const k = 1; begin k := nope end.";
    assert_semantic_error(compile_to_ir(source), SemanticErrorKind::AssignToConstant);
}

#[test]
fn array_without_index() {
    let source = "program p; var a: array [0 .. 3] of integer; begin writeln(a) end.";
    assert_semantic_error(compile_to_ir(source), SemanticErrorKind::UnresolvedOperand);
}

#[test]
fn scalar_with_index() {
    let source = "program p; var x: integer; begin x[1] := 2 end.";
    assert_semantic_error(compile_to_ir(source), SemanticErrorKind::UnresolvedOperand);
}

#[test]
fn non_reference_target() {
    let program = Program {
        name: "p".into(),
        body: vec![Stmt::assign(Expr::Number(1), Expr::Number(2))],
    };
    let result = generate(&program, &SymbolTable::new(), &CodegenOptions::default());
    assert_semantic_error(result, SemanticErrorKind::UnresolvedOperand);
}

#[test]
fn break_outside_loop() {
    let source = "program p; begin if 1 then break end.";
    assert_semantic_error(compile_to_ir(source), SemanticErrorKind::BreakOutsideLoop);
}

#[test]
fn break_target_is_restored_after_a_loop() {
    let source = "program p; begin while 0 do break; break end.";
    assert_semantic_error(compile_to_ir(source), SemanticErrorKind::BreakOutsideLoop);
}

#[test]
fn fault_inside_loop_body_propagates() {
    let program = Program {
        name: "p".into(),
        body: vec![Stmt::while_do(
            Expr::Number(1),
            Stmt::Block(vec![Stmt::Write {
                value: Expr::var("undeclared"),
            }]),
        )],
    };
    let symbols = SymbolTable::from_symbols([Symbol::variable("i", 0)]).unwrap();
    let result = generate(&program, &symbols, &CodegenOptions::default());
    assert_semantic_error(result, SemanticErrorKind::UnboundIdentifier);
}

#[test]
fn error_message_format() {
    let err = compile_to_ir("program p; const k = 1; begin k := 2 end.").unwrap_err();
    assert_eq!(
        err.to_string(),
        "SemanticError:AssignToConstant (1:31) - Cannot assign to constant 'k'"
    );
}

#[test]
fn fault_points_at_the_innermost_statement() {
    let source = "program p;\nvar i: integer;\nbegin\n  while i < 3 do\n  begin\n    i := i + 1;\n    writeln(missing)\n  end\nend.";
    match compile_to_ir(source).unwrap_err() {
        CompileError::Semantic {
            kind,
            statement,
            location: Some(location),
            ..
        } => {
            assert_eq!(kind, SemanticErrorKind::UnboundIdentifier);
            // while, begin-block, assignment, writeln
            assert_eq!(statement, Some(3));
            assert_eq!((location.line, location.column), (7, 5));
        }
        other => panic!("Expected located semantic error, got: {other:?}"),
    }
}

#[test]
fn break_fault_points_at_the_break() {
    let err = compile_to_ir("program p; begin if 1 then break end.").unwrap_err();
    assert!(err.to_string().starts_with("SemanticError:BreakOutsideLoop (1:28)"), "{err}");
}

#[test]
fn hand_built_tree_has_no_source_location() {
    let program = Program {
        name: "p".into(),
        body: vec![
            Stmt::Write {
                value: Expr::Number(1),
            },
            Stmt::Break,
        ],
    };
    let err = generate(&program, &SymbolTable::new(), &CodegenOptions::default()).unwrap_err();
    match &err {
        CompileError::Semantic {
            statement, location, ..
        } => {
            assert_eq!(*statement, Some(1));
            assert!(location.is_none());
        }
        other => panic!("Expected semantic error, got: {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "SemanticError:BreakOutsideLoop - 'break' used outside of a loop"
    );
}

// ── Frontend errors ──────────────────────────────────────────────────────

#[test]
fn lexical_error_reports_line_and_column() {
    let err = compile_to_ir("program p;\nbegin\n  writeln(1 # 2)\nend.").unwrap_err();
    match err {
        CompileError::Lexical(e) => {
            assert_eq!((e.line, e.column), (3, 13));
            assert_eq!(e.unexpected_char, '#');
            assert_eq!(e.context, "writeln(1 # 2)");
        }
        other => panic!("Expected lexical error, got: {other:?}"),
    }
}

#[test]
fn parse_error_reports_expected_token() {
    let err = compile_to_ir("program p;\nbegin\n  x = 1\nend.").unwrap_err();
    match err {
        CompileError::Parse {
            line,
            message,
            context,
            ..
        } => {
            assert_eq!(line, 3);
            assert!(message.contains("':='"), "{message}");
            assert_eq!(context, "x = 1");
        }
        other => panic!("Expected parse error, got: {other:?}"),
    }
}

#[test]
fn literal_out_of_range() {
    let err = compile_to_ir("program p; begin writeln(2147483648) end.").unwrap_err();
    assert!(matches!(err, CompileError::Parse { .. }), "{err:?}");
    // The most negative value is representable as a declared constant.
    assert!(compile_to_ir("program p; const m = -2147483648; begin writeln(m) end.").is_ok());
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn assert_semantic_error(result: Result<Module, CompileError>, expected: SemanticErrorKind) {
    match result {
        Err(CompileError::Semantic { kind, message, .. }) => {
            assert_eq!(
                kind, expected,
                "Expected {expected}, got {kind}: {message}"
            );
        }
        Err(other) => panic!("Expected semantic error {expected}, got: {other}"),
        Ok(_) => panic!("Expected semantic error {expected}, but compilation succeeded"),
    }
}
