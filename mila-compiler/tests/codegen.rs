use mila_compiler::ir::interp::{run_with_input, Interpreter};
use mila_compiler::ir::verify::verify_module;
use mila_compiler::{compile_to_ir, compile_to_ir_with, compile_to_text, ArrayIndexing, CodegenOptions};

// ── Sample program compilation ───────────────────────────────────────────
// Each sample under samples/ compiles, verifies and produces the expected
// output when run.

fn compile_sample(name: &str) -> mila_compiler::ir::Module {
    let path = format!("../samples/{name}");
    let source =
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {path}: {e}"));
    compile_to_ir(&source).unwrap_or_else(|e| panic!("{name} should compile: {e}"))
}

fn run_sample(name: &str, input: &str) -> String {
    let module = compile_sample(name);
    verify_module(&module).expect("generated module should verify");
    run_with_input(&module, input).unwrap_or_else(|e| panic!("{name} failed at run time: {e}"))
}

#[test]
fn counting_mila() {
    assert_eq!(run_sample("counting.mila", ""), "0\n1\n2\n");
}

#[test]
fn factorial_mila() {
    assert_eq!(run_sample("factorial.mila", "6\n"), "720\n");
    assert_eq!(run_sample("factorial.mila", "0"), "1\n");
}

#[test]
fn gcd_mila() {
    assert_eq!(run_sample("gcd.mila", "84 36"), "12\n");
    assert_eq!(run_sample("gcd.mila", "17\n5\n"), "1\n");
}

#[test]
fn arrays_mila() {
    assert_eq!(run_sample("arrays.mila", ""), "16\n9\n4\n1\n0\n30\n");
}

#[test]
fn primes_mila() {
    assert_eq!(
        run_sample("primes.mila", ""),
        "2\n3\n5\n7\n11\n13\n17\n19\n23\n29\n"
    );
}

#[test]
fn radix_mila() {
    assert_eq!(run_sample("radix.mila", ""), "255\n15\n-42\n-225\n");
}

#[test]
fn arrays_mila_with_lower_bound_indexing() {
    let source = std::fs::read_to_string("../samples/arrays.mila").unwrap();
    let options = CodegenOptions {
        array_indexing: ArrayIndexing::LowerBoundRelative,
        ..CodegenOptions::default()
    };
    let module = compile_to_ir_with(&source, &options).expect("arrays.mila should compile");
    assert!(module.to_string().contains("[6 x i32]"));
    assert_eq!(run_with_input(&module, "").unwrap(), "16\n9\n4\n1\n0\n30\n");
}

// ── IR shape ─────────────────────────────────────────────────────────────

#[test]
fn globals_are_materialized_with_initial_values() {
    let ir = compile_to_text(
        "program g; const k = 5; var x: integer; a: array [2 .. 7] of integer; begin end.",
    )
    .unwrap();
    assert!(ir.contains("@k = constant i32 5, align 4"), "{ir}");
    assert!(ir.contains("@x = global i32 0, align 4"), "{ir}");
    assert!(ir.contains("@a = global [5 x i32] zeroinitializer, align 4"), "{ir}");
}

#[test]
fn empty_program_is_a_single_return() {
    let ir = compile_to_text("program empty; begin end.").unwrap();
    assert!(ir.contains("define i32 @main() {\nentry:\n  ret i32 0\n}"), "{ir}");
    assert!(!ir.contains("declare"), "no I/O means no declarations:\n{ir}");
}

#[test]
fn io_routines_are_declared_once() {
    let ir = compile_to_text(
        "program io; var x: integer; begin readln(x); readln(x); writeln(x); writeln(x + 1); writeln(2) end.",
    )
    .unwrap();
    assert_eq!(ir.matches("declare i32 @scanf(ptr, ...)").count(), 1, "{ir}");
    assert_eq!(ir.matches("declare i32 @printf(ptr, ...)").count(), 1, "{ir}");
    assert_eq!(ir.matches("@.fmt.scan = private").count(), 1, "{ir}");
    assert_eq!(ir.matches("@.fmt.print = private").count(), 1, "{ir}");
    assert!(ir.contains("c\"%d\\0A\\00\""), "print format should be %d\\n:\n{ir}");
    assert!(
        ir.contains("call i32 (ptr, ...) @scanf(ptr @.fmt.scan, ptr @x)"),
        "{ir}"
    );
    assert_eq!(ir.matches("@printf(ptr @.fmt.print, i32").count(), 3, "{ir}");
}

#[test]
fn globals_named_like_runtime_symbols_are_renamed() {
    let source = "program p; var printf, main, scanf: integer; begin readln(scanf); printf := scanf + 1; main := printf * 2; writeln(main) end.";
    let module = compile_to_ir(source).expect("clashing names should still compile");
    let ir = module.to_string();
    for needle in [
        "@main.1 = global i32 0",
        "@printf.1 = global i32 0",
        "@scanf.1 = global i32 0",
        "define i32 @main()",
        "declare i32 @printf(ptr, ...)",
        "declare i32 @scanf(ptr, ...)",
        "@scanf(ptr @.fmt.scan, ptr @scanf.1)",
    ] {
        assert!(ir.contains(needle), "missing `{needle}` in:\n{ir}");
    }
    assert!(!ir.contains("@printf = "), "{ir}");
    assert!(!ir.contains("@main = "), "{ir}");
    assert_eq!(run_with_input(&module, "4").unwrap(), "10\n");
}

#[test]
fn arithmetic_uses_signed_instructions() {
    let ir = compile_to_text(
        "program a; var x: integer; begin x := 7; writeln(-x div 2 mod 3 * 4 - 1) end.",
    )
    .unwrap();
    for needle in ["sub i32 0, %x", "sdiv i32", "srem i32", "mul i32", "sub i32 %multmp"] {
        assert!(ir.contains(needle), "missing `{needle}` in:\n{ir}");
    }
}

#[test]
fn element_address_is_a_plain_getelementptr() {
    let ir = compile_to_text(
        "program e; var a: array [0 .. 4] of integer; i: integer; begin a[i] := 1 end.",
    )
    .unwrap();
    assert!(
        ir.contains("%elemptr = getelementptr [4 x i32], ptr @a, i32 0, i32 %i"),
        "{ir}"
    );
    assert!(!ir.contains("inbounds"), "{ir}");
}

#[test]
fn comparison_is_widened_before_store() {
    let module =
        compile_to_ir("program c; var x: integer; begin x := 3 < 4; writeln(x) end.").unwrap();
    let ir = module.to_string();
    assert!(ir.contains("icmp slt i32 3, 4"), "{ir}");
    assert!(ir.contains("zext i1 %lttmp to i32"), "{ir}");
    assert_eq!(run_with_input(&module, "").unwrap(), "1\n");
}

#[test]
fn integer_condition_is_tested_against_zero() {
    let ir = compile_to_text("program c; var x: integer; begin if x then writeln(1) end.").unwrap();
    assert!(ir.contains("icmp ne i32 %x, 0"), "{ir}");
    assert!(ir.contains("br i1 %tobool, label %then, label %else"), "{ir}");
}

#[test]
fn block_labels_are_unique() {
    let ir = compile_to_text(
        "program u; var i: integer; begin if 1 then writeln(1); if 2 then writeln(2); while i < 1 do i := 1; while i < 2 do i := 2 end.",
    )
    .unwrap();
    for label in ["then:", "then1:", "ifcont:", "ifcont1:", "loop:", "loop1:", "after:", "after1:"] {
        assert!(ir.contains(&format!("\n{label}\n")), "missing {label} in:\n{ir}");
    }
}

#[test]
fn runaway_loop_hits_step_limit() {
    let module = compile_to_ir("program spin; begin while 1 do begin end end.").unwrap();
    let err = Interpreter::new(&module)
        .with_fuel(1_000)
        .run("".as_bytes(), std::io::sink())
        .unwrap_err();
    assert!(err.to_string().contains("step limit"), "{err}");
}
