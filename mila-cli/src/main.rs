use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use mila_compiler::frontend::lexer::{position_to_line_col, tokenize};
use mila_compiler::ir::ast::Program;
use mila_compiler::ir::interp::Interpreter;
use mila_compiler::ir::symbol_table::{Symbol, SymbolTable};
use mila_compiler::ir::Module;
use mila_compiler::{frontend, generate, ArrayIndexing, CodegenOptions};
use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, Level};

#[derive(Parser)]
#[command(name = "milac")]
#[command(about = "A compiler from Mila to a block-structured SSA IR")]
struct Args {
    /// Path to the source file (or JSON AST bundle with --ast-json)
    file: Option<PathBuf>,

    /// Treat FILE as `{ "program": ..., "symbols": [...] }` instead of Mila source
    #[arg(long, requires = "file")]
    ast_json: bool,

    /// Emit the IR text. This is the default when --run and --tokens are absent.
    #[arg(long)]
    ir: bool,

    /// Execute the module with the built-in interpreter on stdin/stdout
    #[arg(long)]
    run: bool,

    /// Print the token stream and stop
    #[arg(long, conflicts_with = "ast_json")]
    tokens: bool,

    /// How declared array bounds map onto storage
    #[arg(long, value_enum, default_value_t = IndexingOpt::ZeroBased)]
    array_indexing: IndexingOpt,

    /// Skip the IR verifier
    #[arg(long)]
    no_verify: bool,

    /// Instruction budget for --run
    #[arg(long, default_value_t = Interpreter::DEFAULT_FUEL)]
    fuel: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum IndexingOpt {
    ZeroBased,
    LowerBound,
}

impl From<IndexingOpt> for ArrayIndexing {
    fn from(opt: IndexingOpt) -> Self {
        match opt {
            IndexingOpt::ZeroBased => ArrayIndexing::ZeroBased,
            IndexingOpt::LowerBound => ArrayIndexing::LowerBoundRelative,
        }
    }
}

/// Externally produced AST together with its globals.
#[derive(Deserialize)]
struct AstBundle {
    program: Program,
    #[serde(default)]
    symbols: Vec<Symbol>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let src = match &args.file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading '{}'", path.display()))?,
        None => DEFAULT_SAMPLE.trim().to_string(),
    };

    if args.tokens {
        return print_tokens(&src);
    }

    let options = CodegenOptions {
        module_name: module_name(&args),
        array_indexing: args.array_indexing.into(),
        verify: !args.no_verify,
    };
    debug!(?options, "codegen options");

    let generated = if args.ast_json {
        let (program, symbols) = load_bundle(&src)?;
        generate(&program, &symbols, &options)
    } else {
        let parsed = frontend::parse(&src).context("compilation failed")?;
        generate(&parsed.program, &parsed.symbols, &options).map_err(|e| parsed.locate(&src, e))
    };
    let module = generated.context("compilation failed")?;

    let want_ir = args.ir || !args.run;
    if want_ir {
        print!("{}", module);
    }
    if args.run {
        execute(&module, args.fuel)?;
    }
    Ok(())
}

fn module_name(args: &Args) -> String {
    args.file
        .as_ref()
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| CodegenOptions::default().module_name)
}

fn load_bundle(src: &str) -> Result<(Program, SymbolTable)> {
    let bundle: AstBundle = serde_json::from_str(src).context("decoding AST bundle")?;
    let symbols = match SymbolTable::from_symbols(bundle.symbols) {
        Ok(table) => table,
        Err(dup) => bail!("symbol '{}' is declared more than once", dup.name),
    };
    Ok((bundle.program, symbols))
}

fn print_tokens(src: &str) -> Result<()> {
    let tokens = tokenize(src).context("lexing failed")?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (start, tok, end) in tokens {
        let (line, col) = position_to_line_col(src, start);
        writeln!(out, "{line}:{col}\t{tok}\t{:?}", &src[start..end])?;
    }
    Ok(())
}

fn execute(module: &Module, fuel: u64) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let exec = Interpreter::new(module)
        .with_fuel(fuel)
        .run(stdin.lock(), stdout.lock())
        .context("execution failed")?;
    debug!(steps = exec.steps, exit_code = exec.exit_code, "program finished");
    if exec.exit_code != 0 {
        std::process::exit(exec.exit_code);
    }
    Ok(())
}

const DEFAULT_SAMPLE: &str = r#"
program sample;
const
    limit = 10;
var
    i, sum: integer;
    squares: array [0 .. 10] of integer;
begin
    i := 0;
    sum := 0;
    while i < limit do
    begin
        squares[i] := i * i;
        sum := sum + squares[i];
        if sum > 100 then
            break;
        i := i + 1
    end;
    writeln(i);
    writeln(sum)
end.
"#;
