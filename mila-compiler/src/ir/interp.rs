//! Reference interpreter for generated modules.
//!
//! Executes `main` over a flat memory of `i32` cells, one range per global.
//! `scanf` and `printf` are provided here so programs can be run end-to-end
//! without a native backend.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::trace;

use super::ir::*;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("module has no function '{0}'")]
    MissingFunction(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("access to '{global}' at offset {offset} is out of bounds (length {len})")]
    OutOfBounds {
        global: String,
        offset: i64,
        len: usize,
    },

    #[error("store to read-only global '{0}'")]
    WriteToConstant(String),

    #[error("expected an integer on input, got {0:?}")]
    BadInput(String),

    #[error("unexpected end of input")]
    EndOfInput,

    #[error("call to unsupported external function '{0}'")]
    UnsupportedCall(String),

    #[error("step limit of {0} instructions exceeded")]
    StepLimit(u64),

    #[error("malformed module: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RtValue {
    Int(i32),
    Bool(bool),
    Ptr { global: GlobalId, offset: i64 },
    Str(StrId),
}

impl RtValue {
    fn as_int(self) -> Result<i32, ExecError> {
        match self {
            RtValue::Int(i) => Ok(i),
            RtValue::Bool(b) => Ok(b as i32),
            other => Err(ExecError::Malformed(format!("expected integer, got {other:?}"))),
        }
    }

    fn as_bool(self) -> Result<bool, ExecError> {
        match self {
            RtValue::Bool(b) => Ok(b),
            RtValue::Int(i) => Ok(i != 0),
            other => Err(ExecError::Malformed(format!("expected i1, got {other:?}"))),
        }
    }
}

/// Final state of a completed run.
#[derive(Debug, Clone)]
pub struct Execution {
    pub exit_code: i32,
    pub steps: u64,
    memory: HashMap<String, Vec<i32>>,
}

impl Execution {
    /// Value of a scalar global after the run.
    pub fn scalar(&self, name: &str) -> Option<i32> {
        self.memory.get(name).and_then(|cells| cells.first().copied())
    }

    pub fn array(&self, name: &str) -> Option<&[i32]> {
        self.memory.get(name).map(Vec::as_slice)
    }
}

pub struct Interpreter<'m> {
    module: &'m Module,
    fuel: u64,
}

impl<'m> Interpreter<'m> {
    pub const DEFAULT_FUEL: u64 = 10_000_000;

    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            fuel: Self::DEFAULT_FUEL,
        }
    }

    /// Maximum number of instructions (terminators included) to execute.
    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }

    pub fn run<R: BufRead, W: Write>(&self, input: R, output: W) -> Result<Execution, ExecError> {
        let func = self
            .module
            .function("main")
            .ok_or_else(|| ExecError::MissingFunction("main".into()))?;
        let mut machine = Machine {
            module: self.module,
            func,
            memory: self.initial_memory(),
            values: vec![None; func.insts.len()],
            input: Tokens::new(input),
            output,
            steps: 0,
            fuel: self.fuel,
        };
        let exit_code = machine.run()?;
        machine.output.flush()?;

        let memory = self
            .module
            .globals
            .iter()
            .zip(machine.memory)
            .map(|(g, cells)| (g.name.clone(), cells))
            .collect();
        Ok(Execution {
            exit_code,
            steps: machine.steps,
            memory,
        })
    }

    fn initial_memory(&self) -> Vec<Vec<i32>> {
        self.module
            .globals
            .iter()
            .map(|g| match (g.ty, &g.init) {
                (GlobalType::I32, GlobalInit::Int(v)) => vec![*v],
                (GlobalType::I32, GlobalInit::Zeroed) => vec![0],
                (GlobalType::Array(len), _) => vec![0; len],
            })
            .collect()
    }
}

/// Run `main` with `input` as stdin, returning everything written to stdout.
pub fn run_with_input(module: &Module, input: &str) -> Result<String, ExecError> {
    let mut out = Vec::new();
    Interpreter::new(module).run(input.as_bytes(), &mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

struct Tokens<R> {
    reader: R,
    pending: Vec<String>,
}

impl<R: BufRead> Tokens<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
        }
    }

    fn next_int(&mut self) -> Result<i32, ExecError> {
        loop {
            if let Some(tok) = self.pending.pop() {
                return tok.parse().map_err(|_| ExecError::BadInput(tok));
            }
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(ExecError::EndOfInput);
            }
            self.pending = line.split_whitespace().rev().map(str::to_string).collect();
        }
    }
}

struct Machine<'m, R, W> {
    module: &'m Module,
    func: &'m Function,
    memory: Vec<Vec<i32>>,
    values: Vec<Option<RtValue>>,
    input: Tokens<R>,
    output: W,
    steps: u64,
    fuel: u64,
}

impl<'m, R: BufRead, W: Write> Machine<'m, R, W> {
    fn tick(&mut self) -> Result<(), ExecError> {
        self.steps += 1;
        if self.steps > self.fuel {
            return Err(ExecError::StepLimit(self.fuel));
        }
        Ok(())
    }

    fn run(&mut self) -> Result<i32, ExecError> {
        let func = self.func;
        let mut block = func
            .entry()
            .ok_or_else(|| ExecError::Malformed("main has no entry block".into()))?;
        loop {
            let b = func.block(block);
            trace!(block = %b.label, "enter block");
            for &id in &b.insts {
                self.tick()?;
                let result = self.exec(func.inst(id))?;
                self.values[id.0] = result;
            }
            self.tick()?;
            match &b.terminator {
                Some(Terminator::Br(dest)) => block = *dest,
                Some(Terminator::CondBr {
                    cond,
                    then_dest,
                    else_dest,
                }) => {
                    block = if self.eval(cond)?.as_bool()? {
                        *then_dest
                    } else {
                        *else_dest
                    };
                }
                Some(Terminator::Ret(v)) => {
                    return match v {
                        Some(v) => self.eval(v)?.as_int(),
                        None => Ok(0),
                    };
                }
                None => {
                    return Err(ExecError::Malformed(format!(
                        "block '{}' has no terminator",
                        b.label
                    )))
                }
            }
        }
    }

    fn eval(&self, v: &Value) -> Result<RtValue, ExecError> {
        Ok(match v {
            Value::ConstInt(i) => RtValue::Int(*i),
            Value::ConstBool(b) => RtValue::Bool(*b),
            Value::Global(g) => RtValue::Ptr {
                global: *g,
                offset: 0,
            },
            Value::Str(s) => RtValue::Str(*s),
            Value::Inst(id) => self.values.get(id.0).copied().flatten().ok_or_else(|| {
                ExecError::Malformed(format!("use of %{} before definition", id.0))
            })?,
        })
    }

    fn cell(&mut self, ptr: RtValue, write: bool) -> Result<&mut i32, ExecError> {
        let RtValue::Ptr { global, offset } = ptr else {
            return Err(ExecError::Malformed(format!("expected pointer, got {ptr:?}")));
        };
        let module = self.module;
        let g = module.global(global);
        if write && g.constant {
            return Err(ExecError::WriteToConstant(g.name.clone()));
        }
        let cells = &mut self.memory[global.0];
        let len = cells.len();
        usize::try_from(offset)
            .ok()
            .and_then(|o| cells.get_mut(o))
            .ok_or_else(|| ExecError::OutOfBounds {
                global: g.name.clone(),
                offset,
                len,
            })
    }

    fn exec(&mut self, inst: &'m Inst) -> Result<Option<RtValue>, ExecError> {
        let value = match &inst.kind {
            InstKind::Load { ptr } => {
                let ptr = self.eval(ptr)?;
                RtValue::Int(*self.cell(ptr, false)?)
            }
            InstKind::Store { value, ptr } => {
                let value = self.eval(value)?.as_int()?;
                let ptr = self.eval(ptr)?;
                *self.cell(ptr, true)? = value;
                return Ok(None);
            }
            InstKind::Binary { op, lhs, rhs } => {
                let (l, r) = (self.eval(lhs)?, self.eval(rhs)?);
                if let (RtValue::Bool(a), RtValue::Bool(b)) = (l, r) {
                    match op {
                        BinaryOp::And => RtValue::Bool(a & b),
                        BinaryOp::Or => RtValue::Bool(a | b),
                        _ => return Err(ExecError::Malformed(format!("{op} on i1"))),
                    }
                } else {
                    RtValue::Int(arith(*op, l.as_int()?, r.as_int()?)?)
                }
            }
            InstKind::ICmp { pred, lhs, rhs } => {
                let (l, r) = (self.eval(lhs)?.as_int()?, self.eval(rhs)?.as_int()?);
                RtValue::Bool(match pred {
                    IntPredicate::Eq => l == r,
                    IntPredicate::Ne => l != r,
                    IntPredicate::Slt => l < r,
                    IntPredicate::Sle => l <= r,
                    IntPredicate::Sgt => l > r,
                    IntPredicate::Sge => l >= r,
                })
            }
            InstKind::ZExt { value } => RtValue::Int(self.eval(value)?.as_bool()? as i32),
            InstKind::ElementPtr { base, index, .. } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?.as_int()?;
                match base {
                    RtValue::Ptr { global, offset } => RtValue::Ptr {
                        global,
                        offset: offset + i64::from(index),
                    },
                    other => {
                        return Err(ExecError::Malformed(format!(
                            "getelementptr on {other:?}"
                        )))
                    }
                }
            }
            InstKind::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|a| self.eval(a))
                    .collect::<Result<Vec<_>, _>>()?;
                RtValue::Int(self.call(*callee, &args)?)
            }
        };
        Ok(Some(value))
    }

    fn call(&mut self, callee: DeclId, args: &[RtValue]) -> Result<i32, ExecError> {
        let module = self.module;
        let decl = module.declaration(callee);
        match decl.name.as_str() {
            "printf" => {
                let text = self.format(args)?;
                self.output.write_all(text.as_bytes())?;
                Ok(text.len() as i32)
            }
            "scanf" => {
                let mut assigned = 0;
                for ptr in args.iter().skip(1) {
                    let value = self.input.next_int()?;
                    *self.cell(*ptr, true)? = value;
                    assigned += 1;
                }
                Ok(assigned)
            }
            other => Err(ExecError::UnsupportedCall(other.to_string())),
        }
    }

    /// Minimal `printf`: `%d` consumes the next integer argument, `%%` is a
    /// literal percent sign.
    fn format(&self, args: &[RtValue]) -> Result<String, ExecError> {
        let Some(RtValue::Str(fmt)) = args.first() else {
            return Err(ExecError::Malformed("printf without format string".into()));
        };
        let bytes = &self.module.string(*fmt).bytes;
        let text = String::from_utf8_lossy(bytes.strip_suffix(&[0]).unwrap_or(bytes));
        let mut rest = args[1..].iter();
        let mut out = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('d') => {
                    let v = rest
                        .next()
                        .ok_or_else(|| ExecError::Malformed("missing printf argument".into()))?
                        .as_int()?;
                    out.push_str(&v.to_string());
                }
                Some('%') => out.push('%'),
                other => {
                    return Err(ExecError::Malformed(format!(
                        "unsupported conversion %{}",
                        other.map(String::from).unwrap_or_default()
                    )))
                }
            }
        }
        Ok(out)
    }
}

fn arith(op: BinaryOp, l: i32, r: i32) -> Result<i32, ExecError> {
    Ok(match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::SDiv => {
            if r == 0 {
                return Err(ExecError::DivisionByZero);
            }
            l.wrapping_div(r)
        }
        BinaryOp::SRem => {
            if r == 0 {
                return Err(ExecError::DivisionByZero);
            }
            l.wrapping_rem(r)
        }
        BinaryOp::And => l & r,
        BinaryOp::Or => l | r,
    })
}
