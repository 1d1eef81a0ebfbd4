//! LLVM-flavoured textual form of a [`Module`].

use std::fmt;

use super::ir::*;

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", self.name)?;

        if !self.globals.is_empty() || !self.strings.is_empty() {
            writeln!(f)?;
        }
        for g in &self.globals {
            let linkage = if g.constant { "constant" } else { "global" };
            match (g.ty, &g.init) {
                (GlobalType::I32, GlobalInit::Int(v)) => {
                    writeln!(f, "@{} = {linkage} i32 {v}, align {}", g.name, g.align)?
                }
                (GlobalType::I32, GlobalInit::Zeroed) => {
                    writeln!(f, "@{} = {linkage} i32 0, align {}", g.name, g.align)?
                }
                (GlobalType::Array(len), _) => writeln!(
                    f,
                    "@{} = {linkage} [{len} x i32] zeroinitializer, align {}",
                    g.name, g.align
                )?,
            }
        }
        for s in &self.strings {
            writeln!(
                f,
                "@{} = private unnamed_addr constant [{} x i8] c\"{}\", align 1",
                s.name,
                s.bytes.len(),
                Escaped(&s.bytes)
            )?;
        }

        for func in &self.functions {
            writeln!(f)?;
            write!(f, "{}", FunctionPrinter { module: self, func })?;
        }

        if !self.declarations.is_empty() {
            writeln!(f)?;
        }
        for d in &self.declarations {
            writeln!(f, "declare {} @{}({})", d.ret, d.name, Signature(d))?;
        }
        Ok(())
    }
}

struct FunctionPrinter<'a> {
    module: &'a Module,
    func: &'a Function,
}

impl FunctionPrinter<'_> {
    fn operand(&self, v: &Value) -> String {
        match v {
            Value::ConstInt(i) => i.to_string(),
            Value::ConstBool(b) => b.to_string(),
            Value::Inst(id) => match &self.func.inst(*id).name {
                Some(n) => format!("%{n}"),
                None => "void".to_string(),
            },
            Value::Global(id) => format!("@{}", self.module.global(*id).name),
            Value::Str(id) => format!("@{}", self.module.string(*id).name),
        }
    }

    fn typed(&self, v: &Value) -> String {
        format!("{} {}", self.func.value_type(v), self.operand(v))
    }

    fn label(&self, id: BlockId) -> String {
        format!("label %{}", self.func.block(id).label)
    }

    fn inst(&self, inst: &Inst) -> String {
        let body = match &inst.kind {
            InstKind::Load { ptr } => format!("load i32, {}, align 4", self.typed(ptr)),
            InstKind::Store { value, ptr } => {
                format!("store {}, {}, align 4", self.typed(value), self.typed(ptr))
            }
            InstKind::Binary { op, lhs, rhs } => {
                format!("{op} {}, {}", self.typed(lhs), self.operand(rhs))
            }
            InstKind::ICmp { pred, lhs, rhs } => {
                format!("icmp {pred} {}, {}", self.typed(lhs), self.operand(rhs))
            }
            InstKind::ZExt { value } => format!("zext {} to i32", self.typed(value)),
            InstKind::ElementPtr { base, len, index } => format!(
                "getelementptr [{len} x i32], {}, i32 0, {}",
                self.typed(base),
                self.typed(index)
            ),
            InstKind::Call { callee, args } => {
                let decl = self.module.declaration(*callee);
                let args = args
                    .iter()
                    .map(|a| self.typed(a))
                    .collect::<Vec<_>>()
                    .join(", ");
                if decl.variadic {
                    format!("call {} ({}) @{}({args})", decl.ret, Signature(decl), decl.name)
                } else {
                    format!("call {} @{}({args})", decl.ret, decl.name)
                }
            }
        };
        match &inst.name {
            Some(n) => format!("%{n} = {body}"),
            None => body,
        }
    }

    fn terminator(&self, t: &Terminator) -> String {
        match t {
            Terminator::Br(dest) => format!("br {}", self.label(*dest)),
            Terminator::CondBr {
                cond,
                then_dest,
                else_dest,
            } => format!(
                "br {}, {}, {}",
                self.typed(cond),
                self.label(*then_dest),
                self.label(*else_dest)
            ),
            Terminator::Ret(Some(v)) => format!("ret {}", self.typed(v)),
            Terminator::Ret(None) => "ret void".to_string(),
        }
    }
}

impl fmt::Display for FunctionPrinter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "define {} @{}() {{", self.func.ret, self.func.name)?;
        for (i, id) in self.func.layout.iter().enumerate() {
            let block = self.func.block(*id);
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", block.label)?;
            for inst in &block.insts {
                writeln!(f, "  {}", self.inst(self.func.inst(*inst)))?;
            }
            if let Some(t) = &block.terminator {
                writeln!(f, "  {}", self.terminator(t))?;
            }
        }
        writeln!(f, "}}")
    }
}

struct Signature<'a>(&'a FunctionDecl);

impl fmt::Display for Signature<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.0.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        if self.0.variadic {
            if self.0.params.is_empty() {
                write!(f, "...")?;
            } else {
                write!(f, ", ...")?;
            }
        }
        Ok(())
    }
}

struct Escaped<'a>(&'a [u8]);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0 {
            if (b.is_ascii_graphic() && b != b'"' && b != b'\\') || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\{b:02X}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_bytes() {
        assert_eq!(Escaped(b"%d\n\0").to_string(), "%d\\0A\\00");
        assert_eq!(Escaped(b"a \"b\"").to_string(), "a \\22b\\22");
    }

    #[test]
    fn prints_declarations_once_with_variadic_signature() {
        let mut m = Module::new("t");
        m.get_or_insert_function("printf", Type::I32, &[Type::Ptr], true);
        m.get_or_insert_function("printf", Type::I32, &[Type::Ptr], true);
        let text = m.to_string();
        assert_eq!(text.matches("declare i32 @printf(ptr, ...)").count(), 1);
    }
}
