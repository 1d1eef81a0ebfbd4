// Block-structured SSA IR: a module of globals, external declarations and
// functions made of basic blocks that each end in exactly one terminator.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    I1,
    I32,
    Ptr,
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Type::Void => "void",
            Type::I1 => "i1",
            Type::I32 => "i32",
            Type::Ptr => "ptr",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrId(pub usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(pub usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    ConstInt(i32),
    ConstBool(bool),
    /// Result of an instruction in the enclosing function
    Inst(InstId),
    /// Address of a global
    Global(GlobalId),
    /// Address of an interned string constant
    Str(StrId),
}

/// Shape of a global's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalType {
    I32,
    Array(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalInit {
    Int(i32),
    Zeroed,
}

#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    pub ty: GlobalType,
    pub init: GlobalInit,
    /// Read-only storage (`constant` rather than `global`)
    pub constant: bool,
    pub align: u32,
}

/// Private NUL-terminated byte string.
#[derive(Debug, Clone)]
pub struct StringConst {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// External function declaration (no body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub ret: Type,
    pub params: Vec<Type>,
    pub variadic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    And,
    Or,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::SRem => "srem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        };
        write!(f, "{s}")
    }
}

/// Signed integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl std::fmt::Display for IntPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    /// `%dst = load i32, ptr <ptr>`
    Load { ptr: Value },
    /// `store i32 <value>, ptr <ptr>`
    Store { value: Value, ptr: Value },
    Binary { op: BinaryOp, lhs: Value, rhs: Value },
    ICmp { pred: IntPredicate, lhs: Value, rhs: Value },
    /// Widen an `i1` to `i32`
    ZExt { value: Value },
    /// `getelementptr [len x i32], ptr <base>, i32 0, i32 <index>`
    ElementPtr { base: Value, len: usize, index: Value },
    Call { callee: DeclId, args: Vec<Value> },
}

#[derive(Debug, Clone)]
pub struct Inst {
    /// SSA name, unique within the function; `None` for void instructions
    pub name: Option<String>,
    pub ty: Type,
    pub kind: InstKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Br(BlockId),
    CondBr {
        cond: Value,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    Ret(Option<Value>),
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Br(dest) => vec![*dest],
            Terminator::CondBr {
                then_dest,
                else_dest,
                ..
            } => vec![*then_dest, *else_dest],
            Terminator::Ret(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub label: String,
    pub insts: Vec<InstId>,
    pub terminator: Option<Terminator>,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub ret: Type,
    /// Every block ever created, attached or not
    pub blocks: Vec<Block>,
    /// Attached blocks in emission order; the first one is the entry
    pub layout: Vec<BlockId>,
    pub insts: Vec<Inst>,
    names: HashMap<String, usize>,
}

impl Function {
    pub fn new(name: impl Into<String>, ret: Type) -> Self {
        Self {
            name: name.into(),
            ret,
            blocks: Vec::new(),
            layout: Vec::new(),
            insts: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Reserve a function-local name, suffixing a counter on collision
    /// (`then`, `then1`, `then2`, ...).
    pub fn unique_name(&mut self, base: &str) -> String {
        let base = if base.is_empty() { "tmp" } else { base };
        let Some(&used) = self.names.get(base) else {
            self.names.insert(base.to_string(), 0);
            return base.to_string();
        };
        let mut count = used;
        let candidate = loop {
            count += 1;
            let candidate = format!("{base}{count}");
            if !self.names.contains_key(&candidate) {
                break candidate;
            }
        };
        self.names.insert(base.to_string(), count);
        self.names.insert(candidate.clone(), 0);
        candidate
    }

    /// Create a block that is not yet part of the layout.
    pub fn create_block(&mut self, label: &str) -> BlockId {
        let label = self.unique_name(label);
        self.blocks.push(Block {
            label,
            insts: Vec::new(),
            terminator: None,
        });
        BlockId(self.blocks.len() - 1)
    }

    /// Attach a block at the end of the layout. Attaching twice is a no-op.
    pub fn attach_block(&mut self, id: BlockId) {
        if !self.layout.contains(&id) {
            self.layout.push(id);
        }
    }

    pub fn append_block(&mut self, label: &str) -> BlockId {
        let id = self.create_block(label);
        self.attach_block(id);
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id.0]
    }

    pub fn is_attached(&self, id: BlockId) -> bool {
        self.layout.contains(&id)
    }

    pub fn block_by_label(&self, label: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .position(|b| b.label == label)
            .map(BlockId)
    }

    pub fn entry(&self) -> Option<BlockId> {
        self.layout.first().copied()
    }

    pub fn value_type(&self, value: &Value) -> Type {
        match value {
            Value::ConstInt(_) => Type::I32,
            Value::ConstBool(_) => Type::I1,
            Value::Inst(id) => self.insts.get(id.0).map(|i| i.ty).unwrap_or(Type::Void),
            Value::Global(_) | Value::Str(_) => Type::Ptr,
        }
    }

    /// Attached blocks whose terminator targets `id`.
    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.layout
            .iter()
            .copied()
            .filter(|b| {
                self.block(*b)
                    .terminator
                    .as_ref()
                    .is_some_and(|t| t.successors().contains(&id))
            })
            .collect()
    }

    /// Instructions of attached blocks, in layout order.
    pub fn instructions(&self) -> impl Iterator<Item = &Inst> {
        self.layout
            .iter()
            .flat_map(move |b| self.block(*b).insts.iter().map(move |i| self.inst(*i)))
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub strings: Vec<StringConst>,
    pub declarations: Vec<FunctionDecl>,
    pub functions: Vec<Function>,
    /// Every name taken at module level: globals, strings, declarations and
    /// functions share one namespace.
    symbol_names: HashSet<String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: Vec::new(),
            strings: Vec::new(),
            declarations: Vec::new(),
            functions: Vec::new(),
            symbol_names: HashSet::new(),
        }
    }

    /// Claim a module-level name ahead of its definition so globals added
    /// earlier cannot take it.
    pub fn reserve_symbol(&mut self, name: &str) {
        self.symbol_names.insert(name.to_string());
    }

    /// Claim `base`, or `base.1`, `base.2`, ... if it is taken.
    pub fn unique_symbol(&mut self, base: &str) -> String {
        if self.symbol_names.insert(base.to_string()) {
            return base.to_string();
        }
        let mut count = 0;
        loop {
            count += 1;
            let candidate = format!("{base}.{count}");
            if self.symbol_names.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Add a global under a free name; the stored name may differ from the
    /// requested one.
    pub fn add_global(&mut self, mut global: Global) -> GlobalId {
        global.name = self.unique_symbol(&global.name);
        self.globals.push(global);
        GlobalId(self.globals.len() - 1)
    }

    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[id.0]
    }

    pub fn get_global(&self, name: &str) -> Option<GlobalId> {
        self.globals.iter().position(|g| g.name == name).map(GlobalId)
    }

    /// Intern a NUL-terminated string; identical contents share one constant.
    pub fn intern_string(&mut self, name: &str, text: &str) -> StrId {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        if let Some(pos) = self.strings.iter().position(|s| s.bytes == bytes) {
            return StrId(pos);
        }
        let name = self.unique_symbol(name);
        self.strings.push(StringConst {
            name,
            bytes,
        });
        StrId(self.strings.len() - 1)
    }

    pub fn string(&self, id: StrId) -> &StringConst {
        &self.strings[id.0]
    }

    /// Declare an external function once; later requests return the same id.
    pub fn get_or_insert_function(
        &mut self,
        name: &str,
        ret: Type,
        params: &[Type],
        variadic: bool,
    ) -> DeclId {
        if let Some(id) = self.get_declaration(name) {
            return id;
        }
        self.reserve_symbol(name);
        self.declarations.push(FunctionDecl {
            name: name.to_string(),
            ret,
            params: params.to_vec(),
            variadic,
        });
        DeclId(self.declarations.len() - 1)
    }

    pub fn get_declaration(&self, name: &str) -> Option<DeclId> {
        self.declarations
            .iter()
            .position(|d| d.name == name)
            .map(DeclId)
    }

    pub fn declaration(&self, id: DeclId) -> &FunctionDecl {
        &self.declarations[id.0]
    }

    /// Add a defined function. Its name must already be reserved or free.
    pub fn add_function(&mut self, function: Function) {
        self.reserve_symbol(&function.name);
        self.functions.push(function);
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}
