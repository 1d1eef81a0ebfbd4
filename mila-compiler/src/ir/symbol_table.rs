use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Const,
    Var,
    Array,
}

/// Descriptor for a declared global.
///
/// `value` is the initial value of a scalar; `lower`/`upper` are the declared
/// array bounds, which may appear in either order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default)]
    pub value: i32,
    #[serde(default)]
    pub lower: i32,
    #[serde(default)]
    pub upper: i32,
}

impl Symbol {
    pub fn constant(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Const,
            value,
            lower: 0,
            upper: 0,
        }
    }

    pub fn variable(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Var,
            value,
            lower: 0,
            upper: 0,
        }
    }

    pub fn array(name: impl Into<String>, lower: i32, upper: i32) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Array,
            value: 0,
            lower,
            upper,
        }
    }
}

/// Global symbols in declaration order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    globals: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from descriptors, failing on the first duplicate name.
    pub fn from_symbols<I>(symbols: I) -> Result<Self, Symbol>
    where
        I: IntoIterator<Item = Symbol>,
    {
        let mut table = Self::new();
        for symbol in symbols {
            table.declare(symbol)?;
        }
        Ok(table)
    }

    /// Declare a global. On redefinition the existing descriptor is returned.
    pub fn declare(&mut self, symbol: Symbol) -> Result<(), Symbol> {
        if let Some(existing) = self.globals.get(&symbol.name) {
            return Err(existing.clone());
        }
        self.globals.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.globals.get(name)
    }

    pub fn is_const(&self, name: &str) -> bool {
        matches!(self.lookup(name), Some(s) if s.kind == SymbolKind::Const)
    }

    pub fn globals(&self) -> impl Iterator<Item = &Symbol> {
        self.globals.values()
    }

    pub fn len(&self) -> usize {
        self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }
}
