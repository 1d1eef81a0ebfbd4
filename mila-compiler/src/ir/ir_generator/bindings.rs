//! Storage binding: identifier to the global that holds it.

use std::collections::HashMap;

use tracing::debug;

use super::context::Gen;
use crate::ir::symbol_table::SymbolKind;
use crate::ir::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    /// `origin` is the source index stored in cell 0.
    Array { len: usize, origin: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Storage {
    pub global: GlobalId,
    pub shape: Shape,
}

/// Write-once map; an identifier is bound before its first use and never
/// rebound.
#[derive(Debug, Default)]
pub struct Bindings {
    map: HashMap<String, Storage>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &str, storage: Storage) {
        let prev = self.map.insert(name.to_string(), storage);
        debug_assert!(prev.is_none(), "'{name}' bound twice");
    }

    pub fn get(&self, name: &str) -> Option<Storage> {
        self.map.get(name).copied()
    }
}

impl Gen<'_> {
    /// Create one global per symbol-table entry and bind it.
    pub fn materialize_globals(&mut self) {
        let indexing = self.options.array_indexing;
        for sym in self.symbols.globals() {
            let (global, shape) = match sym.kind {
                SymbolKind::Const | SymbolKind::Var => (
                    Global {
                        name: sym.name.clone(),
                        ty: GlobalType::I32,
                        init: GlobalInit::Int(sym.value),
                        constant: sym.kind == SymbolKind::Const,
                        align: 4,
                    },
                    Shape::Scalar,
                ),
                SymbolKind::Array => {
                    let len = indexing.element_count(sym.lower, sym.upper);
                    (
                        Global {
                            name: sym.name.clone(),
                            ty: GlobalType::Array(len),
                            init: GlobalInit::Zeroed,
                            constant: false,
                            align: 4,
                        },
                        Shape::Array {
                            len,
                            origin: indexing.origin(sym.lower, sym.upper),
                        },
                    )
                }
            };
            debug!(name = %sym.name, kind = ?sym.kind, ?shape, "materializing global");
            let id = self.module.add_global(global);
            self.bindings.bind(&sym.name, Storage { global: id, shape });
        }
    }
}
