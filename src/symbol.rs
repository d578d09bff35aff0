use std::collections::HashMap;

use crate::value::SymbolId;

/// Interned symbol table. Each unique (uppercased) name maps to a unique
/// SymbolId, so `foo` and `FOO` read as the same symbol and `EQ?` is an id
/// comparison.
pub struct SymbolTable {
    name_to_id: HashMap<String, SymbolId>,
    id_to_name: Vec<String>,
}

/// Well-known symbol IDs, pre-interned at startup.
/// These must match the order of interning in SymbolTable::new().
pub mod sym {
    use crate::value::SymbolId;

    pub const T: SymbolId = SymbolId(0);
    pub const QUOTE: SymbolId = SymbolId(1);
    pub const DEFINE: SymbolId = SymbolId(2);
    pub const LAMBDA: SymbolId = SymbolId(3);
    pub const IF: SymbolId = SymbolId(4);
    pub const DEFMACRO: SymbolId = SymbolId(5);
    pub const APPLY: SymbolId = SymbolId(6);
    pub const QUASIQUOTE: SymbolId = SymbolId(7);
    pub const UNQUOTE: SymbolId = SymbolId(8);
    pub const UNQUOTE_SPLICING: SymbolId = SymbolId(9);
}

const WELL_KNOWN: [&str; 10] = [
    "T",
    "QUOTE",
    "DEFINE",
    "LAMBDA",
    "IF",
    "DEFMACRO",
    "APPLY",
    "QUASIQUOTE",
    "UNQUOTE",
    "UNQUOTE-SPLICING",
];

impl SymbolTable {
    /// Create a new symbol table with all well-known symbols pre-interned.
    pub fn new() -> Self {
        let mut table = SymbolTable {
            name_to_id: HashMap::new(),
            id_to_name: Vec::new(),
        };
        for name in WELL_KNOWN {
            table.intern(name);
        }
        table
    }

    /// Intern a symbol name. Returns the existing ID if already interned,
    /// or creates a new one. The name is case-folded to uppercase first.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        let name = name.to_uppercase();
        if let Some(&id) = self.name_to_id.get(&name) {
            return id;
        }
        let id = SymbolId(self.id_to_name.len() as u32);
        self.id_to_name.push(name.clone());
        self.name_to_id.insert(name, id);
        id
    }

    /// Look up a symbol name by its ID.
    pub fn name(&self, id: SymbolId) -> &str {
        &self.id_to_name[id.0 as usize]
    }

    /// Look up a symbol ID by name, without interning.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.name_to_id.get(&name.to_uppercase()).copied()
    }

    /// Total number of interned symbols.
    pub fn count(&self) -> usize {
        self.id_to_name.len()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
