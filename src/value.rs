use std::fmt;

/// Unique identifier for an interned symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// Index into the builtin table (see `builtins::BUILTINS`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuiltinId(pub u8);

/// Index into the cons-cell heap. This is the GC handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairId(pub u32);

/// The fundamental value. Copy semantics: pair data lives in the heap.
///
/// `Closure` and `Macro` point at a pair-of-pairs `(env . (params . body))`.
/// Deriving `PartialEq` gives exactly the identity semantics `EQ?` needs:
/// handles compare by index, integers by value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Nil,
    Integer(i64),
    Symbol(SymbolId),
    Pair(PairId),
    Builtin(BuiltinId),
    Closure(PairId),
    Macro(PairId),
}

impl Value {
    pub fn is_nil(self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_pair(self) -> bool {
        matches!(self, Value::Pair(_))
    }

    pub fn is_symbol(self) -> bool {
        matches!(self, Value::Symbol(_))
    }

    pub fn as_pair(self) -> Option<PairId> {
        match self {
            Value::Pair(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_symbol(self) -> Option<SymbolId> {
        match self {
            Value::Symbol(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_integer(self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(n),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub fn type_name(self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Integer(_) => "integer",
            Value::Symbol(_) => "symbol",
            Value::Pair(_) => "pair",
            Value::Builtin(_) => "builtin",
            Value::Closure(_) => "closure",
            Value::Macro(_) => "macro",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Integer(n) => write!(f, "Int({})", n),
            Value::Symbol(id) => write!(f, "Sym({})", id.0),
            Value::Pair(id) => write!(f, "Pair({})", id.0),
            Value::Builtin(id) => write!(f, "Builtin({})", id.0),
            Value::Closure(id) => write!(f, "Closure({})", id.0),
            Value::Macro(id) => write!(f, "Macro({})", id.0),
        }
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

impl fmt::Debug for BuiltinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltinId({})", self.0)
    }
}

impl fmt::Debug for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairId({})", self.0)
    }
}
