/// Errors raised while reading or evaluating.
///
/// The first four variants are the conditions the evaluator itself detects;
/// all of them abort the current evaluation. The loader decides whether to
/// carry on with the next top-level form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LispError {
    /// Malformed expression shape, or unreadable source text.
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Wrong number of operands to a special form, builtin, or closure.
    #[error("Argument error: {0}")]
    Args(String),

    /// Operand of the wrong variant.
    #[error("Type error: {0}")]
    Type(String),

    /// Symbol with no binding reachable through the environment chain.
    #[error("Unbound symbol: {0}")]
    Unbound(String),

    /// The cons-cell arena is full even after collection.
    #[error("Heap capacity of {capacity} cells exceeded")]
    HeapExhausted { capacity: usize },

    /// Source file could not be read by the loader.
    #[error("I/O error: {0}")]
    Io(String),
}

/// The closed set of error categories, for callers that only care which
/// kind of failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Argument,
    Type,
    Unbound,
    Resource,
    Io,
}

impl LispError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LispError::Syntax(_) => ErrorKind::Syntax,
            LispError::Args(_) => ErrorKind::Argument,
            LispError::Type(_) => ErrorKind::Type,
            LispError::Unbound(_) => ErrorKind::Unbound,
            LispError::HeapExhausted { .. } => ErrorKind::Resource,
            LispError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type LispResult<T> = Result<T, LispError>;
