pub mod builtins;
pub mod config;
pub mod env;
pub mod error;
pub mod eval;
pub mod heap;
pub mod printer;
pub mod reader;
pub mod symbol;
pub mod value;

pub use config::MachineConfig;
pub use error::{ErrorKind, LispError, LispResult};
pub use eval::{LoadSummary, Machine};
pub use value::Value;
