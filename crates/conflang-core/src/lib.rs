pub mod config;
pub mod directives;
pub mod error;
pub mod parser;
pub mod registry;
pub mod runner;
pub mod tokenizer;

pub use config::AppConfig;
pub use error::{ConflangError, ErrorKind, LineError, Result};

pub use directives::{StartpageSettings, directive_registry, register_directives};
pub use parser::{Command, Parser};
pub use registry::{Handler, NOP_COMMAND, Registry};
pub use runner::{RunState, Runner, run};
pub use tokenizer::{Token, TokenKind, Tokenizer};
