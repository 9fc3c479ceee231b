use thiserror::Error;

/// Why a run stopped.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Reading the source failed with something other than a clean end of input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The command name has no registered handler.
    #[error("Command \"{0}\" not found")]
    UnknownCommand(String),

    /// A handler rejected its command.
    #[error("{0}")]
    Handler(anyhow::Error),
}

/// An [`ErrorKind`] paired with the 1-based source line it originated from.
#[derive(Debug, Error)]
#[error("{cause} (at line {line})")]
pub struct LineError {
    pub line: usize,
    #[source]
    pub cause: ErrorKind,
}

impl LineError {
    pub fn new(line: usize, cause: impl Into<ErrorKind>) -> Self {
        Self {
            line,
            cause: cause.into(),
        }
    }

    pub fn unknown_command(line: usize, name: impl Into<String>) -> Self {
        Self::new(line, ErrorKind::UnknownCommand(name.into()))
    }

    pub fn handler(line: usize, err: anyhow::Error) -> Self {
        Self::new(line, ErrorKind::Handler(err))
    }

    /// Name of the missing command, if that is what stopped the run.
    pub fn unknown_command_name(&self) -> Option<&str> {
        match &self.cause {
            ErrorKind::UnknownCommand(name) => Some(name),
            _ => None,
        }
    }

    /// The error a handler returned, if a handler stopped the run.
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match &self.cause {
            ErrorKind::Handler(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors outside of script execution (config loading and saving).
#[derive(Debug, Error)]
pub enum ConflangError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConflangError>;
