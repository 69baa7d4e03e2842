use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The three failure classes every stage reports through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, malformed or empty input file/directory, zero-sample matrix.
    Input,
    /// Unknown mode, missing parameter, gene absent from the data.
    Configuration,
    /// Statistic undefined for the given input.
    Computation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Input => "InputError",
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Computation => "ComputationError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum OncoexprError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OncoexprError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }

    pub fn csv(path: impl AsRef<Path>, source: csv::Error) -> Self {
        Self::Csv { path: path.as_ref().to_path_buf(), source }
    }

    /// Requested genes that the data does not contain. Lists every one of them.
    pub fn missing_genes(missing: &[String]) -> Self {
        Self::Configuration(format!(
            "gene(s) not present in expression matrix: {}",
            missing.join(", ")
        ))
    }

    /// Classify this error. Wrapped I/O and parse failures are input problems.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OncoexprError::Input(_)
            | OncoexprError::Io { .. }
            | OncoexprError::Csv { .. }
            | OncoexprError::Serialization(_) => ErrorKind::Input,
            OncoexprError::Configuration(_) => ErrorKind::Configuration,
            OncoexprError::Computation(_) => ErrorKind::Computation,
        }
    }
}

pub type Result<T> = std::result::Result<T, OncoexprError>;
