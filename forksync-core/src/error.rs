//! Error types for forksync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading the trigger event or configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the path being read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The event payload is not valid JSON or does not have the expected shape.
    #[error("failed to parse event payload at {path}: {source}")]
    Event {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The YAML config file is malformed; includes file path and line context.
    #[error("failed to parse config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A repository identifier was not of the form `owner/name`.
    #[error("invalid repository '{0}'; expected owner/name")]
    InvalidRepo(String),

    /// A configuration value could not be interpreted.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    /// A value required for a live run was not provided by any source.
    #[error("missing required setting {key}; set ${env}")]
    Missing { key: &'static str, env: &'static str },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
