//! Error types for the build pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while loading content and generating the site
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid front-matter in {path:?}: {source}")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },

    #[error("route {route:?} is produced by both {first:?} and {second:?}")]
    DuplicateRoute {
        route: String,
        first: String,
        second: String,
    },

    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidRoutePattern { pattern: String, reason: String },

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from splitting and parsing a front-matter block
#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("opening `---` has no closing `---`")]
    Unterminated,

    #[error("front-matter must be a YAML mapping")]
    NotAMapping,

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}
