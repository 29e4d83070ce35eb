//! Error types for histmine.

use thiserror::Error;

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by backend failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// histmine error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or contradictory mining options
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote location whose repository name cannot be derived
    #[error("Badly formatted url {0}")]
    MalformedUrl(String),

    /// A filter referenced a tag, commit or branch the repository does not have
    #[error("Could not resolve {filter} '{value}'")]
    Resolution { filter: &'static str, value: String },

    /// Failure inside the git backend
    #[error("Backend error: {0}")]
    Backend(#[source] BoxError),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Source analysis failed for one file
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Wrap a backend failure, keeping it as the error source.
    pub fn backend(cause: impl Into<BoxError>) -> Self {
        Error::Backend(cause.into())
    }

    /// True for errors that stop a mining session before any commit is produced.
    pub fn is_fatal_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::MalformedUrl(_) | Error::Resolution { .. }
        )
    }
}
