//! Error types for syncreport.
//!
//! Library crates use [`SyncReportError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all syncreport operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncReportError {
    /// A required setting (controller address, token) was not supplied.
    #[error("missing configuration: {what}")]
    ConfigurationMissing { what: String },

    /// Configuration file could not be parsed or holds invalid values.
    #[error("config error: {message}")]
    Config { message: String },

    /// Retrieving application records from the controller failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// An application name does not split into application and environment.
    #[error("malformed application identifier '{identifier}': expected <application>-<environment>[-<cluster>]")]
    MalformedIdentifier { identifier: String },

    /// The target document could not be read or written.
    #[error("document access failed at {path:?}: {source}")]
    DocumentAccess {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid argument (empty marker heading, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SyncReportError>;

impl SyncReportError {
    /// Create a missing-configuration error naming the absent setting.
    pub fn missing(what: impl Into<String>) -> Self {
        Self::ConfigurationMissing { what: what.into() }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch error from any displayable message.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a malformed-identifier error for `identifier`.
    pub fn malformed(identifier: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            identifier: identifier.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with the document path for context.
    pub fn document_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DocumentAccess {
            path: path.into(),
            source,
        }
    }
}
