//! Error types for dependent filter configuration and storage.
//!
//! Runtime evaluation never fails: stale references are skipped. These
//! errors cover admin-time option handling and view persistence.

use thiserror::Error;

use crate::form::ValidationError;

/// Errors raised while configuring or persisting dependent filters.
#[derive(Debug, Error)]
pub enum DependentFilterError {
    /// Stored handler options could not be decoded.
    #[error("filter '{filter}': invalid options: {details}")]
    InvalidOptions { filter: String, details: String },

    /// Submitted admin options failed validation.
    #[error("filter '{filter}': {} validation error(s): {}", .errors.len(), join_messages(.errors))]
    Validation {
        filter: String,
        errors: Vec<ValidationError>,
    },

    /// Filter id already used in the view.
    #[error("view '{view}': filter id '{filter}' already exists")]
    DuplicateFilter { view: String, filter: String },

    /// Handler name not registered.
    #[error("unknown exposed filter handler '{handler}'")]
    UnknownHandler { handler: String },

    /// Filter id not present in the view.
    #[error("view '{view}': no filter with id '{filter}'")]
    UnknownFilter { view: String, filter: String },

    /// View not found in the config directory.
    #[error("view '{view}' not found in {dir}")]
    UnknownView { view: String, dir: String },

    /// View id cannot be used in a config filename.
    #[error("invalid view id '{view}': {reason}")]
    InvalidViewId { view: String, reason: String },

    /// Config file could not be read, parsed or written.
    #[error("config file {path}: {details}")]
    ConfigFile { path: String, details: String },
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for dependent filter operations.
pub type Result<T> = std::result::Result<T, DependentFilterError>;
