mod context;
mod exit_codes;
mod format;

pub use context::ErrorContext;
pub use exit_codes::get_exit_code;
pub use format::{format_error_chain, format_error_with_color};

use thiserror::Error;

/// Failure reported by a backend capability.
///
/// `drop_claim` uses `Ok(false)` for "no such claim", so any `BackendError`
/// means the backend could not be asked at all.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[derive(Error, Debug)]
pub enum LockyardError {
    #[error("Failed to release {} lock(s) during teardown: {details}", .names.len())]
    Unrecoverable { names: Vec<String>, details: String },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Invalid lock name '{0}'")]
    InvalidLockName(String),

    #[error("Lock registry poisoned: {0}")]
    Poisoned(String),

    #[error("Lock '{name}' is held elsewhere (waited {waited_secs:.1}s)")]
    LockContended { name: String, waited_secs: f64 },

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LockyardError>;
