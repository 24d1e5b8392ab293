//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // SDK Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Pebble SDK not found at: {path}")]
    SdkNotFound { path: PathBuf },

    #[error("Your SDK does not support the Pebble emulator (missing {missing}). Please upgrade your SDK.")]
    UnsupportedSdk { missing: PathBuf },

    #[error("Unknown platform '{0}' (expected one of: aplite, basalt)")]
    UnknownPlatform(String),

    // ─────────────────────────────────────────────────────────────
    // Process Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to launch {program}: {reason}")]
    LaunchFailure { program: PathBuf, reason: String },

    #[error("Failed to probe process {pid}: {reason}")]
    ProbeFailed { pid: u32, reason: String },

    #[error("Failed to kill process {pid}: {reason}")]
    KillFailed { pid: u32, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Supervisor State Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Unreadable state marker {path}: {reason}")]
    StateReadAmbiguous { path: PathBuf, reason: String },

    #[error("Failed to record state marker {path}: {reason}")]
    StateWrite { path: PathBuf, reason: String },

    #[error("Failed to write persistent emulator data at {path}: {reason}")]
    PersistenceWrite { path: PathBuf, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn unsupported_sdk(missing: impl Into<PathBuf>) -> Self {
        Self::UnsupportedSdk {
            missing: missing.into(),
        }
    }

    pub fn launch_failure(program: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::LaunchFailure {
            program: program.into(),
            reason: reason.to_string(),
        }
    }

    pub fn probe_failed(pid: u32, reason: impl ToString) -> Self {
        Self::ProbeFailed {
            pid,
            reason: reason.to_string(),
        }
    }

    pub fn kill_failed(pid: u32, reason: impl ToString) -> Self {
        Self::KillFailed {
            pid,
            reason: reason.to_string(),
        }
    }

    pub fn state_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::StateReadAmbiguous {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn state_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::StateWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn persistence_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::PersistenceWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// An ambiguous marker read is resolved by treating the process as not
    /// alive, so it never reaches the user.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::StateReadAmbiguous { .. })
    }

    /// Check if this error should abort the current command
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
