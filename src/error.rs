//! Unified error handling for the session tracker.
//!
//! Sample filtering never produces errors: rejected samples are reported as
//! outcomes. Errors are reserved for collaborator failures (the journal store)
//! and invalid configuration.

use thiserror::Error;

/// Unified error type for session-tracker operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error), uniffi(flat_error))]
pub enum TrackerError {
    /// A write or read against the journal store failed.
    /// In-memory session state is left untouched when this is returned.
    #[error("Persistence failure: {message}")]
    PersistenceFailure { message: String },

    /// Configuration value out of range
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Requested record does not exist
    #[error("Not found: {what}")]
    NotFound { what: String },
}

impl TrackerError {
    pub fn persistence(message: impl Into<String>) -> Self {
        TrackerError::PersistenceFailure {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        TrackerError::ConfigError {
            message: message.into(),
        }
    }

    /// True for store failures, which callers usually log and keep tracking through.
    pub fn is_persistence(&self) -> bool {
        matches!(self, TrackerError::PersistenceFailure { .. })
    }
}

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        TrackerError::persistence(err.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::config(err.to_string())
    }
}

/// Result type alias for session-tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Extension trait for converting Option to TrackerError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a not-found error naming the missing record.
    fn ok_or_not_found(self, what: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, what: &str) -> Result<T> {
        self.ok_or_else(|| TrackerError::NotFound {
            what: what.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackerError::persistence("disk full");
        assert_eq!(err.to_string(), "Persistence failure: disk full");
        assert!(err.is_persistence());

        let err = TrackerError::config("tick interval must be positive");
        assert!(err.to_string().contains("tick interval"));
        assert!(!err.is_persistence());
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        let result = none.ok_or_not_found("session 7");
        assert!(matches!(result, Err(TrackerError::NotFound { ref what }) if what == "session 7"));

        assert_eq!(Some(3).ok_or_not_found("x"), Ok(3));
    }

    #[cfg(feature = "persistence")]
    #[test]
    fn test_sqlite_error_maps_to_persistence() {
        let err: TrackerError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(err.is_persistence());
    }
}
