//! Error taxonomy for OTAKU POS.
//!
//! Domain modules classify failures so the command layer can decide how to
//! surface them: validation errors block immediately, external failures are
//! retried by the transport layer first, extraction failures degrade to
//! defaults instead of interrupting the workflow.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PosError {
    /// User/staff input rejected before touching the store (missing field,
    /// inactive shift, no active tab). Never retried.
    #[error("{0}")]
    Validation(String),

    /// SQLite failure while reading or writing the store.
    #[error("database error: {0}")]
    Database(String),

    /// External service failure (extraction endpoint) after retries.
    #[error("{0}")]
    External(String),

    /// OCR/AI field extraction could not produce usable values. Callers
    /// fall back to defaults rather than propagating this to staff.
    #[error("extraction failed: {0}")]
    Extraction(String),
}

impl PosError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<rusqlite::Error> for PosError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Commands return `Result<_, String>` across the IPC boundary; the frontend
/// shows the string in a dismissible notification.
impl From<PosError> for String {
    fn from(e: PosError) -> Self {
        e.to_string()
    }
}

pub type PosResult<T> = Result<T, PosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_passthrough() {
        let err = PosError::validation("Please start your shift to add items");
        assert_eq!(err.to_string(), "Please start your shift to add items");
    }

    #[test]
    fn test_database_message_prefixed() {
        let err = PosError::Database("locked".into());
        assert_eq!(err.to_string(), "database error: locked");
    }

    #[test]
    fn test_string_conversion_for_ipc() {
        let msg: String = PosError::validation("No active tab selected").into();
        assert_eq!(msg, "No active tab selected");
    }
}
