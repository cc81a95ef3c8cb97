//! ALFA Slideshow - Error Types

use thiserror::Error;

use crate::exit::PresentationPhase;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    // ═══════════════════════════════════════════════════════════════
    // SESSION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Cannot present an empty collection")]
    EmptyCollection,

    #[error("Session already closed")]
    SessionClosed,

    #[error("Index {index} out of range (len: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cannot {action} while {phase:?}")]
    InvalidTransition {
        phase: PresentationPhase,
        action: &'static str,
    },

    #[error("Collection name must not be empty")]
    InvalidCollectionName,

    // ═══════════════════════════════════════════════════════════════
    // MEDIA ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Media unavailable: {0}")]
    MediaUnavailable(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Image processing error: {0}")]
    ImageError(String),

    // ═══════════════════════════════════════════════════════════════
    // PERSISTENCE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Persistence failed: {0}")]
    PersistenceFailure(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    // ═══════════════════════════════════════════════════════════════
    // SETTINGS / IO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Settings error: {0}")]
    SettingsError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Platform error: {0}")]
    PlatformError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SessionError {
    /// Check if the session can carry on after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::MediaUnavailable(_)
                | SessionError::ImageError(_)
                | SessionError::PersistenceFailure(_)
                | SessionError::DatabaseError(_)
                | SessionError::CollectionNotFound(_)
                | SessionError::PlatformError(_)
        )
    }
}

impl From<rusqlite::Error> for SessionError {
    fn from(e: rusqlite::Error) -> Self {
        SessionError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::SerializationError(e.to_string())
    }
}

impl From<image::ImageError> for SessionError {
    fn from(e: image::ImageError) -> Self {
        SessionError::ImageError(e.to_string())
    }
}
