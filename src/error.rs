use thiserror::Error;

use crate::models::RecordingStatus;

/// Errors surfaced by the recording engine, scheduler and store
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Invalid stream URL: {0}")]
    InvalidStreamUrl(String),

    #[error("Recording duration must be at least one minute")]
    InvalidDuration,

    #[error("Program must end after it starts")]
    InvalidProgramWindow,

    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    #[error("Scheduled recording not found: {0}")]
    ScheduleNotFound(String),

    #[error("Recording {id} is already {status}")]
    TerminalState { id: String, status: RecordingStatus },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),
}

impl RecordingError {
    /// Whether the error was caused by bad caller input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RecordingError::InvalidStreamUrl(_)
                | RecordingError::InvalidDuration
                | RecordingError::InvalidProgramWindow
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RecordingError::RecordingNotFound(_) | RecordingError::ScheduleNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RecordingError>;
