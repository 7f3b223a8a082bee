use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;
use crate::models::SubjectId;

/// Errors surfaced to the user. None of them end the process.
///
/// `Clone` so they can travel inside iced messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Login or session failure; the client drops back to signed out.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A request to the backend failed.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The profile's XP sits below the floor of its own level.
    #[error(
        "inconsistent profile for {subject}: level {level} starts at {level_floor} XP but total is {total_xp}"
    )]
    InconsistentProfile {
        subject: SubjectId,
        level: u32,
        total_xp: u64,
        level_floor: u64,
    },

    /// Rejected locally before reaching the backend.
    #[error("{0}")]
    InvalidInput(String),
}

impl From<BackendError> for ClientError {
    fn from(err: BackendError) -> Self {
        ClientError::BackendUnavailable(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
