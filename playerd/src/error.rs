//! Error types for playerd
//!
//! Every engine failure is translated into one of these variants at the call
//! site. Callers match on [`Error::kind`], which is stable; the message text
//! is for logs.

use crate::engine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the player core
#[derive(Error, Debug)]
pub enum Error {
    /// Open called while the engine connection is already up
    #[error("player is already running")]
    AlreadyRunning,

    /// Close called while the engine connection is down
    #[error("player is already closed")]
    AlreadyClosed,

    /// Operation requires an open engine connection
    #[error("player is not running")]
    NotRunning,

    /// Engine could not be created, initialized or started
    #[error("failed to initialize engine: {0}")]
    InitializationFailed(String),

    /// Engine refused an option
    #[error("failed to set option '{name}': {source}")]
    OptionRejected { name: String, source: EngineError },

    /// Engine refused a command
    #[error("failed to run command '{command}': {source}")]
    CommandRejected { command: String, source: EngineError },

    /// Engine refused a property write
    #[error("failed to set property '{name}': {source}")]
    PropertyRejected { name: String, source: EngineError },

    /// Arguments could not be marshalled for the engine
    #[error("failed to allocate memory: {0}")]
    AllocationFailed(String),

    /// Local media file does not exist
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Error reported by the engine's event source
    #[error("engine fault: {0}")]
    EngineFault(EngineError),
}

/// Stable classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyRunning,
    /// Covers both `AlreadyClosed` and `NotRunning`
    NotRunning,
    InitializationFailed,
    OptionRejected,
    CommandRejected,
    PropertyRejected,
    AllocationFailed,
    FileNotFound,
    EngineFault,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AlreadyRunning => "already_running",
            ErrorKind::NotRunning => "not_running",
            ErrorKind::InitializationFailed => "initialization_failed",
            ErrorKind::OptionRejected => "option_rejected",
            ErrorKind::CommandRejected => "command_rejected",
            ErrorKind::PropertyRejected => "property_rejected",
            ErrorKind::AllocationFailed => "allocation_failed",
            ErrorKind::FileNotFound => "file_not_found",
            ErrorKind::EngineFault => "engine_fault",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AlreadyRunning => ErrorKind::AlreadyRunning,
            Error::AlreadyClosed | Error::NotRunning => ErrorKind::NotRunning,
            Error::InitializationFailed(_) => ErrorKind::InitializationFailed,
            Error::OptionRejected { .. } => ErrorKind::OptionRejected,
            Error::CommandRejected { .. } => ErrorKind::CommandRejected,
            Error::PropertyRejected { .. } => ErrorKind::PropertyRejected,
            Error::AllocationFailed(_) => ErrorKind::AllocationFailed,
            Error::FileNotFound(_) => ErrorKind::FileNotFound,
            Error::EngineFault(_) => ErrorKind::EngineFault,
        }
    }

    /// Translate an engine failure, keeping allocation failures distinct
    pub(crate) fn from_engine(
        err: EngineError,
        rejected: impl FnOnce(EngineError) -> Error,
    ) -> Error {
        match err {
            EngineError::Allocation(msg) => Error::AllocationFailed(msg),
            other => rejected(other),
        }
    }
}

/// Convenience Result type using the player Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_variants_share_kind() {
        assert_eq!(Error::AlreadyClosed.kind(), ErrorKind::NotRunning);
        assert_eq!(Error::NotRunning.kind(), ErrorKind::NotRunning);
        assert_eq!(Error::AlreadyRunning.kind(), ErrorKind::AlreadyRunning);
    }

    #[test]
    fn test_from_engine_separates_allocation() {
        let alloc = Error::from_engine(EngineError::Allocation("oom".into()), |source| {
            Error::CommandRejected {
                command: "loadfile".into(),
                source,
            }
        });
        assert_eq!(alloc.kind(), ErrorKind::AllocationFailed);

        let rejected = Error::from_engine(EngineError::rejected(-4, "invalid parameter"), |source| {
            Error::PropertyRejected {
                name: "pause".into(),
                source,
            }
        });
        assert_eq!(rejected.kind(), ErrorKind::PropertyRejected);
        assert_eq!(
            rejected.to_string(),
            "failed to set property 'pause': invalid parameter (code -4)"
        );
    }

    #[test]
    fn test_file_not_found_message() {
        let err = Error::FileNotFound(PathBuf::from("/media/missing.mp4"));
        assert_eq!(err.to_string(), "file not found: /media/missing.mp4");
        assert_eq!(err.kind().as_str(), "file_not_found");
    }
}
