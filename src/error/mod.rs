// Error types for the multitrack engine
//
// Two families with disjoint code ranges: AudioError for streams, hardware,
// tempo and file I/O, SessionError for invalid-state requests. EngineError
// wraps both for the Player control surface.

mod audio;
mod session;

use std::fmt;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the control surface and the command-line front end.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Error returned by `Player` operations.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Audio(AudioError),
    Session(SessionError),
}

impl ErrorCode for EngineError {
    fn code(&self) -> i32 {
        match self {
            EngineError::Audio(err) => err.code(),
            EngineError::Session(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            EngineError::Audio(err) => err.message(),
            EngineError::Session(err) => err.message(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Audio(err) => err.fmt(f),
            EngineError::Session(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Audio(err) => Some(err),
            EngineError::Session(err) => Some(err),
        }
    }
}

impl From<AudioError> for EngineError {
    fn from(err: AudioError) -> Self {
        EngineError::Audio(err)
    }
}

impl From<SessionError> for EngineError {
    fn from(err: SessionError) -> Self {
        EngineError::Session(err)
    }
}
