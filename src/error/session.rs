// Session error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Session error code constants
///
/// Error code range: 2001-2009
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// No track is currently selected
    pub const NO_TRACK_SELECTED: i32 = 2001;

    /// Selected track is not armed for recording
    pub const TRACK_NOT_ARMED: i32 = 2002;

    /// A recording session is already active
    pub const ALREADY_RECORDING: i32 = 2003;

    /// No recording session is active
    pub const NOT_RECORDING: i32 = 2004;

    /// Track index does not exist
    pub const TRACK_INDEX_OUT_OF_RANGE: i32 = 2005;

    /// Track holds no clip
    pub const EMPTY_TRACK: i32 = 2006;

    /// Frame range is empty or inverted
    pub const INVALID_RANGE: i32 = 2007;

    /// Loop boundaries are inverted or zero-length
    pub const INVALID_LOOP_POINTS: i32 = 2008;

    /// No finalized take is available
    pub const EMPTY_CAPTURE: i32 = 2009;
}

/// Log a session error with structured context
///
/// Session errors are invalid-state requests. They are reported at warning
/// level because the request is simply ignored.
pub fn log_session_error(err: &SessionError, context: &str) {
    warn!(
        "[{}] Request rejected: code={}, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Invalid-state requests against the track list, transport or loop.
///
/// Every operation returning one of these leaves the session untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    NoTrackSelected,

    TrackNotArmed { name: String },

    AlreadyRecording,

    NotRecording,

    TrackIndexOutOfRange { index: usize, len: usize },

    EmptyTrack { name: String },

    InvalidRange { start: usize, end: usize },

    InvalidLoopPoints { start: usize, end: usize },

    EmptyCapture,
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::NoTrackSelected => SessionErrorCodes::NO_TRACK_SELECTED,
            SessionError::TrackNotArmed { .. } => SessionErrorCodes::TRACK_NOT_ARMED,
            SessionError::AlreadyRecording => SessionErrorCodes::ALREADY_RECORDING,
            SessionError::NotRecording => SessionErrorCodes::NOT_RECORDING,
            SessionError::TrackIndexOutOfRange { .. } => {
                SessionErrorCodes::TRACK_INDEX_OUT_OF_RANGE
            }
            SessionError::EmptyTrack { .. } => SessionErrorCodes::EMPTY_TRACK,
            SessionError::InvalidRange { .. } => SessionErrorCodes::INVALID_RANGE,
            SessionError::InvalidLoopPoints { .. } => SessionErrorCodes::INVALID_LOOP_POINTS,
            SessionError::EmptyCapture => SessionErrorCodes::EMPTY_CAPTURE,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::NoTrackSelected => "No track selected".to_string(),
            SessionError::TrackNotArmed { name } => {
                format!("Track '{}' is not armed for recording", name)
            }
            SessionError::AlreadyRecording => "Recording already in progress".to_string(),
            SessionError::NotRecording => "No recording in progress".to_string(),
            SessionError::TrackIndexOutOfRange { index, len } => {
                format!("Track index {} out of range ({} tracks)", index, len)
            }
            SessionError::EmptyTrack { name } => format!("Track '{}' has no audio", name),
            SessionError::InvalidRange { start, end } => {
                format!("Invalid frame range {}..{}", start, end)
            }
            SessionError::InvalidLoopPoints { start, end } => {
                format!(
                    "Loop end ({}) must be greater than loop start ({})",
                    end, start
                )
            }
            SessionError::EmptyCapture => "No finalized recording available".to_string(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session error {}: {}", self.code(), self.message())
    }
}

impl std::error::Error for SessionError {}
