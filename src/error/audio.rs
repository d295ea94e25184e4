// Audio error types: streams, devices, tempo and WAV files

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Error code range: 1001-1009
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Tempo is not a finite positive BPM value
    pub const TEMPO_INVALID: i32 = 1001;

    /// The requested stream path is already open
    pub const ALREADY_RUNNING: i32 = 1002;

    /// The requested stream path is not open
    pub const NOT_RUNNING: i32 = 1003;

    pub const HARDWARE_ERROR: i32 = 1004;

    /// Device refused to build or start a stream
    pub const STREAM_OPEN_FAILED: i32 = 1005;

    /// Session or backend mutex was poisoned by a panicking thread
    pub const LOCK_POISONED: i32 = 1006;

    /// Device reported an error on a running stream
    pub const STREAM_FAILURE: i32 = 1007;

    pub const WAV_CODEC: i32 = 1008;

    /// Sample format neither the device path nor the WAV codec handles
    pub const UNSUPPORTED_FORMAT: i32 = 1009;
}

/// Log an audio error raised at `context` (usually `Type::method`).
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "[{}] Audio error: code={}, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Failures of the audio device edge and of file I/O.
///
/// Callback code never produces these; they surface from `Player`
/// operations that open or close streams and from the WAV codec.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    TempoInvalid { bpm: f64 },

    AlreadyRunning,

    NotRunning,

    /// Device enumeration or configuration failed
    HardwareError { details: String },

    StreamOpenFailed { reason: String },

    LockPoisoned { component: String },

    StreamFailure { reason: String },

    /// WAV read/write failure for `path`
    WavCodec { path: String, reason: String },

    UnsupportedFormat { details: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::TempoInvalid { .. } => AudioErrorCodes::TEMPO_INVALID,
            AudioError::AlreadyRunning => AudioErrorCodes::ALREADY_RUNNING,
            AudioError::NotRunning => AudioErrorCodes::NOT_RUNNING,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
            AudioError::WavCodec { .. } => AudioErrorCodes::WAV_CODEC,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::TempoInvalid { bpm } => {
                format!("Tempo must be a positive BPM value (got {})", bpm)
            }
            AudioError::AlreadyRunning => "Stream is already open".to_string(),
            AudioError::NotRunning => "Stream is not open".to_string(),
            AudioError::HardwareError { details } => format!("Audio device error: {}", details),
            AudioError::StreamOpenFailed { reason } => {
                format!("Could not open stream: {}", reason)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock on {} poisoned by a panicked thread", component)
            }
            AudioError::StreamFailure { reason } => format!("Stream error: {}", reason),
            AudioError::WavCodec { path, reason } => format!("WAV file {}: {}", path, reason),
            AudioError::UnsupportedFormat { details } => {
                format!("Unsupported sample format: {}", details)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audio error {}: {}", self.code(), self.message())
    }
}

impl std::error::Error for AudioError {}
