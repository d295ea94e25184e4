// Multitrack Engine - real-time multitrack recorder core
// Block-based mixing, looping, metronome and punch recording

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;

pub use audio::{Clip, RecordingMode, Track, TransportState};
pub use config::EngineConfig;
pub use engine::{DesktopStubBackend, Player, Session, SessionStatus};
pub use error::{AudioError, EngineError, ErrorCode, SessionError};
