// Audio module - clips, tracks, mixing and the metronome

pub mod clip;
pub mod generator;
pub mod loop_manager;
pub mod metronome;
pub mod mixer;
pub mod track;
pub mod transport;
pub mod wav;

// Re-export commonly used types for convenience
pub use clip::{concat, convert_channels, merge, Clip};
pub use loop_manager::LoopManager;
pub use metronome::{ClickKind, Metronome};
pub use track::{RecordingMode, Track, TrackId};
pub use transport::{CapturedTake, Transport, TransportState};
pub use wav::{load_wav, save_wav};
