//! Orchestration around the audio leaf components.
//!
//! `session` holds every piece of mutable state behind one lock, `callback`
//! adds the real-time block processing to it, `core` is the `Player` control
//! surface and `backend` abstracts the audio device.

pub mod backend;
mod callback;
pub mod core;
pub mod session;

#[cfg(not(target_os = "android"))]
pub use backend::{list_devices, CpalBackend};
pub use backend::{AudioBackend, DesktopStubBackend};
pub use core::{Player, ADJUST_STEP};
pub use session::{MetronomeStatus, Session, SessionStatus, TrackStatus};
