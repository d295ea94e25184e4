//! Backend abstractions for the audio hardware edge.
//!
//! A backend owns the device streams and calls back into the engine once
//! per block. Callbacks exchange interleaved `f32` buffers at the rate and
//! channel counts the player was configured with.

use crate::error::AudioError;

/// Fills one output block.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Receives one captured input block.
pub type InputCallback = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// Receives one input block and fills the matching output block.
pub type DuplexCallback = Box<dyn FnMut(&[f32], &mut [f32]) + Send + 'static>;

/// Trait implemented by platform-specific audio backends.
///
/// Starting a path that is already running fails with
/// [`AudioError::AlreadyRunning`]; stopping an idle one fails with
/// [`AudioError::NotRunning`].
pub trait AudioBackend: Send + Sync {
    fn start_output(&self, callback: OutputCallback) -> Result<(), AudioError>;
    fn start_input(&self, callback: InputCallback) -> Result<(), AudioError>;
    fn start_duplex(&self, callback: DuplexCallback) -> Result<(), AudioError>;
    fn stop_output(&self) -> Result<(), AudioError>;
    fn stop_input(&self) -> Result<(), AudioError>;
    fn stop_duplex(&self) -> Result<(), AudioError>;

    /// True while an output or duplex stream is open.
    fn is_running(&self) -> bool;
    /// True while an input or duplex stream is open.
    fn is_input_running(&self) -> bool;
}

#[cfg(not(target_os = "android"))]
mod cpal;
#[cfg(not(target_os = "android"))]
pub use cpal::{list_devices, CpalBackend};

mod desktop_stub;
pub use desktop_stub::DesktopStubBackend;
