use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::AudioError;

use super::{AudioBackend, DuplexCallback, InputCallback, OutputCallback};

/// Desktop stub backend used for deterministic testing and offline CLI runs.
///
/// Nothing talks to hardware. Callbacks are stored when a path starts and
/// are driven block by block through [`pump_output`](Self::pump_output),
/// [`pump_input`](Self::pump_input) and [`pump_duplex`](Self::pump_duplex).
pub struct DesktopStubBackend {
    output_channels: usize,
    input_channels: usize,
    output_running: AtomicBool,
    input_running: AtomicBool,
    duplex_running: AtomicBool,
    output: Mutex<Option<OutputCallback>>,
    input: Mutex<Option<InputCallback>>,
    duplex: Mutex<Option<DuplexCallback>>,
}

impl DesktopStubBackend {
    pub fn new(output_channels: usize, input_channels: usize) -> Self {
        Self {
            output_channels: output_channels.max(1),
            input_channels: input_channels.max(1),
            output_running: AtomicBool::new(false),
            input_running: AtomicBool::new(false),
            duplex_running: AtomicBool::new(false),
            output: Mutex::new(None),
            input: Mutex::new(None),
            duplex: Mutex::new(None),
        }
    }

    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Request one output block of `frame_count` frames.
    ///
    /// Uses the output callback, or the duplex callback fed with silence.
    /// Returns silence when no output path is running.
    pub fn pump_output(&self, frame_count: usize) -> Vec<f32> {
        let mut out = vec![0.0; frame_count * self.output_channels];
        if let Ok(mut slot) = self.output.lock() {
            if let Some(callback) = slot.as_mut() {
                callback(&mut out);
                return out;
            }
        }
        if let Ok(mut slot) = self.duplex.lock() {
            if let Some(callback) = slot.as_mut() {
                let silence = vec![0.0; frame_count * self.input_channels];
                callback(&silence, &mut out);
            }
        }
        out
    }

    /// Deliver one captured block. Returns false when no input path took it.
    pub fn pump_input(&self, block: &[f32]) -> bool {
        if let Ok(mut slot) = self.input.lock() {
            if let Some(callback) = slot.as_mut() {
                callback(block);
                return true;
            }
        }
        false
    }

    /// Deliver one input block and pull the matching output block.
    ///
    /// With separate streams this behaves like hardware that calls the input
    /// callback first and then the output callback for the same period.
    pub fn pump_duplex(&self, input: &[f32]) -> Vec<f32> {
        let frame_count = input.len() / self.input_channels;
        if let Ok(mut slot) = self.duplex.lock() {
            if let Some(callback) = slot.as_mut() {
                let mut out = vec![0.0; frame_count * self.output_channels];
                callback(input, &mut out);
                return out;
            }
        }
        self.pump_input(input);
        self.pump_output(frame_count)
    }

    fn claim(flag: &AtomicBool) -> Result<(), AudioError> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(AudioError::AlreadyRunning);
        }
        Ok(())
    }

    fn release(flag: &AtomicBool) -> Result<(), AudioError> {
        if !flag.swap(false, Ordering::SeqCst) {
            return Err(AudioError::NotRunning);
        }
        Ok(())
    }

    /// Claim `flag` and store the callback. The flag is dropped again if the
    /// slot cannot take it.
    fn install<T>(
        flag: &AtomicBool,
        slot: &Mutex<Option<T>>,
        callback: T,
        component: &str,
    ) -> Result<(), AudioError> {
        Self::claim(flag)?;
        if let Err(err) = Self::store(slot, Some(callback), component) {
            flag.store(false, Ordering::SeqCst);
            return Err(err);
        }
        Ok(())
    }

    fn store<T>(slot: &Mutex<Option<T>>, value: Option<T>, component: &str) -> Result<(), AudioError> {
        let mut guard = slot.lock().map_err(|_| AudioError::LockPoisoned {
            component: component.to_string(),
        })?;
        *guard = value;
        Ok(())
    }
}

impl Default for DesktopStubBackend {
    fn default() -> Self {
        Self::new(2, 1)
    }
}

impl AudioBackend for DesktopStubBackend {
    fn start_output(&self, callback: OutputCallback) -> Result<(), AudioError> {
        if self.duplex_running.load(Ordering::SeqCst) {
            return Err(AudioError::AlreadyRunning);
        }
        Self::install(&self.output_running, &self.output, callback, "stub output")
    }

    fn start_input(&self, callback: InputCallback) -> Result<(), AudioError> {
        if self.duplex_running.load(Ordering::SeqCst) {
            return Err(AudioError::AlreadyRunning);
        }
        Self::install(&self.input_running, &self.input, callback, "stub input")
    }

    fn start_duplex(&self, callback: DuplexCallback) -> Result<(), AudioError> {
        if self.output_running.load(Ordering::SeqCst) || self.input_running.load(Ordering::SeqCst) {
            return Err(AudioError::AlreadyRunning);
        }
        Self::install(&self.duplex_running, &self.duplex, callback, "stub duplex")
    }

    fn stop_output(&self) -> Result<(), AudioError> {
        Self::release(&self.output_running)?;
        Self::store(&self.output, None, "stub output")
    }

    fn stop_input(&self) -> Result<(), AudioError> {
        Self::release(&self.input_running)?;
        Self::store(&self.input, None, "stub input")
    }

    fn stop_duplex(&self) -> Result<(), AudioError> {
        Self::release(&self.duplex_running)?;
        Self::store(&self.duplex, None, "stub duplex")
    }

    fn is_running(&self) -> bool {
        self.output_running.load(Ordering::SeqCst) || self.duplex_running.load(Ordering::SeqCst)
    }

    fn is_input_running(&self) -> bool {
        self.input_running.load(Ordering::SeqCst) || self.duplex_running.load(Ordering::SeqCst)
    }
}
