//! CPAL-based audio backend for desktop platforms (Linux, macOS, Windows)
//!
//! Streams are opened on the default devices with `f32` samples at the
//! configured rate and channel counts. CPAL has no native duplex stream, so
//! duplex mode runs an input stream that feeds an `rtrb` ring buffer and an
//! output stream that drains it before calling the duplex callback.

use std::sync::Mutex;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::config::AudioConfig;
use crate::error::AudioError;

use super::{AudioBackend, DuplexCallback, InputCallback, OutputCallback};

/// Seconds of input the duplex ring buffer can hold before dropping samples.
const DUPLEX_RING_SECONDS: usize = 1;

/// Wrapper to make streams Send+Sync
struct StreamHolder(Vec<cpal::Stream>);

// SAFETY: streams are only created and dropped from the control thread, each
// behind its own mutex
unsafe impl Send for StreamHolder {}
unsafe impl Sync for StreamHolder {}

impl StreamHolder {
    fn is_open(&self) -> bool {
        !self.0.is_empty()
    }
}

/// CPAL-based audio backend
pub struct CpalBackend {
    sample_rate: u32,
    output_channels: usize,
    input_channels: usize,
    output: Mutex<StreamHolder>,
    input: Mutex<StreamHolder>,
    duplex: Mutex<StreamHolder>,
}

impl CpalBackend {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            output_channels: config.output_channels,
            input_channels: config.input_channels,
            output: Mutex::new(StreamHolder(Vec::new())),
            input: Mutex::new(StreamHolder(Vec::new())),
            duplex: Mutex::new(StreamHolder(Vec::new())),
        }
    }

    fn stream_config(&self, channels: usize) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: channels as cpal::ChannelCount,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        }
    }

    fn build_output(&self, mut callback: OutputCallback) -> Result<cpal::Stream, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::StreamOpenFailed {
                reason: "No default output device found".to_string(),
            })?;

        let stream = device
            .build_output_stream(
                &self.stream_config(self.output_channels),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| callback(data),
                |err| tracing::error!("[CpalBackend] Output stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("{:?}", e),
            })?;
        Ok(stream)
    }

    fn build_input(&self, mut callback: InputCallback) -> Result<cpal::Stream, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AudioError::StreamOpenFailed {
                reason: "No default input device found".to_string(),
            })?;

        let stream = device
            .build_input_stream(
                &self.stream_config(self.input_channels),
                move |data: &[f32], _: &cpal::InputCallbackInfo| callback(data),
                |err| tracing::error!("[CpalBackend] Input stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("{:?}", e),
            })?;
        Ok(stream)
    }

    fn lock<'a>(
        slot: &'a Mutex<StreamHolder>,
        component: &str,
    ) -> Result<std::sync::MutexGuard<'a, StreamHolder>, AudioError> {
        slot.lock().map_err(|_| AudioError::LockPoisoned {
            component: component.to_string(),
        })
    }

    fn is_open(slot: &Mutex<StreamHolder>) -> bool {
        slot.lock().map(|holder| holder.is_open()).unwrap_or(false)
    }

    fn play(stream: &cpal::Stream, direction: &str) -> Result<(), AudioError> {
        stream.play().map_err(|e| AudioError::HardwareError {
            details: format!("{} start failed: {}", direction, e),
        })
    }

    fn close(slot: &Mutex<StreamHolder>, component: &str) -> Result<(), AudioError> {
        let mut holder = Self::lock(slot, component)?;
        if !holder.is_open() {
            return Err(AudioError::NotRunning);
        }
        holder.0.clear();
        tracing::info!("[CpalBackend] {} stream closed", component);
        Ok(())
    }
}

impl AudioBackend for CpalBackend {
    fn start_output(&self, callback: OutputCallback) -> Result<(), AudioError> {
        if Self::is_open(&self.duplex) {
            return Err(AudioError::AlreadyRunning);
        }
        let mut holder = Self::lock(&self.output, "output stream")?;
        if holder.is_open() {
            return Err(AudioError::AlreadyRunning);
        }
        let stream = self.build_output(callback)?;
        Self::play(&stream, "Output")?;
        holder.0.push(stream);
        tracing::info!(
            "[CpalBackend] Output stream started ({} Hz, {} ch)",
            self.sample_rate,
            self.output_channels
        );
        Ok(())
    }

    fn start_input(&self, callback: InputCallback) -> Result<(), AudioError> {
        if Self::is_open(&self.duplex) {
            return Err(AudioError::AlreadyRunning);
        }
        let mut holder = Self::lock(&self.input, "input stream")?;
        if holder.is_open() {
            return Err(AudioError::AlreadyRunning);
        }
        let stream = self.build_input(callback)?;
        Self::play(&stream, "Input")?;
        holder.0.push(stream);
        tracing::info!(
            "[CpalBackend] Input stream started ({} Hz, {} ch)",
            self.sample_rate,
            self.input_channels
        );
        Ok(())
    }

    fn start_duplex(&self, mut callback: DuplexCallback) -> Result<(), AudioError> {
        if Self::is_open(&self.output) || Self::is_open(&self.input) {
            return Err(AudioError::AlreadyRunning);
        }
        let mut holder = Self::lock(&self.duplex, "duplex stream")?;
        if holder.is_open() {
            return Err(AudioError::AlreadyRunning);
        }

        let capacity = self.sample_rate as usize * self.input_channels * DUPLEX_RING_SECONDS;
        let (mut producer, mut consumer) = rtrb::RingBuffer::<f32>::new(capacity.max(1));
        let input_channels = self.input_channels;
        let output_channels = self.output_channels;

        let input = self.build_input(Box::new(move |data: &[f32]| {
            for &sample in data {
                // A full ring means the output side stalled; drop the overflow.
                if producer.push(sample).is_err() {
                    break;
                }
            }
        }))?;

        let mut input_block: Vec<f32> = Vec::new();
        let output = self.build_output(Box::new(move |data: &mut [f32]| {
            let frames = data.len() / output_channels;
            let wanted = frames * input_channels;
            if input_block.len() != wanted {
                input_block.resize(wanted, 0.0);
            }
            for slot in input_block.iter_mut() {
                *slot = consumer.pop().unwrap_or(0.0);
            }
            callback(&input_block, data);
        }))?;

        Self::play(&input, "Duplex input")?;
        Self::play(&output, "Duplex output")?;
        holder.0.push(input);
        holder.0.push(output);
        tracing::info!(
            "[CpalBackend] Duplex streams started ({} Hz, {} in / {} out)",
            self.sample_rate,
            self.input_channels,
            self.output_channels
        );
        Ok(())
    }

    fn stop_output(&self) -> Result<(), AudioError> {
        Self::close(&self.output, "output stream")
    }

    fn stop_input(&self) -> Result<(), AudioError> {
        Self::close(&self.input, "input stream")
    }

    fn stop_duplex(&self) -> Result<(), AudioError> {
        Self::close(&self.duplex, "duplex stream")
    }

    fn is_running(&self) -> bool {
        Self::is_open(&self.output) || Self::is_open(&self.duplex)
    }

    fn is_input_running(&self) -> bool {
        Self::is_open(&self.input) || Self::is_open(&self.duplex)
    }
}

fn device_name(device: cpal::Device) -> String {
    device.name().unwrap_or_else(|_| "<unknown>".to_string())
}

/// Names of the default host's input and output devices, in that order.
pub fn list_devices() -> Result<(Vec<String>, Vec<String>), AudioError> {
    let host = cpal::default_host();
    let enumeration_failed = |e: cpal::DevicesError| AudioError::HardwareError {
        details: format!("Device enumeration failed: {}", e),
    };
    let inputs = host
        .input_devices()
        .map_err(enumeration_failed)?
        .map(device_name)
        .collect();
    let outputs = host
        .output_devices()
        .map_err(enumeration_failed)?
        .map(device_name)
        .collect();
    Ok((inputs, outputs))
}
