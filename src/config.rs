//! Configuration management for the engine
//!
//! This module provides configuration loading from JSON files. Stream
//! geometry (sample rate, block size, channel counts) is fixed at `Player`
//! construction; changing it means building a new player.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::audio::track::RecordingMode;
use crate::error::AudioError;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub metronome: MetronomeConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Stream geometry shared by the backend and every callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Frames per callback block
    pub block_size: usize,
    /// Interleaved channels delivered to the output device
    pub output_channels: usize,
    /// Interleaved channels captured from the input device
    pub input_channels: usize,
    /// Use a single duplex stream instead of separate output/input streams
    #[serde(default)]
    pub duplex: bool,
    /// Seconds of capture buffer reserved when a recording starts
    #[serde(default = "default_capture_reserve_seconds")]
    pub capture_reserve_seconds: u32,
}

fn default_capture_reserve_seconds() -> u32 {
    60
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 1024,
            output_channels: 2,
            input_channels: 1,
            duplex: false,
            capture_reserve_seconds: default_capture_reserve_seconds(),
        }
    }
}

/// Source waveform for metronome clicks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickSound {
    /// Short sine burst, pitched higher on the downbeat
    Sine,
    /// Deterministic white noise burst
    Noise,
}

/// Metronome parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetronomeConfig {
    pub tempo_bpm: f64,
    pub click_sound: ClickSound,
    pub click_duration_ms: f32,
    pub click_amplitude: f32,
    /// Frequency of the downbeat click (sine only)
    pub strong_beat_hz: f32,
    /// Frequency of the other beats (sine only)
    pub weak_beat_hz: f32,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: 120.0,
            click_sound: ClickSound::Sine,
            click_duration_ms: 50.0,
            click_amplitude: 0.2,
            strong_beat_hz: 880.0,
            weak_beat_hz: 440.0,
        }
    }
}

/// Transport defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Frames skipped by forward/backward
    pub seek_step_frames: usize,
    /// Recording mode selected at startup
    pub recording_mode: RecordingMode,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            seek_step_frames: 44100,
            recording_mode: RecordingMode::Replace,
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file doesn't exist or
    /// the JSON is invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("assets/engine_config.json")
    }

    /// Reject geometry the engine cannot run with.
    pub fn validate(&self) -> Result<(), AudioError> {
        let audio = &self.audio;
        if audio.sample_rate == 0 {
            return Err(AudioError::HardwareError {
                details: "sample_rate must be greater than 0".to_string(),
            });
        }
        if audio.block_size == 0 {
            return Err(AudioError::HardwareError {
                details: "block_size must be greater than 0".to_string(),
            });
        }
        if audio.output_channels == 0 || audio.input_channels == 0 {
            return Err(AudioError::HardwareError {
                details: format!(
                    "channel counts must be greater than 0 (output={}, input={})",
                    audio.output_channels, audio.input_channels
                ),
            });
        }
        if !(self.metronome.tempo_bpm.is_finite() && self.metronome.tempo_bpm > 0.0) {
            return Err(AudioError::TempoInvalid {
                bpm: self.metronome.tempo_bpm,
            });
        }
        Ok(())
    }
}
