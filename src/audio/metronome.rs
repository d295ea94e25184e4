//! Metronome - Sample-accurate click generation
//!
//! This module provides the block-driven metronome mixed into the output
//! callback. Key features:
//! - Beat detection by integer frame arithmetic (no drift across blocks)
//! - Strong click on the first beat of every bar of four, weak otherwise
//! - Clicks start at the exact boundary frame and spill into later blocks
//! - Zero allocations per block

use serde::Serialize;

use super::clip::Clip;
use super::generator::{noise_burst, sine_burst};
use super::mixer::mix_into;
use crate::config::{ClickSound, MetronomeConfig};
use crate::error::AudioError;

/// Beats per bar; the strong click falls on beat 0.
const BEATS_PER_BAR: u8 = 4;

/// Which click sound a beat uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickKind {
    Strong,
    Weak,
}

/// Converts a tempo to frames per beat.
///
/// Formula: frames_per_beat = round(sample_rate × 60 / bpm)
///
/// # Arguments
/// * `bpm` - Beats per minute (must be > 0)
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
/// Number of frames between beats, at least 1
///
/// # Examples
/// ```
/// use multitrack_engine::audio::metronome::frames_per_beat;
///
/// assert_eq!(frames_per_beat(120.0, 44100), 22050);
/// assert_eq!(frames_per_beat(100.0, 44100), 26460);
/// ```
#[inline]
pub fn frames_per_beat(bpm: f64, sample_rate: u32) -> usize {
    ((sample_rate as f64 * 60.0 / bpm).round() as usize).max(1)
}

/// Finds the first beat boundary crossed by a block.
///
/// A block covering `[playback_frame, playback_frame + frame_count)` crosses
/// a boundary when `playback_frame / fpb < (playback_frame + frame_count) / fpb`.
///
/// # Returns
/// Offset in frames from the block start to the boundary, or `None`. The
/// offset may equal `frame_count` when the boundary sits on the first frame
/// of the following block.
///
/// # Examples
/// ```
/// use multitrack_engine::audio::metronome::beat_boundary;
///
/// // 120 BPM at 44.1kHz: beat every 22050 frames
/// assert_eq!(beat_boundary(21500, 1024, 22050), Some(550));
/// assert_eq!(beat_boundary(0, 1024, 22050), None);
/// ```
#[inline]
pub fn beat_boundary(playback_frame: usize, frame_count: usize, fpb: usize) -> Option<usize> {
    let current_beat = playback_frame / fpb;
    let next_beat = (playback_frame + frame_count) / fpb;
    if current_beat < next_beat {
        Some((current_beat + 1) * fpb - playback_frame)
    } else {
        None
    }
}

pub struct Metronome {
    sample_rate: u32,
    channels: usize,
    tempo_bpm: f64,
    frames_per_beat: usize,
    playback_frame: usize,
    beat_count: u8,
    enabled: bool,
    first_click_pending: bool,
    strong_click: Clip,
    weak_click: Clip,
    active_click: Option<ClickKind>,
    click_read_cursor: usize,
    click_delay: usize,
}

impl Metronome {
    /// Build a disabled metronome with clicks rendered at `channels`.
    pub fn new(sample_rate: u32, channels: usize, config: &MetronomeConfig) -> Self {
        let channels = channels.max(1);
        let (strong_click, weak_click) = match config.click_sound {
            ClickSound::Sine => (
                sine_burst(
                    config.strong_beat_hz,
                    config.click_duration_ms,
                    config.click_amplitude,
                    sample_rate,
                    channels,
                ),
                sine_burst(
                    config.weak_beat_hz,
                    config.click_duration_ms,
                    config.click_amplitude,
                    sample_rate,
                    channels,
                ),
            ),
            ClickSound::Noise => {
                let strong = noise_burst(
                    config.click_duration_ms,
                    config.click_amplitude,
                    sample_rate,
                    channels,
                );
                let weak_samples = strong.samples().iter().map(|s| s * 0.5).collect();
                let weak = Clip::new("noise_click_weak", sample_rate, channels, weak_samples);
                (strong, weak)
            }
        };

        let tempo_bpm = if config.tempo_bpm.is_finite() && config.tempo_bpm > 0.0 {
            config.tempo_bpm
        } else {
            120.0
        };

        Self {
            sample_rate,
            channels,
            tempo_bpm,
            frames_per_beat: frames_per_beat(tempo_bpm, sample_rate),
            playback_frame: 0,
            beat_count: 0,
            enabled: false,
            first_click_pending: false,
            strong_click,
            weak_click,
            active_click: None,
            click_read_cursor: 0,
            click_delay: 0,
        }
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn frames_per_beat(&self) -> usize {
        self.frames_per_beat
    }

    pub fn playback_frame(&self) -> usize {
        self.playback_frame
    }

    pub fn beat_count(&self) -> u8 {
        self.beat_count
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_click_playing(&self) -> bool {
        self.active_click.is_some()
    }

    /// Change tempo. Non-positive or non-finite values are rejected and the
    /// previous tempo is kept.
    pub fn update_tempo(&mut self, bpm: f64) -> Result<(), AudioError> {
        if !(bpm.is_finite() && bpm > 0.0) {
            return Err(AudioError::TempoInvalid { bpm });
        }
        self.tempo_bpm = bpm;
        self.frames_per_beat = frames_per_beat(bpm, self.sample_rate);
        log::info!(
            "[Metronome] Tempo set to {} BPM ({} frames/beat)",
            self.tempo_bpm,
            self.frames_per_beat
        );
        Ok(())
    }

    /// Switch clicking on or off. Turning it on restarts the bar on a strong
    /// beat at frame 0 with an immediate click.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        if self.enabled {
            self.playback_frame = 0;
            self.beat_count = 0;
            self.first_click_pending = true;
            log::info!("[Metronome] Enabled");
        } else {
            self.first_click_pending = false;
            log::info!("[Metronome] Disabled");
        }
        self.active_click = None;
        self.click_read_cursor = 0;
        self.click_delay = 0;
        self.enabled
    }

    /// Mirror the player's global frame counter.
    pub fn set_playback_frame(&mut self, frame: usize) {
        self.playback_frame = frame;
    }

    pub fn advance(&mut self, frame_count: usize) {
        self.playback_frame += frame_count;
    }

    /// Detect a beat inside the next block and mix any active click into `out`.
    ///
    /// `out` holds `frame_count` interleaved frames at the metronome's channel
    /// count. Position is not advanced here; the caller mirrors it.
    ///
    /// # Returns
    /// The click triggered in this block, if any
    pub fn process_block(&mut self, out: &mut [f32], frame_count: usize) -> Option<ClickKind> {
        if !self.enabled {
            return None;
        }

        let mut triggered = None;
        if self.first_click_pending && self.playback_frame == 0 {
            triggered = Some(self.play_click(0));
        }
        self.first_click_pending = false;

        if let Some(offset) = beat_boundary(self.playback_frame, frame_count, self.frames_per_beat)
        {
            triggered = Some(self.play_click(offset));
        }

        self.mix_click_data(out, frame_count);
        triggered
    }

    fn play_click(&mut self, delay: usize) -> ClickKind {
        let kind = if self.beat_count == 0 {
            ClickKind::Strong
        } else {
            ClickKind::Weak
        };
        self.beat_count = (self.beat_count + 1) % BEATS_PER_BAR;
        self.active_click = Some(kind);
        self.click_read_cursor = 0;
        self.click_delay = delay;
        kind
    }

    /// Copy as much of the active click as fits into this block.
    fn mix_click_data(&mut self, out: &mut [f32], frame_count: usize) {
        let Some(kind) = self.active_click else {
            return;
        };
        let click = match kind {
            ClickKind::Strong => &self.strong_click,
            ClickKind::Weak => &self.weak_click,
        };
        let channels = self.channels;
        let frame_count = frame_count.min(out.len() / channels);

        let delay = self.click_delay.min(frame_count);
        self.click_delay -= delay;

        let click_len = click.length_frames();
        let frames = (frame_count - delay).min(click_len.saturating_sub(self.click_read_cursor));
        if frames > 0 {
            let source = click.frames(self.click_read_cursor, self.click_read_cursor + frames);
            mix_into(&mut out[delay * channels..(delay + frames) * channels], source);
            self.click_read_cursor += frames;
        }

        if self.click_read_cursor >= click_len {
            self.active_click = None;
            self.click_read_cursor = 0;
        }
    }
}
