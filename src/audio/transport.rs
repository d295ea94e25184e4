//! Transport - play/record state and the capture buffer
//!
//! This type only holds transport state; transitions that touch tracks or
//! the audio backend are driven by the session and the player.
//!
//! ```text
//!            play                 start_recording
//!  Stopped ────────► Playing ───────────────────► Recording
//!     ▲  ▲             │  ▲                          │
//!     │  │   pause     ▼  │ play                     │ pause / play / stop_recording
//!     │  └──────────  Paused ◄───────────────────────┘   (finalizes the take)
//!     └──── stop (from any state, finalizes first) ──────
//! ```

use serde::Serialize;

use super::track::RecordingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Stopped,
    Paused,
    Playing,
    Recording,
}

/// A finished capture handed over for arrangement.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedTake {
    pub samples: Vec<f32>,
    pub start_frame: usize,
    pub end_frame: usize,
}

#[derive(Debug)]
pub struct Transport {
    state: TransportState,
    recording_mode: RecordingMode,
    capture_buffer: Vec<f32>,
    capture_start_frame: usize,
    capture_end_frame: usize,
    wrapped_during_capture: bool,
}

impl Transport {
    pub fn new(recording_mode: RecordingMode) -> Self {
        Self {
            state: TransportState::Stopped,
            recording_mode,
            capture_buffer: Vec::new(),
            capture_start_frame: 0,
            capture_end_frame: 0,
            wrapped_during_capture: false,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// True while Playing or Recording.
    pub fn is_playing(&self) -> bool {
        matches!(
            self.state,
            TransportState::Playing | TransportState::Recording
        )
    }

    pub fn is_recording(&self) -> bool {
        self.state == TransportState::Recording
    }

    pub fn recording_mode(&self) -> RecordingMode {
        self.recording_mode
    }

    pub fn set_recording_mode(&mut self, mode: RecordingMode) {
        self.recording_mode = mode;
        log::info!("[Transport] Recording mode set to {}", mode);
    }

    pub fn toggle_recording_mode(&mut self) -> RecordingMode {
        self.set_recording_mode(self.recording_mode.toggled());
        self.recording_mode
    }

    pub fn capture_start_frame(&self) -> usize {
        self.capture_start_frame
    }

    pub fn capture_end_frame(&self) -> usize {
        self.capture_end_frame
    }

    pub fn captured_samples(&self) -> usize {
        self.capture_buffer.len()
    }

    pub fn play(&mut self) {
        if self.state != TransportState::Recording {
            self.state = TransportState::Playing;
        }
    }

    /// Playing stops but the position is kept.
    pub fn pause(&mut self) {
        self.state = TransportState::Paused;
    }

    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
    }

    /// Open a capture session at `start_frame`.
    ///
    /// The buffer is cleared and `reserve_samples` of capacity is set aside so
    /// the input callback does not reallocate in the common case.
    pub fn begin_recording(&mut self, start_frame: usize, reserve_samples: usize) {
        self.capture_buffer.clear();
        self.capture_buffer.reserve(reserve_samples);
        self.capture_start_frame = start_frame;
        self.capture_end_frame = start_frame;
        self.wrapped_during_capture = false;
        self.state = TransportState::Recording;
        log::info!("[Transport] Recording started at frame {}", start_frame);
    }

    /// Append one interleaved input block while recording.
    pub fn append_capture(&mut self, block: &[f32]) {
        if self.is_recording() {
            self.capture_buffer.extend_from_slice(block);
        }
    }

    /// Note that the timeline jumped back while capturing.
    pub fn mark_loop_wrap(&mut self) {
        if self.is_recording() {
            self.wrapped_during_capture = true;
        }
    }

    pub fn wrapped_during_capture(&self) -> bool {
        self.wrapped_during_capture
    }

    /// Close the capture session. Recording drops back to Playing; the caller
    /// decides the final state.
    ///
    /// Returns `None` when nothing was captured.
    pub fn end_recording(&mut self, end_frame: usize) -> Option<CapturedTake> {
        if self.state == TransportState::Recording {
            self.state = TransportState::Playing;
        }
        self.capture_end_frame = end_frame;
        if self.capture_buffer.is_empty() {
            return None;
        }
        Some(CapturedTake {
            samples: std::mem::take(&mut self.capture_buffer),
            start_frame: self.capture_start_frame,
            end_frame,
        })
    }
}
