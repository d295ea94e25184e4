//! Track - timeline placement, block rendering and take splicing
//!
//! A track owns at most one [`Clip`], positioned on the global timeline by
//! `offset_frames`. Its `cursor_frames` is expressed in global timeline
//! frames as well, and advances by exactly one block on every render call
//! (even when muted or empty) so that sibling tracks stay in lockstep with
//! the player.
//!
//! `arrange_take` merges a freshly recorded take into the existing clip,
//! either replacing or summing with the audio it overlaps.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::clip::{concat, convert_channels, convert_channels_into, merge, Clip};
use super::mixer::{apply_gain, apply_gain_pan_stereo};
use crate::error::SessionError;

/// Stable identifier assigned by the session when a track is created.
pub type TrackId = u32;

/// How a new take combines with audio it overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    /// Take audio overwrites the overlapped range
    #[default]
    Replace,
    /// Take audio is summed with the overlapped range
    Mix,
}

impl RecordingMode {
    pub fn toggled(self) -> Self {
        match self {
            RecordingMode::Replace => RecordingMode::Mix,
            RecordingMode::Mix => RecordingMode::Replace,
        }
    }
}

impl fmt::Display for RecordingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingMode::Replace => write!(f, "replace"),
            RecordingMode::Mix => write!(f, "mix"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    name: String,
    sample_rate: u32,
    channels: usize,
    clip: Option<Clip>,
    offset_frames: usize,
    cursor_frames: usize,
    gain: f32,
    pan: f32,
    muted: bool,
    solo: bool,
    armed: bool,
}

impl Track {
    pub fn new(id: TrackId, name: impl Into<String>, sample_rate: u32, channels: usize) -> Self {
        Self {
            id,
            name: name.into(),
            sample_rate,
            channels: channels.max(1),
            clip: None,
            offset_frames: 0,
            cursor_frames: 0,
            gain: 1.0,
            pan: 0.0,
            muted: false,
            solo: false,
            armed: false,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Output channel count of rendered blocks.
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn clip(&self) -> Option<&Clip> {
        self.clip.as_ref()
    }

    /// Place `clip` on the timeline at `offset_frames`, replacing any previous clip.
    ///
    /// The cursor is left untouched; the session keeps it in sync.
    pub fn set_clip(&mut self, clip: Clip, offset_frames: usize) {
        log::info!(
            "[Track] '{}': clip {} placed at frame {}",
            self.name,
            clip,
            offset_frames
        );
        self.clip = Some(clip);
        self.offset_frames = offset_frames;
    }

    pub fn has_audio(&self) -> bool {
        self.clip.as_ref().is_some_and(|clip| !clip.is_empty())
    }

    pub fn offset_frames(&self) -> usize {
        self.offset_frames
    }

    pub fn length_frames(&self) -> usize {
        self.clip.as_ref().map_or(0, Clip::length_frames)
    }

    /// Timeline frame just past the clip's last frame.
    pub fn end_frame(&self) -> usize {
        self.offset_frames + self.length_frames()
    }

    pub fn cursor_frames(&self) -> usize {
        self.cursor_frames
    }

    pub fn set_cursor(&mut self, frame: usize) {
        self.cursor_frames = frame;
    }

    /// Rewind the cursor to the clip's start, not to 0.
    pub fn reset_cursor(&mut self) {
        self.cursor_frames = self.offset_frames;
    }

    /// True once the cursor has reached the end of the clip (or there is none).
    pub fn is_finished(&self) -> bool {
        self.cursor_frames >= self.end_frame()
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    /// Nudge gain by `delta`, clamped to [0, 1]. Returns the new gain.
    pub fn adjust_gain(&mut self, delta: f32) -> f32 {
        self.set_gain(self.gain + delta);
        self.gain
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.pan = pan.clamp(-1.0, 1.0);
    }

    /// Nudge pan by `delta`, clamped to [-1, 1]. Returns the new pan.
    pub fn adjust_pan(&mut self, delta: f32) -> f32 {
        self.set_pan(self.pan + delta);
        self.pan
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn is_solo(&self) -> bool {
        self.solo
    }

    pub fn set_solo(&mut self, solo: bool) {
        self.solo = solo;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    pub fn toggle_armed(&mut self) -> bool {
        self.armed = !self.armed;
        self.armed
    }

    /// Render the next `frame_count` frames and advance the cursor.
    ///
    /// Always returns `frame_count * channels` samples.
    pub fn render_block(&mut self, frame_count: usize) -> Vec<f32> {
        let mut out = vec![0.0; frame_count * self.channels];
        self.render_into(&mut out);
        out
    }

    /// Render into a caller-owned block of `frame_count * channels` samples.
    ///
    /// The frame count is `out.len() / channels`; the cursor advances by that
    /// amount exactly once whatever the track state.
    pub fn render_into(&mut self, out: &mut [f32]) {
        let channels = self.channels;
        let frame_count = out.len() / channels;
        let cursor = self.cursor_frames;
        self.cursor_frames += frame_count;
        out.fill(0.0);

        if self.muted {
            return;
        }
        let Some(clip) = self.clip.as_ref().filter(|clip| !clip.is_empty()) else {
            return;
        };

        // Leading silence when the block starts before the clip.
        let (silence, clip_start) = if cursor < self.offset_frames {
            ((self.offset_frames - cursor).min(frame_count), 0)
        } else {
            (0, cursor - self.offset_frames)
        };
        if silence >= frame_count {
            return;
        }

        let wanted = frame_count - silence;
        let available = clip.length_frames().saturating_sub(clip_start).min(wanted);
        if available > 0 {
            let source = clip.frames(clip_start, clip_start + available);
            let dest = &mut out[silence * channels..(silence + available) * channels];
            convert_channels_into(source, clip.channels(), channels, dest);
        }

        let block = &mut out[..frame_count * channels];
        if channels == 2 {
            apply_gain_pan_stereo(block, self.gain, self.pan);
        } else {
            apply_gain(block, self.gain);
        }
    }

    /// Merge a recorded take into this track's clip.
    ///
    /// `take` is interleaved with `take_channels` channels and covers the
    /// timeline range `[take_start, take_end)`. The resulting clip spans the
    /// union of the old clip and that range and starts at its minimum. In
    /// [`RecordingMode::Replace`] the overlapped frames hold only take audio;
    /// in [`RecordingMode::Mix`] they hold old + take, unclamped. Audio
    /// outside the take range is preserved.
    ///
    /// An empty track simply adopts the take, converted to the track's
    /// channel count, at `take_start`.
    pub fn arrange_take(
        &mut self,
        take: &[f32],
        take_channels: usize,
        take_start: usize,
        take_end: usize,
        mode: RecordingMode,
    ) -> Result<(), SessionError> {
        if take_end < take_start {
            return Err(SessionError::InvalidRange {
                start: take_start,
                end: take_end,
            });
        }
        let channels = self.channels;
        let take_channels = take_channels.max(1);

        let Some(old) = self.clip.as_ref().filter(|clip| !clip.is_empty()) else {
            let frames = take.len() / take_channels;
            let samples = convert_channels(take, take_channels, channels, frames);
            let clip = Clip::new(format!("{}_take", self.name), self.sample_rate, channels, samples);
            log::info!(
                "[Track] '{}': take of {} frames adopted by empty track at frame {}",
                self.name,
                frames,
                take_start
            );
            self.clip = Some(clip);
            self.offset_frames = take_start;
            return Ok(());
        };

        let old_offset = self.offset_frames;
        let old_len = old.length_frames();
        let old_end = old_offset + old_len;
        let union_start = old_offset.min(take_start);
        let union_end = old_end.max(take_end);

        let old_samples = convert_channels(old.samples(), old.channels(), channels, old_len);
        let take_samples = convert_channels(take, take_channels, channels, take_end - take_start);
        let mut buffer = vec![0.0; (union_end - union_start) * channels];

        let mut write = |frame: usize, data: &[f32]| {
            let at = (frame - union_start) * channels;
            buffer[at..at + data.len()].copy_from_slice(data);
        };

        // Old audio strictly before the take.
        if take_start > old_offset {
            let before = (take_start - old_offset).min(old_len);
            write(old_offset, &old_samples[..before * channels]);
        }

        // Old audio strictly after the take.
        if take_end < old_end {
            let from = take_end.max(old_offset);
            write(from, &old_samples[(from - old_offset) * channels..]);
        }

        write(take_start, &take_samples);

        if mode == RecordingMode::Mix {
            let overlap_start = take_start.max(old_offset);
            let overlap_end = take_end.min(old_end);
            if overlap_end > overlap_start {
                let old_part = &old_samples
                    [(overlap_start - old_offset) * channels..(overlap_end - old_offset) * channels];
                let take_part = &take_samples
                    [(overlap_start - take_start) * channels..(overlap_end - take_start) * channels];
                write(overlap_start, &merge(old_part, take_part));
            }
        }

        let frames = union_end - union_start;
        self.clip = Some(Clip::new(
            format!("{}_arranged", self.name),
            self.sample_rate,
            channels,
            buffer,
        ));
        self.offset_frames = union_start;
        log::info!(
            "[Track] '{}': take arranged ({} mode), length {} frames, offset {}",
            self.name,
            mode,
            frames,
            union_start
        );
        Ok(())
    }

    /// Cut clip frames `[start, end)` out of the clip; the clip gets shorter.
    ///
    /// Frames are relative to the clip's frame 0 and clamped to its length.
    pub fn delete_range(&mut self, start: usize, end: usize) -> Result<(), SessionError> {
        let (clip, start, end) = self.clip_range(start, end)?;
        let channels = clip.channels();
        let samples = clip.samples();
        let joined = concat(&samples[..start * channels], &samples[end * channels..]);
        let rebuilt = Clip::new(clip.name(), clip.sample_rate(), channels, joined);
        log::info!(
            "[Track] '{}': deleted frames {}..{}, new length {} frames",
            self.name,
            start,
            end,
            rebuilt.length_frames()
        );
        self.clip = Some(rebuilt);
        Ok(())
    }

    /// Replace clip frames `[start, end)` with silence; length is unchanged.
    pub fn erase_range(&mut self, start: usize, end: usize) -> Result<(), SessionError> {
        let (clip, start, end) = self.clip_range(start, end)?;
        let channels = clip.channels();
        let mut samples = clip.samples().to_vec();
        samples[start * channels..end * channels].fill(0.0);
        let rebuilt = Clip::new(clip.name(), clip.sample_rate(), channels, samples);
        log::info!(
            "[Track] '{}': erased frames {}..{}",
            self.name,
            start,
            end
        );
        self.clip = Some(rebuilt);
        Ok(())
    }

    fn clip_range(&self, start: usize, end: usize) -> Result<(&Clip, usize, usize), SessionError> {
        let clip = self
            .clip
            .as_ref()
            .filter(|clip| !clip.is_empty())
            .ok_or_else(|| SessionError::EmptyTrack {
                name: self.name.clone(),
            })?;
        let end = end.min(clip.length_frames());
        if start >= end {
            return Err(SessionError::InvalidRange { start, end });
        }
        Ok((clip, start, end))
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.muted {
            flags.push("M");
        }
        if self.solo {
            flags.push("S");
        }
        if self.armed {
            flags.push("R");
        }

        write!(f, "#{} {} ", self.id, self.name)?;
        match &self.clip {
            Some(clip) => write!(f, "{}", clip)?,
            None => write!(f, "<empty>")?,
        }
        write!(
            f,
            " offset={} pos={} vol={:.2} pan={:.2}",
            self.offset_frames, self.cursor_frames, self.gain, self.pan
        )?;
        if !flags.is_empty() {
            write!(f, " [{}]", flags.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
