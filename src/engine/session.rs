//! Session: every piece of engine state shared by the control surface and
//! the audio callbacks.
//!
//! A single `Mutex<Session>` serializes both sides. Control operations here
//! are plain state changes; anything that opens or closes streams lives in
//! [`Player`](crate::engine::Player). The per-block callbacks are in
//! `callback.rs`.

use serde::Serialize;
use tracing::{info, warn};

use crate::audio::clip::{convert_channels, Clip};
use crate::audio::loop_manager::LoopManager;
use crate::audio::metronome::Metronome;
use crate::audio::mixer::mix_into;
use crate::audio::track::{RecordingMode, Track, TrackId};
use crate::audio::transport::{Transport, TransportState};
use crate::config::{AudioConfig, EngineConfig};
use crate::error::{AudioError, SessionError};

/// Per-track row of a [`SessionStatus`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackStatus {
    pub index: usize,
    pub id: TrackId,
    pub name: String,
    pub offset_frames: usize,
    pub length_frames: usize,
    pub cursor_frames: usize,
    pub gain: f32,
    pub pan: f32,
    pub muted: bool,
    pub solo: bool,
    pub armed: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetronomeStatus {
    pub enabled: bool,
    pub tempo_bpm: f64,
    pub beat_count: u8,
}

/// Serializable snapshot for display layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: TransportState,
    pub recording_mode: RecordingMode,
    pub position_frames: usize,
    pub total_duration_frames: usize,
    pub current_time_seconds: f64,
    pub total_duration_seconds: f64,
    pub looping: LoopManager,
    pub metronome: MetronomeStatus,
    pub selected_track: Option<usize>,
    pub tracks: Vec<TrackStatus>,
}

pub struct Session {
    pub(crate) audio: AudioConfig,
    pub(crate) tracks: Vec<Track>,
    selected: Option<usize>,
    pub(crate) current_frame: usize,
    total_duration_frames: usize,
    pub(crate) transport: Transport,
    pub(crate) loop_manager: LoopManager,
    pub(crate) metronome: Metronome,
    next_track_id: TrackId,
    last_take: Option<Clip>,
    /// Output accumulator, pre-sized to one block
    pub(crate) mix_buffer: Vec<f32>,
    /// Per-track render target, pre-sized to one block
    pub(crate) track_buffer: Vec<f32>,
}

impl Session {
    pub fn new(config: &EngineConfig) -> Self {
        let audio = config.audio.clone();
        let block_samples = audio.block_size * audio.output_channels;
        Self {
            metronome: Metronome::new(audio.sample_rate, audio.output_channels, &config.metronome),
            transport: Transport::new(config.transport.recording_mode),
            loop_manager: LoopManager::new(),
            tracks: Vec::new(),
            selected: None,
            current_frame: 0,
            total_duration_frames: 0,
            next_track_id: 1,
            last_take: None,
            mix_buffer: Vec::with_capacity(block_samples),
            track_buffer: Vec::with_capacity(block_samples),
            audio,
        }
    }

    pub fn audio_config(&self) -> &AudioConfig {
        &self.audio
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Result<&Track, SessionError> {
        let len = self.tracks.len();
        self.tracks
            .get(index)
            .ok_or(SessionError::TrackIndexOutOfRange { index, len })
    }

    fn track_mut(&mut self, index: usize) -> Result<&mut Track, SessionError> {
        let len = self.tracks.len();
        self.tracks
            .get_mut(index)
            .ok_or(SessionError::TrackIndexOutOfRange { index, len })
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.selected.and_then(|index| self.tracks.get(index))
    }

    pub fn position_frames(&self) -> usize {
        self.current_frame
    }

    pub fn total_duration_frames(&self) -> usize {
        self.total_duration_frames
    }

    pub fn current_time_seconds(&self) -> f64 {
        self.current_frame as f64 / self.audio.sample_rate as f64
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.total_duration_frames as f64 / self.audio.sample_rate as f64
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn is_recording(&self) -> bool {
        self.transport.is_recording()
    }

    pub fn recording_mode(&self) -> RecordingMode {
        self.transport.recording_mode()
    }

    pub fn loop_manager(&self) -> &LoopManager {
        &self.loop_manager
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    /// Raw input of the last finalized recording.
    pub fn last_take(&self) -> Option<&Clip> {
        self.last_take.as_ref()
    }

    /// True when any track is soloed.
    pub fn solo_active(&self) -> bool {
        self.tracks.iter().any(Track::is_solo)
    }

    /// Recompute the cached song length from every track's clip end.
    pub fn update_total_duration(&mut self) {
        self.total_duration_frames = self
            .tracks
            .iter()
            .filter(|track| track.has_audio())
            .map(Track::end_frame)
            .max()
            .unwrap_or(0);
    }

    // ========================================================================
    // TRACK LIST
    // ========================================================================

    /// Append an empty track and select it. Returns its index.
    pub fn add_track(&mut self, name: Option<&str>) -> usize {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("Track {}", self.tracks.len() + 1));
        let mut track = Track::new(
            self.next_track_id,
            name,
            self.audio.sample_rate,
            self.audio.output_channels,
        );
        self.next_track_id += 1;
        track.set_cursor(self.current_frame);
        self.tracks.push(track);

        let index = self.tracks.len() - 1;
        self.selected = Some(index);
        info!("[Session] Added track {} '{}'", index, self.tracks[index].name());
        index
    }

    /// Append a track holding `clip` at `offset_frames` and select it.
    pub fn add_track_with_clip(&mut self, name: &str, clip: Clip, offset_frames: usize) -> usize {
        if clip.sample_rate() != self.audio.sample_rate {
            warn!(
                "[Session] Clip '{}' is {} Hz but the session runs at {} Hz; playing unresampled",
                clip.name(),
                clip.sample_rate(),
                self.audio.sample_rate
            );
        }
        let index = self.add_track(Some(name));
        self.tracks[index].set_clip(clip, offset_frames);
        self.update_total_duration();
        index
    }

    pub fn delete_track(&mut self, index: usize) -> Result<Track, SessionError> {
        self.track(index)?;
        let removed = self.tracks.remove(index);
        self.selected = match self.selected {
            Some(selected) if selected == index => None,
            Some(selected) if selected > index => Some(selected - 1),
            other => other,
        };
        self.update_total_duration();
        info!("[Session] Deleted track '{}'", removed.name());
        Ok(removed)
    }

    pub fn select_track(&mut self, index: usize) -> Result<(), SessionError> {
        self.track(index)?;
        self.selected = Some(index);
        Ok(())
    }

    /// Move the selection one track down. Stops at the last track.
    pub fn select_next_track(&mut self) -> Result<usize, SessionError> {
        let next = self.selected.map_or(0, |index| index + 1);
        self.select_track(next)?;
        Ok(next)
    }

    /// Move the selection one track up. Stops at the first track.
    pub fn select_previous_track(&mut self) -> Result<usize, SessionError> {
        let len = self.tracks.len();
        let previous = match self.selected {
            Some(index) if index > 0 => index - 1,
            Some(index) => return Err(SessionError::TrackIndexOutOfRange { index, len }),
            None => return Err(SessionError::NoTrackSelected),
        };
        self.select_track(previous)?;
        Ok(previous)
    }

    /// Drop every track and rewind to frame 0. The caller stops playback first.
    pub fn remove_all_tracks(&mut self) {
        let count = self.tracks.len();
        self.tracks.clear();
        self.selected = None;
        self.total_duration_frames = 0;
        self.current_frame = 0;
        self.metronome.set_playback_frame(0);
        info!("[Session] Removed all {} tracks", count);
    }

    // ========================================================================
    // TRACK FLAGS
    // ========================================================================

    /// Flip solo on a track. Soloing one track un-solos all others.
    pub fn toggle_solo(&mut self, index: usize) -> Result<bool, SessionError> {
        let solo = !self.track(index)?.is_solo();
        if solo {
            for track in &mut self.tracks {
                track.set_solo(false);
            }
        }
        self.tracks[index].set_solo(solo);
        Ok(solo)
    }

    pub fn toggle_mute(&mut self, index: usize) -> Result<bool, SessionError> {
        Ok(self.track_mut(index)?.toggle_mute())
    }

    pub fn toggle_arm(&mut self, index: usize) -> Result<bool, SessionError> {
        Ok(self.track_mut(index)?.toggle_armed())
    }

    pub fn adjust_volume(&mut self, index: usize, delta: f32) -> Result<f32, SessionError> {
        Ok(self.track_mut(index)?.adjust_gain(delta))
    }

    pub fn adjust_pan(&mut self, index: usize, delta: f32) -> Result<f32, SessionError> {
        Ok(self.track_mut(index)?.adjust_pan(delta))
    }

    // ========================================================================
    // POSITION
    // ========================================================================

    /// Seek to `frame`, clamped to `[0, total_duration_frames]`.
    ///
    /// Every track cursor and the metronome follow. Returns the new position.
    pub fn set_position(&mut self, frame: i64) -> usize {
        let position = frame.clamp(0, self.total_duration_frames as i64) as usize;
        self.sync_position(position);
        position
    }

    pub(crate) fn sync_position(&mut self, position: usize) {
        self.current_frame = position;
        for track in &mut self.tracks {
            track.set_cursor(position);
        }
        self.metronome.set_playback_frame(position);
    }

    pub fn forward(&mut self, frames: usize) -> usize {
        self.set_position(self.current_frame as i64 + frames as i64)
    }

    pub fn backward(&mut self, frames: usize) -> usize {
        self.set_position(self.current_frame as i64 - frames as i64)
    }

    pub fn goto_start(&mut self) -> usize {
        self.set_position(0)
    }

    pub fn goto_end(&mut self) -> usize {
        self.set_position(self.total_duration_frames as i64)
    }

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    /// Enter Playing. Leaving Stopped re-aligns the track cursors, which
    /// `stop` parks on each clip's offset, with the global frame counter.
    pub fn begin_playback(&mut self) {
        if self.transport.state() == TransportState::Stopped {
            self.sync_position(self.current_frame);
        }
        self.transport.play();
        info!("[Session] Playing from frame {}", self.current_frame);
    }

    /// Enter Paused, finalizing any recording first. Position is kept.
    pub fn pause(&mut self) {
        if self.transport.is_recording() {
            self.finalize_recording();
        }
        self.transport.pause();
        info!("[Session] Paused at frame {}", self.current_frame);
    }

    /// Enter Stopped, finalizing any recording first.
    ///
    /// The global counter goes back to 0 and each track cursor to its own
    /// clip offset.
    pub fn stop(&mut self) {
        if self.transport.is_recording() {
            self.finalize_recording();
        }
        self.transport.stop();
        self.current_frame = 0;
        for track in &mut self.tracks {
            track.reset_cursor();
        }
        self.metronome.set_playback_frame(0);
        info!("[Session] Stopped");
    }

    /// Index of the track a new recording would land on.
    pub fn recording_target(&self) -> Result<usize, SessionError> {
        if self.transport.is_recording() {
            return Err(SessionError::AlreadyRecording);
        }
        let index = self.selected.ok_or(SessionError::NoTrackSelected)?;
        let track = self.track(index)?;
        if !track.is_armed() {
            return Err(SessionError::TrackNotArmed {
                name: track.name().to_string(),
            });
        }
        Ok(index)
    }

    /// Open a capture at the current frame on the selected, armed track.
    pub fn start_recording(&mut self) -> Result<(), SessionError> {
        let index = self.recording_target()?;
        if self.transport.state() == TransportState::Stopped {
            self.sync_position(self.current_frame);
        }
        let reserve = self.audio.capture_reserve_seconds as usize
            * self.audio.sample_rate as usize
            * self.audio.input_channels;
        self.transport.begin_recording(self.current_frame, reserve);
        info!(
            "[Session] Recording on track '{}' from frame {}",
            self.tracks[index].name(),
            self.current_frame
        );
        Ok(())
    }

    /// Finalize the capture and keep playing.
    ///
    /// Returns the index of the track that received the take, if any audio
    /// was captured.
    pub fn stop_recording(&mut self) -> Result<Option<usize>, SessionError> {
        if !self.transport.is_recording() {
            return Err(SessionError::NotRecording);
        }
        Ok(self.finalize_recording())
    }

    /// Close the capture and arrange it onto the timeline.
    ///
    /// The take goes onto the selected track, or onto a new track when the
    /// selection was lost while recording.
    fn finalize_recording(&mut self) -> Option<usize> {
        let input_channels = self.audio.input_channels.max(1);
        let captured_frames = self.transport.captured_samples() / input_channels;
        let start = self.transport.capture_start_frame();
        let end = if self.transport.wrapped_during_capture() || self.current_frame < start {
            start + captured_frames
        } else {
            self.current_frame
        };

        let Some(take) = self.transport.end_recording(end) else {
            warn!("[Session] Recording buffer is empty, nothing to finalize");
            return None;
        };

        let mode = self.transport.recording_mode();
        let index = match self.selected.filter(|&index| index < self.tracks.len()) {
            Some(index) => {
                let track = &mut self.tracks[index];
                if let Err(err) =
                    track.arrange_take(&take.samples, input_channels, take.start_frame, take.end_frame, mode)
                {
                    warn!("[Session] Take rejected: {}", err);
                    return None;
                }
                track.set_cursor(self.current_frame);
                index
            }
            None => {
                let channels = self.audio.output_channels;
                let frames = take.samples.len() / input_channels;
                let samples = convert_channels(&take.samples, input_channels, channels, frames);
                let name = format!("Recorded Track {}", self.tracks.len() + 1);
                let clip = Clip::new(format!("rec_{}", take.start_frame), self.audio.sample_rate, channels, samples);
                let index = self.add_track_with_clip(&name, clip, take.start_frame);
                self.tracks[index].set_cursor(self.current_frame);
                index
            }
        };

        info!(
            "[Session] Take {}..{} arranged on '{}' ({} mode)",
            take.start_frame,
            take.end_frame,
            self.tracks[index].name(),
            mode
        );
        self.last_take = Some(Clip::new(
            format!("take_{}", take.start_frame),
            self.audio.sample_rate,
            input_channels,
            take.samples,
        ));
        self.update_total_duration();
        Some(index)
    }

    pub fn set_recording_mode(&mut self, mode: RecordingMode) {
        self.transport.set_recording_mode(mode);
    }

    pub fn toggle_recording_mode(&mut self) -> RecordingMode {
        self.transport.toggle_recording_mode()
    }

    // ========================================================================
    // LOOP & METRONOME
    // ========================================================================

    pub fn set_loop_points(&mut self, start_frame: i64, end_frame: i64) -> bool {
        self.loop_manager
            .set_loop_points(start_frame, end_frame, self.total_duration_frames)
    }

    pub fn toggle_loop(&mut self) -> Result<bool, SessionError> {
        self.loop_manager.toggle()
    }

    pub fn toggle_click(&mut self) -> bool {
        self.metronome.toggle()
    }

    pub fn set_tempo(&mut self, bpm: f64) -> Result<(), AudioError> {
        self.metronome.update_tempo(bpm)
    }

    // ========================================================================
    // EDITING
    // ========================================================================

    pub fn delete_audio(&mut self, index: usize, start: usize, end: usize) -> Result<(), SessionError> {
        self.track_mut(index)?.delete_range(start, end)?;
        self.update_total_duration();
        Ok(())
    }

    pub fn erase_audio(&mut self, index: usize, start: usize, end: usize) -> Result<(), SessionError> {
        self.track_mut(index)?.erase_range(start, end)
    }

    /// Copy of clip frames `[start, end)` of a track, `end` defaulting to the
    /// clip length.
    pub fn track_clip_range(
        &self,
        index: usize,
        start: usize,
        end: Option<usize>,
    ) -> Result<Clip, SessionError> {
        let track = self.track(index)?;
        let clip = track
            .clip()
            .filter(|clip| !clip.is_empty())
            .ok_or_else(|| SessionError::EmptyTrack {
                name: track.name().to_string(),
            })?;
        let end = end.unwrap_or(clip.length_frames()).min(clip.length_frames());
        if start >= end {
            return Err(SessionError::InvalidRange { start, end });
        }
        Ok(Clip::new(
            clip.name(),
            clip.sample_rate(),
            clip.channels(),
            clip.frames(start, end).to_vec(),
        ))
    }

    /// Mix every audible track over `[start, end)` into a new "Bounced Mix"
    /// track placed at `start`.
    ///
    /// Muted tracks are skipped and solo is respected. The play position is
    /// restored afterwards.
    pub fn bounce(&mut self, start: usize, end: Option<usize>) -> Result<usize, SessionError> {
        let end = end
            .unwrap_or(self.total_duration_frames)
            .min(self.total_duration_frames);
        if start >= end {
            return Err(SessionError::InvalidRange { start, end });
        }

        let channels = self.audio.output_channels;
        let block_size = self.audio.block_size.max(1);
        let length = end - start;
        let saved_position = self.current_frame;
        let solo_active = self.solo_active();

        let mut mix = vec![0.0; length * channels];
        let mut block = Vec::with_capacity(block_size * channels);
        for track in &mut self.tracks {
            if track.is_muted() || (solo_active && !track.is_solo()) {
                continue;
            }
            track.set_cursor(start);
            let mut done = 0;
            while done < length {
                let frames = block_size.min(length - done);
                block.clear();
                block.resize(frames * channels, 0.0);
                track.render_into(&mut block);
                mix_into(&mut mix[done * channels..(done + frames) * channels], &block);
                done += frames;
            }
        }

        let clip = Clip::new("bounce", self.audio.sample_rate, channels, mix);
        let index = self.add_track_with_clip("Bounced Mix", clip, start);
        self.sync_position(saved_position);
        info!("[Session] Bounced frames {}..{} to track {}", start, end, index);
        Ok(index)
    }

    // ========================================================================
    // STATUS
    // ========================================================================

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.transport.state(),
            recording_mode: self.transport.recording_mode(),
            position_frames: self.current_frame,
            total_duration_frames: self.total_duration_frames,
            current_time_seconds: self.current_time_seconds(),
            total_duration_seconds: self.total_duration_seconds(),
            looping: self.loop_manager,
            metronome: MetronomeStatus {
                enabled: self.metronome.is_enabled(),
                tempo_bpm: self.metronome.tempo_bpm(),
                beat_count: self.metronome.beat_count(),
            },
            selected_track: self.selected,
            tracks: self
                .tracks
                .iter()
                .enumerate()
                .map(|(index, track)| TrackStatus {
                    index,
                    id: track.id(),
                    name: track.name().to_string(),
                    offset_frames: track.offset_frames(),
                    length_frames: track.length_frames(),
                    cursor_frames: track.cursor_frames(),
                    gain: track.gain(),
                    pan: track.pan(),
                    muted: track.is_muted(),
                    solo: track.is_solo(),
                    armed: track.is_armed(),
                    selected: self.selected == Some(index),
                })
                .collect(),
        }
    }
}
