//! Player: the control surface of the engine.
//!
//! The player owns the shared `Arc<Mutex<Session>>` and the audio backend.
//! Control operations lock the session for the state change only; streams
//! are opened and closed with the lock released, because the backend's
//! callbacks take the same lock. Backend failures leave the transport in
//! its previous state.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info};

use crate::audio::track::RecordingMode;
use crate::audio::transport::TransportState;
use crate::audio::wav::{load_wav, save_wav};
use crate::config::EngineConfig;
#[cfg(not(target_os = "android"))]
use crate::engine::backend::CpalBackend;
use crate::engine::backend::{AudioBackend, DesktopStubBackend, OutputCallback};
use crate::engine::session::{Session, SessionStatus};
use crate::error::{log_audio_error, log_session_error, AudioError, EngineError, SessionError};

/// Volume and pan step used by the nudge helpers.
pub const ADJUST_STEP: f32 = 0.1;

pub struct Player {
    config: EngineConfig,
    session: Arc<Mutex<Session>>,
    backend: Arc<dyn AudioBackend>,
}

impl Player {
    /// Create a player on top of `backend`. The configuration is validated
    /// and fixed for the player's lifetime.
    pub fn new(config: EngineConfig, backend: Arc<dyn AudioBackend>) -> Result<Self, AudioError> {
        config.validate()?;
        let session = Arc::new(Mutex::new(Session::new(&config)));
        info!(
            "[Player] Created ({} Hz, block {}, {} out / {} in)",
            config.audio.sample_rate,
            config.audio.block_size,
            config.audio.output_channels,
            config.audio.input_channels
        );
        Ok(Self {
            config,
            session,
            backend,
        })
    }

    /// Create a player on the platform's default backend.
    pub fn with_default_backend(config: EngineConfig) -> Result<Self, AudioError> {
        let backend = Self::create_backend(&config);
        Self::new(config, backend)
    }

    #[cfg(not(target_os = "android"))]
    fn create_backend(config: &EngineConfig) -> Arc<dyn AudioBackend> {
        Arc::new(CpalBackend::new(&config.audio))
    }

    #[cfg(target_os = "android")]
    fn create_backend(config: &EngineConfig) -> Arc<dyn AudioBackend> {
        Arc::new(DesktopStubBackend::new(
            config.audio.output_channels,
            config.audio.input_channels,
        ))
    }

    /// Create a player driven by a [`DesktopStubBackend`], returned alongside
    /// so the caller can pump blocks.
    pub fn with_stub_backend(
        config: EngineConfig,
    ) -> Result<(Self, Arc<DesktopStubBackend>), AudioError> {
        let stub = Arc::new(DesktopStubBackend::new(
            config.audio.output_channels,
            config.audio.input_channels,
        ));
        let backend: Arc<dyn AudioBackend> = stub.clone();
        Ok((Self::new(config, backend)?, stub))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared session handle, for inspection by embedding code and tests.
    pub fn session(&self) -> Arc<Mutex<Session>> {
        Arc::clone(&self.session)
    }

    pub fn is_running(&self) -> bool {
        self.backend.is_running()
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, Session>, AudioError> {
        self.session.lock().map_err(|_| {
            let err = AudioError::LockPoisoned {
                component: "session".to_string(),
            };
            log_audio_error(&err, "Player::lock_session");
            err
        })
    }

    /// Run a session operation under the lock, logging rejected requests.
    fn with_session<T>(
        &self,
        context: &str,
        op: impl FnOnce(&mut Session) -> Result<T, SessionError>,
    ) -> Result<T, EngineError> {
        let mut session = self.lock_session()?;
        op(&mut session).map_err(|err| {
            log_session_error(&err, context);
            EngineError::Session(err)
        })
    }

    /// Read or mutate the session where no request can be rejected.
    fn read_session<T>(&self, op: impl FnOnce(&mut Session) -> T) -> Result<T, EngineError> {
        let mut session = self.lock_session()?;
        Ok(op(&mut session))
    }

    // ========================================================================
    // STREAMS
    // ========================================================================

    fn output_callback(session: &Arc<Mutex<Session>>) -> OutputCallback {
        let session = Arc::clone(session);
        Box::new(move |out: &mut [f32]| match session.lock() {
            Ok(mut session) => session.process_output(out),
            Err(_) => {
                error!("[Player] Session lock poisoned in output callback; emitting silence");
                out.fill(0.0);
            }
        })
    }

    fn ensure_output(&self) -> Result<(), AudioError> {
        if self.backend.is_running() {
            return Ok(());
        }
        if self.config.audio.duplex {
            let session = Arc::clone(&self.session);
            self.backend
                .start_duplex(Box::new(move |input: &[f32], out: &mut [f32]| {
                    match session.lock() {
                        Ok(mut session) => session.process_duplex(input, out),
                        Err(_) => {
                            error!("[Player] Session lock poisoned in duplex callback; emitting silence");
                            out.fill(0.0);
                        }
                    }
                }))
        } else {
            self.backend.start_output(Self::output_callback(&self.session))
        }
    }

    fn ensure_input(&self) -> Result<(), AudioError> {
        if self.backend.is_input_running() {
            return Ok(());
        }
        if self.config.audio.duplex {
            return self.ensure_output();
        }
        let session = Arc::clone(&self.session);
        self.backend.start_input(Box::new(move |input: &[f32]| {
            match session.lock() {
                Ok(mut session) => session.process_input(input),
                Err(_) => error!("[Player] Session lock poisoned in input callback; dropping block"),
            }
        }))
    }

    /// Close the input path unless a duplex stream still needs it.
    fn release_input(&self) {
        if self.config.audio.duplex || !self.backend.is_input_running() {
            return;
        }
        if let Err(err) = self.backend.stop_input() {
            log_audio_error(&err, "Player::release_input");
        }
    }

    fn release_all(&self) {
        if self.config.audio.duplex {
            if self.backend.is_running() {
                if let Err(err) = self.backend.stop_duplex() {
                    log_audio_error(&err, "Player::release_all");
                }
            }
            return;
        }
        self.release_input();
        if self.backend.is_running() {
            if let Err(err) = self.backend.stop_output() {
                log_audio_error(&err, "Player::release_all");
            }
        }
    }

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    /// Start playback. While recording this finalizes the take instead.
    pub fn play(&self) -> Result<(), EngineError> {
        let recording = self.lock_session()?.is_recording();
        if recording {
            return self.stop_recording().map(|_| ());
        }
        self.ensure_output().map_err(|err| {
            log_audio_error(&err, "Player::play");
            EngineError::Audio(err)
        })?;
        self.read_session(Session::begin_playback)?;
        info!("[Player] Playing");
        Ok(())
    }

    /// Pause, finalizing any recording. The output stream stays open.
    pub fn pause(&self) -> Result<(), EngineError> {
        self.read_session(Session::pause)?;
        self.release_input();
        Ok(())
    }

    /// Stop, finalize any recording, rewind, and close the streams.
    pub fn stop(&self) -> Result<(), EngineError> {
        self.read_session(Session::stop)?;
        self.release_all();
        info!("[Player] Stopped");
        Ok(())
    }

    /// Start punch recording on the selected, armed track.
    pub fn start_recording(&self) -> Result<(), EngineError> {
        self.with_session("Player::start_recording", |session| {
            session.recording_target().map(|_| ())
        })?;

        let input_was_running = self.backend.is_input_running();
        let opened = self.ensure_input().and_then(|_| self.ensure_output());
        if let Err(err) = opened {
            log_audio_error(&err, "Player::start_recording");
            if !input_was_running {
                self.release_input();
            }
            return Err(EngineError::Audio(err));
        }

        self.with_session("Player::start_recording", Session::start_recording)
    }

    /// Finalize the recording and keep playing. Returns the index of the
    /// track that received the take.
    pub fn stop_recording(&self) -> Result<Option<usize>, EngineError> {
        let landed = self.with_session("Player::stop_recording", Session::stop_recording)?;
        self.release_input();
        Ok(landed)
    }

    /// Returns true when recording after the call.
    pub fn toggle_record(&self) -> Result<bool, EngineError> {
        let recording = self.lock_session()?.is_recording();
        if recording {
            self.stop_recording()?;
            Ok(false)
        } else {
            self.start_recording()?;
            Ok(true)
        }
    }

    /// Returns true when playing after the call.
    pub fn toggle_play_pause(&self) -> Result<bool, EngineError> {
        let playing = self.lock_session()?.is_playing();
        if playing {
            self.pause()?;
            Ok(false)
        } else {
            self.play()?;
            Ok(true)
        }
    }

    pub fn set_recording_mode(&self, mode: RecordingMode) -> Result<(), EngineError> {
        self.read_session(|session| session.set_recording_mode(mode))
    }

    pub fn toggle_recording_mode(&self) -> Result<RecordingMode, EngineError> {
        self.read_session(Session::toggle_recording_mode)
    }

    pub fn transport_state(&self) -> Result<TransportState, EngineError> {
        self.read_session(|session| session.transport_state())
    }

    // ========================================================================
    // POSITION
    // ========================================================================

    pub fn set_position(&self, frame: i64) -> Result<usize, EngineError> {
        self.read_session(|session| session.set_position(frame))
    }

    /// Seek forward by `frames`, or by the configured step.
    pub fn forward(&self, frames: Option<usize>) -> Result<usize, EngineError> {
        let step = frames.unwrap_or(self.config.transport.seek_step_frames);
        self.read_session(|session| session.forward(step))
    }

    /// Seek backward by `frames`, or by the configured step.
    pub fn backward(&self, frames: Option<usize>) -> Result<usize, EngineError> {
        let step = frames.unwrap_or(self.config.transport.seek_step_frames);
        self.read_session(|session| session.backward(step))
    }

    pub fn goto_start(&self) -> Result<usize, EngineError> {
        self.read_session(Session::goto_start)
    }

    pub fn goto_end(&self) -> Result<usize, EngineError> {
        self.read_session(Session::goto_end)
    }

    pub fn position_frames(&self) -> Result<usize, EngineError> {
        self.read_session(|session| session.position_frames())
    }

    pub fn current_time_seconds(&self) -> Result<f64, EngineError> {
        self.read_session(|session| session.current_time_seconds())
    }

    pub fn total_duration_seconds(&self) -> Result<f64, EngineError> {
        self.read_session(|session| session.total_duration_seconds())
    }

    pub fn status(&self) -> Result<SessionStatus, EngineError> {
        self.read_session(|session| session.status())
    }

    // ========================================================================
    // LOOP & METRONOME
    // ========================================================================

    /// Store loop points and enable looping. Returns false when rejected.
    pub fn set_loop_points(&self, start_frame: i64, end_frame: i64) -> Result<bool, EngineError> {
        self.read_session(|session| session.set_loop_points(start_frame, end_frame))
    }

    pub fn toggle_loop(&self) -> Result<bool, EngineError> {
        self.with_session("Player::toggle_loop", Session::toggle_loop)
    }

    pub fn toggle_click(&self) -> Result<bool, EngineError> {
        self.read_session(Session::toggle_click)
    }

    pub fn set_tempo(&self, bpm: f64) -> Result<(), EngineError> {
        let mut session = self.lock_session()?;
        session.set_tempo(bpm).map_err(|err| {
            log_audio_error(&err, "Player::set_tempo");
            EngineError::Audio(err)
        })
    }

    // ========================================================================
    // TRACKS
    // ========================================================================

    pub fn add_track(&self, name: Option<&str>) -> Result<usize, EngineError> {
        self.read_session(|session| session.add_track(name))
    }

    pub fn delete_track(&self, index: usize) -> Result<(), EngineError> {
        self.with_session("Player::delete_track", |session| {
            session.delete_track(index).map(|_| ())
        })
    }

    pub fn select_track(&self, index: usize) -> Result<(), EngineError> {
        self.with_session("Player::select_track", |session| session.select_track(index))
    }

    pub fn select_next_track(&self) -> Result<usize, EngineError> {
        self.with_session("Player::select_next_track", Session::select_next_track)
    }

    pub fn select_previous_track(&self) -> Result<usize, EngineError> {
        self.with_session("Player::select_previous_track", Session::select_previous_track)
    }

    fn selected(session: &Session) -> Result<usize, SessionError> {
        session.selected_index().ok_or(SessionError::NoTrackSelected)
    }

    pub fn toggle_mute(&self) -> Result<bool, EngineError> {
        self.with_session("Player::toggle_mute", |session| {
            session.toggle_mute(Self::selected(session)?)
        })
    }

    pub fn toggle_solo(&self) -> Result<bool, EngineError> {
        self.with_session("Player::toggle_solo", |session| {
            session.toggle_solo(Self::selected(session)?)
        })
    }

    pub fn toggle_arm(&self) -> Result<bool, EngineError> {
        self.with_session("Player::toggle_arm", |session| {
            session.toggle_arm(Self::selected(session)?)
        })
    }

    /// Nudge the selected track's volume by `steps` × 0.1.
    pub fn adjust_volume(&self, steps: i32) -> Result<f32, EngineError> {
        self.with_session("Player::adjust_volume", |session| {
            session.adjust_volume(Self::selected(session)?, steps as f32 * ADJUST_STEP)
        })
    }

    /// Nudge the selected track's pan by `steps` × 0.1; negative is left.
    pub fn adjust_pan(&self, steps: i32) -> Result<f32, EngineError> {
        self.with_session("Player::adjust_pan", |session| {
            session.adjust_pan(Self::selected(session)?, steps as f32 * ADJUST_STEP)
        })
    }

    /// Stop playback and drop every track.
    pub fn remove_all_tracks(&self) -> Result<(), EngineError> {
        self.stop()?;
        self.read_session(Session::remove_all_tracks)
    }

    // ========================================================================
    // FILES & EDITING
    // ========================================================================

    /// Load a WAV file into a new track placed at `offset_frames`.
    pub fn load_track<P: AsRef<Path>>(&self, path: P, offset_frames: usize) -> Result<usize, EngineError> {
        let clip = load_wav(path.as_ref()).map_err(|err| {
            log_audio_error(&err, "Player::load_track");
            EngineError::Audio(err)
        })?;
        let name = clip.name().to_string();
        self.read_session(|session| session.add_track_with_clip(&name, clip, offset_frames))
    }

    /// Write clip frames `[start, end)` of a track, `end` defaulting to the
    /// whole clip.
    pub fn save_track<P: AsRef<Path>>(
        &self,
        index: usize,
        path: P,
        start: usize,
        end: Option<usize>,
    ) -> Result<(), EngineError> {
        let clip = self.with_session("Player::save_track", |session| {
            session.track_clip_range(index, start, end)
        })?;
        save_wav(path, &clip).map_err(|err| {
            log_audio_error(&err, "Player::save_track");
            EngineError::Audio(err)
        })
    }

    /// Write the raw input of the last finalized recording.
    pub fn save_recording<P: AsRef<Path>>(&self, path: P) -> Result<(), EngineError> {
        let take = self.with_session("Player::save_recording", |session| {
            if session.is_recording() {
                return Err(SessionError::AlreadyRecording);
            }
            session.last_take().cloned().ok_or(SessionError::EmptyCapture)
        })?;
        save_wav(path, &take).map_err(|err| {
            log_audio_error(&err, "Player::save_recording");
            EngineError::Audio(err)
        })
    }

    pub fn delete_audio(&self, index: usize, start: usize, end: usize) -> Result<(), EngineError> {
        self.with_session("Player::delete_audio", |session| {
            session.delete_audio(index, start, end)
        })
    }

    pub fn erase_audio(&self, index: usize, start: usize, end: usize) -> Result<(), EngineError> {
        self.with_session("Player::erase_audio", |session| {
            session.erase_audio(index, start, end)
        })
    }

    /// Mix audible tracks over `[start, end)` into a new track.
    pub fn bounce(&self, start: usize, end: Option<usize>) -> Result<usize, EngineError> {
        self.with_session("Player::bounce", |session| session.bounce(start, end))
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.release_all();
    }
}
