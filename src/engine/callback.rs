//! Real-time callbacks driven by the audio backend.
//!
//! Both run with the session lock held for the whole block. They never
//! return errors: shape faults degrade to silence plus a diagnostic.
//! Buffers are taken out of the session for the duration of the block and
//! put back, so steady-state blocks do not allocate.

use tracing::warn;

use super::session::Session;
use crate::audio::mixer::mix_into;
use crate::audio::track::{RecordingMode, Track};

impl Session {
    /// Fill one interleaved output block.
    pub fn process_output(&mut self, out: &mut [f32]) {
        let channels = self.audio.output_channels.max(1);
        if out.len() % channels != 0 {
            warn!(
                "[Session] Output block of {} samples is not a whole number of {}-channel frames",
                out.len(),
                channels
            );
            out.fill(0.0);
            return;
        }
        let frame_count = out.len() / channels;

        let mut mix = std::mem::take(&mut self.mix_buffer);
        mix.clear();
        mix.resize(out.len(), 0.0);

        // Runs while stopped too so the click keeps time.
        self.metronome.process_block(&mut mix, frame_count);

        if !self.transport.is_playing() {
            if self.metronome.is_enabled() {
                self.metronome.advance(frame_count);
            }
            out.copy_from_slice(&mix);
            self.mix_buffer = mix;
            return;
        }

        let solo_active = self.solo_active();
        let replacing = self.transport.is_recording()
            && self.transport.recording_mode() == RecordingMode::Replace;

        let mut block = std::mem::take(&mut self.track_buffer);
        block.clear();
        block.resize(out.len(), 0.0);

        for track in &mut self.tracks {
            // Render even when inaudible so every cursor advances in lockstep.
            track.render_into(&mut block);
            let silenced = (solo_active && !track.is_solo())
                || track.is_muted()
                || (track.is_armed() && replacing);
            if !silenced && !mix_into(&mut mix, &block) {
                warn!(
                    "[Session] Track '{}' rendered {} samples, expected {}; treated as silence",
                    track.name(),
                    block.len(),
                    mix.len()
                );
            }
        }
        self.track_buffer = block;

        self.current_frame += frame_count;
        self.metronome.set_playback_frame(self.current_frame);

        if let Some(start) = self.loop_manager.wrap_target(self.current_frame) {
            self.sync_position(start);
            self.transport.mark_loop_wrap();
        } else if !self.loop_manager.is_enabled()
            && !self.transport.is_recording()
            && self.tracks.iter().all(Track::is_finished)
        {
            self.transport.pause();
        }

        out.copy_from_slice(&mix);
        self.mix_buffer = mix;
    }

    /// Take one interleaved input block. Only kept while recording.
    pub fn process_input(&mut self, input: &[f32]) {
        if !self.transport.is_recording() {
            return;
        }
        let channels = self.audio.input_channels.max(1);
        if input.len() % channels != 0 {
            warn!(
                "[Session] Input block of {} samples is not a whole number of {}-channel frames; dropped",
                input.len(),
                channels
            );
            return;
        }
        self.transport.append_capture(input);
    }

    /// Input then output for one duplex period.
    pub fn process_duplex(&mut self, input: &[f32], out: &mut [f32]) {
        self.process_input(input);
        self.process_output(out);
    }
}

#[cfg(test)]
mod tests {
    use crate::audio::clip::Clip;
    use crate::audio::transport::TransportState;
    use crate::config::EngineConfig;
    use crate::engine::session::Session;

    fn mono_session(block_size: usize) -> Session {
        let mut config = EngineConfig::default();
        config.audio.output_channels = 1;
        config.audio.input_channels = 1;
        config.audio.block_size = block_size;
        Session::new(&config)
    }

    fn add_constant_track(session: &mut Session, value: f32, frames: usize, offset: usize) -> usize {
        let clip = Clip::new("c", session.sample_rate(), 1, vec![value; frames]);
        session.add_track_with_clip("t", clip, offset)
    }

    #[test]
    fn test_stopped_session_outputs_silence() {
        let mut session = mono_session(64);
        add_constant_track(&mut session, 0.5, 1000, 0);
        let mut out = vec![1.0; 64];
        session.process_output(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(session.position_frames(), 0, "Position only moves while playing");
    }

    #[test]
    fn test_tracks_are_summed_without_limiting() {
        let mut session = mono_session(64);
        add_constant_track(&mut session, 0.75, 1000, 0);
        add_constant_track(&mut session, 0.5, 1000, 0);
        session.begin_playback();

        let mut out = vec![0.0; 64];
        session.process_output(&mut out);
        assert!(out.iter().all(|&s| (s - 1.25).abs() < 1e-6), "Raw additive mix");
        assert_eq!(session.position_frames(), 64);
        assert!(session.tracks().iter().all(|t| t.cursor_frames() == 64));
    }

    #[test]
    fn test_solo_overrides_mute_of_others() {
        let mut session = mono_session(16);
        let a = add_constant_track(&mut session, 0.25, 100, 0);
        let b = add_constant_track(&mut session, 0.5, 100, 0);
        session.toggle_solo(b).unwrap();
        session.begin_playback();

        let mut out = vec![0.0; 16];
        session.process_output(&mut out);
        assert!(out.iter().all(|&s| s == 0.5), "Only the soloed track is heard");
        assert_eq!(session.tracks()[a].cursor_frames(), 16, "Silenced track still advances");
    }

    #[test]
    fn test_armed_track_silent_while_replace_recording() {
        let mut session = mono_session(16);
        let index = add_constant_track(&mut session, 0.5, 100, 0);
        session.toggle_arm(index).unwrap();
        session.start_recording().unwrap();

        let mut out = vec![0.0; 16];
        session.process_output(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));

        session.stop_recording().unwrap();
        session.toggle_recording_mode();
        session.start_recording().unwrap();
        session.process_output(&mut out);
        assert!(out.iter().all(|&s| s == 0.5), "Mix mode keeps monitoring the armed track");
    }

    #[test]
    fn test_auto_stop_after_last_track_ends() {
        let mut session = mono_session(64);
        add_constant_track(&mut session, 0.5, 100, 0);
        session.begin_playback();

        let mut out = vec![0.0; 64];
        session.process_output(&mut out);
        assert!(session.is_playing());
        session.process_output(&mut out);
        assert!(!session.is_playing(), "Playback halts once every track is finished");
        assert_eq!(session.transport_state(), TransportState::Paused);
        assert_eq!(session.position_frames(), 128);
    }

    #[test]
    fn test_no_auto_stop_while_recording() {
        let mut session = mono_session(64);
        let index = session.add_track(None);
        session.toggle_arm(index).unwrap();
        session.start_recording().unwrap();

        let mut out = vec![0.0; 64];
        for _ in 0..4 {
            session.process_output(&mut out);
        }
        assert!(session.is_recording());
        assert_eq!(session.position_frames(), 256);
    }

    #[test]
    fn test_loop_wrap_resets_every_cursor() {
        let mut session = mono_session(1000);
        add_constant_track(&mut session, 0.1, 10_000, 0);
        add_constant_track(&mut session, 0.1, 8000, 500);
        assert!(session.set_loop_points(1000, 5000));
        session.set_position(4000);
        session.begin_playback();

        let mut out = vec![0.0; 1000];
        session.process_output(&mut out);
        assert_eq!(session.position_frames(), 1000, "Reaching the loop end wraps to its start");
        assert!(session.tracks().iter().all(|t| t.cursor_frames() == 1000));
        assert_eq!(session.metronome().playback_frame(), 1000);
    }

    #[test]
    fn test_input_captured_only_while_recording() {
        let mut session = mono_session(8);
        let index = session.add_track(None);
        session.process_input(&[0.5; 8]);

        session.toggle_arm(index).unwrap();
        session.start_recording().unwrap();
        session.process_duplex(&[0.5; 8], &mut [0.0; 8]);
        session.stop_recording().unwrap();

        let track = &session.tracks()[index];
        assert_eq!(track.length_frames(), 8);
        assert_eq!(track.offset_frames(), 0);
    }

    #[test]
    fn test_misshapen_output_block_is_silenced() {
        let mut config = EngineConfig::default();
        config.audio.output_channels = 2;
        let mut session = Session::new(&config);
        session.begin_playback();
        let mut out = vec![1.0; 7];
        session.process_output(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(session.position_frames(), 0);
    }
}
