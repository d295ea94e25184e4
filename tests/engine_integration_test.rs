//! End-to-end tests driving a `Player` through the desktop stub backend.
//!
//! Blocks are pumped by hand, so every scenario is deterministic and runs
//! without audio hardware.

use std::path::PathBuf;
use std::sync::Arc;

use multitrack_engine::audio::{load_wav, save_wav, Clip, RecordingMode, TransportState};
use multitrack_engine::config::EngineConfig;
use multitrack_engine::engine::{AudioBackend, DesktopStubBackend, Player};

fn mono_player() -> (Player, Arc<DesktopStubBackend>) {
    let mut config = EngineConfig::default();
    config.audio.output_channels = 1;
    config.audio.input_channels = 1;
    config.audio.capture_reserve_seconds = 1;
    Player::with_stub_backend(config).expect("valid config")
}

fn temp_wav(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "multitrack_it_{}_{}.wav",
        name,
        std::process::id()
    ))
}

fn write_constant_wav(name: &str, value: f32, frames: usize) -> PathBuf {
    let path = temp_wav(name);
    let clip = Clip::new(name, 44100, 1, vec![value; frames]);
    save_wav(&path, &clip).expect("write fixture wav");
    path
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn test_one_second_take_on_empty_track() {
    let mut config = EngineConfig::default();
    config.audio.output_channels = 2;
    config.audio.input_channels = 1;
    let (player, stub) = Player::with_stub_backend(config).unwrap();

    let index = player.add_track(None).unwrap();
    player.toggle_arm().unwrap();
    player.start_recording().unwrap();
    for _ in 0..100 {
        stub.pump_duplex(&[0.25; 441]);
    }
    assert_eq!(player.stop_recording().unwrap(), Some(index));

    let session = player.session();
    let session = session.lock().unwrap();
    let track = &session.tracks()[index];
    assert_eq!(track.length_frames(), 44100, "One second at 44.1 kHz");
    assert_eq!(track.offset_frames(), 0);
    assert_eq!(track.channels(), 2, "Take converted to the track's channel count");
    assert_eq!(session.transport_state(), TransportState::Playing);
}

#[test]
fn test_punch_replace_preserves_surrounding_audio() {
    let (player, stub) = mono_player();
    let base = write_constant_wav("punch_replace_base", 0.5, 1000);
    let index = player.load_track(&base, 0).unwrap();
    player.select_track(index).unwrap();
    player.toggle_arm().unwrap();

    assert_eq!(player.set_position(200).unwrap(), 200);
    player.start_recording().unwrap();
    stub.pump_duplex(&[0.1; 300]);
    player.stop_recording().unwrap();
    player.stop().unwrap();

    let out = temp_wav("punch_replace_out");
    player.save_track(index, &out, 0, None).unwrap();
    let clip = load_wav(&out).unwrap();
    let samples = clip.samples();
    assert_eq!(samples.len(), 1000, "Punch inside the clip keeps its length");
    assert!(samples[..200].iter().all(|&s| approx(s, 0.5)), "Head untouched");
    assert!(samples[200..500].iter().all(|&s| approx(s, 0.1)), "Overlap replaced");
    assert!(samples[500..].iter().all(|&s| approx(s, 0.5)), "Tail untouched");
}

#[test]
fn test_punch_mix_sums_overlap_and_extends_clip() {
    let (player, stub) = mono_player();
    let base = write_constant_wav("punch_mix_base", 0.5, 1000);
    let index = player.load_track(&base, 0).unwrap();
    player.select_track(index).unwrap();
    player.toggle_arm().unwrap();
    player.set_recording_mode(RecordingMode::Mix).unwrap();

    player.set_position(800).unwrap();
    player.start_recording().unwrap();
    stub.pump_duplex(&[0.75; 400]);
    player.stop_recording().unwrap();

    let session = player.session();
    let session = session.lock().unwrap();
    let clip = session.tracks()[index].clip().unwrap();
    assert_eq!(clip.length_frames(), 1200, "Union of [0,1000) and [800,1200)");
    let samples = clip.samples();
    assert!(approx(samples[799], 0.5));
    assert!(approx(samples[800], 1.25), "Overlap summed without clamping");
    assert!(approx(samples[999], 1.25));
    assert!(approx(samples[1000], 0.75), "Take tail written as recorded");
}

#[test]
fn test_loop_playback_wraps_to_loop_start() {
    let (player, stub) = mono_player();
    {
        let session = player.session();
        let mut session = session.lock().unwrap();
        session.add_track_with_clip("bed", Clip::new("bed", 44100, 1, vec![0.5; 4000]), 0);
    }
    assert!(player.set_loop_points(1000, 2000).unwrap());
    assert!(player.status().unwrap().looping.is_enabled(), "Valid loop points enable looping");
    player.set_position(1500).unwrap();
    player.play().unwrap();

    for _ in 0..4 {
        let block = stub.pump_output(250);
        assert!(block.iter().all(|&s| approx(s, 0.5)), "Loop region is inside the clip");
    }
    assert_eq!(player.position_frames().unwrap(), 1500, "1500 -> 2000 wraps to 1000, then 500 more");
    assert_eq!(player.transport_state().unwrap(), TransportState::Playing);
}

#[test]
fn test_playback_auto_stops_after_content() {
    let (player, stub) = mono_player();
    let base = write_constant_wav("auto_stop", 0.5, 100);
    player.load_track(&base, 0).unwrap();
    player.play().unwrap();

    let first = stub.pump_output(64);
    assert!(first.iter().all(|&s| approx(s, 0.5)));
    let second = stub.pump_output(64);
    assert!(second[..36].iter().all(|&s| approx(s, 0.5)));
    assert!(second[36..].iter().all(|&s| s == 0.0), "Zero padded past the clip end");

    assert_eq!(player.transport_state().unwrap(), TransportState::Paused);
    let third = stub.pump_output(64);
    assert!(third.iter().all(|&s| s == 0.0), "Paused output is silent without the click");
    assert_eq!(player.position_frames().unwrap(), 128);
}

#[test]
fn test_solo_and_mute_shape_the_mix() {
    let (player, stub) = mono_player();
    {
        let session = player.session();
        let mut session = session.lock().unwrap();
        session.add_track_with_clip("a", Clip::new("a", 44100, 1, vec![0.25; 1000]), 0);
        session.add_track_with_clip("b", Clip::new("b", 44100, 1, vec![0.5; 1000]), 0);
    }
    player.play().unwrap();
    assert!(stub.pump_output(16).iter().all(|&s| approx(s, 0.75)), "Both tracks summed");

    player.select_track(0).unwrap();
    assert!(player.toggle_mute().unwrap());
    assert!(stub.pump_output(16).iter().all(|&s| approx(s, 0.5)), "Muted track dropped");

    assert!(player.toggle_solo().unwrap());
    assert!(
        stub.pump_output(16).iter().all(|&s| s == 0.0),
        "Soloed but muted track stays silent and the other is not soloed"
    );

    player.select_track(1).unwrap();
    assert!(player.toggle_solo().unwrap(), "Solo moves to track b");
    assert!(stub.pump_output(16).iter().all(|&s| approx(s, 0.5)));
}

#[test]
fn test_stop_rewinds_cursors_to_offsets() {
    let (player, stub) = mono_player();
    {
        let session = player.session();
        let mut session = session.lock().unwrap();
        session.add_track_with_clip("late", Clip::new("late", 44100, 1, vec![0.5; 1000]), 300);
    }
    player.play().unwrap();
    stub.pump_output(500);
    player.stop().unwrap();

    let status = player.status().unwrap();
    assert_eq!(status.state, TransportState::Stopped);
    assert_eq!(status.position_frames, 0);
    assert_eq!(status.tracks[0].cursor_frames, 300, "Cursor rests at the clip offset");
    assert!(!stub.is_running(), "Stop closes the output stream");

    player.play().unwrap();
    let block = stub.pump_output(400);
    assert!(block[..300].iter().all(|&s| s == 0.0), "Leading silence before the offset");
    assert!(block[300..].iter().all(|&s| approx(s, 0.5)));
}

#[test]
fn test_metronome_clicks_on_first_block() {
    let (player, stub) = mono_player();
    assert!(player.toggle_click().unwrap());
    player.play().unwrap();

    let block = stub.pump_output(1024);
    let peak = block.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    assert!(peak > 0.0, "Enabled metronome clicks immediately");
    assert!(peak <= 0.2 + 1e-6, "Click never exceeds its amplitude");
}

#[test]
fn test_bounce_creates_mixed_track() {
    let (player, _stub) = mono_player();
    {
        let session = player.session();
        let mut session = session.lock().unwrap();
        session.add_track_with_clip("a", Clip::new("a", 44100, 1, vec![0.25; 3000]), 0);
        session.add_track_with_clip("b", Clip::new("b", 44100, 1, vec![0.5; 1000]), 1000);
    }
    let index = player.bounce(0, None).unwrap();
    let status = player.status().unwrap();
    assert_eq!(status.tracks.len(), 3);
    assert_eq!(status.tracks[index].name, "Bounced Mix");
    assert_eq!(status.tracks[index].length_frames, 3000);

    let out = temp_wav("bounce_out");
    player.save_track(index, &out, 0, None).unwrap();
    let samples = load_wav(&out).unwrap().into_samples();
    assert!(approx(samples[500], 0.25));
    assert!(approx(samples[1500], 0.75));
    assert!(approx(samples[2500], 0.25));
}

#[test]
fn test_save_recording_writes_raw_input() {
    let (player, stub) = mono_player();
    player.add_track(None).unwrap();
    player.toggle_arm().unwrap();
    player.start_recording().unwrap();
    stub.pump_duplex(&[0.125; 256]);
    stub.pump_duplex(&[0.125; 256]);
    player.stop().unwrap();

    let out = temp_wav("raw_take");
    player.save_recording(&out).unwrap();
    let take = load_wav(&out).unwrap();
    assert_eq!(take.channels(), 1);
    assert_eq!(take.length_frames(), 512);
    assert!(take.samples().iter().all(|&s| approx(s, 0.125)));
}
