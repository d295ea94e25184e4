use super::*;

const SR: u32 = 44100;

fn stereo_track_with(samples: Vec<f32>, offset: usize) -> Track {
    let mut track = Track::new(0, "Track 1", SR, 2);
    track.set_clip(Clip::new("src", SR, 2, samples), offset);
    track
}

fn mono_ramp(frames: usize, start: f32) -> Vec<f32> {
    (0..frames).map(|i| start + i as f32).collect()
}

#[test]
fn test_render_length_invariant_across_states() {
    let mut empty = Track::new(0, "empty", SR, 2);
    let mut muted = stereo_track_with(vec![1.0; 20], 0);
    muted.set_muted(true);
    let mut playing = stereo_track_with(vec![1.0; 20], 3);

    for &frames in &[1usize, 7, 64, 1024] {
        for track in [&mut empty, &mut muted, &mut playing] {
            let before = track.cursor_frames();
            let block = track.render_block(frames);
            assert_eq!(block.len(), frames * 2, "Block must hold frame_count * channels samples");
            assert_eq!(
                track.cursor_frames(),
                before + frames,
                "Cursor must advance by exactly frame_count"
            );
        }
    }
}

#[test]
fn test_render_muted_is_silent() {
    let mut track = stereo_track_with(vec![1.0; 8], 0);
    track.set_muted(true);
    assert!(track.render_block(4).iter().all(|&s| s == 0.0));
}

#[test]
fn test_render_block_before_clip_is_silent() {
    let mut track = stereo_track_with(vec![1.0; 8], 100);
    let block = track.render_block(50);
    assert!(block.iter().all(|&s| s == 0.0));
    assert_eq!(track.cursor_frames(), 50);
}

#[test]
fn test_render_straddles_clip_start() {
    // Mono clip 1,2,3 at offset 2 on a stereo track.
    let mut track = Track::new(0, "t", SR, 2);
    track.set_clip(Clip::new("m", SR, 1, vec![1.0, 2.0, 3.0]), 2);

    let block = track.render_block(4);
    assert_eq!(block, vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);

    let block = track.render_block(4);
    assert_eq!(block, vec![3.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], "Zero-padded past the end");
}

#[test]
fn test_render_past_end_is_silent() {
    let mut track = stereo_track_with(vec![1.0; 4], 0);
    track.set_cursor(10);
    assert!(track.render_block(8).iter().all(|&s| s == 0.0));
}

#[test]
fn test_render_applies_linear_pan() {
    let mut track = stereo_track_with(vec![1.0; 4], 0);
    track.set_gain(0.5);
    track.set_pan(-0.5);
    let block = track.render_block(2);
    assert_eq!(block, vec![0.75, 0.25, 0.75, 0.25]);
}

#[test]
fn test_render_mono_track_applies_gain_only() {
    let mut track = Track::new(0, "mono", SR, 1);
    track.set_clip(Clip::new("m", SR, 1, vec![1.0, 1.0]), 0);
    track.set_gain(0.25);
    track.set_pan(1.0);
    assert_eq!(track.render_block(2), vec![0.25, 0.25]);
}

#[test]
fn test_reset_cursor_returns_to_offset() {
    let mut track = stereo_track_with(vec![1.0; 4], 500);
    track.set_cursor(1200);
    track.reset_cursor();
    assert_eq!(track.cursor_frames(), 500);
}

#[test]
fn test_gain_and_pan_are_clamped() {
    let mut track = Track::new(0, "t", SR, 2);
    assert_eq!(track.adjust_gain(0.1), 1.0);
    for _ in 0..15 {
        track.adjust_gain(-0.1);
    }
    assert_eq!(track.gain(), 0.0);
    for _ in 0..15 {
        track.adjust_pan(0.1);
    }
    assert_eq!(track.pan(), 1.0);
    track.set_pan(-3.0);
    assert_eq!(track.pan(), -1.0);
}

#[test]
fn test_arrange_take_on_empty_track_adopts_take() {
    let mut track = Track::new(0, "t", SR, 2);
    let take = mono_ramp(100, 1.0);
    track
        .arrange_take(&take, 1, 250, 350, RecordingMode::Replace)
        .expect("take on empty track");

    let clip = track.clip().expect("clip set");
    assert_eq!(track.offset_frames(), 250);
    assert_eq!(clip.length_frames(), 100);
    assert_eq!(clip.channels(), 2);
    assert_eq!(&clip.samples()[..4], &[1.0, 1.0, 2.0, 2.0]);
}

#[test]
fn test_arrange_take_replace_overlap() {
    // Old clip: frames 0..10 with value 1.0, mono track.
    let mut track = Track::new(0, "t", SR, 1);
    track.set_clip(Clip::new("old", SR, 1, vec![1.0; 10]), 0);

    let take = vec![5.0; 4];
    track
        .arrange_take(&take, 1, 3, 7, RecordingMode::Replace)
        .unwrap();

    let clip = track.clip().unwrap();
    assert_eq!(clip.length_frames(), 10);
    assert_eq!(
        clip.samples(),
        &[1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0, 1.0, 1.0, 1.0],
        "Overlap holds take samples only, surroundings preserved"
    );
}

#[test]
fn test_arrange_take_mix_overlap_sums_without_clamping() {
    let mut track = Track::new(0, "t", SR, 1);
    track.set_clip(Clip::new("old", SR, 1, vec![0.75; 10]), 0);

    track
        .arrange_take(&[0.5; 4], 1, 3, 7, RecordingMode::Mix)
        .unwrap();

    let samples = track.clip().unwrap().samples();
    assert_eq!(&samples[..3], &[0.75; 3]);
    assert_eq!(&samples[3..7], &[1.25; 4]);
    assert_eq!(&samples[7..], &[0.75; 3]);
}

#[test]
fn test_arrange_take_extends_before_and_after() {
    // Old clip at 100..110, take at 95..115.
    let mut track = Track::new(0, "t", SR, 1);
    track.set_clip(Clip::new("old", SR, 1, vec![1.0; 10]), 100);

    track
        .arrange_take(&[2.0; 20], 1, 95, 115, RecordingMode::Mix)
        .unwrap();

    let clip = track.clip().unwrap();
    assert_eq!(track.offset_frames(), 95);
    assert_eq!(clip.length_frames(), 20);
    let samples = clip.samples();
    assert_eq!(&samples[..5], &[2.0; 5], "Take head written directly");
    assert_eq!(&samples[5..15], &[3.0; 10], "Overlap summed");
    assert_eq!(&samples[15..], &[2.0; 5], "Take tail written directly");
}

#[test]
fn test_arrange_take_splice_length_property() {
    let cases = [
        (0usize, 50usize, 10usize, 30usize),
        (100, 50, 20, 60),
        (100, 50, 170, 200),
        (100, 50, 120, 400),
        (0, 10, 0, 10),
    ];
    for &(offset, len, take_start, take_end) in &cases {
        for mode in [RecordingMode::Replace, RecordingMode::Mix] {
            let mut track = Track::new(0, "t", SR, 2);
            track.set_clip(Clip::silent("old", SR, 2, len), offset);
            let take = vec![0.5; (take_end - take_start) * 2];
            track
                .arrange_take(&take, 2, take_start, take_end, mode)
                .unwrap();

            let expected = (offset + len).max(take_end) - offset.min(take_start);
            assert_eq!(
                track.length_frames(),
                expected,
                "Splice length for old {}+{} take {}..{}",
                offset,
                len,
                take_start,
                take_end
            );
            assert_eq!(track.offset_frames(), offset.min(take_start));
        }
    }
}

#[test]
fn test_arrange_take_disjoint_leaves_gap_silent() {
    let mut track = Track::new(0, "t", SR, 1);
    track.set_clip(Clip::new("old", SR, 1, vec![1.0; 4]), 0);

    track
        .arrange_take(&[2.0; 2], 1, 6, 8, RecordingMode::Replace)
        .unwrap();

    assert_eq!(
        track.clip().unwrap().samples(),
        &[1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 2.0, 2.0]
    );
}

#[test]
fn test_arrange_take_before_existing_clip_preserves_old_audio() {
    let mut track = Track::new(0, "t", SR, 1);
    track.set_clip(Clip::new("old", SR, 1, vec![1.0, 2.0, 3.0]), 10);

    track
        .arrange_take(&[9.0; 2], 1, 4, 6, RecordingMode::Replace)
        .unwrap();

    assert_eq!(track.offset_frames(), 4);
    assert_eq!(
        track.clip().unwrap().samples(),
        &[9.0, 9.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0]
    );
}

#[test]
fn test_arrange_take_converts_take_channels() {
    let mut track = Track::new(0, "t", SR, 2);
    track.set_clip(Clip::new("old", SR, 2, vec![0.0; 8]), 0);

    track
        .arrange_take(&[0.5, 0.25], 1, 1, 3, RecordingMode::Replace)
        .unwrap();

    assert_eq!(
        track.clip().unwrap().samples(),
        &[0.0, 0.0, 0.5, 0.5, 0.25, 0.25, 0.0, 0.0]
    );
}

#[test]
fn test_arrange_take_rejects_inverted_range() {
    let mut track = stereo_track_with(vec![1.0; 8], 0);
    let before = track.clip().cloned();
    let result = track.arrange_take(&[0.0; 4], 2, 10, 5, RecordingMode::Replace);
    assert_eq!(result, Err(SessionError::InvalidRange { start: 10, end: 5 }));
    assert_eq!(track.clip().cloned(), before, "Rejected take must not alter the clip");
}

#[test]
fn test_delete_range_shrinks_clip() {
    let mut track = Track::new(0, "t", SR, 1);
    track.set_clip(Clip::new("c", SR, 1, mono_ramp(6, 0.0)), 0);
    track.delete_range(1, 3).unwrap();
    assert_eq!(track.clip().unwrap().samples(), &[0.0, 3.0, 4.0, 5.0]);
}

#[test]
fn test_erase_range_keeps_length() {
    let mut track = Track::new(0, "t", SR, 1);
    track.set_clip(Clip::new("c", SR, 1, mono_ramp(6, 1.0)), 0);
    track.erase_range(4, 100).unwrap();
    assert_eq!(
        track.clip().unwrap().samples(),
        &[1.0, 2.0, 3.0, 4.0, 0.0, 0.0]
    );
}

#[test]
fn test_edit_rejects_empty_track_and_range() {
    let mut track = Track::new(0, "t", SR, 1);
    assert!(matches!(
        track.delete_range(0, 4),
        Err(SessionError::EmptyTrack { .. })
    ));

    track.set_clip(Clip::new("c", SR, 1, vec![1.0; 4]), 0);
    assert!(matches!(
        track.erase_range(3, 3),
        Err(SessionError::InvalidRange { .. })
    ));
    assert!(matches!(
        track.delete_range(8, 12),
        Err(SessionError::InvalidRange { .. })
    ));
}

#[test]
fn test_display_shows_status_flags() {
    let mut track = Track::new(2, "Vox", SR, 2);
    track.set_muted(true);
    track.set_armed(true);
    let text = track.to_string();
    assert!(text.contains("Vox"));
    assert!(text.contains("<empty>"));
    assert!(text.ends_with("[M R]"), "got {text}");
}

#[test]
fn test_recording_mode_toggle() {
    assert_eq!(RecordingMode::Replace.toggled(), RecordingMode::Mix);
    assert_eq!(RecordingMode::Mix.toggled(), RecordingMode::Replace);
    assert_eq!(RecordingMode::default(), RecordingMode::Replace);
}
