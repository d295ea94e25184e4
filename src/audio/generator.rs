//! Click sources for the metronome
//!
//! Both generators are pure and deterministic: the noise burst uses a fixed
//! seed so repeated calls produce identical output.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::clip::Clip;

/// Seed for the noise click
const NOISE_SEED: u64 = 42;

fn frames_for(duration_ms: f32, sample_rate: u32) -> usize {
    (sample_rate as f32 * duration_ms.max(0.0) / 1000.0) as usize
}

/// Sine burst of `duration_ms`, duplicated across `channels`.
///
/// # Arguments
/// * `freq_hz` - Tone frequency
/// * `duration_ms` - Burst length in milliseconds
/// * `amplitude` - Peak amplitude
/// * `sample_rate` - Sample rate in Hz
/// * `channels` - Interleaved channel count of the result
pub fn sine_burst(
    freq_hz: f32,
    duration_ms: f32,
    amplitude: f32,
    sample_rate: u32,
    channels: usize,
) -> Clip {
    let frames = frames_for(duration_ms, sample_rate);
    let channels = channels.max(1);
    let step = 2.0 * std::f32::consts::PI * freq_hz / sample_rate.max(1) as f32;

    let mut samples = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        let value = amplitude * (step * i as f32).sin();
        samples.extend(std::iter::repeat(value).take(channels));
    }

    Clip::new(format!("sine_{}hz", freq_hz), sample_rate, channels, samples)
}

/// White noise burst of `duration_ms` in `[-amplitude, amplitude]`.
///
/// # Examples
/// ```
/// use multitrack_engine::audio::generator::noise_burst;
///
/// let click = noise_burst(20.0, 1.0, 48000, 1);
/// assert_eq!(click.length_frames(), 960);
/// ```
pub fn noise_burst(duration_ms: f32, amplitude: f32, sample_rate: u32, channels: usize) -> Clip {
    let frames = frames_for(duration_ms, sample_rate);
    let channels = channels.max(1);
    let mut rng = StdRng::seed_from_u64(NOISE_SEED);
    let amplitude = amplitude.abs();

    let mut samples = Vec::with_capacity(frames * channels);
    for _ in 0..frames {
        let value = if amplitude > 0.0 {
            rng.gen_range(-amplitude..=amplitude)
        } else {
            0.0
        };
        samples.extend(std::iter::repeat(value).take(channels));
    }

    Clip::new("noise_click", sample_rate, channels, samples)
}
