//! Clip - interleaved sample container and buffer primitives
//!
//! A `Clip` holds channel-interleaved `f32` samples together with their
//! sample rate and channel count. Clips are never edited in place: every
//! edit builds a new sample vector and replaces the clip wholesale, so the
//! audio callback always reads a consistent buffer.
//!
//! The three buffer primitives used by every higher-level edit live here:
//! - `convert_channels` / `convert_channels_into`: mono/stereo conversion
//! - `concat`: join two buffers
//! - `merge`: sample-wise sum, shorter operand zero-padded

use std::fmt;

/// Interleaved audio buffer with its format.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    name: String,
    sample_rate: u32,
    channels: usize,
    samples: Vec<f32>,
}

impl Clip {
    /// Create a clip from interleaved samples.
    ///
    /// A trailing partial frame (when `samples.len()` is not a multiple of
    /// `channels`) is dropped so the frame invariant always holds.
    pub fn new(name: impl Into<String>, sample_rate: u32, channels: usize, samples: Vec<f32>) -> Self {
        let channels = channels.max(1);
        let mut samples = samples;
        let remainder = samples.len() % channels;
        if remainder != 0 {
            log::warn!(
                "[Clip] Dropping {} trailing samples that do not form a full {}-channel frame",
                remainder,
                channels
            );
            samples.truncate(samples.len() - remainder);
        }

        Self {
            name: name.into(),
            sample_rate,
            channels,
            samples,
        }
    }

    /// Zero-filled clip of `frames` frames.
    pub fn silent(name: impl Into<String>, sample_rate: u32, channels: usize, frames: usize) -> Self {
        let channels = channels.max(1);
        Self::new(name, sample_rate, channels, vec![0.0; frames * channels])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Length in frames (`samples.len() / channels`).
    pub fn length_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.length_frames() as f64 / self.sample_rate as f64
    }

    /// Samples for frames `[start, end)`, clamped to the clip.
    pub fn frames(&self, start: usize, end: usize) -> &[f32] {
        let len = self.length_frames();
        let start = start.min(len);
        let end = end.clamp(start, len);
        &self.samples[start * self.channels..end * self.channels]
    }
}

impl fmt::Display for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' ({} frames, {} ch, {} Hz)",
            self.name,
            self.length_frames(),
            self.channels,
            self.sample_rate
        )
    }
}

/// Convert `frame_count` frames of interleaved audio between channel layouts.
///
/// The result always holds exactly `frame_count * dst_channels` samples:
/// missing input frames become silence and surplus input is ignored.
///
/// - equal layouts: copy, zero-padded
/// - 1 -> 2: each mono sample is duplicated into both channels
/// - 2 -> 1: arithmetic mean of the pair
/// - anything else: warning and a zero-filled buffer
///
/// # Examples
/// ```
/// use multitrack_engine::audio::clip::convert_channels;
///
/// let stereo = convert_channels(&[0.5, -0.25], 1, 2, 2);
/// assert_eq!(stereo, vec![0.5, 0.5, -0.25, -0.25]);
/// ```
pub fn convert_channels(
    samples: &[f32],
    src_channels: usize,
    dst_channels: usize,
    frame_count: usize,
) -> Vec<f32> {
    let mut out = vec![0.0; frame_count * dst_channels];
    convert_channels_into(samples, src_channels, dst_channels, &mut out);
    out
}

/// Allocation-free form of [`convert_channels`] used on the audio thread.
///
/// Writes `out.len() / dst_channels` frames into `out`. Returns `false` when
/// the conversion is unsupported, in which case `out` is zero-filled.
pub fn convert_channels_into(
    samples: &[f32],
    src_channels: usize,
    dst_channels: usize,
    out: &mut [f32],
) -> bool {
    out.fill(0.0);
    if src_channels == 0 || dst_channels == 0 {
        log::warn!(
            "[Clip] Unsupported channel conversion: {} -> {}",
            src_channels,
            dst_channels
        );
        return false;
    }

    match (src_channels, dst_channels) {
        (src, dst) if src == dst => {
            let n = samples.len().min(out.len());
            out[..n].copy_from_slice(&samples[..n]);
        }
        (1, 2) => {
            for (frame, &sample) in out.chunks_exact_mut(2).zip(samples) {
                frame[0] = sample;
                frame[1] = sample;
            }
        }
        (2, 1) => {
            for (dst, pair) in out.iter_mut().zip(samples.chunks_exact(2)) {
                *dst = (pair[0] + pair[1]) * 0.5;
            }
        }
        (src, dst) => {
            log::warn!("[Clip] Unsupported channel conversion: {} -> {}", src, dst);
            return false;
        }
    }
    true
}

/// Join two interleaved buffers.
pub fn concat(a: &[f32], b: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

/// Sample-wise sum, the shorter operand treated as zero-padded.
///
/// No clamping is applied.
pub fn merge(a: &[f32], b: &[f32]) -> Vec<f32> {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut out = long.to_vec();
    for (dst, &src) in out.iter_mut().zip(short) {
        *dst += src;
    }
    out
}
