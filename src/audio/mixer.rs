// Mixer - stateless buffer summation helpers
//
// Mixing is raw additive: no limiter and no gain compensation by track
// count. Overlapping loud tracks can exceed [-1, 1].

/// Add `block` into `output` element-wise.
///
/// Returns `false` without touching `output` when the lengths differ.
pub fn mix_into(output: &mut [f32], block: &[f32]) -> bool {
    if output.len() != block.len() {
        return false;
    }
    for (dst, &src) in output.iter_mut().zip(block) {
        *dst += src;
    }
    true
}

/// Multiply every sample by `gain`.
pub fn apply_gain(buffer: &mut [f32], gain: f32) {
    if gain == 1.0 {
        return;
    }
    for sample in buffer.iter_mut() {
        *sample *= gain;
    }
}

/// Apply gain and linear pan to an interleaved stereo buffer.
///
/// Left is scaled by `gain * (1 - pan)`, right by `gain * (1 + pan)`.
pub fn apply_gain_pan_stereo(buffer: &mut [f32], gain: f32, pan: f32) {
    let left = gain * (1.0 - pan);
    let right = gain * (1.0 + pan);
    for frame in buffer.chunks_exact_mut(2) {
        frame[0] *= left;
        frame[1] *= right;
    }
}
