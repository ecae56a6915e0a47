//! Pure-math helpers shared by the capture loop and the analyzer.
//!
//! All functions work on plain slices with no platform dependencies.

/// Size of one 32-bit float sample in bytes.
pub const SAMPLE_BYTES: usize = 4;

/// Decode little-endian 32-bit float PCM into `out` (appending).
///
/// A trailing partial sample is ignored.
pub fn bytes_to_samples(bytes: &[u8], out: &mut Vec<f32>) {
    out.reserve(bytes.len() / SAMPLE_BYTES);
    out.extend(
        bytes
            .chunks_exact(SAMPLE_BYTES)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
    );
}

/// Encode samples as little-endian 32-bit float PCM into `out` (appending).
pub fn samples_to_bytes(samples: &[f32], out: &mut Vec<u8>) {
    out.reserve(samples.len() * SAMPLE_BYTES);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

/// Split interleaved frames `[c0, c1, c0, c1, ...]` into one vector per channel.
///
/// Each vector in `out` is cleared first. Channels beyond `out.len()` are
/// dropped; a trailing partial frame is ignored.
pub fn deinterleave(interleaved: &[f32], channels: usize, out: &mut [Vec<f32>]) {
    for channel in out.iter_mut() {
        channel.clear();
    }
    if channels == 0 {
        return;
    }
    for frame in interleaved.chunks_exact(channels) {
        for (channel, &sample) in out.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
}

/// Interleave equal-length channels into frames (used by resampler backends).
pub fn interleave(channels: &[Vec<f32>], out: &mut Vec<f32>) {
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    out.reserve(frames * channels.len());
    for i in 0..frames {
        for channel in channels {
            out.push(channel[i]);
        }
    }
}

/// Peak-to-peak amplitude of a block (`max - min`), 0 for an empty block.
pub fn vu_amplitude(block: &[f32]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }
    let (min, max) = block
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    max - min
}

/// Root-mean-square level of a block, 0 for an empty block.
pub fn rms_level(block: &[f32]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = block.iter().map(|s| s * s).sum();
    (sum_sq / block.len() as f32).sqrt()
}
