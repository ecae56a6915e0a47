use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Mix format reported by a loopback capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Bytes per interleaved frame.
    pub block_align: u16,
    /// Speaker position mask (`0` when the device does not report one).
    pub channel_mask: u32,
}

impl MixFormat {
    /// Interleaved 32-bit float format with the default speaker mask for
    /// mono or stereo layouts.
    pub fn float32(sample_rate: u32, channels: u16) -> Self {
        let channel_mask = match channels {
            1 => 0x4,
            2 => 0x3,
            _ => 0,
        };
        Self {
            sample_rate,
            channels,
            bits_per_sample: 32,
            block_align: channels * 4,
            channel_mask,
        }
    }

    pub fn bytes_per_second(&self) -> u32 {
        self.sample_rate * self.block_align as u32
    }

    /// Only interleaved 32-bit float frames are consumed by the pipeline.
    pub fn ensure_float32(&self) -> Result<(), CaptureError> {
        if self.sample_rate == 0 || self.channels == 0 {
            return Err(CaptureError::UnsupportedFormat(format!(
                "{} Hz, {} channels",
                self.sample_rate, self.channels
            )));
        }
        if self.bits_per_sample != 32 || self.block_align != self.channels * 4 {
            return Err(CaptureError::UnsupportedFormat(format!(
                "{} bits per sample, block align {}",
                self.bits_per_sample, self.block_align
            )));
        }
        Ok(())
    }
}

/// One packet borrowed from a capture source.
///
/// `data` holds `frames * block_align` bytes of interleaved samples. When
/// `silent` is set the contents must be treated as zeros.
#[derive(Debug)]
pub struct CapturePacket<'a> {
    pub data: &'a [u8],
    pub frames: u32,
    pub silent: bool,
}

/// A render endpoint whose output mix can be captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Point-in-time view of the analyzer, for host-side export.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AnalysisSnapshot {
    pub bpm: f32,
    pub milliseconds_to_next_beat: f32,
    pub window_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float32_stereo_layout() {
        let format = MixFormat::float32(48000, 2);
        assert_eq!(format.block_align, 8);
        assert_eq!(format.channel_mask, 0x3);
        assert_eq!(format.bytes_per_second(), 384_000);
        assert!(format.ensure_float32().is_ok());
    }

    #[test]
    fn rejects_integer_pcm() {
        let format = MixFormat {
            bits_per_sample: 16,
            block_align: 4,
            ..MixFormat::float32(44100, 2)
        };
        assert!(matches!(format.ensure_float32(), Err(CaptureError::UnsupportedFormat(_))));
    }

    #[test]
    fn snapshot_serializes() {
        let snapshot = AnalysisSnapshot {
            bpm: 120.0,
            milliseconds_to_next_beat: 250.0,
            window_size: 2000,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"bpm\":120.0"));
    }
}
