//! Sample-rate conversion between the device mix rate and the consumer rate.
//!
//! The capture loop only sees the [`Resample`] push/drain contract: write one
//! packet of interleaved 32-bit float bytes, then read until the backend
//! reports it needs more input. No channel mixing happens here; input and
//! output layouts are identical.

mod fft;
mod passthrough;

pub use fft::FftResampler;
pub use passthrough::PassthroughResampler;

use crate::models::audio_models::MixFormat;
use crate::models::error::CaptureError;

/// Construction parameters for a resampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResamplerSpec {
    pub block_align: u16,
    pub channel_mask: u32,
    pub input_bytes_per_second: u32,
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    pub channels: u16,
}

impl ResamplerSpec {
    pub fn from_mix_format(format: &MixFormat, output_sample_rate: u32) -> Self {
        Self {
            block_align: format.block_align,
            channel_mask: format.channel_mask,
            input_bytes_per_second: format.bytes_per_second(),
            input_sample_rate: format.sample_rate,
            output_sample_rate,
            channels: format.channels,
        }
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.channels == 0 || self.input_sample_rate == 0 || self.output_sample_rate == 0 {
            return Err(CaptureError::ResamplerFailed(format!(
                "{} channels, {} Hz → {} Hz",
                self.channels, self.input_sample_rate, self.output_sample_rate
            )));
        }
        if self.block_align as usize != self.channels as usize * crate::processing::dsp::SAMPLE_BYTES {
            return Err(CaptureError::UnsupportedFormat(format!(
                "block align {} for {} float channels",
                self.block_align, self.channels
            )));
        }
        if self.input_bytes_per_second != self.input_sample_rate * self.block_align as u32 {
            return Err(CaptureError::ResamplerFailed(format!(
                "byte rate {} does not match {} Hz × {} bytes",
                self.input_bytes_per_second, self.input_sample_rate, self.block_align
            )));
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        self.input_sample_rate == self.output_sample_rate
    }
}

/// Stateful push/drain sample-rate converter.
pub trait Resample: Send {
    /// Feed one packet of interleaved PCM. The backend may hold it until
    /// enough input has accumulated.
    fn write(&mut self, bytes: &[u8]) -> Result<(), CaptureError>;

    /// Append every currently available output fragment to `output` and
    /// return the number of bytes appended. Running out of input is not an
    /// error; it simply ends the drain.
    fn read(&mut self, output: &mut Vec<u8>) -> Result<usize, CaptureError>;

    fn spec(&self) -> &ResamplerSpec;
}

/// Build the backend for `spec`: passthrough when the rates match, the
/// FFT converter otherwise.
pub fn create_resampler(spec: ResamplerSpec) -> Result<Box<dyn Resample>, CaptureError> {
    spec.validate()?;
    if spec.is_identity() {
        return Ok(Box::new(PassthroughResampler::new(spec)));
    }
    Ok(Box::new(FftResampler::new(spec)?))
}

fn ensure_whole_frames(spec: &ResamplerSpec, bytes: &[u8]) -> Result<(), CaptureError> {
    if bytes.len() % spec.block_align as usize != 0 {
        return Err(CaptureError::ResamplerFailed(format!(
            "packet of {} bytes is not a whole number of {}-byte frames",
            bytes.len(),
            spec.block_align
        )));
    }
    Ok(())
}
