use super::{ensure_whole_frames, Resample, ResamplerSpec};
use crate::models::error::CaptureError;

/// Identity backend used when input and output rates are equal.
///
/// Bytes come out exactly as they went in.
#[derive(Debug)]
pub struct PassthroughResampler {
    spec: ResamplerSpec,
    pending: Vec<u8>,
}

impl PassthroughResampler {
    pub fn new(spec: ResamplerSpec) -> Self {
        Self {
            spec,
            pending: Vec::new(),
        }
    }
}

impl Resample for PassthroughResampler {
    fn write(&mut self, bytes: &[u8]) -> Result<(), CaptureError> {
        ensure_whole_frames(&self.spec, bytes)?;
        self.pending.extend_from_slice(bytes);
        Ok(())
    }

    fn read(&mut self, output: &mut Vec<u8>) -> Result<usize, CaptureError> {
        let produced = self.pending.len();
        output.append(&mut self.pending);
        Ok(produced)
    }

    fn spec(&self) -> &ResamplerSpec {
        &self.spec
    }
}
