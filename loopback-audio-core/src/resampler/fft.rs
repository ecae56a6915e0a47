use rubato::{FftFixedIn, Resampler as _};

use super::{ensure_whole_frames, Resample, ResamplerSpec};
use crate::models::error::CaptureError;
use crate::processing::dsp;

/// Input frames consumed per conversion step.
const CHUNK_FRAMES: usize = 512;
const SUB_CHUNKS: usize = 2;

/// Synchronous FFT sample-rate converter backed by `rubato`.
///
/// Input is buffered per channel until a full chunk is available, so a write
/// may produce no output until later writes top it up.
pub struct FftResampler {
    spec: ResamplerSpec,
    inner: FftFixedIn<f32>,
    pending: Vec<Vec<f32>>,
    chunk: Vec<Vec<f32>>,
    decoded: Vec<f32>,
    interleaved: Vec<f32>,
}

impl FftResampler {
    pub fn new(spec: ResamplerSpec) -> Result<Self, CaptureError> {
        let channels = spec.channels as usize;
        let inner = FftFixedIn::<f32>::new(
            spec.input_sample_rate as usize,
            spec.output_sample_rate as usize,
            CHUNK_FRAMES,
            SUB_CHUNKS,
            channels,
        )
        .map_err(|e| CaptureError::ResamplerFailed(format!("failed to build FFT resampler: {}", e)))?;

        log::debug!(
            "FFT resampler {} Hz → {} Hz, {} channels",
            spec.input_sample_rate,
            spec.output_sample_rate,
            channels
        );

        Ok(Self {
            spec,
            inner,
            pending: vec![Vec::new(); channels],
            chunk: vec![Vec::with_capacity(CHUNK_FRAMES); channels],
            decoded: Vec::new(),
            interleaved: Vec::new(),
        })
    }

    fn pending_frames(&self) -> usize {
        self.pending.first().map_or(0, Vec::len)
    }
}

impl Resample for FftResampler {
    fn write(&mut self, bytes: &[u8]) -> Result<(), CaptureError> {
        ensure_whole_frames(&self.spec, bytes)?;

        self.decoded.clear();
        dsp::bytes_to_samples(bytes, &mut self.decoded);

        let channels = self.pending.len();
        for frame in self.decoded.chunks_exact(channels) {
            for (channel, &sample) in self.pending.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Ok(())
    }

    fn read(&mut self, output: &mut Vec<u8>) -> Result<usize, CaptureError> {
        let start = output.len();
        loop {
            let needed = self.inner.input_frames_next();
            if self.pending_frames() < needed {
                break;
            }

            for (chunk, pending) in self.chunk.iter_mut().zip(self.pending.iter_mut()) {
                chunk.clear();
                chunk.extend(pending.drain(..needed));
            }

            let converted = self
                .inner
                .process(&self.chunk, None)
                .map_err(|e| CaptureError::ResamplerFailed(format!("conversion failed: {}", e)))?;

            self.interleaved.clear();
            dsp::interleave(&converted, &mut self.interleaved);
            dsp::samples_to_bytes(&self.interleaved, output);
        }
        Ok(output.len() - start)
    }

    fn spec(&self) -> &ResamplerSpec {
        &self.spec
    }
}
