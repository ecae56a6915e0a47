use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::capture_engine::EngineShared;
use crate::models::config::EngineConfiguration;
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::processing::dsp;
use crate::resampler::{create_resampler, Resample, ResamplerSpec};
use crate::traits::capture_provider::{CaptureProvider, CaptureSource};

/// Everything the capture thread needs to pull one stream: the running
/// source, its resampler, and reusable scratch buffers.
pub(crate) struct CaptureContext {
    source: Box<dyn CaptureSource>,
    resampler: Box<dyn Resample>,
    channels: usize,
    block_align: usize,
    poll_interval: Duration,
    silence: Vec<u8>,
    resampled: Vec<u8>,
    samples: Vec<f32>,
    deinterleaved: Vec<Vec<f32>>,
}

impl CaptureContext {
    /// Open the device and build a matching resampler.
    ///
    /// The source is stopped again if anything after `open` fails.
    pub(crate) fn acquire(
        provider: &dyn CaptureProvider,
        device_buffer_ms: u32,
        output_sample_rate: u32,
        config: &EngineConfiguration,
    ) -> Result<Self, CaptureError> {
        let mut source = provider.open(device_buffer_ms)?;
        let format = source.mix_format();

        let resampler = format
            .ensure_float32()
            .and_then(|()| create_resampler(ResamplerSpec::from_mix_format(&format, output_sample_rate)));
        let resampler = match resampler {
            Ok(resampler) => resampler,
            Err(e) => {
                if let Err(stop_err) = source.stop() {
                    log::warn!("Failed to stop source after setup error: {}", stop_err);
                }
                return Err(e);
            }
        };

        let poll_interval = poll_interval(
            source.buffer_frame_count(),
            format.sample_rate,
            config.min_poll_interval_ms,
        );
        let channels = format.channels as usize;

        log::info!(
            "Loopback capture acquired on {}: {} Hz, {} channels, {} frame buffer, polling every {:?}, output {} Hz",
            provider.device_info().name,
            format.sample_rate,
            channels,
            source.buffer_frame_count(),
            poll_interval,
            output_sample_rate
        );

        Ok(Self {
            source,
            resampler,
            channels,
            block_align: format.block_align as usize,
            poll_interval,
            silence: Vec::new(),
            resampled: Vec::new(),
            samples: Vec::new(),
            deinterleaved: vec![Vec::new(); channels],
        })
    }

    pub(crate) fn channels(&self) -> usize {
        self.channels
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Drain every packet the device currently holds.
    pub(crate) fn capture_available(&mut self, shared: &EngineShared) -> Result<(), CaptureError> {
        while self.source.next_packet_size()? > 0 {
            self.capture_packet(shared)?;
        }
        Ok(())
    }

    fn capture_packet(&mut self, shared: &EngineShared) -> Result<(), CaptureError> {
        let packet = self.source.get_buffer()?;
        let frames = packet.frames;
        let byte_len = frames as usize * self.block_align;

        let written = if packet.silent {
            if self.silence.len() < byte_len {
                self.silence.resize(byte_len, 0);
            }
            self.resampler.write(&self.silence[..byte_len])
        } else {
            match packet.data.get(..byte_len) {
                Some(data) => self.resampler.write(data),
                None => Err(CaptureError::Unknown(format!(
                    "packet holds {} bytes, expected {}",
                    packet.data.len(),
                    byte_len
                ))),
            }
        };

        self.source.release_buffer(frames)?;
        written?;

        self.resampled.clear();
        if self.resampler.read(&mut self.resampled)? == 0 {
            return Ok(());
        }

        self.samples.clear();
        dsp::bytes_to_samples(&self.resampled, &mut self.samples);
        dsp::deinterleave(&self.samples, self.channels, &mut self.deinterleaved);
        shared.append(&self.deinterleaved);
        Ok(())
    }

    pub(crate) fn stop(&mut self) {
        if let Err(e) = self.source.stop() {
            log::warn!("Failed to stop loopback source: {}", e);
        }
    }
}

/// Half the device buffer period, so a full buffer is drained twice per fill.
pub(crate) fn poll_interval(buffer_frames: u32, sample_rate: u32, min_ms: u64) -> Duration {
    let min = Duration::from_millis(min_ms);
    if sample_rate == 0 {
        return min;
    }
    let half_period = Duration::from_secs_f64(buffer_frames as f64 / sample_rate as f64 / 2.0);
    half_period.max(min)
}

/// Capture thread body. Runs until the state becomes `Stopped`.
///
/// Failures while polling never end the thread: they are logged, reported to
/// the delegate, and turned into a reinitialize request that the next
/// iteration services by re-acquiring the device.
pub(crate) fn run(shared: Arc<EngineShared>, provider: Arc<dyn CaptureProvider>, context: CaptureContext) {
    // Used while no device is held, e.g. between failed re-acquisitions.
    let fallback_interval =
        Duration::from_millis((shared.device_buffer_ms() as u64 / 2).max(shared.config.min_poll_interval_ms));
    let mut interval = context.poll_interval();
    let mut context = Some(context);

    while !shared.state().is_terminal() {
        thread::sleep(interval);
        shared.flush_deferred_announcements();

        if let Some(next) = shared.take_handoff() {
            if let Some(mut old) = context.replace(next) {
                old.stop();
            }
            interval = context.as_ref().map_or(fallback_interval, CaptureContext::poll_interval);
        }

        match shared.state() {
            CaptureState::Stopped => break,
            CaptureState::Constructed => {}
            CaptureState::Reinitializing => {
                if let Some(mut old) = context.take() {
                    old.stop();
                }
                context = reacquire(&shared, provider.as_ref());
                interval = context.as_ref().map_or(fallback_interval, CaptureContext::poll_interval);
            }
            CaptureState::Preparing | CaptureState::Playing => {
                let result = match context.as_mut() {
                    Some(active) => active.capture_available(&shared),
                    None => Err(CaptureError::DeviceNotAvailable),
                };
                if let Err(e) = result {
                    log::warn!("Capture failed, scheduling reinitialize: {}", e);
                    shared.report_error(&e);
                    shared.request_reinitialize(shared.output_sample_rate());
                }
            }
        }
    }

    if let Some(mut active) = context.take() {
        active.stop();
    }
    log::debug!("Capture thread exiting");
}

fn reacquire(shared: &EngineShared, provider: &dyn CaptureProvider) -> Option<CaptureContext> {
    let sample_rate = shared.pending_sample_rate();
    match CaptureContext::acquire(provider, shared.device_buffer_ms(), sample_rate, &shared.config) {
        Ok(context) => {
            shared.install_stream(context.channels(), sample_rate);
            if !shared.transition(CaptureState::Reinitializing, CaptureState::Preparing) {
                log::debug!("Reinitialized while state moved to {}", shared.state());
            }
            Some(context)
        }
        Err(e) => {
            log::warn!("Re-acquiring loopback device failed, retrying next poll: {}", e);
            shared.report_error(&e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polls_at_half_the_buffer_period() {
        // 1536 frames at 48 kHz = 32 ms.
        assert_eq!(poll_interval(1536, 48000, 1), Duration::from_millis(16));
    }

    #[test]
    fn poll_interval_has_a_floor() {
        assert_eq!(poll_interval(16, 48000, 5), Duration::from_millis(5));
        assert_eq!(poll_interval(1024, 0, 3), Duration::from_millis(3));
    }
}
