use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, RwLock};

use super::capture_loop::{self, CaptureContext};
use super::playback::{PlaybackReader, PlaybackStatus};
use super::reinitialize::ReinitializeRequester;
use crate::models::config::EngineConfiguration;
use crate::models::error::CaptureError;
use crate::models::state::{AtomicCaptureState, CaptureState};
use crate::processing::channel_queue::ChannelQueues;
use crate::traits::analysis_source::AnalysisSource;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::CaptureProvider;

/// State shared between the owner, the capture thread, render readers, and
/// device-change listeners.
///
/// The two queue families have independent locks so the render thread and
/// the analyzer never wait on each other. Neither lock is held across device
/// or resampler calls.
pub(crate) struct EngineShared {
    pub(crate) config: EngineConfiguration,
    state: AtomicCaptureState,
    device_buffer_ms: AtomicU32,
    output_sample_rate: AtomicU32,
    pending_sample_rate: AtomicU32,
    channels: AtomicUsize,
    generation: AtomicU64,
    /// Set by the render path when it starts playback; announced later by
    /// whichever non-render thread transitions or wakes next.
    playing_unannounced: AtomicBool,
    playback: Mutex<ChannelQueues>,
    analysis: Mutex<ChannelQueues>,
    handoff: Mutex<Option<CaptureContext>>,
    delegate: RwLock<Option<Arc<dyn CaptureDelegate>>>,
}

impl EngineShared {
    fn new(config: EngineConfiguration) -> Self {
        Self {
            state: AtomicCaptureState::new(CaptureState::Constructed),
            device_buffer_ms: AtomicU32::new(config.device_buffer_ms),
            output_sample_rate: AtomicU32::new(config.output_sample_rate),
            pending_sample_rate: AtomicU32::new(config.output_sample_rate),
            channels: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
            playing_unannounced: AtomicBool::new(false),
            playback: Mutex::new(ChannelQueues::default()),
            analysis: Mutex::new(ChannelQueues::default()),
            handoff: Mutex::new(None),
            delegate: RwLock::new(None),
            config,
        }
    }

    pub(crate) fn state(&self) -> CaptureState {
        self.state.load()
    }

    pub(crate) fn device_buffer_ms(&self) -> u32 {
        self.device_buffer_ms.load(Ordering::Acquire)
    }

    pub(crate) fn output_sample_rate(&self) -> u32 {
        self.output_sample_rate.load(Ordering::Acquire)
    }

    pub(crate) fn pending_sample_rate(&self) -> u32 {
        self.pending_sample_rate.load(Ordering::Acquire)
    }

    pub(crate) fn transition(&self, from: CaptureState, to: CaptureState) -> bool {
        if !self.state.transition(from, to) {
            return false;
        }
        self.announce(from, to);
        true
    }

    pub(crate) fn transition_from_any(&self, to: CaptureState) -> Option<CaptureState> {
        let from = self.state.transition_from_any(to)?;
        self.announce(from, to);
        Some(from)
    }

    fn announce(&self, from: CaptureState, to: CaptureState) {
        self.flush_deferred_announcements();
        self.notify(from, to);
    }

    fn notify(&self, from: CaptureState, to: CaptureState) {
        log::info!("Capture state {} → {}", from, to);
        if let Some(delegate) = self.delegate.read().as_ref() {
            delegate.on_state_changed(from, to);
        }
    }

    /// Deliver the Preparing → Playing change made on the render thread.
    /// Never called from the render thread.
    pub(crate) fn flush_deferred_announcements(&self) {
        if self.playing_unannounced.swap(false, Ordering::AcqRel) {
            self.notify(CaptureState::Preparing, CaptureState::Playing);
        }
    }

    /// Render-thread side of Preparing → Playing: no logging, no delegate.
    /// Returns whether the engine is now playing, which also holds when a
    /// concurrent reader made the transition first.
    fn start_playing(&self) -> bool {
        if self.state.transition(CaptureState::Preparing, CaptureState::Playing) {
            self.playing_unannounced.store(true, Ordering::Release);
            return true;
        }
        self.state() == CaptureState::Playing
    }

    pub(crate) fn report_error(&self, error: &CaptureError) {
        if let Some(delegate) = self.delegate.read().as_ref() {
            delegate.on_capture_error(error);
        }
    }

    /// Record a reinitialize request. Constant time; safe from any thread.
    pub(crate) fn request_reinitialize(&self, sample_rate: u32) {
        self.pending_sample_rate.store(sample_rate, Ordering::Release);
        if self.transition_from_any(CaptureState::Reinitializing).is_none() {
            log::debug!("Reinitialize request ignored in state {}", self.state());
        }
    }

    /// Reset both queue families for a freshly acquired stream layout.
    pub(crate) fn install_stream(&self, channels: usize, sample_rate: u32) {
        let max_len = self.config.max_buffer_size;
        *self.playback.lock() = ChannelQueues::new(channels, max_len);
        *self.analysis.lock() = ChannelQueues::new(channels, max_len);
        self.channels.store(channels, Ordering::Release);
        self.output_sample_rate.store(sample_rate, Ordering::Release);
        self.pending_sample_rate.store(sample_rate, Ordering::Release);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!(
            "Installed stream generation {}: {} channels at {} Hz",
            generation,
            channels,
            sample_rate
        );
    }

    /// Fan one de-interleaved block out to the playback and analysis queues.
    pub(crate) fn append(&self, blocks: &[Vec<f32>]) {
        let evicted = self.playback.lock().push_all(blocks);
        if evicted > 0 {
            log::trace!("Playback queues dropped {} oldest samples", evicted);
        }
        let evicted = self.analysis.lock().push_all(blocks);
        if evicted > 0 {
            log::trace!("Analysis queues dropped {} oldest samples", evicted);
        }
    }

    pub(crate) fn take_handoff(&self) -> Option<CaptureContext> {
        self.handoff.lock().take()
    }

    pub(crate) fn read_playback(&self, channel: usize, out: &mut [f32]) -> PlaybackStatus {
        match self.state() {
            CaptureState::Preparing => {
                if self.playback.lock().len_of(channel) < self.config.prepare_buffer_size {
                    return PlaybackStatus::Preparing;
                }
                if !self.start_playing() {
                    return PlaybackStatus::Inactive;
                }
            }
            CaptureState::Playing => {}
            _ => return PlaybackStatus::Inactive,
        }

        let mut queues = self.playback.lock();
        let Some(queue) = queues.get_mut(channel) else {
            return PlaybackStatus::Inactive;
        };
        if queue.pop_into(out) {
            return PlaybackStatus::Delivered;
        }
        log::trace!(
            "Underrun on channel {}: wanted {}, queued {}",
            channel,
            out.len(),
            queue.len()
        );
        PlaybackStatus::Underrun
    }
}

/// Loopback capture engine.
///
/// Owns the capture thread, the state machine, and the per-channel playback
/// and analysis queues. Data flow:
/// ```text
/// [CaptureSource] → [Resample] → de-interleave ─┬→ [playback queues] → PlaybackReader::get_buffer
///                                                └→ [analysis queues] → Analyzer::update
/// ```
pub struct CaptureEngine {
    shared: Arc<EngineShared>,
    provider: Arc<dyn CaptureProvider>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CaptureEngine {
    pub fn new(provider: Arc<dyn CaptureProvider>, config: EngineConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            shared: Arc::new(EngineShared::new(config)),
            provider,
            capture_handle: Mutex::new(None),
        })
    }

    pub fn set_delegate(&self, delegate: Arc<dyn CaptureDelegate>) {
        *self.shared.delegate.write() = Some(delegate);
    }

    /// Acquire the device and resampler and start (or retarget) capture.
    ///
    /// Transitions constructed / playing / reinitializing → preparing. On
    /// failure nothing is changed and the error is returned.
    pub fn initialize(&self, device_buffer_ms: u32, output_sample_rate: u32) -> Result<(), CaptureError> {
        let state = self.shared.state();
        if state.is_terminal() {
            return Err(CaptureError::InvalidState("engine has been stopped".into()));
        }
        if device_buffer_ms == 0 || output_sample_rate == 0 {
            return Err(CaptureError::ConfigurationFailed(format!(
                "invalid parameters: {} ms buffer, {} Hz",
                device_buffer_ms, output_sample_rate
            )));
        }

        let context = CaptureContext::acquire(
            self.provider.as_ref(),
            device_buffer_ms,
            output_sample_rate,
            &self.shared.config,
        )?;

        self.shared.device_buffer_ms.store(device_buffer_ms, Ordering::Release);
        self.shared.install_stream(context.channels(), output_sample_rate);

        let mut handle = self.capture_handle.lock();
        if handle.is_some() {
            if let Some(mut replaced) = self.shared.handoff.lock().replace(context) {
                replaced.stop();
            }
        } else {
            let shared = Arc::clone(&self.shared);
            let provider = Arc::clone(&self.provider);
            let spawned = thread::Builder::new()
                .name("loopback-capture".into())
                .spawn(move || capture_loop::run(shared, provider, context))
                .map_err(|e| CaptureError::Unknown(format!("failed to spawn capture thread: {}", e)))?;
            *handle = Some(spawned);
        }
        drop(handle);

        self.shared.transition_from_any(CaptureState::Preparing);
        Ok(())
    }

    pub fn state(&self) -> CaptureState {
        self.shared.state()
    }

    /// Whether a device has been acquired and the engine is not stopped.
    pub fn is_initialized(&self) -> bool {
        matches!(
            self.shared.state(),
            CaptureState::Preparing | CaptureState::Playing | CaptureState::Reinitializing
        )
    }

    /// Rate of the samples delivered to consumers.
    pub fn sample_rate(&self) -> u32 {
        self.shared.output_sample_rate()
    }

    pub fn num_channels(&self) -> usize {
        self.shared.channels.load(Ordering::Acquire)
    }

    /// Incremented on every successful (re-)acquisition of the device.
    pub fn device_generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &EngineConfiguration {
        &self.shared.config
    }

    /// A reader for the real-time render context.
    pub fn playback_reader(&self) -> PlaybackReader {
        PlaybackReader::new(Arc::clone(&self.shared))
    }

    /// Move exactly `out.len()` samples of `channel` into `out`, following
    /// the preparing / playing rules. `out` is left untouched unless the
    /// status is [`PlaybackStatus::Delivered`].
    pub fn read_playback(&self, channel: usize, out: &mut [f32]) -> PlaybackStatus {
        self.shared.read_playback(channel, out)
    }

    /// Trim `channel`'s playback queue to the shortest queue among channels.
    pub fn catch_up(&self, channel: usize) {
        self.shared.playback.lock().catch_up(channel);
    }

    /// Clear all playback queues and return to preparing.
    pub fn reset_buffer(&self) {
        self.shared.playback.lock().clear();
        self.shared.transition(CaptureState::Playing, CaptureState::Preparing);
    }

    pub fn reset_analysis(&self) {
        self.shared.analysis.lock().clear();
    }

    /// Consume whole multiples of `alignment` samples from every analysis
    /// queue. `None` until every channel holds at least one alignment.
    pub fn take_analysis_blocks(&self, alignment: usize) -> Option<Vec<Vec<f32>>> {
        self.shared.analysis.lock().take_aligned(alignment)
    }

    pub fn playback_len(&self, channel: usize) -> usize {
        self.shared.playback.lock().len_of(channel)
    }

    pub fn analysis_len(&self, channel: usize) -> usize {
        self.shared.analysis.lock().len_of(channel)
    }

    /// Ask the capture thread to re-acquire the device at `sample_rate`.
    pub fn request_reinitialize(&self, sample_rate: u32) {
        self.shared.request_reinitialize(sample_rate);
    }

    /// Listener to register with the platform's device-change notifier.
    pub fn device_change_listener(&self) -> Arc<ReinitializeRequester> {
        Arc::new(ReinitializeRequester::new(Arc::clone(&self.shared)))
    }

    /// Stop capture and join the capture thread. Terminal.
    pub fn stop(&self) {
        self.shared.transition_from_any(CaptureState::Stopped);
        if let Some(handle) = self.capture_handle.lock().take() {
            if handle.join().is_err() {
                log::error!("Capture thread panicked");
            }
        }
        if let Some(mut context) = self.shared.take_handoff() {
            context.stop();
        }
    }
}

impl AnalysisSource for CaptureEngine {
    fn take_analysis_blocks(&self, alignment: usize) -> Option<Vec<Vec<f32>>> {
        CaptureEngine::take_analysis_blocks(self, alignment)
    }

    fn reset_analysis(&self) {
        CaptureEngine::reset_analysis(self);
    }

    fn device_generation(&self) -> u64 {
        CaptureEngine::device_generation(self)
    }

    fn sample_rate(&self) -> u32 {
        CaptureEngine::sample_rate(self)
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
