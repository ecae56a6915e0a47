use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::engine::{CaptureEngine, PlaybackReader, ReinitializeRequester};
use crate::models::audio_models::AnalysisSnapshot;
use crate::models::config::{AnalyzerConfiguration, EngineConfiguration};
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::CaptureProvider;

/// Host-facing facade over one capture engine and its analyzer.
///
/// The host owns exactly one session and drives it from two contexts: the
/// render callback calls [`LoopbackSession::get_buffer`], the UI or game
/// loop calls [`LoopbackSession::update`] and the analysis getters. Nothing
/// here fails once constructed: before [`LoopbackSession::initialize`]
/// succeeds, rates and channel counts read `-1`, analysis values read `0.0`,
/// and buffers are silent.
pub struct LoopbackSession {
    provider: Arc<dyn CaptureProvider>,
    engine_config: EngineConfiguration,
    analyzer_config: AnalyzerConfiguration,
    engine: Option<CaptureEngine>,
    reader: Option<PlaybackReader>,
    analyzer: Option<Analyzer>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    // Parameters of the last initialize call, replayed by `update`.
    parameters: Option<(u32, u32)>,
    silence: Vec<f32>,
}

impl LoopbackSession {
    pub fn new(
        provider: Arc<dyn CaptureProvider>,
        engine_config: EngineConfiguration,
        analyzer_config: AnalyzerConfiguration,
    ) -> Result<Self, CaptureError> {
        engine_config.validate().map_err(CaptureError::ConfigurationFailed)?;
        analyzer_config.validate().map_err(CaptureError::ConfigurationFailed)?;
        let silence = vec![0.0; engine_config.scratch_capacity];
        Ok(Self {
            provider,
            engine_config,
            analyzer_config,
            engine: None,
            reader: None,
            analyzer: None,
            delegate: None,
            parameters: None,
            silence,
        })
    }

    pub fn with_defaults(provider: Arc<dyn CaptureProvider>) -> Self {
        let engine_config = EngineConfiguration::default();
        let silence = vec![0.0; engine_config.scratch_capacity];
        Self {
            provider,
            engine_config,
            analyzer_config: AnalyzerConfiguration::default(),
            engine: None,
            reader: None,
            analyzer: None,
            delegate: None,
            parameters: None,
            silence,
        }
    }

    /// Delegate for state changes and contained capture errors. Applies to
    /// the current engine and any engine created later.
    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        if let Some(engine) = &self.engine {
            engine.set_delegate(Arc::clone(&delegate));
        }
        self.delegate = Some(delegate);
    }

    /// Acquire the loopback device and start capture.
    ///
    /// Returns `false` when the device or resampler cannot be set up; the
    /// failure is logged and the previous state is kept. The parameters are
    /// remembered either way so [`LoopbackSession::update`] can retry.
    pub fn initialize(&mut self, device_buffer_ms: u32, output_sample_rate: u32) -> bool {
        self.parameters = Some((device_buffer_ms, output_sample_rate));
        match self.try_initialize(device_buffer_ms, output_sample_rate) {
            Ok(()) => true,
            Err(e) => {
                log::error!(
                    "Loopback initialize failed ({} ms, {} Hz): {}",
                    device_buffer_ms,
                    output_sample_rate,
                    e
                );
                false
            }
        }
    }

    fn try_initialize(&mut self, device_buffer_ms: u32, output_sample_rate: u32) -> Result<(), CaptureError> {
        if self.engine.is_none() {
            let engine = CaptureEngine::new(Arc::clone(&self.provider), self.engine_config.clone())?;
            if let Some(delegate) = &self.delegate {
                engine.set_delegate(Arc::clone(delegate));
            }
            self.engine = Some(engine);
        }
        let Some(engine) = self.engine.as_ref() else {
            return Err(CaptureError::InvalidState("engine missing after creation".into()));
        };

        engine.initialize(device_buffer_ms, output_sample_rate)?;

        if self.reader.is_none() {
            self.reader = Some(engine.playback_reader());
        }
        if self.analyzer.is_none() {
            self.analyzer = Some(Analyzer::new(self.analyzer_config.clone(), output_sample_rate)?);
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.as_ref().is_some_and(CaptureEngine::is_initialized)
    }

    pub fn state(&self) -> Option<CaptureState> {
        self.engine.as_ref().map(CaptureEngine::state)
    }

    /// `length` samples of `channel` for the render callback, or silence.
    /// The slice stays valid until the next call.
    pub fn get_buffer(&mut self, channel: usize, length: usize) -> &[f32] {
        match self.reader.as_mut() {
            Some(reader) => reader.get_buffer(channel, length),
            None => {
                if self.silence.len() < length {
                    self.silence.resize(length, 0.0);
                }
                &self.silence[..length]
            }
        }
    }

    pub fn catch_up(&self, channel: usize) {
        if let Some(engine) = &self.engine {
            engine.catch_up(channel);
        }
    }

    pub fn reset_buffer(&self) {
        if let Some(engine) = &self.engine {
            engine.reset_buffer();
        }
    }

    /// Run one analysis pass, first re-initializing the engine if it never
    /// came up. Returns the number of blocks analyzed.
    pub fn update(&mut self) -> usize {
        if !self.is_initialized() {
            if let Some((device_buffer_ms, output_sample_rate)) = self.parameters {
                log::debug!("Engine not initialized, retrying before analysis");
                if !self.initialize(device_buffer_ms, output_sample_rate) {
                    return 0;
                }
            }
        }
        match (self.analyzer.as_mut(), self.engine.as_ref()) {
            (Some(analyzer), Some(engine)) => analyzer.update(engine),
            _ => 0,
        }
    }

    /// Drop queued analysis samples and all tempo statistics.
    pub fn reset_analysis(&mut self) {
        if let (Some(analyzer), Some(engine)) = (self.analyzer.as_mut(), self.engine.as_ref()) {
            analyzer.reset(engine);
        }
    }

    pub fn sample_rate(&self) -> i64 {
        match &self.engine {
            Some(engine) if engine.is_initialized() => engine.sample_rate() as i64,
            _ => -1,
        }
    }

    pub fn num_channels(&self) -> i64 {
        match &self.engine {
            Some(engine) if engine.is_initialized() => engine.num_channels() as i64,
            _ => -1,
        }
    }

    pub fn bpm(&self) -> f32 {
        self.analyzer.as_ref().map_or(0.0, Analyzer::bpm)
    }

    pub fn score(&self, index: usize) -> f32 {
        self.analyzer.as_ref().map_or(0.0, |a| a.score(index))
    }

    pub fn frame_score(&self, index: usize) -> f32 {
        self.analyzer.as_ref().map_or(0.0, |a| a.frame_score(index))
    }

    pub fn vu(&self, index: usize) -> f32 {
        self.analyzer.as_ref().map_or(0.0, |a| a.vu(index))
    }

    pub fn rms(&self, index: usize) -> f32 {
        self.analyzer.as_ref().map_or(0.0, |a| a.rms(index))
    }

    pub fn milliseconds_to_next_beat(&self) -> f32 {
        self.analyzer.as_ref().map_or(0.0, Analyzer::milliseconds_to_next_beat)
    }

    /// Length of the loudness and RMS windows. Constant for the session.
    pub fn window_size(&self) -> usize {
        self.analyzer_config.window_size
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.analyzer.as_ref().map_or_else(
            || AnalysisSnapshot {
                window_size: self.window_size(),
                ..AnalysisSnapshot::default()
            },
            Analyzer::snapshot,
        )
    }

    /// Listener to hand to the platform's default-device notifier. `None`
    /// until an engine exists.
    pub fn device_change_listener(&self) -> Option<Arc<ReinitializeRequester>> {
        self.engine.as_ref().map(CaptureEngine::device_change_listener)
    }

    /// Stop capture and release the engine, reader and analyzer.
    pub fn finalize(&mut self) {
        self.reader = None;
        self.analyzer = None;
        self.parameters = None;
        if let Some(engine) = self.engine.take() {
            engine.stop();
            log::info!("Loopback session finalized");
        }
    }
}

impl Drop for LoopbackSession {
    fn drop(&mut self) {
        self.finalize();
    }
}
