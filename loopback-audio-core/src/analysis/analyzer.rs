use super::beat_phase::BeatPhase;
use super::tempo::{ScoreUpdate, TempoScoreTable};
use super::window::AnalysisWindow;
use crate::models::audio_models::AnalysisSnapshot;
use crate::models::config::AnalyzerConfiguration;
use crate::models::error::CaptureError;
use crate::processing::dsp;
use crate::traits::analysis_source::AnalysisSource;

/// Tempo, beat-phase, and level analysis over the captured stream.
///
/// Each call to [`Analyzer::update`] consumes every whole block the source
/// has queued. Per block the analyzer records one loudness value and one
/// RMS value, then rescores every candidate beat interval. The tempo is the
/// interval with the highest accumulated score; the beat phase is searched
/// again only when that interval changes and counted down otherwise.
///
/// Index-based getters return `0.0` for out-of-range indices.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfiguration,
    sample_rate: u32,
    vu: AnalysisWindow,
    rms: AnalysisWindow,
    tempo: TempoScoreTable,
    phase: BeatPhase,
    interval: Option<usize>,
    bpm: f32,
    generation: Option<u64>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfiguration, sample_rate: u32) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        if sample_rate == 0 {
            return Err(CaptureError::ConfigurationFailed("analyzer sample rate must be positive".into()));
        }
        Ok(Self {
            vu: AnalysisWindow::new(config.window_size),
            rms: AnalysisWindow::new(config.window_size),
            tempo: TempoScoreTable::new(&config),
            phase: BeatPhase::default(),
            interval: None,
            bpm: 0.0,
            generation: None,
            sample_rate,
            config,
        })
    }

    /// Pull every whole block queued by `source` and analyze it.
    ///
    /// When the source reports a new device generation, all accumulated
    /// state is discarded first and the source's rate is adopted. Returns
    /// the number of blocks processed.
    pub fn update(&mut self, source: &dyn AnalysisSource) -> usize {
        let generation = source.device_generation();
        if self.generation != Some(generation) {
            if self.generation.is_some() {
                log::info!("Device generation changed to {}, resetting analysis", generation);
                self.clear();
            }
            self.generation = Some(generation);
            let rate = source.sample_rate();
            if rate > 0 {
                self.sample_rate = rate;
            }
        }

        match source.take_analysis_blocks(self.config.packet_size) {
            Some(channels) => self.process_blocks(&channels),
            None => 0,
        }
    }

    /// Analyze de-interleaved channels holding a whole number of blocks.
    /// A trailing partial block is ignored.
    pub fn process_blocks(&mut self, channels: &[Vec<f32>]) -> usize {
        let packet = self.config.packet_size;
        let blocks = channels.iter().map(|c| c.len() / packet).min().unwrap_or(0);
        if blocks == 0 {
            return 0;
        }

        let channel_count = channels.len() as f32;
        for block in 0..blocks {
            let range = block * packet..(block + 1) * packet;
            let (vu, rms) = channels.iter().fold((0.0f32, 0.0f32), |(vu, rms), channel| {
                let samples = &channel[range.clone()];
                (vu + dsp::vu_amplitude(samples), rms + dsp::rms_level(samples))
            });
            // Half the peak-to-peak swing, averaged over channels.
            self.vu.push(vu / (2.0 * channel_count));
            self.rms.push(rms / channel_count);

            if self.tempo.update(&self.vu) == ScoreUpdate::Silent {
                log::trace!("Analysis window is silent, tempo scores cleared");
            }
        }

        self.refresh_tempo(blocks);
        blocks
    }

    fn refresh_tempo(&mut self, blocks: usize) {
        let interval = self.tempo.best_interval();
        let packet = self.config.packet_size;
        let blocks_per_minute = self.sample_rate as f32 / packet as f32 * 60.0;
        self.bpm = blocks_per_minute / interval as f32;

        if self.interval == Some(interval) {
            self.phase
                .advance((blocks * packet) as f64, (interval * packet) as f64);
        } else {
            log::debug!("Tempo estimate moved to {} blocks ({:.2} BPM)", interval, self.bpm);
            self.phase.locate(&self.vu, interval, packet);
            self.interval = Some(interval);
        }
    }

    /// Discard queued analysis samples and every accumulated statistic.
    pub fn reset(&mut self, source: &dyn AnalysisSource) {
        source.reset_analysis();
        self.clear();
    }

    fn clear(&mut self) {
        self.vu.fill_zero();
        self.rms.fill_zero();
        self.tempo.reset();
        self.phase.reset();
        self.interval = None;
        self.bpm = 0.0;
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Current best beat interval in blocks, once any block was analyzed.
    pub fn beat_interval(&self) -> Option<usize> {
        self.interval
    }

    /// Accumulated score of candidate interval `min_interval + index`.
    pub fn score(&self, index: usize) -> f32 {
        self.tempo.score(index).unwrap_or(0.0) as f32
    }

    /// Normalized score of candidate interval `min_interval + index` for the
    /// most recent block.
    pub fn frame_score(&self, index: usize) -> f32 {
        self.tempo.frame_score(index).unwrap_or(0.0) as f32
    }

    /// Loudness of window block `index`, oldest first.
    pub fn vu(&self, index: usize) -> f32 {
        self.vu.get(index).unwrap_or(0.0)
    }

    /// RMS level of window block `index`, oldest first.
    pub fn rms(&self, index: usize) -> f32 {
        self.rms.get(index).unwrap_or(0.0)
    }

    pub fn milliseconds_to_next_beat(&self) -> f32 {
        self.phase.milliseconds(self.sample_rate)
    }

    pub fn window_size(&self) -> usize {
        self.vu.len()
    }

    /// Number of candidate intervals in the score tables.
    pub fn score_count(&self) -> usize {
        self.tempo.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn config(&self) -> &AnalyzerConfiguration {
        &self.config
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        AnalysisSnapshot {
            bpm: self.bpm,
            milliseconds_to_next_beat: self.milliseconds_to_next_beat(),
            window_size: self.window_size(),
        }
    }
}
