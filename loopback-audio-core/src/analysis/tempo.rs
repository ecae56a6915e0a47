use super::window::AnalysisWindow;
use crate::models::config::AnalyzerConfiguration;

/// Outcome of scoring one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreUpdate {
    /// Scores were normalized and accumulated.
    Accumulated,
    /// The window was flat; both score tables were zeroed.
    Silent,
}

/// Per-interval comb-filter scores over the loudness window.
///
/// Index `i` stands for a beat interval of `min_interval + i` blocks. The
/// frame table holds the normalized score of the most recent block; the
/// accumulated table is the decayed running sum the tempo is read from.
#[derive(Debug, Clone)]
pub struct TempoScoreTable {
    min_interval: usize,
    silence_threshold: f64,
    inhibition_radius: usize,
    decay: f64,
    tie_tolerance: f64,
    frame: Vec<f64>,
    accumulated: Vec<f64>,
}

impl TempoScoreTable {
    pub fn new(config: &AnalyzerConfiguration) -> Self {
        let count = config.interval_count();
        Self {
            min_interval: config.min_interval,
            silence_threshold: config.silence_threshold,
            inhibition_radius: config.inhibition_radius,
            decay: config.score_decay,
            tie_tolerance: config.tie_tolerance,
            frame: vec![0.0; count],
            accumulated: vec![0.0; count],
        }
    }

    pub fn len(&self) -> usize {
        self.accumulated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }

    /// Score every candidate interval against the window's newest block.
    ///
    /// Normalization maps the best-matching interval to 0 and the worst to 1.
    /// Between beats the true interval samples only quiet blocks and scores
    /// 1, so it accumulates fastest. The neighbours of the block's best
    /// interval are pinned to 1 as well: a near miss that catches one loud
    /// block at the window edge must not pull the true interval down.
    pub fn update(&mut self, window: &AnalysisWindow) -> ScoreUpdate {
        let mut best_index = 0;
        let mut max_score = f64::NEG_INFINITY;
        let mut min_score = f64::INFINITY;

        for (index, slot) in self.frame.iter_mut().enumerate() {
            let score = comb_score(window, self.min_interval + index);
            *slot = score;
            if score > max_score {
                max_score = score;
                best_index = index;
            }
            min_score = min_score.min(score);
        }

        let spread = max_score - min_score;
        if self.frame.is_empty() || spread <= self.silence_threshold {
            self.reset();
            return ScoreUpdate::Silent;
        }

        for score in self.frame.iter_mut() {
            *score = (max_score - *score) / spread;
        }
        for offset in 1..=self.inhibition_radius {
            if let Some(below) = best_index.checked_sub(offset) {
                self.frame[below] = 1.0;
            }
            if let Some(above) = self.frame.get_mut(best_index + offset) {
                *above = 1.0;
            }
        }

        for (total, score) in self.accumulated.iter_mut().zip(&self.frame) {
            *total = *total * self.decay + score;
        }
        ScoreUpdate::Accumulated
    }

    /// Shortest interval, in blocks, whose accumulated score is within
    /// `tie_tolerance` (relative) of the highest one.
    ///
    /// Whole multiples of the beat interval sample the same blocks and
    /// accumulate to within rounding of it, so the plain argmax is decided by
    /// warm-up noise.
    pub fn best_interval(&self) -> usize {
        let best = self.accumulated.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let floor = best - self.tie_tolerance * best.abs();
        let index = self
            .accumulated
            .iter()
            .position(|&score| score >= floor)
            .unwrap_or(0);
        self.min_interval + index
    }

    pub fn score(&self, index: usize) -> Option<f64> {
        self.accumulated.get(index).copied()
    }

    pub fn frame_score(&self, index: usize) -> Option<f64> {
        self.frame.get(index).copied()
    }

    pub fn reset(&mut self) {
        self.frame.iter_mut().for_each(|s| *s = 0.0);
        self.accumulated.iter_mut().for_each(|s| *s = 0.0);
    }
}

/// Mean of the window sampled backwards from the newest block every
/// `interval` blocks.
fn comb_score(window: &AnalysisWindow, interval: usize) -> f64 {
    let Some(newest) = window.len().checked_sub(1) else {
        return 0.0;
    };
    if interval == 0 {
        return 0.0;
    }
    let (sum, taps) = (0..=newest / interval)
        .map(|tap| window[newest - tap * interval] as f64)
        .fold((0.0, 0usize), |(sum, taps), v| (sum + v, taps + 1));
    sum / taps as f64
}
