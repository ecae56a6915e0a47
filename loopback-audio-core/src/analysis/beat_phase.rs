use super::window::AnalysisWindow;

/// Countdown to the next predicted beat, in samples.
#[derive(Debug, Clone, Default)]
pub struct BeatPhase {
    samples_to_next_beat: f64,
}

impl BeatPhase {
    /// Search the window for the offset whose comb of period `interval`
    /// blocks collects the most loudness, and count from the newest block to
    /// the next beat on that comb.
    pub fn locate(&mut self, window: &AnalysisWindow, interval: usize, packet_size: usize) {
        if interval == 0 || window.is_empty() {
            self.samples_to_next_beat = 0.0;
            return;
        }
        let mut best_offset = 0;
        let mut best = 0.0f64;
        for offset in 0..interval.min(window.len()) {
            let total: f64 = (offset..window.len())
                .step_by(interval)
                .map(|index| window[index] as f64)
                .sum();
            if total > best {
                best = total;
                best_offset = offset;
            }
        }
        let blocks = (best_offset as i64 - window.len() as i64).rem_euclid(interval as i64);
        self.samples_to_next_beat = (blocks as usize * packet_size) as f64;
    }

    /// Count down by `elapsed_samples`, wrapping into the next beat period.
    pub fn advance(&mut self, elapsed_samples: f64, period_samples: f64) {
        if period_samples <= 0.0 {
            self.samples_to_next_beat = 0.0;
            return;
        }
        self.samples_to_next_beat -= elapsed_samples;
        if self.samples_to_next_beat < 0.0 {
            self.samples_to_next_beat = self.samples_to_next_beat.rem_euclid(period_samples);
        }
    }

    pub fn samples_to_next_beat(&self) -> f64 {
        self.samples_to_next_beat
    }

    pub fn milliseconds(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        (self.samples_to_next_beat * 1000.0 / sample_rate as f64) as f32
    }

    pub fn reset(&mut self) {
        self.samples_to_next_beat = 0.0;
    }
}
