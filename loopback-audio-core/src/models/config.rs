use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Configuration for a capture engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfiguration {
    /// Device buffer duration requested at activation, in milliseconds (default: 32).
    pub device_buffer_ms: u32,

    /// Sample rate delivered to consumers, in Hz (default: 48000).
    pub output_sample_rate: u32,

    /// Samples a channel must hold before playback starts (default: 3072).
    pub prepare_buffer_size: usize,

    /// Per-channel queue bound; older samples are dropped beyond it (default: 10240).
    pub max_buffer_size: usize,

    /// Initial size of the render scratch and silence buffers (default: 4096).
    pub scratch_capacity: usize,

    /// Lower bound on the capture thread's poll interval (default: 1).
    pub min_poll_interval_ms: u64,
}

impl EngineConfiguration {
    pub fn new(device_buffer_ms: u32, output_sample_rate: u32) -> Self {
        Self {
            device_buffer_ms,
            output_sample_rate,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid engine configuration: {}", e)))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.device_buffer_ms == 0 {
            return Err("device buffer duration must be positive".into());
        }
        if self.output_sample_rate == 0 {
            return Err("output sample rate must be positive".into());
        }
        if self.max_buffer_size == 0 {
            return Err("max buffer size must be positive".into());
        }
        if self.prepare_buffer_size > self.max_buffer_size {
            return Err(format!(
                "prepare buffer size {} exceeds max buffer size {}",
                self.prepare_buffer_size, self.max_buffer_size
            ));
        }
        if self.scratch_capacity == 0 {
            return Err("scratch capacity must be positive".into());
        }
        Ok(())
    }
}

impl Default for EngineConfiguration {
    fn default() -> Self {
        Self {
            device_buffer_ms: 32,
            output_sample_rate: 48000,
            prepare_buffer_size: 1024 * 3,
            max_buffer_size: 1024 * 10,
            scratch_capacity: 4096,
            min_poll_interval_ms: 1,
        }
    }
}

/// Configuration for the tempo analyzer.
///
/// `silence_threshold` and `inhibition_radius` are tuned values with no
/// derivation behind them; keep them unless you have listening tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfiguration {
    /// Samples per channel in one analysis block (default: 256).
    pub packet_size: usize,

    /// Number of blocks kept in the loudness and RMS windows (default: 2000).
    pub window_size: usize,

    /// Shortest candidate beat interval, in blocks (default: 45).
    pub min_interval: usize,

    /// Longest candidate beat interval, in blocks (default: 180).
    pub max_interval: usize,

    /// Score spread at or below which the stream counts as silent (default: 1.0e-5).
    pub silence_threshold: f64,

    /// Intervals suppressed on each side of the per-block best (default: 2).
    pub inhibition_radius: usize,

    /// Per-block decay applied to the accumulated score (default: 0.999).
    pub score_decay: f64,

    /// Relative distance from the top accumulated score within which the
    /// shortest interval wins (default: 1.0e-3).
    pub tie_tolerance: f64,
}

impl AnalyzerConfiguration {
    pub fn from_json_str(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid analyzer configuration: {}", e)))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.packet_size == 0 {
            return Err("packet size must be positive".into());
        }
        if self.min_interval == 0 {
            return Err("min interval must be positive".into());
        }
        if self.min_interval > self.max_interval {
            return Err(format!(
                "min interval {} exceeds max interval {}",
                self.min_interval, self.max_interval
            ));
        }
        if self.max_interval >= self.window_size {
            return Err(format!(
                "max interval {} must be shorter than the window ({})",
                self.max_interval, self.window_size
            ));
        }
        if !(0.0..=1.0).contains(&self.score_decay) {
            return Err(format!("score decay {} outside [0, 1]", self.score_decay));
        }
        if !(0.0..1.0).contains(&self.tie_tolerance) {
            return Err(format!("tie tolerance {} outside [0, 1)", self.tie_tolerance));
        }
        Ok(())
    }

    /// Number of candidate intervals in the score tables.
    pub fn interval_count(&self) -> usize {
        self.max_interval - self.min_interval + 1
    }
}

impl Default for AnalyzerConfiguration {
    fn default() -> Self {
        Self {
            packet_size: 256,
            window_size: 2000,
            min_interval: 45,
            max_interval: 180,
            silence_threshold: 1.0e-5,
            inhibition_radius: 2,
            score_decay: 0.999,
            tie_tolerance: 1.0e-3,
        }
    }
}
