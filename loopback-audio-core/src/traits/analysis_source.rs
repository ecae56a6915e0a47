/// Supplier of aligned analysis blocks, implemented by `CaptureEngine`.
pub trait AnalysisSource: Send + Sync {
    /// Consume whole multiples of `alignment` samples per channel, or `None`
    /// when not even one full alignment is available.
    fn take_analysis_blocks(&self, alignment: usize) -> Option<Vec<Vec<f32>>>;

    /// Discard everything queued for analysis.
    fn reset_analysis(&self);

    /// Changes whenever the underlying device is (re-)acquired.
    fn device_generation(&self) -> u64;

    /// Rate of the supplied samples.
    fn sample_rate(&self) -> u32;
}
