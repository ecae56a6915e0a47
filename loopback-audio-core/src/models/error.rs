use thiserror::Error;

/// Errors that can occur while acquiring or driving the loopback capture.
///
/// Only acquisition failures reach the caller of `initialize`; everything
/// raised on the capture thread is contained there and turned into a
/// `Reinitializing` transition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available")]
    DeviceNotAvailable,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("resampler failed: {0}")]
    ResamplerFailed(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}
