//! # loopback-audio-core
//!
//! Platform-agnostic loopback capture and tempo analysis.
//!
//! Captures the system output mix through a [`CaptureProvider`], resamples
//! it to a caller-chosen rate, and fans it out to a real-time playback path
//! and a tempo/beat analyzer. Platform backends (Windows WASAPI) implement
//! `CaptureProvider` and plug into the generic [`CaptureEngine`].
//!
//! ## Architecture
//!
//! ```text
//! loopback-audio-core (this crate)
//! ├── traits/       ← CaptureProvider, CaptureSource, CaptureDelegate, DeviceChangeListener, AnalysisSource
//! ├── models/       ← CaptureError, CaptureState, EngineConfiguration, AnalyzerConfiguration, MixFormat
//! ├── processing/   ← RingBuffer, ChannelQueues, sample conversion and level helpers
//! ├── resampler/    ← Resample adapter (passthrough or rubato FFT)
//! ├── engine/       ← CaptureEngine, capture thread, PlaybackReader
//! ├── analysis/     ← Analyzer (tempo, beat phase, VU/RMS windows)
//! └── session/      ← LoopbackSession (host facade)
//! ```

pub mod analysis;
pub mod engine;
pub mod models;
pub mod processing;
pub mod resampler;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use analysis::analyzer::Analyzer;
pub use engine::{CaptureEngine, PlaybackReader, PlaybackStatus, ReinitializeRequester};
pub use models::audio_models::{AnalysisSnapshot, AudioSource, CapturePacket, MixFormat};
pub use models::config::{AnalyzerConfiguration, EngineConfiguration};
pub use models::error::CaptureError;
pub use models::state::CaptureState;
pub use processing::channel_queue::{ChannelQueue, ChannelQueues};
pub use processing::ring_buffer::RingBuffer;
pub use resampler::{create_resampler, Resample, ResamplerSpec};
pub use session::loopback::LoopbackSession;
pub use traits::analysis_source::AnalysisSource;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_provider::{CaptureProvider, CaptureSource};
pub use traits::device_listener::DeviceChangeListener;
