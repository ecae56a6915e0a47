use crate::models::audio_models::{AudioSource, CapturePacket, MixFormat};
use crate::models::error::CaptureError;

/// Opens loopback capture on the current default render endpoint.
///
/// The engine calls `open` once in `initialize` and again every time the
/// capture thread re-acquires the device after a failure or a
/// default-device change. Implemented by:
/// - `WasapiLoopbackProvider` (Windows)
/// - scripted in-memory providers in tests
pub trait CaptureProvider: Send + Sync {
    /// Activate the device with a buffer of roughly `buffer_duration_ms` and
    /// start capturing.
    fn open(&self, buffer_duration_ms: u32) -> Result<Box<dyn CaptureSource>, CaptureError>;

    /// Information about the endpoint this provider captures from.
    fn device_info(&self) -> AudioSource;
}

/// An activated, running loopback stream.
///
/// Owned and polled exclusively by the capture thread. The packet protocol
/// mirrors the OS contract: query the next packet size, borrow the packet,
/// then release exactly the frames that were borrowed.
pub trait CaptureSource: Send {
    fn mix_format(&self) -> MixFormat;

    /// Device buffer length in frames; sets the capture thread's poll period.
    fn buffer_frame_count(&self) -> u32;

    /// Frames in the next packet, `0` when nothing is pending.
    fn next_packet_size(&mut self) -> Result<u32, CaptureError>;

    fn get_buffer(&mut self) -> Result<CapturePacket<'_>, CaptureError>;

    fn release_buffer(&mut self, frames: u32) -> Result<(), CaptureError>;

    /// Stop the stream. Called before the source is dropped.
    fn stop(&mut self) -> Result<(), CaptureError>;
}
