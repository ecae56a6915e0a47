use std::sync::Arc;

use super::capture_engine::EngineShared;

/// Outcome of a playback read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// The requested samples were moved out of the queue.
    Delivered,
    /// Still filling up to the prepare threshold.
    Preparing,
    /// Playing, but fewer samples are queued than were requested.
    Underrun,
    /// Not capturing (constructed, reinitializing, stopped) or unknown channel.
    Inactive,
}

/// Real-time side of the engine.
///
/// Owns the scratch and silence buffers that `get_buffer` hands out, so the
/// returned slice stays valid until the next call on any channel. Neither
/// buffer is reallocated unless a caller asks for more samples than ever
/// before.
pub struct PlaybackReader {
    shared: Arc<EngineShared>,
    scratch: Vec<f32>,
    silence: Vec<f32>,
}

impl PlaybackReader {
    pub(crate) fn new(shared: Arc<EngineShared>) -> Self {
        let capacity = shared.config.scratch_capacity;
        Self {
            shared,
            scratch: vec![0.0; capacity],
            silence: vec![0.0; capacity],
        }
    }

    /// `length` samples of `channel`, or silence if none can be delivered.
    pub fn get_buffer(&mut self, channel: usize, length: usize) -> &[f32] {
        self.get_buffer_with_status(channel, length).0
    }

    /// Like [`get_buffer`](Self::get_buffer), also reporting why silence was returned.
    pub fn get_buffer_with_status(&mut self, channel: usize, length: usize) -> (&[f32], PlaybackStatus) {
        if self.scratch.len() < length {
            self.scratch.resize(length, 0.0);
            self.silence.resize(length, 0.0);
        }

        let status = self.shared.read_playback(channel, &mut self.scratch[..length]);
        match status {
            PlaybackStatus::Delivered => (&self.scratch[..length], status),
            _ => (&self.silence[..length], status),
        }
    }
}
