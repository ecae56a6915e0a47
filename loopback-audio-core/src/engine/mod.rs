mod capture_engine;
mod capture_loop;
mod playback;
mod reinitialize;

pub use capture_engine::CaptureEngine;
pub use playback::{PlaybackReader, PlaybackStatus};
pub use reinitialize::ReinitializeRequester;
