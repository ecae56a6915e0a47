#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use loopback_audio_core::processing::dsp;
use loopback_audio_core::{
    AudioSource, CaptureDelegate, CaptureError, CapturePacket, CaptureProvider, CaptureSource, CaptureState,
    EngineConfiguration, MixFormat,
};
use parking_lot::Mutex;

pub const RATE: u32 = 48000;
pub const CHANNELS: u16 = 2;
pub const BUFFER_FRAMES: u32 = 480;

/// Device state shared by the provider, every source it opened, and the test.
#[derive(Default)]
pub struct DeviceScript {
    /// Interleaved samples the device will hand out.
    pub pending: VecDeque<f32>,
    pub fail_next_poll: bool,
    pub failing_opens: usize,
    pub opens: usize,
    pub stops: usize,
}

/// In-memory loopback device. Frames pushed with [`ScriptedProvider::push`]
/// are delivered in packets of at most [`BUFFER_FRAMES`].
pub struct ScriptedProvider {
    pub format: MixFormat,
    pub script: Arc<Mutex<DeviceScript>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Self::with_format(MixFormat::float32(RATE, CHANNELS))
    }

    pub fn with_format(format: MixFormat) -> Arc<Self> {
        Arc::new(Self {
            format,
            script: Arc::new(Mutex::new(DeviceScript::default())),
        })
    }

    pub fn push(&self, interleaved: &[f32]) {
        self.script.lock().pending.extend(interleaved.iter().copied());
    }

    pub fn opens(&self) -> usize {
        self.script.lock().opens
    }

    pub fn stops(&self) -> usize {
        self.script.lock().stops
    }
}

impl CaptureProvider for ScriptedProvider {
    fn open(&self, _buffer_duration_ms: u32) -> Result<Box<dyn CaptureSource>, CaptureError> {
        let mut script = self.script.lock();
        if script.failing_opens > 0 {
            script.failing_opens -= 1;
            return Err(CaptureError::DeviceNotAvailable);
        }
        script.opens += 1;
        Ok(Box::new(ScriptedSource {
            format: self.format,
            script: Arc::clone(&self.script),
            packet: Vec::new(),
        }))
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: "scripted".into(),
            name: "Scripted Speakers".into(),
            is_default: true,
        }
    }
}

struct ScriptedSource {
    format: MixFormat,
    script: Arc<Mutex<DeviceScript>>,
    packet: Vec<u8>,
}

impl CaptureSource for ScriptedSource {
    fn mix_format(&self) -> MixFormat {
        self.format
    }

    fn buffer_frame_count(&self) -> u32 {
        BUFFER_FRAMES
    }

    fn next_packet_size(&mut self) -> Result<u32, CaptureError> {
        let mut script = self.script.lock();
        if script.fail_next_poll {
            script.fail_next_poll = false;
            return Err(CaptureError::Unknown("scripted device failure".into()));
        }
        let frames = script.pending.len() / self.format.channels as usize;
        Ok((frames as u32).min(BUFFER_FRAMES))
    }

    fn get_buffer(&mut self) -> Result<CapturePacket<'_>, CaptureError> {
        let channels = self.format.channels as usize;
        let samples: Vec<f32> = {
            let mut script = self.script.lock();
            let frames = (script.pending.len() / channels).min(BUFFER_FRAMES as usize);
            script.pending.drain(..frames * channels).collect()
        };
        self.packet.clear();
        dsp::samples_to_bytes(&samples, &mut self.packet);
        Ok(CapturePacket {
            data: &self.packet,
            frames: (samples.len() / channels) as u32,
            silent: false,
        })
    }

    fn release_buffer(&mut self, _frames: u32) -> Result<(), CaptureError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.script.lock().stops += 1;
        Ok(())
    }
}

/// Records every delegate callback.
#[derive(Default)]
pub struct RecordingDelegate {
    pub transitions: Mutex<Vec<(CaptureState, CaptureState)>>,
    /// Name of the thread each transition was reported on.
    pub threads: Mutex<Vec<Option<String>>>,
    pub errors: Mutex<Vec<CaptureError>>,
}

impl CaptureDelegate for RecordingDelegate {
    fn on_state_changed(&self, from: CaptureState, to: CaptureState) {
        self.transitions.lock().push((from, to));
        self.threads.lock().push(thread::current().name().map(str::to_owned));
    }

    fn on_capture_error(&self, error: &CaptureError) {
        self.errors.lock().push(error.clone());
    }
}

pub fn test_config() -> EngineConfiguration {
    EngineConfiguration {
        min_poll_interval_ms: 1,
        ..EngineConfiguration::new(10, RATE)
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Interleaved stereo ramp: left counts up from `start`, right mirrors it.
pub fn stereo_ramp(start: usize, frames: usize) -> Vec<f32> {
    (start..start + frames)
        .flat_map(|i| {
            let v = (i % 10_000) as f32 * 1.0e-4;
            [v, -v]
        })
        .collect()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
