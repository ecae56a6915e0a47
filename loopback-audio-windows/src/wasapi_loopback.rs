//! WASAPI loopback capture on the default render endpoint.
//!
//! Captures the mix going to the default console render device using
//! `AUDCLNT_STREAMFLAGS_LOOPBACK`. No special permissions are needed.
//!
//! ## Notes
//! - Shared mode only; the stream runs at the device mix rate and the core
//!   resamples it.
//! - DRM-protected audio is delivered as silence.
//! - The stream is polled, not event driven: loopback clients do not get
//!   buffer events on older Windows builds.

use windows::core::GUID;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use loopback_audio_core::models::audio_models::{AudioSource, CapturePacket, MixFormat};
use loopback_audio_core::models::error::CaptureError;
use loopback_audio_core::traits::capture_provider::{CaptureProvider, CaptureSource};

use crate::com;

const WAVE_FORMAT_IEEE_FLOAT_TAG: u16 = 0x0003;
const WAVE_FORMAT_EXTENSIBLE_TAG: u16 = 0xFFFE;
const SUBTYPE_IEEE_FLOAT: GUID = GUID::from_u128(0x00000003_0000_0010_8000_00aa00389b71);

/// Opens loopback streams on whatever the default render device is at the
/// time of the call, so re-opening after a device change follows the new
/// default.
#[derive(Debug, Default, Clone)]
pub struct WasapiLoopbackProvider;

impl WasapiLoopbackProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureProvider for WasapiLoopbackProvider {
    fn open(&self, buffer_duration_ms: u32) -> Result<Box<dyn CaptureSource>, CaptureError> {
        Ok(Box::new(WasapiLoopbackSource::activate(buffer_duration_ms)?))
    }

    fn device_info(&self) -> AudioSource {
        default_render_device().unwrap_or_else(|e| {
            log::debug!("Default render device info unavailable: {}", e);
            AudioSource {
                id: "default-render".into(),
                name: "System Audio (Loopback)".into(),
                is_default: true,
            }
        })
    }
}

/// A started loopback stream.
pub struct WasapiLoopbackSource {
    audio_client: IAudioClient,
    capture_client: IAudioCaptureClient,
    format: MixFormat,
    buffer_frames: u32,
}

// SAFETY: the interfaces are created in the MTA and the source is used by
// one thread at a time (the engine's capture thread after hand-off).
unsafe impl Send for WasapiLoopbackSource {}

impl WasapiLoopbackSource {
    /// Activate, initialize and start loopback capture.
    ///
    /// Sequence:
    /// 1. Join the MTA on this thread
    /// 2. Get the default render endpoint
    /// 3. Activate `IAudioClient` and read the mix format
    /// 4. Initialize shared-mode loopback with the requested buffer length
    /// 5. Get `IAudioCaptureClient` and start
    pub fn activate(buffer_duration_ms: u32) -> Result<Self, CaptureError> {
        com::ensure_initialized()?;

        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(|_| CaptureError::DeviceNotAvailable)?;

            let device = enumerator
                .GetDefaultAudioEndpoint(eRender, eConsole)
                .map_err(|_| CaptureError::DeviceNotAvailable)?;

            let audio_client: IAudioClient = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| CaptureError::ConfigurationFailed(format!("Activate failed: {}", e)))?;

            let mix_format_ptr = audio_client
                .GetMixFormat()
                .map_err(|e| CaptureError::ConfigurationFailed(format!("GetMixFormat failed: {}", e)))?;

            let format = read_mix_format(mix_format_ptr);

            // 100 ns units.
            let buffer_duration = buffer_duration_ms as i64 * 10_000;
            let initialized = format.and_then(|format| {
                audio_client
                    .Initialize(
                        AUDCLNT_SHAREMODE_SHARED,
                        AUDCLNT_STREAMFLAGS_LOOPBACK | AUDCLNT_STREAMFLAGS_NOPERSIST,
                        buffer_duration,
                        0,
                        mix_format_ptr,
                        None,
                    )
                    .map(|()| format)
                    .map_err(|e| {
                        CaptureError::ConfigurationFailed(format!("IAudioClient::Initialize (loopback) failed: {}", e))
                    })
            });
            CoTaskMemFree(Some(mix_format_ptr as *const _ as *const _));
            let format = initialized?;

            let buffer_frames = audio_client
                .GetBufferSize()
                .map_err(|e| CaptureError::ConfigurationFailed(format!("GetBufferSize failed: {}", e)))?;

            let capture_client: IAudioCaptureClient = audio_client
                .GetService()
                .map_err(|e| CaptureError::ConfigurationFailed(format!("GetService failed: {}", e)))?;

            audio_client
                .Start()
                .map_err(|e| CaptureError::Unknown(format!("IAudioClient::Start failed: {}", e)))?;

            log::debug!(
                "WASAPI loopback started: {} Hz, {} channels, {} frames",
                format.sample_rate,
                format.channels,
                buffer_frames
            );

            Ok(Self {
                audio_client,
                capture_client,
                format,
                buffer_frames,
            })
        }
    }
}

impl CaptureSource for WasapiLoopbackSource {
    fn mix_format(&self) -> MixFormat {
        self.format
    }

    fn buffer_frame_count(&self) -> u32 {
        self.buffer_frames
    }

    fn next_packet_size(&mut self) -> Result<u32, CaptureError> {
        unsafe { self.capture_client.GetNextPacketSize() }
            .map_err(|e| CaptureError::Unknown(format!("GetNextPacketSize failed: {}", e)))
    }

    fn get_buffer(&mut self) -> Result<CapturePacket<'_>, CaptureError> {
        let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
        let mut frames: u32 = 0;
        let mut flags: u32 = 0;

        unsafe {
            self.capture_client
                .GetBuffer(&mut buffer_ptr, &mut frames, &mut flags, None, None)
                .map_err(|e| CaptureError::Unknown(format!("GetBuffer failed: {}", e)))?;
        }

        let byte_len = frames as usize * self.format.block_align as usize;
        let silent = flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 || buffer_ptr.is_null();
        let data = if silent || byte_len == 0 {
            &[][..]
        } else {
            // SAFETY: WASAPI guarantees `frames * nBlockAlign` readable bytes
            // until `ReleaseBuffer`, which needs `&mut self` and so cannot
            // run while this borrow is alive.
            unsafe { std::slice::from_raw_parts(buffer_ptr as *const u8, byte_len) }
        };

        Ok(CapturePacket { data, frames, silent })
    }

    fn release_buffer(&mut self, frames: u32) -> Result<(), CaptureError> {
        unsafe { self.capture_client.ReleaseBuffer(frames) }
            .map_err(|e| CaptureError::Unknown(format!("ReleaseBuffer failed: {}", e)))
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        unsafe { self.audio_client.Stop() }
            .map_err(|e| CaptureError::Unknown(format!("IAudioClient::Stop failed: {}", e)))
    }
}

/// Translate the device mix format, rejecting anything but IEEE float.
unsafe fn read_mix_format(ptr: *const WAVEFORMATEX) -> Result<MixFormat, CaptureError> {
    let wave = &*ptr;
    let tag = wave.wFormatTag;
    let mut channel_mask = 0;

    let is_float = match tag {
        WAVE_FORMAT_IEEE_FLOAT_TAG => true,
        WAVE_FORMAT_EXTENSIBLE_TAG => {
            let extensible = &*(ptr as *const WAVEFORMATEXTENSIBLE);
            channel_mask = extensible.dwChannelMask;
            let sub_format = extensible.SubFormat;
            sub_format == SUBTYPE_IEEE_FLOAT
        }
        _ => false,
    };
    if !is_float {
        return Err(CaptureError::UnsupportedFormat(format!("format tag {:#06x} is not IEEE float", tag)));
    }

    Ok(MixFormat {
        sample_rate: wave.nSamplesPerSec,
        channels: wave.nChannels,
        bits_per_sample: wave.wBitsPerSample,
        block_align: wave.nBlockAlign,
        channel_mask,
    })
}

/// Id of the current default render endpoint.
fn default_render_device() -> Result<AudioSource, CaptureError> {
    com::ensure_initialized()?;

    unsafe {
        let enumerator: IMMDeviceEnumerator =
            CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(|_| CaptureError::DeviceNotAvailable)?;
        let device = enumerator
            .GetDefaultAudioEndpoint(eRender, eConsole)
            .map_err(|_| CaptureError::DeviceNotAvailable)?;

        let id = device
            .GetId()
            .map_err(|e| CaptureError::Unknown(format!("GetId failed: {}", e)))?;
        let id_string = id.to_string().unwrap_or_default();
        CoTaskMemFree(Some(id.0 as *const _));

        Ok(AudioSource {
            id: id_string,
            name: "System Audio (Loopback)".into(),
            is_default: true,
        })
    }
}
