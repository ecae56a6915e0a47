//! Default-device change notifications.
//!
//! Registers an `IMMNotificationClient` with the MMDevice enumerator and
//! forwards "default console render device changed" to a
//! [`DeviceChangeListener`]. The callback runs on a system thread and only
//! records the request; the capture thread does the re-acquisition.

use std::sync::Arc;

use windows::core::{implement, Result as WinResult, PCWSTR};
use windows::Win32::Foundation::PROPERTYKEY;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use loopback_audio_core::models::error::CaptureError;
use loopback_audio_core::traits::device_listener::DeviceChangeListener;

use crate::com;

#[implement(IMMNotificationClient)]
struct DefaultDeviceNotifier {
    listener: Arc<dyn DeviceChangeListener>,
}

impl IMMNotificationClient_Impl for DefaultDeviceNotifier_Impl {
    fn OnDeviceStateChanged(&self, _device_id: &PCWSTR, _new_state: DEVICE_STATE) -> WinResult<()> {
        Ok(())
    }

    fn OnDeviceAdded(&self, _device_id: &PCWSTR) -> WinResult<()> {
        Ok(())
    }

    fn OnDeviceRemoved(&self, _device_id: &PCWSTR) -> WinResult<()> {
        Ok(())
    }

    fn OnDefaultDeviceChanged(&self, flow: EDataFlow, role: ERole, _device_id: &PCWSTR) -> WinResult<()> {
        if flow == eRender && role == eConsole {
            self.listener.on_default_device_changed();
        }
        Ok(())
    }

    fn OnPropertyValueChanged(&self, _device_id: &PCWSTR, _key: &PROPERTYKEY) -> WinResult<()> {
        Ok(())
    }
}

/// Keeps a notification client registered until dropped.
pub struct DeviceChangeRegistration {
    enumerator: IMMDeviceEnumerator,
    client: IMMNotificationClient,
}

// SAFETY: both interfaces live in the MTA; unregistering from another MTA
// thread is allowed.
unsafe impl Send for DeviceChangeRegistration {}

impl DeviceChangeRegistration {
    /// Start forwarding default render device changes to `listener`.
    pub fn register(listener: Arc<dyn DeviceChangeListener>) -> Result<Self, CaptureError> {
        com::ensure_initialized()?;

        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(|_| CaptureError::DeviceNotAvailable)?;

            let client: IMMNotificationClient = DefaultDeviceNotifier { listener }.into();
            enumerator.RegisterEndpointNotificationCallback(&client).map_err(|e| {
                CaptureError::ConfigurationFailed(format!("RegisterEndpointNotificationCallback failed: {}", e))
            })?;

            log::debug!("Registered default device change notifications");
            Ok(Self { enumerator, client })
        }
    }
}

impl Drop for DeviceChangeRegistration {
    fn drop(&mut self) {
        if let Err(e) = unsafe { self.enumerator.UnregisterEndpointNotificationCallback(&self.client) } {
            log::warn!("Failed to unregister device notifications: {}", e);
        }
    }
}
