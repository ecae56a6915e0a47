//! Per-thread COM apartment membership.
//!
//! The engine opens devices from the owner thread and re-opens them from its
//! capture thread, so every thread that touches WASAPI joins the MTA once and
//! leaves it when the thread exits.

use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_MULTITHREADED};

use loopback_audio_core::models::error::CaptureError;

struct ComApartment {
    /// `CoInitializeEx` succeeded and must be balanced on thread exit.
    owned: bool,
    usable: bool,
}

impl ComApartment {
    fn enter() -> Self {
        let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
        if hr.is_ok() {
            return Self { owned: true, usable: true };
        }
        // Already in an STA; COM works, just not in our apartment.
        let usable = hr == RPC_E_CHANGED_MODE;
        if !usable {
            log::error!("CoInitializeEx failed: {:?}", hr);
        }
        Self { owned: false, usable }
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.owned {
            unsafe { CoUninitialize() };
        }
    }
}

thread_local! {
    static APARTMENT: ComApartment = ComApartment::enter();
}

/// Make sure COM is initialized on the calling thread.
pub(crate) fn ensure_initialized() -> Result<(), CaptureError> {
    APARTMENT.with(|apartment| {
        if apartment.usable {
            Ok(())
        } else {
            Err(CaptureError::Unknown("COM initialization failed".into()))
        }
    })
}
