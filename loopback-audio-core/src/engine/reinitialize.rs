use std::sync::Arc;

use super::capture_engine::EngineShared;
use crate::traits::device_listener::DeviceChangeListener;

/// Turns a "default device changed" notification into a reinitialize request.
///
/// Only stores the request (state and pending sample rate); the capture
/// thread re-acquires the device on its next wake.
pub struct ReinitializeRequester {
    shared: Arc<EngineShared>,
}

impl ReinitializeRequester {
    pub(crate) fn new(shared: Arc<EngineShared>) -> Self {
        Self { shared }
    }
}

impl DeviceChangeListener for ReinitializeRequester {
    fn on_default_device_changed(&self) {
        log::info!("Default render device changed");
        self.shared.request_reinitialize(self.shared.output_sample_rate());
    }
}
