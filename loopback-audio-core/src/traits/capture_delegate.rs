use crate::models::error::CaptureError;
use crate::models::state::CaptureState;

/// Event delegate for capture engine notifications.
///
/// Methods may be called from the capture thread, the owner's thread, or the
/// device-change notifier thread, never from the render thread. Playback
/// starting on the render thread is reported by the capture thread on its
/// next wake. Keep implementations short and non-blocking.
pub trait CaptureDelegate: Send + Sync {
    /// Called after every successful state transition.
    fn on_state_changed(&self, from: CaptureState, to: CaptureState);

    /// Called when the capture thread contains a transient failure.
    fn on_capture_error(&self, error: &CaptureError);
}
