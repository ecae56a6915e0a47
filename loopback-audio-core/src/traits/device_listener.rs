/// Receiver for "default render device changed" notifications.
///
/// Platform notifiers call this on their own thread. Implementations must
/// only record the request; no device work may happen here.
pub trait DeviceChangeListener: Send + Sync {
    fn on_default_device_changed(&self);
}
