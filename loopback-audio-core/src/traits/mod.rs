pub mod analysis_source;
pub mod capture_delegate;
pub mod capture_provider;
pub mod device_listener;
