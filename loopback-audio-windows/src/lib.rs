//! # loopback-audio-windows
//!
//! Windows WASAPI backend for loopback-audio-core.
//!
//! Provides:
//! - `WasapiLoopbackProvider`: loopback capture of the default render endpoint
//! - `DeviceChangeRegistration`: default-device change notifications forwarded
//!   to a `DeviceChangeListener`
//!
//! ## Platform Requirements
//! - Windows 10 or later
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use loopback_audio_core::LoopbackSession;
//! use loopback_audio_windows::{DeviceChangeRegistration, WasapiLoopbackProvider};
//!
//! let mut session = LoopbackSession::with_defaults(Arc::new(WasapiLoopbackProvider::new()));
//! if session.initialize(32, 48000) {
//!     let _registration = session
//!         .device_change_listener()
//!         .map(|listener| DeviceChangeRegistration::register(listener));
//! }
//! ```

#[cfg(target_os = "windows")]
mod com;
#[cfg(target_os = "windows")]
pub mod notification_client;
#[cfg(target_os = "windows")]
pub mod wasapi_loopback;

#[cfg(target_os = "windows")]
pub use notification_client::DeviceChangeRegistration;
#[cfg(target_os = "windows")]
pub use wasapi_loopback::{WasapiLoopbackProvider, WasapiLoopbackSource};
