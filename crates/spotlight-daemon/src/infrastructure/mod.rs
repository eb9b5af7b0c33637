//! Infrastructure layer for the daemon.
//!
//! Contains OS-facing adapters: the uinput device, device-node readers, the
//! udev hotplug monitor, tokio-backed timers, the headless overlay surface,
//! and TOML config storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `spotlight_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.

pub mod input_emulation;
#[cfg(target_os = "linux")]
pub mod reader;
pub mod scheduler;
pub mod storage;
pub mod surface;
#[cfg(target_os = "linux")]
pub mod udev_monitor;
