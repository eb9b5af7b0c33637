//! Virtual input device backends.
//!
//! - [`linux`] – uinput device created through evdev.
//! - [`mock`] – in-memory recorder for tests.

#[cfg(target_os = "linux")]
pub mod linux;
pub mod mock;
