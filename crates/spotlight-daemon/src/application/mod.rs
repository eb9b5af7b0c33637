//! Application layer use cases for the daemon.
//!
//! # What lives here? (for beginners)
//!
//! Everything between "a device node produced something" and "a key was
//! pressed on the virtual device", expressed against traits so it can be
//! driven by tests without a kernel:
//!
//! - **`pipeline`** – turns one device's packets and evdev events into
//!   button signals and feeds the gesture engine.
//!
//! - **`dispatch`** – maps recognised gestures to actions (slide keys,
//!   overlay commands) depending on the device model and overlay mode.
//!
//! - **`emulate_input`** – writes key taps, chords and pointer passthrough
//!   to a [`emulate_input::VirtualInput`] in atomic batches.
//!
//! - **`registry`** – one live instance per device model, each with at most
//!   one reader thread.
//!
//! - **`hotplug`** – classifies add/remove notifications and updates the
//!   registry.
//!
//! No module here opens a file, talks to udev or creates a thread other than
//! the registry's reader threads.

pub mod dispatch;
pub mod emulate_input;
pub mod hotplug;
pub mod pipeline;
pub mod registry;
