//! # spotlight-core
//!
//! Device-independent heart of the presenter-remote daemon: packet framing,
//! button tables, and the gesture state machine.
//!
//! This crate has no dependencies on OS APIs.  Device nodes, uinput, udev and
//! real timers all live in `spotlight-daemon`.
//!
//! # Architecture overview (for beginners)
//!
//! A wireless presenter reports button activity as a stream of raw bytes (or,
//! for some remotes, as ordinary key events).  Turning that into "go to the
//! next slide" takes a few steps:
//!
//! - **`protocol`** – cut the byte stream into packets and pull the status
//!   code out of each one.
//!
//! - **`device`** – the supported remotes: their USB ids, report shapes, and
//!   the table that turns codes into logical buttons such as `OK` or `LASER`.
//!
//! - **`gesture`** – decide whether a press was a tap, a double tap, a long
//!   press (with auto-repeat), or part of a two-button combo.
//!
//! - **`presentation`** / **`input`** – the vocabulary used to act on a
//!   gesture: overlay commands and virtual keys.

pub mod device;
pub mod gesture;
pub mod input;
pub mod presentation;
pub mod protocol;

pub use device::buttons::{Button, ButtonCode, ButtonMap, Signal};
pub use device::model::DeviceModel;
pub use device::signature::{DeviceDescriptor, DeviceNode, DeviceSignature, NodeKind};
pub use gesture::{GestureEngine, GestureEvent, GestureProfile, GestureSink, ProfileError, Scheduler};
pub use input::{RawInputEvent, VirtualKey};
pub use presentation::{DrawCommand, LogSink, Mode, PresentationSurface};
pub use protocol::framer::{FrameError, PacketFramer};
pub use protocol::packet::{PacketError, PacketShape, StatusCode};
