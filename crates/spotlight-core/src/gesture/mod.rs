//! Gesture recognition: press/release edges in, semantic events out.
//!
//! - [`engine`] – the per-button state machine.
//! - [`events`] – the [`GestureEvent`] vocabulary and the sink trait.
//! - [`profile`] – per-device thresholds, repeatable buttons and combos.
//! - [`scheduler`] – the delayed-task seam and a virtual-clock implementation.

pub mod engine;
pub mod events;
pub mod profile;
pub mod scheduler;

pub use engine::GestureEngine;
pub use events::{GestureEvent, GestureSink};
pub use profile::{GestureProfile, ProfileError};
pub use scheduler::{ManualScheduler, Scheduler, Task, TaskHandle};
