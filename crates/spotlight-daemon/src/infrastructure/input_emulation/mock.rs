//! Mock virtual input device for unit testing.
//!
//! The real uinput device needs `/dev/uinput` access and would press keys on
//! the test machine.  `MockVirtualInput` records every batch it receives in a
//! `Mutex<Vec<...>>` so tests can assert exactly what was emitted and in what
//! order.
//!
//! # `should_fail` flag
//!
//! Build with [`MockVirtualInput::failing`] to make every `emit` return an
//! error, for exercising the broken-handle path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use spotlight_core::input::{RawInputEvent, EV_KEY};

use crate::application::emulate_input::{EmulationError, VirtualInput};

/// Records all emitted batches without touching the kernel.
#[derive(Default)]
pub struct MockVirtualInput {
    /// One entry per `emit` call.
    pub batches: Mutex<Vec<Vec<RawInputEvent>>>,
    /// When `true`, every `emit` fails.
    pub should_fail: bool,
    attempts: AtomicUsize,
}

impl MockVirtualInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Number of `emit` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// All key `(code, value)` transitions across batches, in order.
    pub fn key_transitions(&self) -> Vec<(u16, i32)> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .filter(|e| e.event_type == EV_KEY)
            .map(|e| (e.code, e.value))
            .collect()
    }

    /// Codes of keys pressed, in order.
    pub fn pressed_codes(&self) -> Vec<u16> {
        self.key_transitions()
            .into_iter()
            .filter(|(_, v)| *v == 1)
            .map(|(c, _)| c)
            .collect()
    }
}

impl VirtualInput for MockVirtualInput {
    fn emit(&self, events: &[RawInputEvent]) -> Result<(), EmulationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(EmulationError::Device(std::io::Error::from_raw_os_error(19)));
        }
        self.batches.lock().unwrap().push(events.to_vec());
        Ok(())
    }
}
