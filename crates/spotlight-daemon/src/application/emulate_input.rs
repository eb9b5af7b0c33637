//! InputEmitter: synthesises key taps, chords, and pointer passthrough.
//!
//! This use case sits at the application layer and delegates the actual
//! writes to a [`VirtualInput`] trait object.  The uinput-backed
//! implementation lives in the infrastructure layer.
//!
//! # Why every gesture is one write
//!
//! A key tap is `press, SYN, release, SYN`.  If another thread's events
//! landed between the press and the release, the desktop would see a key
//! held across someone else's input.  The emitter therefore builds the whole
//! sequence first and hands it to the device in a single `emit` call.
//!
//! # Broken handles
//!
//! If the device write fails (uinput node gone, permissions changed), the
//! handle is marked broken and a warning is logged once.  Further emissions
//! are silent no-ops until [`InputEmitter::replace`] installs a fresh handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use spotlight_core::input::{RawInputEvent, KEY_PRESSED, KEY_RELEASED};
use spotlight_core::VirtualKey;
use thiserror::Error;
use tracing::{trace, warn};

/// Error type for input emulation operations.
#[derive(Debug, Error)]
pub enum EmulationError {
    #[error("virtual device error: {0}")]
    Device(#[from] std::io::Error),
    #[error("event type {event_type} code {code} is not forwardable")]
    NotForwardable { event_type: u16, code: u16 },
}

/// Kernel-facing sink for raw input events.
///
/// The implementation must write `events` to the device as one batch and
/// terminate the batch with a sync report.
pub trait VirtualInput: Send + Sync {
    fn emit(&self, events: &[RawInputEvent]) -> Result<(), EmulationError>;
}

/// Thread-safe front end to a swappable [`VirtualInput`].
pub struct InputEmitter {
    device: RwLock<Arc<dyn VirtualInput>>,
    broken: AtomicBool,
}

impl InputEmitter {
    pub fn new(device: Arc<dyn VirtualInput>) -> Self {
        Self {
            device: RwLock::new(device),
            broken: AtomicBool::new(false),
        }
    }

    /// Presses and releases `key` in one batch.
    pub fn press_release(&self, key: VirtualKey) -> Result<(), EmulationError> {
        let code = key.code();
        self.write(&[
            RawInputEvent::key(code, KEY_PRESSED),
            RawInputEvent::sync(),
            RawInputEvent::key(code, KEY_RELEASED),
        ])
    }

    /// Presses `keys` in order, then releases them in reverse order.
    pub fn chord(&self, keys: &[VirtualKey]) -> Result<(), EmulationError> {
        let mut events = Vec::with_capacity(keys.len() * 2 + 1);
        events.extend(keys.iter().map(|k| RawInputEvent::key(k.code(), KEY_PRESSED)));
        events.push(RawInputEvent::sync());
        events.extend(
            keys.iter()
                .rev()
                .map(|k| RawInputEvent::key(k.code(), KEY_RELEASED)),
        );
        self.write(&events)
    }

    /// Re-emits pointer events read from a grabbed node as one frame.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::NotForwardable`] if any event is something
    /// other than relative motion or a left/right click; nothing is written
    /// in that case.
    pub fn forward(&self, events: &[RawInputEvent]) -> Result<(), EmulationError> {
        if let Some(bad) = events.iter().find(|e| !e.is_pointer_passthrough()) {
            return Err(EmulationError::NotForwardable {
                event_type: bad.event_type,
                code: bad.code,
            });
        }
        if events.is_empty() {
            return Ok(());
        }
        self.write(events)
    }

    /// Installs a new device handle and clears the broken flag.  The previous
    /// handle is released once no emission still holds it.
    pub fn replace(&self, device: Arc<dyn VirtualInput>) {
        let mut slot = self
            .device
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = device;
        self.broken.store(false, Ordering::SeqCst);
    }

    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::SeqCst)
    }

    fn write(&self, events: &[RawInputEvent]) -> Result<(), EmulationError> {
        if self.is_broken() {
            trace!(count = events.len(), "virtual device broken; dropping events");
            return Ok(());
        }
        let device = Arc::clone(
            &self
                .device
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        match device.emit(events) {
            Ok(()) => Ok(()),
            Err(e) => {
                if !self.broken.swap(true, Ordering::SeqCst) {
                    warn!("virtual input device failed, further input suppressed: {e}");
                }
                Err(e)
            }
        }
    }
}
