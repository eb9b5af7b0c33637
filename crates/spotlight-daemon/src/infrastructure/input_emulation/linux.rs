//! Linux uinput virtual device.
//!
//! Creates one keyboard+pointer device that advertises exactly the keys in
//! [`VirtualKey::ALL`] plus relative motion and wheel axes.  The capability
//! set is fixed at creation; the kernel rejects codes outside it.
//!
//! Requires write access to `/dev/uinput` (the packaged udev rule grants it
//! to the logged-in user).

use std::sync::Mutex;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key, RelativeAxisType};
use spotlight_core::input::RawInputEvent;
use spotlight_core::VirtualKey;
use tracing::info;

use crate::application::emulate_input::{EmulationError, VirtualInput};

/// Default name shown by `libinput list-devices`.
pub const DEFAULT_DEVICE_NAME: &str = "Virtual Spotlight Mouse";

pub struct UinputDevice {
    device: Mutex<VirtualDevice>,
}

impl UinputDevice {
    /// Registers the virtual device with the kernel.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::Device`] when `/dev/uinput` cannot be opened
    /// or the kernel refuses the capability set.
    pub fn create(name: &str) -> Result<Self, EmulationError> {
        let mut keys = AttributeSet::<Key>::new();
        for key in VirtualKey::ALL {
            keys.insert(Key::new(key.code()));
        }
        let mut axes = AttributeSet::<RelativeAxisType>::new();
        for axis in VirtualKey::RELATIVE_AXES {
            axes.insert(RelativeAxisType(axis));
        }

        let device = VirtualDeviceBuilder::new()?
            .name(name)
            .with_keys(&keys)?
            .with_relative_axes(&axes)?
            .build()?;

        info!(name, "virtual input device created");
        Ok(Self {
            device: Mutex::new(device),
        })
    }
}

impl VirtualInput for UinputDevice {
    fn emit(&self, events: &[RawInputEvent]) -> Result<(), EmulationError> {
        let batch: Vec<InputEvent> = events
            .iter()
            .map(|e| InputEvent::new(EventType(e.event_type), e.code, e.value))
            .collect();
        let mut device = self
            .device
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // `emit` appends the closing SYN_REPORT.
        device.emit(&batch)?;
        Ok(())
    }
}
