//! Linux input event records and the virtual key table.
//!
//! Codes here are the numeric values from `linux/input-event-codes.h`.  The
//! core crate never talks to the kernel; it only names the codes so that the
//! button maps, the dispatcher, and the uinput backend agree on them.

/// `EV_SYN`
pub const EV_SYN: u16 = 0x00;
/// `EV_KEY`
pub const EV_KEY: u16 = 0x01;
/// `EV_REL`
pub const EV_REL: u16 = 0x02;

pub const SYN_REPORT: u16 = 0;

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_HWHEEL: u16 = 0x06;
pub const REL_WHEEL: u16 = 0x08;

pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;

/// Key event values as reported by evdev.
pub const KEY_RELEASED: i32 = 0;
pub const KEY_PRESSED: i32 = 1;
pub const KEY_AUTOREPEAT: i32 = 2;

/// One `(type, code, value)` triple as read from or written to an event node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputEvent {
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl RawInputEvent {
    pub const fn new(event_type: u16, code: u16, value: i32) -> Self {
        Self {
            event_type,
            code,
            value,
        }
    }

    pub const fn key(code: u16, value: i32) -> Self {
        Self::new(EV_KEY, code, value)
    }

    pub const fn sync() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 0)
    }

    /// `true` for relative motion and left/right clicks: the only codes a
    /// grabbed node may forward to the virtual device.
    pub fn is_pointer_passthrough(&self) -> bool {
        match self.event_type {
            EV_REL => true,
            EV_KEY => self.code == BTN_LEFT || self.code == BTN_RIGHT,
            _ => false,
        }
    }
}

/// Keys the virtual device registers and the dispatcher may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualKey {
    MouseLeft,
    MouseRight,
    B,
    PageUp,
    PageDown,
    Escape,
    F5,
    Space,
    LeftShift,
    VolumeUp,
    VolumeDown,
}

impl VirtualKey {
    /// The full capability set, registered once when the device is created.
    pub const ALL: [VirtualKey; 11] = [
        VirtualKey::MouseLeft,
        VirtualKey::MouseRight,
        VirtualKey::B,
        VirtualKey::PageUp,
        VirtualKey::PageDown,
        VirtualKey::Escape,
        VirtualKey::F5,
        VirtualKey::Space,
        VirtualKey::LeftShift,
        VirtualKey::VolumeUp,
        VirtualKey::VolumeDown,
    ];

    /// Relative axes registered alongside the keys.
    pub const RELATIVE_AXES: [u16; 4] = [REL_X, REL_Y, REL_WHEEL, REL_HWHEEL];

    pub const fn code(self) -> u16 {
        match self {
            VirtualKey::MouseLeft => BTN_LEFT,
            VirtualKey::MouseRight => BTN_RIGHT,
            VirtualKey::B => 48,
            VirtualKey::PageUp => 104,
            VirtualKey::PageDown => 109,
            VirtualKey::Escape => 1,
            VirtualKey::F5 => 63,
            VirtualKey::Space => 57,
            VirtualKey::LeftShift => 42,
            VirtualKey::VolumeUp => 115,
            VirtualKey::VolumeDown => 114,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_motion_is_passthrough() {
        assert!(RawInputEvent::new(EV_REL, REL_X, -3).is_pointer_passthrough());
        assert!(RawInputEvent::new(EV_REL, REL_WHEEL, 1).is_pointer_passthrough());
    }

    #[test]
    fn test_only_left_and_right_clicks_are_passthrough() {
        assert!(RawInputEvent::key(BTN_LEFT, 1).is_pointer_passthrough());
        assert!(RawInputEvent::key(BTN_RIGHT, 0).is_pointer_passthrough());
        assert!(!RawInputEvent::key(VirtualKey::PageDown.code(), 1).is_pointer_passthrough());
        assert!(!RawInputEvent::sync().is_pointer_passthrough());
    }

    #[test]
    fn test_capability_codes_are_unique() {
        // Arrange
        let mut codes: Vec<u16> = VirtualKey::ALL.iter().map(|k| k.code()).collect();

        // Act
        codes.sort_unstable();
        codes.dedup();

        // Assert
        assert_eq!(codes.len(), VirtualKey::ALL.len());
    }
}
