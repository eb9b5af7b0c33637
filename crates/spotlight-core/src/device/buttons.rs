//! Static code → logical button tables for each supported remote.
//!
//! Remotes often report one physical button under several codes (a "press"
//! code that differs between the first and subsequent presses, a separate
//! "still held" code, and so on).  The tables below collapse every such code
//! to one canonical [`Button`] plus a [`Signal`] saying what the code means.

use std::fmt;

/// Logical buttons across all supported remotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Button {
    // Baseus Orange Dot AI
    Ok,
    Spotlight,
    Laser,
    Erase,
    Highlight,
    Prev,
    Next,
    Back,
    Present,
    Mode,
    ColorNext,
    ColorPrev,
    VolumeUp,
    VolumeDown,
    // Generic VR-Box
    G1,
    G2,
    A,
    B,
    C,
    D,
    ScrollLeft,
    ScrollRight,
}

impl Button {
    /// The name used in logs and gesture traces.
    pub fn name(self) -> &'static str {
        match self {
            Button::Ok => "OK",
            Button::Spotlight => "SPOTLIGHT",
            Button::Laser => "LASER",
            Button::Erase => "ERASE",
            Button::Highlight => "HIGHLIGHT",
            Button::Prev => "PREV",
            Button::Next => "NEXT",
            Button::Back => "BACK",
            Button::Present => "PRESENT",
            Button::Mode => "MODE",
            Button::ColorNext => "COLOR_NEXT",
            Button::ColorPrev => "COLOR_PREV",
            Button::VolumeUp => "VOLUME_UP",
            Button::VolumeDown => "VOLUME_DOWN",
            Button::G1 => "G1",
            Button::G2 => "G2",
            Button::A => "A",
            Button::B => "B",
            Button::C => "C",
            Button::D => "D",
            Button::ScrollLeft => "SL",
            Button::ScrollRight => "SR",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a single code says about its button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Press,
    /// Periodic "still held" report.  Carries no new information.
    Hold,
    Release,
}

/// A resolved code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonCode {
    pub button: Button,
    pub signal: Signal,
}

/// A device's code table plus the set of buttons that bypass gesture
/// resolution.
#[derive(Debug, Clone, Copy)]
pub struct ButtonMap {
    entries: &'static [(u16, Button, Signal)],
    immediate: &'static [Button],
}

impl ButtonMap {
    pub const fn new(
        entries: &'static [(u16, Button, Signal)],
        immediate: &'static [Button],
    ) -> Self {
        Self { entries, immediate }
    }

    /// Looks up `code`; `None` for codes this device does not define.
    pub fn resolve(&self, code: u16) -> Option<ButtonCode> {
        self.entries
            .iter()
            .find(|(c, _, _)| *c == code)
            .map(|&(_, button, signal)| ButtonCode { button, signal })
    }

    /// Immediate buttons turn press into `Tap` and release into `Release`
    /// without any timing.
    pub fn fires_immediately(&self, button: Button) -> bool {
        self.immediate.contains(&button)
    }

    /// Every distinct button this map can produce.
    pub fn buttons(&self) -> Vec<Button> {
        let mut all: Vec<Button> = self.entries.iter().map(|&(_, b, _)| b).collect();
        all.sort_unstable();
        all.dedup();
        all
    }
}

// ── Baseus Orange Dot AI (status byte of the 16-byte report) ─────────────────

const BASEUS_ENTRIES: &[(u16, Button, Signal)] = &[
    (97, Button::Ok, Signal::Press),
    (99, Button::Spotlight, Signal::Press),
    (100, Button::Laser, Signal::Press),
    (103, Button::Erase, Signal::Press),
    (104, Button::Highlight, Signal::Press),
    (114, Button::Highlight, Signal::Press),
    (105, Button::Highlight, Signal::Release),
    (115, Button::Highlight, Signal::Release),
    (106, Button::Prev, Signal::Press),
    (107, Button::Back, Signal::Press),
    (108, Button::Next, Signal::Press),
    (109, Button::Present, Signal::Press),
    (113, Button::Mode, Signal::Press),
    (116, Button::ColorNext, Signal::Press),
    (117, Button::ColorNext, Signal::Press),
    (118, Button::ColorNext, Signal::Hold),
    (119, Button::ColorNext, Signal::Release),
    (120, Button::VolumeUp, Signal::Press),
    (121, Button::VolumeDown, Signal::Press),
    (122, Button::ColorPrev, Signal::Press),
    (123, Button::ColorPrev, Signal::Press),
    (124, Button::ColorPrev, Signal::Hold),
    (125, Button::ColorPrev, Signal::Release),
];

pub const BASEUS_BUTTONS: ButtonMap = ButtonMap::new(BASEUS_ENTRIES, &[Button::Highlight]);

// ── Generic VR-Box (evdev key codes) ─────────────────────────────────────────
//
// The same remote enumerates as a mouse, a gamepad, or a media keyboard
// depending on its mode switch, so each logical button has several codes.

const BTN_LEFT: u16 = 0x110;
const BTN_RIGHT: u16 = 0x111;
const BTN_A: u16 = 0x130;
const BTN_B: u16 = 0x131;
const BTN_X: u16 = 0x133;
const BTN_Y: u16 = 0x134;
const BTN_TL: u16 = 0x136;
const BTN_TR: u16 = 0x137;
const BTN_TL2: u16 = 0x138;
const BTN_TR2: u16 = 0x139;
const KEY_VOLUMEDOWN: u16 = 114;
const KEY_VOLUMEUP: u16 = 115;
const KEY_NEXTSONG: u16 = 163;
const KEY_PLAYPAUSE: u16 = 164;
const KEY_PREVIOUSSONG: u16 = 165;

const VRBOX_ENTRIES: &[(u16, Button, Signal)] = &[
    (BTN_LEFT, Button::G1, Signal::Press),
    (BTN_TL, Button::G1, Signal::Press),
    (BTN_RIGHT, Button::G2, Signal::Press),
    (BTN_TR, Button::G2, Signal::Press),
    (BTN_A, Button::A, Signal::Press),
    (KEY_PLAYPAUSE, Button::A, Signal::Press),
    (BTN_TR2, Button::A, Signal::Press),
    (BTN_B, Button::B, Signal::Press),
    (BTN_X, Button::B, Signal::Press),
    (KEY_VOLUMEUP, Button::C, Signal::Press),
    (BTN_TL2, Button::C, Signal::Press),
    (KEY_VOLUMEDOWN, Button::D, Signal::Press),
    (BTN_Y, Button::D, Signal::Press),
    (KEY_NEXTSONG, Button::ScrollLeft, Signal::Press),
    (KEY_PREVIOUSSONG, Button::ScrollRight, Signal::Press),
];

pub const VRBOX_BUTTONS: ButtonMap = ButtonMap::new(VRBOX_ENTRIES, &[]);
