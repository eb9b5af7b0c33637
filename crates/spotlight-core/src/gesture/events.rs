//! Semantic events produced by the gesture engine.

use std::fmt;

use crate::device::buttons::Button;

/// Exactly one of these is produced per resolved physical interaction
/// (plus `RepeatTick`s while a repeatable button stays held).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureEvent {
    Tap(Button),
    DoubleTap(Button),
    LongPress(Button),
    RepeatTick(Button),
    /// Release that ends a long press.
    Release(Button),
    Combo(Button, Button),
}

impl GestureEvent {
    /// The button this event concerns (the first one for a combo).
    pub fn button(&self) -> Button {
        match *self {
            GestureEvent::Tap(b)
            | GestureEvent::DoubleTap(b)
            | GestureEvent::LongPress(b)
            | GestureEvent::RepeatTick(b)
            | GestureEvent::Release(b)
            | GestureEvent::Combo(b, _) => b,
        }
    }
}

impl fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureEvent::Tap(b) => write!(f, "{b}"),
            GestureEvent::DoubleTap(b) => write!(f, "{b}+double"),
            GestureEvent::LongPress(b) => write!(f, "{b}+long"),
            GestureEvent::RepeatTick(b) => write!(f, "{b}+repeat"),
            GestureEvent::Release(b) => write!(f, "{b}+release"),
            GestureEvent::Combo(a, b) => write!(f, "{a}+{b}"),
        }
    }
}

/// Receiver of gesture events.
///
/// Implementations are called from reader threads and timer tasks alike, so
/// they must be thread-safe and must not block for long.
pub trait GestureSink: Send + Sync {
    fn on_gesture(&self, event: GestureEvent);
}
