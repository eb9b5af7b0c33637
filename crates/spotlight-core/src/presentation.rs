//! Interfaces to the presentation overlay and the user-facing log.
//!
//! The gesture engine never draws anything.  Whatever renders the spotlight,
//! laser dot, or pen strokes implements [`PresentationSurface`]; whatever
//! shows the user a running activity log implements [`LogSink`].

use std::fmt;

/// Overlay modes, in cycling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Spotlight,
    Laser,
    Pen,
    Mouse,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Spotlight, Mode::Laser, Mode::Pen, Mode::Mouse];

    pub fn index(self) -> usize {
        match self {
            Mode::Spotlight => 0,
            Mode::Laser => 1,
            Mode::Pen => 2,
            Mode::Mouse => 3,
        }
    }

    /// Steps through the cycle, wrapping in both directions.
    pub fn step(self, step: i32) -> Mode {
        let len = Self::ALL.len() as i32;
        let index = (self.index() as i32 + step).rem_euclid(len);
        Self::ALL[index as usize]
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Spotlight => "spotlight",
            Mode::Laser => "laser",
            Mode::Pen => "pen",
            Mode::Mouse => "mouse",
        };
        f.write_str(name)
    }
}

/// Pen stroke control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCommand {
    StartMove,
    StopMove,
}

/// What the dispatcher may ask of the overlay.
///
/// Calls arrive from reader threads and timer tasks; implementations must be
/// thread-safe and return quickly.
pub trait PresentationSurface: Send + Sync {
    fn current_mode(&self) -> Mode;
    /// Jumps to `direct_mode` when given, otherwise moves `step` places
    /// through the mode cycle.
    fn switch_mode(&self, direct_mode: Option<Mode>, step: i32);
    fn set_laser_mode(&self);
    fn change_line_width(&self, delta: i32);
    fn change_spot_radius(&self, delta: i32);
    fn zoom(&self, direction: i32);
    fn next_color(&self, step: i32);
    fn clear_drawing(&self);
    fn handle_draw_command(&self, command: DrawCommand);
    fn adjust_overlay_color(&self, color_step: i32, alpha_step: i32);
}

/// Fire-and-forget user-visible log.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_wraps_forward_and_backward() {
        assert_eq!(Mode::Mouse.step(1), Mode::Spotlight);
        assert_eq!(Mode::Spotlight.step(-1), Mode::Mouse);
        assert_eq!(Mode::Laser.step(2), Mode::Mouse);
        assert_eq!(Mode::Pen.step(0), Mode::Pen);
    }
}
