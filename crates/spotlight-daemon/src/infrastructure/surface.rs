//! Presentation surfaces and log sinks that need no display.
//!
//! - [`HeadlessSurface`] keeps the overlay's logical state (mode, pen width,
//!   spotlight radius, zoom, colour, alpha) and reports every change through
//!   `tracing`.  It lets the daemon run on a machine without an overlay, and
//!   gives an overlay process a faithful state model to mirror.
//! - [`TracingLogSink`] forwards user-facing log lines to `tracing`.
//! - [`RecordingSurface`] / [`RecordingLog`] record calls for tests.

use std::sync::Mutex;

use spotlight_core::{DrawCommand, LogSink, Mode, PresentationSurface};
use tracing::info;

const LINE_WIDTH_RANGE: (i32, i32) = (1, 20);
const MIN_SPOT_RADIUS: i32 = 50;
const SPOT_RADIUS_STEP: i32 = 10;
const ZOOM_RANGE: (i32, i32) = (1, 10);
const PALETTE_SIZE: i32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayState {
    pub mode: Mode,
    pub line_width: i32,
    pub spot_radius: i32,
    pub zoom: i32,
    pub color_index: i32,
    pub overlay_alpha: i32,
    pub drawing: bool,
    pub strokes: usize,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            mode: Mode::Mouse,
            line_width: 3,
            spot_radius: 150,
            zoom: 1,
            color_index: 0,
            overlay_alpha: 200,
            drawing: false,
            strokes: 0,
        }
    }
}

/// In-memory overlay state machine.
#[derive(Default)]
pub struct HeadlessSurface {
    state: Mutex<OverlayState>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> OverlayState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, OverlayState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PresentationSurface for HeadlessSurface {
    fn current_mode(&self) -> Mode {
        self.lock().mode
    }

    fn switch_mode(&self, direct_mode: Option<Mode>, step: i32) {
        let mut s = self.lock();
        let current = s.mode;
        s.mode = direct_mode.unwrap_or_else(|| current.step(step));
        s.drawing = false;
        info!(mode = %s.mode, "overlay mode changed");
    }

    fn set_laser_mode(&self) {
        self.switch_mode(Some(Mode::Laser), 0);
    }

    fn change_line_width(&self, delta: i32) {
        let mut s = self.lock();
        s.line_width = (s.line_width + delta).clamp(LINE_WIDTH_RANGE.0, LINE_WIDTH_RANGE.1);
        info!(width = s.line_width, "pen width");
    }

    fn change_spot_radius(&self, delta: i32) {
        let mut s = self.lock();
        s.spot_radius = (s.spot_radius + delta * SPOT_RADIUS_STEP).max(MIN_SPOT_RADIUS);
        info!(radius = s.spot_radius, "spotlight radius");
    }

    fn zoom(&self, direction: i32) {
        let mut s = self.lock();
        s.zoom = (s.zoom + direction.signum()).clamp(ZOOM_RANGE.0, ZOOM_RANGE.1);
        info!(zoom = s.zoom, "zoom level");
    }

    fn next_color(&self, step: i32) {
        let mut s = self.lock();
        s.color_index = (s.color_index + step).rem_euclid(PALETTE_SIZE);
        info!(color = s.color_index, "drawing colour");
    }

    fn clear_drawing(&self) {
        let mut s = self.lock();
        s.strokes = 0;
        s.drawing = false;
        info!("drawing cleared");
    }

    fn handle_draw_command(&self, command: DrawCommand) {
        let mut s = self.lock();
        match command {
            DrawCommand::StartMove if !s.drawing => {
                s.drawing = true;
                s.strokes += 1;
            }
            DrawCommand::StopMove => s.drawing = false,
            DrawCommand::StartMove => {}
        }
    }

    fn adjust_overlay_color(&self, color_step: i32, alpha_step: i32) {
        let mut s = self.lock();
        s.color_index = (s.color_index + color_step).rem_euclid(PALETTE_SIZE);
        s.overlay_alpha = (s.overlay_alpha + alpha_step).clamp(0, 255);
        info!(alpha = s.overlay_alpha, color = s.color_index, "overlay colour");
    }
}

/// Writes user-facing log lines through `tracing`.
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, message: &str) {
        info!(target: "spotlight::log", "{message}");
    }
}

// ── Test doubles ──────────────────────────────────────────────────────────────

/// A surface call as recorded by [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    SwitchMode(Option<Mode>, i32),
    SetLaserMode,
    LineWidth(i32),
    SpotRadius(i32),
    Zoom(i32),
    NextColor(i32),
    ClearDrawing,
    Draw(DrawCommand),
    OverlayColor(i32, i32),
}

/// Records every call; the mode only changes when the test says so.
pub struct RecordingSurface {
    mode: Mutex<Mode>,
    calls: Mutex<Vec<SurfaceCall>>,
}

impl RecordingSurface {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode: Mutex::new(mode),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PresentationSurface for RecordingSurface {
    fn current_mode(&self) -> Mode {
        *self.mode.lock().unwrap()
    }
    fn switch_mode(&self, direct_mode: Option<Mode>, step: i32) {
        self.record(SurfaceCall::SwitchMode(direct_mode, step));
    }
    fn set_laser_mode(&self) {
        self.record(SurfaceCall::SetLaserMode);
    }
    fn change_line_width(&self, delta: i32) {
        self.record(SurfaceCall::LineWidth(delta));
    }
    fn change_spot_radius(&self, delta: i32) {
        self.record(SurfaceCall::SpotRadius(delta));
    }
    fn zoom(&self, direction: i32) {
        self.record(SurfaceCall::Zoom(direction));
    }
    fn next_color(&self, step: i32) {
        self.record(SurfaceCall::NextColor(step));
    }
    fn clear_drawing(&self) {
        self.record(SurfaceCall::ClearDrawing);
    }
    fn handle_draw_command(&self, command: DrawCommand) {
        self.record(SurfaceCall::Draw(command));
    }
    fn adjust_overlay_color(&self, color_step: i32, alpha_step: i32) {
        self.record(SurfaceCall::OverlayColor(color_step, alpha_step));
    }
}

#[derive(Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<String>>,
}

impl RecordingLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl LogSink for RecordingLog {
    fn log(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_mode_by_step_wraps_from_mouse_to_spotlight() {
        // Arrange
        let surface = HeadlessSurface::new();

        // Act
        surface.switch_mode(None, 1);

        // Assert
        assert_eq!(surface.current_mode(), Mode::Spotlight);
    }

    #[test]
    fn test_line_width_is_clamped() {
        // Arrange
        let surface = HeadlessSurface::new();

        // Act
        for _ in 0..50 {
            surface.change_line_width(1);
        }
        let wide = surface.snapshot().line_width;
        for _ in 0..50 {
            surface.change_line_width(-1);
        }

        // Assert
        assert_eq!(wide, 20);
        assert_eq!(surface.snapshot().line_width, 1);
    }

    #[test]
    fn test_spot_radius_never_drops_below_minimum() {
        let surface = HeadlessSurface::new();
        for _ in 0..100 {
            surface.change_spot_radius(-1);
        }
        assert_eq!(surface.snapshot().spot_radius, MIN_SPOT_RADIUS);
    }

    #[test]
    fn test_draw_start_counts_one_stroke_until_stopped() {
        // Arrange
        let surface = HeadlessSurface::new();

        // Act
        surface.handle_draw_command(DrawCommand::StartMove);
        surface.handle_draw_command(DrawCommand::StartMove);
        surface.handle_draw_command(DrawCommand::StopMove);
        surface.handle_draw_command(DrawCommand::StartMove);

        // Assert
        let state = surface.snapshot();
        assert_eq!(state.strokes, 2);
        assert!(state.drawing);
    }

    #[test]
    fn test_overlay_alpha_is_clamped_and_color_wraps() {
        // Arrange
        let surface = HeadlessSurface::new();

        // Act
        surface.adjust_overlay_color(-1, 100);

        // Assert
        let state = surface.snapshot();
        assert_eq!(state.overlay_alpha, 255);
        assert_eq!(state.color_index, PALETTE_SIZE - 1);
    }
}
