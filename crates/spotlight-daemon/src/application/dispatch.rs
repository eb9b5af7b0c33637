//! ActionDispatcher: turns gestures into overlay commands and key presses.
//!
//! Dispatch happens in two steps:
//!
//! 1. [`plan`] is a pure function from `(model, gesture, current mode)` to a
//!    list of [`Action`]s.  All the "what does LASER+long do in pen mode"
//!    knowledge lives here and is tested without any mocks.
//! 2. [`ActionDispatcher`] executes those actions against the
//!    [`PresentationSurface`] and the [`InputEmitter`].

use std::sync::Arc;

use spotlight_core::{
    Button, DeviceModel, DrawCommand, GestureEvent, GestureSink, LogSink, Mode,
    PresentationSurface, VirtualKey,
};
use tracing::{trace, warn};

use super::emulate_input::InputEmitter;

/// Shared collaborators handed to every device instance.
#[derive(Clone)]
pub struct AppContext {
    pub surface: Arc<dyn PresentationSurface>,
    pub log: Arc<dyn LogSink>,
    pub emitter: Arc<InputEmitter>,
}

/// One effect of a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Key(VirtualKey),
    Chord(&'static [VirtualKey]),
    SwitchMode { direct: Option<Mode>, step: i32 },
    SetLaserMode,
    LineWidth(i32),
    SpotRadius(i32),
    Zoom(i32),
    NextColor(i32),
    ClearDrawing,
    Draw(DrawCommand),
    OverlayColor { color_step: i32, alpha_step: i32 },
}

const START_SLIDESHOW: &[VirtualKey] = &[VirtualKey::LeftShift, VirtualKey::F5];

fn to_mouse() -> Action {
    Action::SwitchMode {
        direct: Some(Mode::Mouse),
        step: 0,
    }
}

fn next_mode(step: i32) -> Action {
    Action::SwitchMode { direct: None, step }
}

/// Page key in mouse mode, otherwise resize whatever the mode draws.
fn page_or_resize(mode: Mode, key: VirtualKey, delta: i32) -> Vec<Action> {
    match mode {
        Mode::Mouse => vec![Action::Key(key)],
        Mode::Pen => vec![Action::LineWidth(delta)],
        Mode::Spotlight => vec![Action::SpotRadius(delta)],
        Mode::Laser => vec![],
    }
}

/// Decides what a gesture means for `model` in `mode`.
pub fn plan(model: DeviceModel, event: GestureEvent, mode: Mode) -> Vec<Action> {
    match model {
        DeviceModel::BaseusOrangeDotAi => plan_baseus(event, mode),
        DeviceModel::GenericVrBox => plan_vrbox(event, mode),
    }
}

fn plan_baseus(event: GestureEvent, mode: Mode) -> Vec<Action> {
    use GestureEvent::*;
    let mouse = mode == Mode::Mouse;
    match event {
        Tap(Button::Ok) if mouse => vec![Action::Key(VirtualKey::MouseLeft)],
        Tap(Button::Ok) => vec![to_mouse()],
        DoubleTap(Button::Ok) | DoubleTap(Button::Mode) => vec![next_mode(1)],
        Tap(Button::Spotlight) if mouse => vec![next_mode(1)],
        LongPress(Button::Mode) => vec![to_mouse()],

        Tap(Button::Laser) => vec![Action::SetLaserMode],
        LongPress(Button::Laser) => vec![Action::SetLaserMode, Action::Draw(DrawCommand::StartMove)],
        Release(Button::Laser) => vec![Action::Draw(DrawCommand::StopMove)],

        Tap(Button::Erase) if mouse => vec![Action::Key(VirtualKey::B)],
        Tap(Button::Erase) => vec![Action::ClearDrawing],

        Tap(Button::Highlight) => vec![Action::Draw(DrawCommand::StartMove)],
        Release(Button::Highlight) => vec![Action::Draw(DrawCommand::StopMove)],

        Tap(Button::Prev) | RepeatTick(Button::Prev) => page_or_resize(mode, VirtualKey::PageUp, 1),
        Tap(Button::Next) | RepeatTick(Button::Next) => {
            page_or_resize(mode, VirtualKey::PageDown, -1)
        }

        Tap(Button::Back) if mouse => vec![Action::Key(VirtualKey::Escape)],
        Tap(Button::Back) => vec![to_mouse()],

        Tap(Button::Present) if mouse => vec![Action::Chord(START_SLIDESHOW)],
        LongPress(Button::Present) if mouse => vec![Action::Key(VirtualKey::F5)],

        Tap(Button::ColorNext) if matches!(mode, Mode::Pen | Mode::Laser) => {
            vec![Action::NextColor(1)]
        }
        Tap(Button::ColorPrev) if matches!(mode, Mode::Pen | Mode::Laser) => {
            vec![Action::NextColor(-1)]
        }
        LongPress(Button::ColorNext) | RepeatTick(Button::ColorNext) if mode == Mode::Spotlight => {
            vec![Action::OverlayColor {
                color_step: 0,
                alpha_step: 10,
            }]
        }
        LongPress(Button::ColorPrev) | RepeatTick(Button::ColorPrev) if mode == Mode::Spotlight => {
            vec![Action::OverlayColor {
                color_step: 0,
                alpha_step: -10,
            }]
        }

        Tap(Button::VolumeUp) | RepeatTick(Button::VolumeUp) if mouse => {
            vec![Action::Key(VirtualKey::VolumeUp)]
        }
        Tap(Button::VolumeUp) | RepeatTick(Button::VolumeUp) => vec![Action::Zoom(1)],
        Tap(Button::VolumeDown) | RepeatTick(Button::VolumeDown) if mouse => {
            vec![Action::Key(VirtualKey::VolumeDown)]
        }
        Tap(Button::VolumeDown) | RepeatTick(Button::VolumeDown) => vec![Action::Zoom(-1)],

        _ => Vec::new(),
    }
}

fn plan_vrbox(event: GestureEvent, mode: Mode) -> Vec<Action> {
    use GestureEvent::*;
    match event {
        Tap(Button::G1) => page_or_resize(mode, VirtualKey::PageDown, 1),
        LongPress(Button::G1) => vec![Action::Chord(START_SLIDESHOW)],
        Tap(Button::G2) => page_or_resize(mode, VirtualKey::PageUp, -1),

        Tap(Button::B) if mode == Mode::Mouse => vec![Action::Key(VirtualKey::B)],
        Tap(Button::B) if mode == Mode::Pen => vec![Action::ClearDrawing],
        LongPress(Button::B) | LongPress(Button::D) => vec![to_mouse()],

        Tap(Button::C) => vec![next_mode(1)],
        LongPress(Button::C) => vec![next_mode(-1)],

        Tap(Button::D) if matches!(mode, Mode::Pen | Mode::Laser) => vec![Action::NextColor(1)],

        Tap(Button::ScrollLeft) | RepeatTick(Button::ScrollLeft) => vec![Action::Zoom(1)],
        Tap(Button::ScrollRight) | RepeatTick(Button::ScrollRight) => vec![Action::Zoom(-1)],

        Combo(Button::G1, Button::G2) if mode == Mode::Mouse => vec![Action::SwitchMode {
            direct: Some(Mode::Spotlight),
            step: 0,
        }],
        Combo(Button::G1, Button::G2) => vec![to_mouse()],

        _ => Vec::new(),
    }
}

/// [`GestureSink`] that logs each gesture and carries out its plan.
pub struct ActionDispatcher {
    model: DeviceModel,
    ctx: AppContext,
}

impl ActionDispatcher {
    pub fn new(model: DeviceModel, ctx: AppContext) -> Self {
        Self { model, ctx }
    }

    fn execute(&self, action: Action) {
        let surface = &self.ctx.surface;
        let emitted = match action {
            Action::Key(key) => self.ctx.emitter.press_release(key),
            Action::Chord(keys) => self.ctx.emitter.chord(keys),
            Action::SwitchMode { direct, step } => {
                surface.switch_mode(direct, step);
                Ok(())
            }
            Action::SetLaserMode => {
                surface.set_laser_mode();
                Ok(())
            }
            Action::LineWidth(d) => {
                surface.change_line_width(d);
                Ok(())
            }
            Action::SpotRadius(d) => {
                surface.change_spot_radius(d);
                Ok(())
            }
            Action::Zoom(d) => {
                surface.zoom(d);
                Ok(())
            }
            Action::NextColor(step) => {
                surface.next_color(step);
                Ok(())
            }
            Action::ClearDrawing => {
                surface.clear_drawing();
                Ok(())
            }
            Action::Draw(command) => {
                surface.handle_draw_command(command);
                Ok(())
            }
            Action::OverlayColor {
                color_step,
                alpha_step,
            } => {
                surface.adjust_overlay_color(color_step, alpha_step);
                Ok(())
            }
        };
        if let Err(e) = emitted {
            warn!(model = %self.model, ?action, "key emission failed: {e}");
        }
    }
}

impl GestureSink for ActionDispatcher {
    fn on_gesture(&self, event: GestureEvent) {
        self.ctx.log.log(&format!("[{}] {event}", self.model.name()));
        let actions = plan(self.model, event, self.ctx.surface.current_mode());
        if actions.is_empty() {
            trace!(model = %self.model, gesture = %event, "gesture has no action in this mode");
        }
        for action in actions {
            self.execute(action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_emulation::mock::MockVirtualInput;
    use crate::infrastructure::surface::{RecordingLog, RecordingSurface, SurfaceCall};

    const BASEUS: DeviceModel = DeviceModel::BaseusOrangeDotAi;
    const VRBOX: DeviceModel = DeviceModel::GenericVrBox;

    #[test]
    fn test_ok_tap_clicks_in_mouse_mode_and_returns_to_mouse_otherwise() {
        assert_eq!(
            plan(BASEUS, GestureEvent::Tap(Button::Ok), Mode::Mouse),
            vec![Action::Key(VirtualKey::MouseLeft)]
        );
        assert_eq!(
            plan(BASEUS, GestureEvent::Tap(Button::Ok), Mode::Pen),
            vec![to_mouse()]
        );
    }

    #[test]
    fn test_next_pages_in_mouse_and_resizes_in_drawing_modes() {
        let next = GestureEvent::RepeatTick(Button::Next);
        assert_eq!(plan(BASEUS, next, Mode::Mouse), vec![Action::Key(VirtualKey::PageDown)]);
        assert_eq!(plan(BASEUS, next, Mode::Pen), vec![Action::LineWidth(-1)]);
        assert_eq!(plan(BASEUS, next, Mode::Spotlight), vec![Action::SpotRadius(-1)]);
        assert!(plan(BASEUS, next, Mode::Laser).is_empty());
    }

    #[test]
    fn test_present_tap_starts_slideshow_with_shift_f5() {
        assert_eq!(
            plan(BASEUS, GestureEvent::Tap(Button::Present), Mode::Mouse),
            vec![Action::Chord(&[VirtualKey::LeftShift, VirtualKey::F5])]
        );
    }

    #[test]
    fn test_color_hold_adjusts_alpha_only_in_spotlight() {
        let hold = GestureEvent::RepeatTick(Button::ColorPrev);
        assert_eq!(
            plan(BASEUS, hold, Mode::Spotlight),
            vec![Action::OverlayColor {
                color_step: 0,
                alpha_step: -10
            }]
        );
        assert!(plan(BASEUS, hold, Mode::Mouse).is_empty());
    }

    #[test]
    fn test_vrbox_c_cycles_modes_both_ways() {
        assert_eq!(plan(VRBOX, GestureEvent::Tap(Button::C), Mode::Pen), vec![next_mode(1)]);
        assert_eq!(
            plan(VRBOX, GestureEvent::LongPress(Button::C), Mode::Pen),
            vec![next_mode(-1)]
        );
    }

    #[test]
    fn test_vrbox_combo_toggles_between_mouse_and_spotlight() {
        let combo = GestureEvent::Combo(Button::G1, Button::G2);
        assert_eq!(
            plan(VRBOX, combo, Mode::Mouse),
            vec![Action::SwitchMode {
                direct: Some(Mode::Spotlight),
                step: 0
            }]
        );
        assert_eq!(plan(VRBOX, combo, Mode::Laser), vec![to_mouse()]);
    }

    #[test]
    fn test_dispatcher_logs_gesture_and_drives_surface_and_keys() {
        // Arrange
        let surface = Arc::new(RecordingSurface::new(Mode::Mouse));
        let log = Arc::new(RecordingLog::default());
        let device = Arc::new(MockVirtualInput::new());
        let ctx = AppContext {
            surface: surface.clone(),
            log: log.clone(),
            emitter: Arc::new(InputEmitter::new(device.clone())),
        };
        let dispatcher = ActionDispatcher::new(BASEUS, ctx);

        // Act
        dispatcher.on_gesture(GestureEvent::Tap(Button::Next));
        dispatcher.on_gesture(GestureEvent::DoubleTap(Button::Mode));

        // Assert
        assert_eq!(device.pressed_codes(), vec![VirtualKey::PageDown.code()]);
        assert_eq!(
            surface.calls(),
            vec![SurfaceCall::SwitchMode(None, 1)]
        );
        assert_eq!(
            log.lines(),
            vec![
                "[Baseus Orange Dot AI] NEXT".to_string(),
                "[Baseus Orange Dot AI] MODE+double".to_string()
            ]
        );
    }
}
