//! DevicePipeline: one device instance's path from input to gestures.
//!
//! ```text
//! hidraw bytes ─► framer ─► PacketShape::check ─► ButtonMap ─┐
//!                                                            ├─► GestureEngine ─► ActionDispatcher
//! evdev events ─────────────────────────────────► ButtonMap ─┘          (immediate buttons skip the engine)
//!      └─► pointer motion / clicks ─► InputEmitter::forward
//! ```
//!
//! The pipeline owns no threads.  The node reader calls into it from its own
//! thread; the engine's timer callbacks call the dispatcher from the
//! scheduler's threads.

use std::sync::Arc;
use std::time::Instant;

use spotlight_core::input::{EV_KEY, KEY_AUTOREPEAT, KEY_PRESSED, KEY_RELEASED};
use spotlight_core::protocol::packet::STATUS_ALL_RELEASED;
use spotlight_core::{
    ButtonCode, ButtonMap, DeviceModel, GestureEngine, GestureEvent, GestureProfile, GestureSink,
    PacketFramer, RawInputEvent, Scheduler, Signal,
};
use tracing::{debug, trace};

use super::emulate_input::InputEmitter;

pub struct DevicePipeline {
    model: DeviceModel,
    buttons: ButtonMap,
    engine: GestureEngine,
    dispatcher: Arc<dyn GestureSink>,
    emitter: Arc<InputEmitter>,
}

impl DevicePipeline {
    pub fn new(
        model: DeviceModel,
        profile: GestureProfile,
        scheduler: Arc<dyn Scheduler>,
        dispatcher: Arc<dyn GestureSink>,
        emitter: Arc<InputEmitter>,
    ) -> Self {
        Self {
            model,
            buttons: model.buttons(),
            engine: GestureEngine::new(profile, scheduler, Arc::clone(&dispatcher)),
            dispatcher,
            emitter,
        }
    }

    pub fn model(&self) -> DeviceModel {
        self.model
    }

    pub fn engine(&self) -> &GestureEngine {
        &self.engine
    }

    pub fn emitter(&self) -> &Arc<InputEmitter> {
        &self.emitter
    }

    /// A fresh framer for one raw node, if this model speaks a raw protocol.
    pub fn new_framer(&self) -> Option<PacketFramer> {
        self.model
            .packet_shape()
            .map(|s| PacketFramer::with_limit(s.terminator, s.length))
    }

    /// Handles one framed raw report received at `at`.
    pub fn handle_packet(&self, packet: &[u8], at: Instant) {
        let Some(shape) = self.model.packet_shape() else {
            trace!(model = %self.model, "raw packet from a model without a raw protocol");
            return;
        };
        let status = match shape.check(packet) {
            Ok(status) => status,
            Err(e) => {
                trace!(model = %self.model, "malformed packet dropped: {e}");
                return;
            }
        };
        if status == STATUS_ALL_RELEASED {
            self.engine.release_all();
            return;
        }
        match self.buttons.resolve(u16::from(status)) {
            Some(code) => self.apply(code, at),
            None => debug!(model = %self.model, status, "unknown status code"),
        }
    }

    /// Handles one batch of evdev events (up to and including a SYN_REPORT).
    ///
    /// Key events become gestures for models that report buttons as keys.
    /// Pointer motion and clicks are re-emitted when `forward_pointer` is set
    /// (the node is grabbed, so nothing else would deliver them).  Everything
    /// else is dropped.
    pub fn handle_input_events(&self, events: &[RawInputEvent], at: Instant, forward_pointer: bool) {
        let mut pointer = Vec::new();
        for event in events {
            if event.event_type == EV_KEY && self.model.keys_from_event_nodes() {
                if let Some(code) = self.buttons.resolve(event.code) {
                    if let Some(signal) = key_signal(event.value) {
                        self.apply(
                            ButtonCode {
                                button: code.button,
                                signal,
                            },
                            at,
                        );
                    }
                    continue;
                }
            }
            if forward_pointer && event.is_pointer_passthrough() {
                pointer.push(*event);
            } else {
                trace!(model = %self.model, ?event, "event dropped");
            }
        }
        if let Err(e) = self.emitter.forward(&pointer) {
            debug!(model = %self.model, "pointer passthrough failed: {e}");
        }
    }

    /// Drops in-flight gesture state after the device went away.
    pub fn disconnected(&self) {
        self.engine.reset();
    }

    fn apply(&self, code: ButtonCode, at: Instant) {
        let ButtonCode { button, signal } = code;
        if self.buttons.fires_immediately(button) {
            match signal {
                Signal::Press => self.dispatcher.on_gesture(GestureEvent::Tap(button)),
                Signal::Release => self.dispatcher.on_gesture(GestureEvent::Release(button)),
                Signal::Hold => {}
            }
            return;
        }
        match signal {
            Signal::Press => self.engine.press(button, at),
            Signal::Release => self.engine.release(button),
            Signal::Hold => trace!(%button, "hold report"),
        }
    }
}

fn key_signal(value: i32) -> Option<Signal> {
    match value {
        KEY_PRESSED => Some(Signal::Press),
        KEY_RELEASED => Some(Signal::Release),
        KEY_AUTOREPEAT => Some(Signal::Hold),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_emulation::mock::MockVirtualInput;
    use spotlight_core::gesture::ManualScheduler;
    use spotlight_core::input::{BTN_LEFT, EV_REL, REL_X, REL_Y};
    use spotlight_core::Button;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<GestureEvent>>);

    impl GestureSink for Recorder {
        fn on_gesture(&self, event: GestureEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    struct Fixture {
        pipeline: DevicePipeline,
        sched: Arc<ManualScheduler>,
        sink: Arc<Recorder>,
        device: Arc<MockVirtualInput>,
    }

    fn fixture(model: DeviceModel) -> Fixture {
        let sched = Arc::new(ManualScheduler::new());
        let sink = Arc::new(Recorder::default());
        let device = Arc::new(MockVirtualInput::new());
        let pipeline = DevicePipeline::new(
            model,
            model.profile(),
            sched.clone(),
            sink.clone(),
            Arc::new(InputEmitter::new(device.clone())),
        );
        Fixture {
            pipeline,
            sched,
            sink,
            device,
        }
    }

    fn report(status: u8) -> Vec<u8> {
        let mut p = vec![0u8; 16];
        p[0] = 10;
        p[5] = status;
        p[15] = 182;
        p
    }

    #[test]
    fn test_immediate_button_bypasses_engine() {
        // Arrange
        let f = fixture(DeviceModel::BaseusOrangeDotAi);

        // Act
        f.pipeline.handle_packet(&report(104), f.sched.now());
        f.pipeline.handle_packet(&report(105), f.sched.now());

        // Assert
        assert_eq!(
            *f.sink.0.lock().unwrap(),
            vec![
                GestureEvent::Tap(Button::Highlight),
                GestureEvent::Release(Button::Highlight)
            ]
        );
        assert!(f.pipeline.engine().tracked().is_empty());
    }

    #[test]
    fn test_unknown_and_malformed_packets_are_dropped() {
        // Arrange
        let f = fixture(DeviceModel::BaseusOrangeDotAi);
        let mut short = report(97);
        short.pop();

        // Act
        f.pipeline.handle_packet(&short, f.sched.now());
        f.pipeline.handle_packet(&report(201), f.sched.now());
        f.sched.advance(Duration::from_secs(2));

        // Assert
        assert!(f.sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_raw_framer_drops_reports_without_terminator_and_resyncs() {
        // Arrange
        let f = fixture(DeviceModel::BaseusOrangeDotAi);
        let mut framer = f.pipeline.new_framer().expect("baseus has a raw protocol");
        let keyboard_noise = [0x01u8; 64];

        // Act
        for _ in 0..1024 {
            assert!(framer.extend(&keyboard_noise).is_empty());
        }
        // 64 noise bytes leave the buffer empty at a 16 byte limit.
        let buffered_after_noise = framer.buffered();
        let packets = framer.extend(&report(104));

        // Assert
        assert_eq!(framer.limit(), 16);
        assert_eq!(buffered_after_noise, 0);
        assert_eq!(packets, vec![report(104)]);
    }

    #[test]
    fn test_grabbed_baseus_event_node_forwards_pointer_frame_only() {
        // Arrange
        let f = fixture(DeviceModel::BaseusOrangeDotAi);
        let batch = [
            RawInputEvent::new(EV_REL, REL_X, 4),
            RawInputEvent::new(EV_REL, REL_Y, -2),
            RawInputEvent::key(104, 1),
            RawInputEvent::sync(),
        ];

        // Act
        f.pipeline.handle_input_events(&batch, f.sched.now(), true);

        // Assert
        let batches = f.device.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], batch[..2].to_vec());
        assert!(f.sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_ungrabbed_node_forwards_nothing() {
        let f = fixture(DeviceModel::BaseusOrangeDotAi);
        f.pipeline
            .handle_input_events(&[RawInputEvent::new(EV_REL, REL_X, 4)], f.sched.now(), false);
        assert!(f.device.batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_vrbox_keys_become_gestures_and_motion_passes_through() {
        // Arrange
        let f = fixture(DeviceModel::GenericVrBox);

        // Act
        f.pipeline.handle_input_events(
            &[
                RawInputEvent::key(BTN_LEFT, 1),
                RawInputEvent::new(EV_REL, REL_X, 3),
                RawInputEvent::sync(),
            ],
            f.sched.now(),
            true,
        );
        f.sched.advance(Duration::from_millis(50));
        f.pipeline
            .handle_input_events(&[RawInputEvent::key(BTN_LEFT, 0)], f.sched.now(), true);
        f.sched.advance(Duration::from_secs(1));

        // Assert
        assert_eq!(*f.sink.0.lock().unwrap(), vec![GestureEvent::Tap(Button::G1)]);
        assert!(f.device.key_transitions().is_empty());
        assert_eq!(f.device.batches.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_disconnect_discards_pending_gestures() {
        // Arrange
        let f = fixture(DeviceModel::BaseusOrangeDotAi);
        f.pipeline.handle_packet(&report(100), f.sched.now());

        // Act
        f.pipeline.disconnected();
        f.sched.advance(Duration::from_secs(2));

        // Assert
        assert!(f.sink.0.lock().unwrap().is_empty());
        assert_eq!(f.sched.pending(), 0);
    }
}
