//! Per-button gesture disambiguation.
//!
//! # The state machine (for beginners)
//!
//! A presenter button is just "down" and "up".  Users, however, mean
//! different things by a quick click, two quick clicks, and holding the
//! button.  The engine watches press/release edges and turns each physical
//! interaction into exactly one [`GestureEvent`]:
//!
//! ```text
//!            press                     long_press elapsed
//!  (none) ─────────► Pending(held) ───────────────────────► Held / Repeating
//!                       │    ▲                                   │
//!               release │    │ press within                      │ release
//!                       ▼    │ double_tap window                 ▼
//!                 Pending(released) ──► DoubleTap,         emit Release
//!                       │               Consumed
//!   long_press elapsed  │
//!                       ▼
//!                   emit Tap
//! ```
//!
//! Each tracked button owns one pending-task slot.  Installing a task drops
//! the previous handle, which cancels it, so there is never more than one
//! live timer per button.  Every task carries the id it was installed with
//! and does nothing if the slot has since moved on, which makes late timer
//! callbacks harmless.
//!
//! The state lock is only held while updating the table.  Events are
//! collected and handed to the [`GestureSink`] after the lock is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

use tracing::{debug, trace};

use super::events::{GestureEvent, GestureSink};
use super::profile::GestureProfile;
use super::scheduler::{Scheduler, TaskHandle};
use crate::device::buttons::Button;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for the long-press deadline.
    Pending,
    /// Long press fired; waiting for release.
    Held,
    /// Long press fired; repeat ticks running.
    Repeating,
    /// A double tap or combo already spoke for this press.
    Consumed,
}

#[derive(Debug, Clone, Copy)]
enum TaskKind {
    Resolve,
    Repeat,
}

struct ButtonState {
    pressed_at: Instant,
    order: u64,
    held: bool,
    phase: Phase,
    task: Option<(u64, TaskHandle)>,
}

impl ButtonState {
    fn task_id(&self) -> Option<u64> {
        self.task.as_ref().map(|(id, _)| *id)
    }
}

#[derive(Default)]
struct Table {
    buttons: HashMap<Button, ButtonState>,
    next_task: u64,
    next_order: u64,
}

impl Table {
    fn take_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    /// Applies a release to `button` and returns the event it produces.
    fn release(&mut self, button: Button) -> Option<GestureEvent> {
        let state = self.buttons.get_mut(&button)?;
        if !state.held {
            return None;
        }
        match state.phase {
            Phase::Pending => {
                // The pending resolve task will emit the Tap.
                state.held = false;
                None
            }
            Phase::Held | Phase::Repeating => {
                self.buttons.remove(&button);
                Some(GestureEvent::Release(button))
            }
            Phase::Consumed => {
                self.buttons.remove(&button);
                None
            }
        }
    }
}

struct Shared {
    profile: GestureProfile,
    scheduler: Arc<dyn Scheduler>,
    sink: Arc<dyn GestureSink>,
    table: Mutex<Table>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn arm(
        self: &Arc<Self>,
        table: &mut Table,
        button: Button,
        kind: TaskKind,
    ) -> (u64, TaskHandle) {
        let id = table.next_task;
        table.next_task += 1;
        let delay = match kind {
            TaskKind::Resolve => self.profile.long_press,
            TaskKind::Repeat => self.profile.repeat_interval,
        };
        let weak: Weak<Shared> = Arc::downgrade(self);
        let handle = self.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.on_timer(button, id, kind);
                }
            }),
        );
        (id, handle)
    }

    fn on_timer(self: &Arc<Self>, button: Button, id: u64, kind: TaskKind) {
        let event = {
            let mut table = self.lock();
            let held = match table.buttons.get(&button) {
                Some(state) if state.task_id() == Some(id) => state.held,
                _ => {
                    trace!(%button, "stale timer ignored");
                    return;
                }
            };
            match (kind, held) {
                (TaskKind::Resolve, false) => {
                    table.buttons.remove(&button);
                    GestureEvent::Tap(button)
                }
                (TaskKind::Resolve, true) => {
                    let repeat = self.profile.is_repeatable(button);
                    let next = repeat.then(|| self.arm(&mut table, button, TaskKind::Repeat));
                    if let Some(state) = table.buttons.get_mut(&button) {
                        state.task = next;
                        state.phase = if repeat { Phase::Repeating } else { Phase::Held };
                    }
                    GestureEvent::LongPress(button)
                }
                (TaskKind::Repeat, _) => {
                    let next = self.arm(&mut table, button, TaskKind::Repeat);
                    if let Some(state) = table.buttons.get_mut(&button) {
                        state.task = Some(next);
                    }
                    GestureEvent::RepeatTick(button)
                }
            }
        };
        self.emit(vec![event]);
    }

    fn emit(&self, events: Vec<GestureEvent>) {
        for event in events {
            debug!(gesture = %event, "gesture resolved");
            self.sink.on_gesture(event);
        }
    }
}

/// Gesture state machine for one device instance.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct GestureEngine {
    shared: Arc<Shared>,
}

impl GestureEngine {
    pub fn new(
        profile: GestureProfile,
        scheduler: Arc<dyn Scheduler>,
        sink: Arc<dyn GestureSink>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                profile,
                scheduler,
                sink,
                table: Mutex::new(Table::default()),
            }),
        }
    }

    pub fn profile(&self) -> &GestureProfile {
        &self.shared.profile
    }

    /// Handles a press edge observed at `at`.
    pub fn press(&self, button: Button, at: Instant) {
        let shared = &self.shared;
        let mut events = Vec::new();
        {
            let mut table = shared.lock();

            if let Some(previous) = table.buttons.remove(&button) {
                let pending_tap = !previous.held && previous.phase == Phase::Pending;
                let within_window =
                    at.saturating_duration_since(previous.pressed_at) < shared.profile.double_tap;
                // Dropping the old state cancels its task.
                drop(previous);

                if pending_tap && within_window {
                    let order = table.take_order();
                    table.buttons.insert(
                        button,
                        ButtonState {
                            pressed_at: at,
                            order,
                            held: true,
                            phase: Phase::Consumed,
                            task: None,
                        },
                    );
                    events.push(GestureEvent::DoubleTap(button));
                } else if pending_tap {
                    // Superseded before its deadline: the earlier tap still counts.
                    events.push(GestureEvent::Tap(button));
                }
            }

            if events.last() != Some(&GestureEvent::DoubleTap(button)) {
                let task = shared.arm(&mut table, button, TaskKind::Resolve);
                let order = table.take_order();
                table.buttons.insert(
                    button,
                    ButtonState {
                        pressed_at: at,
                        order,
                        held: true,
                        phase: Phase::Pending,
                        task: Some(task),
                    },
                );

                let combo = shared.profile.combos_with(button).find(|(_, partner)| {
                    table
                        .buttons
                        .get(partner)
                        .is_some_and(|s| s.held && s.phase == Phase::Pending)
                });
                if let Some(((a, b), _)) = combo {
                    for member in [a, b] {
                        if let Some(state) = table.buttons.get_mut(&member) {
                            state.task = None;
                            state.phase = Phase::Consumed;
                        }
                    }
                    events.push(GestureEvent::Combo(a, b));
                }
            }
        }
        shared.emit(events);
    }

    /// Handles a release edge.  Releasing an untracked button does nothing.
    pub fn release(&self, button: Button) {
        let event = self.shared.lock().release(button);
        self.shared.emit(event.into_iter().collect());
    }

    /// Releases every held button in the order it was pressed.
    pub fn release_all(&self) {
        let events = {
            let mut table = self.shared.lock();
            let mut held: Vec<(u64, Button)> = table
                .buttons
                .iter()
                .filter(|(_, s)| s.held)
                .map(|(b, s)| (s.order, *b))
                .collect();
            held.sort_unstable();
            held.into_iter()
                .filter_map(|(_, button)| table.release(button))
                .collect::<Vec<_>>()
        };
        self.shared.emit(events);
    }

    /// Forgets every tracked button and cancels its timers without emitting.
    pub fn reset(&self) {
        let mut table = self.shared.lock();
        if !table.buttons.is_empty() {
            debug!(count = table.buttons.len(), "dropping in-flight gesture state");
        }
        table.buttons.clear();
    }

    /// Buttons currently tracked, in press order.
    pub fn tracked(&self) -> Vec<Button> {
        let table = self.shared.lock();
        let mut buttons: Vec<(u64, Button)> =
            table.buttons.iter().map(|(b, s)| (s.order, *b)).collect();
        buttons.sort_unstable();
        buttons.into_iter().map(|(_, b)| b).collect()
    }
}
