//! The activation state machine.
//!
//! Turns raw toggle-key presses plus an authoritative latched-state query
//! into clean start/stop/cancel commands. The OS delivers the key-down event
//! slightly before the latch flag updates, so every press is followed by a
//! settle-delayed re-query instead of trusting the event itself. A second
//! press inside the double-tap window coalesces into a meeting toggle and
//! cancels whatever single-tap action was pending.
//!
//! The machine never blocks and performs no I/O: it mutates its cached
//! state, manages one deferred-action slot, and returns commands for the
//! owning controller to execute. Time is always passed in, which keeps the
//! timing logic deterministic under test.

use std::time::{Duration, Instant};
use tracing::debug;

use super::timer::{Pending, SlotTimer};
use super::{ActivationEvent, ActivationKind, Command, KeyEvent, LatchProbe};
use crate::settings::GestureSettings;

/// Timing knobs for gesture classification.
#[derive(Debug, Clone, Copy)]
pub struct ActivationConfig {
    /// Pause before re-querying the latched state after a raw press.
    pub settle_delay: Duration,
    /// Two presses within this window form a double-tap.
    pub double_tap_window: Duration,
    /// Whether double-tap toggles meeting recording. When disabled,
    /// single-tap actions fire right after the settle check.
    pub double_tap_enabled: bool,
}

impl ActivationConfig {
    pub fn from_settings(gesture: &GestureSettings) -> Self {
        Self {
            settle_delay: Duration::from_millis(gesture.settle_delay_ms),
            double_tap_window: Duration::from_millis(gesture.double_tap_window_ms),
            double_tap_enabled: gesture.double_tap_enabled,
        }
    }
}

/// Read-only snapshot of session state, supplied by the controller on every
/// call. The machine never owns recording state itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionView {
    pub dictation_active: bool,
    pub meeting_active: bool,
}

pub struct ActivationMachine {
    config: ActivationConfig,
    /// Cached latched state, updated only from settle-delayed probe reads.
    latched: bool,
    last_toggle_press: Option<Instant>,
    timer: SlotTimer,
}

impl ActivationMachine {
    /// `initially_latched` seeds the cache from a startup probe so a key
    /// already latched at daemon launch is not misread as a transition.
    pub fn new(config: ActivationConfig, initially_latched: bool) -> Self {
        Self {
            config,
            latched: initially_latched,
            last_toggle_press: None,
            timer: SlotTimer::default(),
        }
    }

    /// When the controller must next call [`Self::on_deadline`].
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Feed one raw key event. Returns commands to execute now.
    pub fn handle_key(&mut self, event: KeyEvent, now: Instant, view: SessionView) -> Vec<Command> {
        match event {
            KeyEvent::TogglePressed => self.on_toggle_press(now),
            KeyEvent::CancelPressed => {
                if !view.dictation_active {
                    return Vec::new();
                }
                // Cancellation is instantaneous: no settle delay, no probe.
                self.timer.cancel();
                self.trace(ActivationEvent {
                    kind: ActivationKind::Cancel,
                    observed_at: now,
                });
                vec![Command::CancelDictation]
            }
            KeyEvent::ClearPressed => {
                if view.dictation_active {
                    vec![Command::ClearDictationBuffer]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn on_toggle_press(&mut self, now: Instant) -> Vec<Command> {
        let is_double_tap = self.config.double_tap_enabled
            && self
                .last_toggle_press
                .is_some_and(|prev| now.duration_since(prev) < self.config.double_tap_window);

        if is_double_tap {
            // Consume both presses and whatever single-tap action was
            // pending. The latch has flipped twice, so the cache only needs
            // a silent re-sync once the state settles.
            self.last_toggle_press = None;
            self.timer
                .schedule(now + self.config.settle_delay, Pending::Resync);
            debug!("double-tap detected, toggling meeting recording");
            return vec![Command::ToggleMeeting];
        }

        self.last_toggle_press = Some(now);
        self.timer
            .schedule(now + self.config.settle_delay, Pending::SettleCheck);
        Vec::new()
    }

    /// Called by the controller once `next_deadline()` has passed.
    pub fn on_deadline(
        &mut self,
        now: Instant,
        probe: &dyn LatchProbe,
        view: SessionView,
    ) -> Vec<Command> {
        let Some(action) = self.timer.take_due(now) else {
            return Vec::new();
        };

        match action {
            Pending::SettleCheck => self.settle_check(now, probe, view),
            Pending::Resync => {
                self.latched = probe.is_latched();
                Vec::new()
            }
            Pending::BeginDictation => vec![Command::StartDictation],
            Pending::FinishDictation => vec![Command::StopDictation],
        }
    }

    fn settle_check(
        &mut self,
        now: Instant,
        probe: &dyn LatchProbe,
        view: SessionView,
    ) -> Vec<Command> {
        let actual = probe.is_latched();

        if actual && !self.latched {
            self.latched = true;
            self.trace(ActivationEvent {
                kind: ActivationKind::LatchOn,
                observed_at: now,
            });
            if self.config.double_tap_enabled {
                // Defer so a second tap can still coalesce into a meeting
                // toggle instead of a dictation start.
                self.timer
                    .schedule(now + self.config.double_tap_window, Pending::BeginDictation);
                Vec::new()
            } else {
                vec![Command::StartDictation]
            }
        } else if !actual && self.latched {
            self.latched = false;
            self.trace(ActivationEvent {
                kind: ActivationKind::LatchOff,
                observed_at: now,
            });
            if !view.dictation_active {
                return Vec::new();
            }
            if self.config.double_tap_enabled {
                self.timer
                    .schedule(now + self.config.double_tap_window, Pending::FinishDictation);
                Vec::new()
            } else {
                vec![Command::StopDictation]
            }
        } else {
            // Duplicate or stale event; the authoritative state did not
            // transition.
            Vec::new()
        }
    }

    fn trace(&self, event: ActivationEvent) {
        debug!("activation: {:?}", event.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    struct FakeProbe {
        latched: Cell<bool>,
    }

    impl FakeProbe {
        fn new(latched: bool) -> Self {
            Self {
                latched: Cell::new(latched),
            }
        }

        /// Simulate the physical latch flipping on a key press.
        fn flip(&self) {
            self.latched.set(!self.latched.get());
        }
    }

    impl LatchProbe for FakeProbe {
        fn is_latched(&self) -> bool {
            self.latched.get()
        }
    }

    fn config() -> ActivationConfig {
        ActivationConfig {
            settle_delay: Duration::from_millis(10),
            double_tap_window: Duration::from_millis(600),
            double_tap_enabled: true,
        }
    }

    fn at(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    /// Fire every due deadline up to and including `until`, collecting
    /// emitted commands.
    fn drain(
        machine: &mut ActivationMachine,
        probe: &FakeProbe,
        view: SessionView,
        until: Instant,
    ) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Some(deadline) = machine.next_deadline() {
            if deadline > until {
                break;
            }
            commands.extend(machine.on_deadline(deadline, probe, view));
        }
        commands
    }

    #[test]
    fn test_single_press_starts_dictation_after_window() {
        let t0 = Instant::now();
        let mut machine = ActivationMachine::new(config(), false);
        let probe = FakeProbe::new(false);
        let view = SessionView::default();

        probe.flip();
        assert!(machine.handle_key(KeyEvent::TogglePressed, t0, view).is_empty());

        // Settle check runs, but the start is deferred past the double-tap
        // window.
        let cmds = drain(&mut machine, &probe, view, at(t0, 10));
        assert!(cmds.is_empty());

        let cmds = drain(&mut machine, &probe, view, at(t0, 700));
        assert_eq!(cmds, vec![Command::StartDictation]);
    }

    #[test]
    fn test_two_presses_within_window_are_one_double_tap() {
        let t0 = Instant::now();
        let mut machine = ActivationMachine::new(config(), false);
        let probe = FakeProbe::new(false);
        let view = SessionView::default();

        probe.flip();
        machine.handle_key(KeyEvent::TogglePressed, t0, view);
        let cmds = drain(&mut machine, &probe, view, at(t0, 10));
        assert!(cmds.is_empty());

        probe.flip();
        let cmds = machine.handle_key(KeyEvent::TogglePressed, at(t0, 50), view);
        assert_eq!(cmds, vec![Command::ToggleMeeting]);

        // Nothing else fires: the pending dictation start was cancelled and
        // the resync is silent.
        let cmds = drain(&mut machine, &probe, view, at(t0, 2000));
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_presses_a_second_apart_are_independent_actions() {
        let t0 = Instant::now();
        let mut machine = ActivationMachine::new(config(), false);
        let probe = FakeProbe::new(false);

        let idle = SessionView::default();
        probe.flip();
        machine.handle_key(KeyEvent::TogglePressed, t0, idle);
        let cmds = drain(&mut machine, &probe, idle, at(t0, 900));
        assert_eq!(cmds, vec![Command::StartDictation]);

        // Second press lands outside the window while dictating.
        let dictating = SessionView {
            dictation_active: true,
            meeting_active: false,
        };
        probe.flip();
        let cmds = machine.handle_key(KeyEvent::TogglePressed, at(t0, 1000), dictating);
        assert!(cmds.is_empty());
        let cmds = drain(&mut machine, &probe, dictating, at(t0, 2000));
        assert_eq!(cmds, vec![Command::StopDictation]);
    }

    #[test]
    fn test_stale_press_without_transition_is_suppressed() {
        let t0 = Instant::now();
        let mut machine = ActivationMachine::new(config(), true);
        let probe = FakeProbe::new(true);
        let view = SessionView::default();

        // Event arrives but the authoritative state never changed.
        machine.handle_key(KeyEvent::TogglePressed, t0, view);
        let cmds = drain(&mut machine, &probe, view, at(t0, 2000));
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_latch_off_without_active_dictation_is_a_noop() {
        let t0 = Instant::now();
        let mut machine = ActivationMachine::new(config(), true);
        let probe = FakeProbe::new(false);
        let view = SessionView::default();

        machine.handle_key(KeyEvent::TogglePressed, t0, view);
        let cmds = drain(&mut machine, &probe, view, at(t0, 2000));
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_cancel_fires_immediately_without_probe() {
        let t0 = Instant::now();
        let mut machine = ActivationMachine::new(config(), true);
        let dictating = SessionView {
            dictation_active: true,
            meeting_active: false,
        };

        let cmds = machine.handle_key(KeyEvent::CancelPressed, t0, dictating);
        assert_eq!(cmds, vec![Command::CancelDictation]);
        // Cancellation also clears any pending deferred action.
        assert_eq!(machine.next_deadline(), None);
    }

    #[test]
    fn test_cancel_without_session_is_ignored() {
        let t0 = Instant::now();
        let mut machine = ActivationMachine::new(config(), false);
        let cmds = machine.handle_key(KeyEvent::CancelPressed, t0, SessionView::default());
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_clear_buffer_requires_active_dictation() {
        let t0 = Instant::now();
        let mut machine = ActivationMachine::new(config(), true);

        let cmds = machine.handle_key(KeyEvent::ClearPressed, t0, SessionView::default());
        assert!(cmds.is_empty());

        let dictating = SessionView {
            dictation_active: true,
            meeting_active: false,
        };
        let cmds = machine.handle_key(KeyEvent::ClearPressed, t0, dictating);
        assert_eq!(cmds, vec![Command::ClearDictationBuffer]);
    }

    #[test]
    fn test_only_one_deferred_action_outstanding() {
        let t0 = Instant::now();
        let mut machine = ActivationMachine::new(
            ActivationConfig {
                double_tap_enabled: false,
                ..config()
            },
            false,
        );
        let view = SessionView::default();

        machine.handle_key(KeyEvent::TogglePressed, t0, view);
        let first = machine.next_deadline().unwrap();
        machine.handle_key(KeyEvent::TogglePressed, at(t0, 5), view);
        let second = machine.next_deadline().unwrap();

        // The second press replaced the first settle check.
        assert!(second > first);
        let probe = FakeProbe::new(true);
        let cmds = drain(&mut machine, &probe, view, at(t0, 100));
        // A single transition, a single command.
        assert_eq!(cmds, vec![Command::StartDictation]);
    }

    #[test]
    fn test_disabled_double_tap_starts_immediately() {
        let t0 = Instant::now();
        let mut machine = ActivationMachine::new(
            ActivationConfig {
                double_tap_enabled: false,
                ..config()
            },
            false,
        );
        let probe = FakeProbe::new(false);
        let view = SessionView::default();

        probe.flip();
        machine.handle_key(KeyEvent::TogglePressed, t0, view);
        let cmds = drain(&mut machine, &probe, view, at(t0, 10));
        assert_eq!(cmds, vec![Command::StartDictation]);
    }

    #[test]
    fn test_double_tap_during_dictation_keeps_dictating() {
        let t0 = Instant::now();
        let mut machine = ActivationMachine::new(config(), true);
        let probe = FakeProbe::new(true);
        let dictating = SessionView {
            dictation_active: true,
            meeting_active: false,
        };

        // First tap flips the latch off; a deferred stop gets scheduled.
        probe.flip();
        machine.handle_key(KeyEvent::TogglePressed, t0, dictating);
        let cmds = drain(&mut machine, &probe, dictating, at(t0, 10));
        assert!(cmds.is_empty());

        // Second tap inside the window: meeting toggles, the stop is
        // cancelled, dictation carries on.
        probe.flip();
        let cmds = machine.handle_key(KeyEvent::TogglePressed, at(t0, 80), dictating);
        assert_eq!(cmds, vec![Command::ToggleMeeting]);
        let cmds = drain(&mut machine, &probe, dictating, at(t0, 2000));
        assert!(cmds.is_empty());
    }
}
