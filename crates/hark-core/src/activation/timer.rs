//! Single-slot deadline timer for the state machine's deferred actions.

use std::time::Instant;

/// Deferred actions the machine can hold, at most one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pending {
    /// Re-query the authoritative latched state after the settle delay.
    SettleCheck,
    /// Re-query and silently re-sync the cached state (post double-tap).
    Resync,
    /// Deferred single-tap action: start dictation.
    BeginDictation,
    /// Deferred single-tap action: stop dictation and process.
    FinishDictation,
}

/// Holds at most one pending deferred action. Scheduling always replaces the
/// previous slot, so a stale timer can never double-fire.
#[derive(Debug, Default)]
pub(crate) struct SlotTimer {
    slot: Option<(Instant, Pending)>,
}

impl SlotTimer {
    pub fn schedule(&mut self, due: Instant, action: Pending) {
        self.slot = Some((due, action));
    }

    pub fn cancel(&mut self) {
        self.slot = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.slot.map(|(due, _)| due)
    }

    /// Consume the pending action if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<Pending> {
        match self.slot {
            Some((due, action)) if now >= due => {
                self.slot = None;
                Some(action)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_schedule_replaces_pending_action() {
        let t0 = Instant::now();
        let mut timer = SlotTimer::default();
        timer.schedule(t0 + Duration::from_millis(10), Pending::SettleCheck);
        timer.schedule(t0 + Duration::from_millis(600), Pending::BeginDictation);

        // The first action is gone; only the replacement can fire.
        assert_eq!(timer.take_due(t0 + Duration::from_millis(10)), None);
        assert_eq!(
            timer.take_due(t0 + Duration::from_millis(600)),
            Some(Pending::BeginDictation)
        );
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn test_take_due_respects_deadline() {
        let t0 = Instant::now();
        let mut timer = SlotTimer::default();
        timer.schedule(t0 + Duration::from_millis(100), Pending::FinishDictation);
        assert_eq!(timer.take_due(t0), None);
        assert_eq!(
            timer.take_due(t0 + Duration::from_millis(100)),
            Some(Pending::FinishDictation)
        );
        // Fired actions do not repeat.
        assert_eq!(timer.take_due(t0 + Duration::from_millis(200)), None);
    }

    #[test]
    fn test_cancel_clears_slot() {
        let t0 = Instant::now();
        let mut timer = SlotTimer::default();
        timer.schedule(t0 + Duration::from_millis(50), Pending::SettleCheck);
        timer.cancel();
        assert_eq!(timer.deadline(), None);
        assert_eq!(timer.take_due(t0 + Duration::from_secs(1)), None);
    }
}
