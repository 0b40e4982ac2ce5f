//! Hit arbitration.
//!
//! The two blades are read through independent, slightly skewed channels.
//! The first touch opens a window; a touch from the other side landing within
//! `window_ms` of it makes a double. The decision is held back until
//! `eval_delay_ms` after the first touch so a genuine second touch has time
//! to arrive.
//!
//! ```text
//! open --(first touch)--> window open --(now - first > D)--> locked
//! locked --unlock()--> open
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::signal::{HitRegistrar, HitSignal, SignalBoard};
use crate::clock::MatchClock;
use crate::effects::EffectSequencer;
use crate::events::Event;
use crate::score::{ScoreLedger, Side};
use crate::time::TimeSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterTiming {
    /// Simultaneity window (W).
    pub window_ms: u64,
    /// Evaluation delay (D).
    pub eval_delay_ms: u64,
}

impl Default for ArbiterTiming {
    fn default() -> Self {
        Self {
            window_ms: 40,
            eval_delay_ms: 45,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrationState {
    /// Timestamp of the touch that opened the window.
    pub first_hit_ms: Option<u64>,
    pub locked: bool,
    pub red_received: bool,
    pub green_received: bool,
}

/// A finalized decision.
#[derive(Debug, Clone, PartialEq)]
pub struct HitDecision {
    pub scorer: Side,
    /// Timestamp gap between the two touches of a double.
    pub gap_ms: Option<u64>,
    pub decided_at_ms: u64,
    /// Present when the decision stopped a running clock.
    pub clock_event: Option<Event>,
}

#[derive(Debug)]
pub struct HitArbiter {
    timing: ArbiterTiming,
    state: ArbitrationState,
    red_ts: Option<u64>,
    green_ts: Option<u64>,
    board: Arc<SignalBoard>,
}

impl HitArbiter {
    pub fn new(timing: ArbiterTiming) -> Self {
        Self {
            timing,
            state: ArbitrationState::default(),
            red_ts: None,
            green_ts: None,
            board: Arc::new(SignalBoard::default()),
        }
    }

    /// Handle for asynchronous producers.
    pub fn registrar(&self, time: Arc<dyn TimeSource>) -> HitRegistrar {
        HitRegistrar::new(Arc::clone(&self.board), time)
    }

    pub fn state(&self) -> ArbitrationState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state.locked
    }

    pub fn timing(&self) -> ArbiterTiming {
        self.timing
    }

    /// Tell producers whether the clock is running. Hits are only accepted
    /// while it is.
    pub fn set_clock_running(&self, running: bool) {
        self.board.set_clock_running(running);
    }

    /// Same as [`HitRegistrar::register_hit`].
    pub fn register_hit(&self, side: Side, timestamp_ms: u64) -> bool {
        self.board.register(side, timestamp_ms)
    }

    /// Poll step. Folds pending touches into the open window and finalizes
    /// the decision once the evaluation delay has passed.
    pub fn evaluate_if_due(
        &mut self,
        now_ms: u64,
        ledger: &mut ScoreLedger,
        clock: &mut MatchClock,
        effects: &mut EffectSequencer,
    ) -> Option<HitDecision> {
        if self.state.locked {
            self.board.clear_pending();
            return None;
        }

        if clock.is_running() {
            self.absorb(Side::Red);
            self.absorb(Side::Green);
        } else {
            self.board.clear_pending();
        }

        // A window opened while the clock ran is judged even if the clock
        // stopped since (e.g. expired inside the delay).
        let first = self.state.first_hit_ms?;
        if now_ms.saturating_sub(first) > self.timing.eval_delay_ms {
            Some(self.evaluate(now_ms, ledger, clock, effects))
        } else {
            None
        }
    }

    /// Finalize: lock, stop the clock, score, start the effects.
    pub fn evaluate(
        &mut self,
        now_ms: u64,
        ledger: &mut ScoreLedger,
        clock: &mut MatchClock,
        effects: &mut EffectSequencer,
    ) -> HitDecision {
        self.state.locked = true;
        self.board.set_locked(true);

        let clock_event = if clock.is_running() {
            clock.toggle_start_pause(now_ms)
        } else {
            None
        };
        self.board.set_clock_running(clock.is_running());

        let scorer = Side::from_flags(self.state.red_received, self.state.green_received);
        let gap_ms = match (self.red_ts, self.green_ts) {
            (Some(r), Some(g)) if scorer == Side::Both => Some(r.abs_diff(g)),
            _ => None,
        };

        match scorer {
            Side::Both => info!(gap_ms = gap_ms.unwrap_or(0), "double touch"),
            Side::Red | Side::Green => info!(?scorer, "touch scored"),
            Side::None => {
                error!(state = ?self.state, "decision with no received touch");
                debug_assert!(false, "arbitration window open with no received touch");
            }
        }

        ledger.award(scorer);
        effects.trigger(now_ms, scorer);
        info!(red = ledger.red(), green = ledger.green(), "score");

        HitDecision {
            scorer,
            gap_ms,
            decided_at_ms: now_ms,
            clock_event,
        }
    }

    /// Reopen arbitration for the next point and force the outputs off.
    pub fn unlock(&mut self, effects: &mut EffectSequencer) {
        self.state = ArbitrationState::default();
        self.red_ts = None;
        self.green_ts = None;
        self.board.clear_pending();
        self.board.set_locked(false);
        effects.force_clear();
    }

    fn absorb(&mut self, side: Side) {
        let signal: &HitSignal = match side {
            Side::Red => &self.board.red,
            Side::Green => &self.board.green,
            _ => return,
        };
        let Some(ts) = signal.take() else {
            return;
        };

        let first = *self.state.first_hit_ms.get_or_insert(ts);
        let gap = ts.abs_diff(first);
        if gap > self.timing.window_ms {
            info!(?side, gap_ms = gap, "late touch ignored");
            return;
        }

        debug!(?side, gap_ms = gap, "touch received");
        match side {
            Side::Red => {
                self.state.red_received = true;
                self.red_ts = Some(ts);
            }
            _ => {
                self.state.green_received = true;
                self.green_ts = Some(ts);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockSettings;
    use crate::effects::EffectTiming;
    use crate::output::{GuardedIndicator, IndicatorLog, IndicatorState, DEFAULT_LOCK_WAIT};
    use crate::score::Score;

    struct Rig {
        arbiter: HitArbiter,
        ledger: ScoreLedger,
        clock: MatchClock,
        effects: EffectSequencer,
        device: Arc<GuardedIndicator<IndicatorLog>>,
    }

    impl Rig {
        fn running() -> Self {
            let device = Arc::new(GuardedIndicator::new(IndicatorLog::default(), DEFAULT_LOCK_WAIT));
            let mut clock = MatchClock::new(ClockSettings::default());
            clock.toggle_start_pause(0);
            let arbiter = HitArbiter::new(ArbiterTiming::default());
            arbiter.set_clock_running(true);
            Self {
                arbiter,
                ledger: ScoreLedger::new(),
                clock,
                effects: EffectSequencer::new(EffectTiming::default(), device.clone()),
                device,
            }
        }

        fn poll(&mut self, now_ms: u64) -> Option<HitDecision> {
            self.arbiter
                .evaluate_if_due(now_ms, &mut self.ledger, &mut self.clock, &mut self.effects)
        }

        /// Poll every millisecond in `from..=to`, returning the first decision.
        fn poll_range(&mut self, from: u64, to: u64) -> Option<HitDecision> {
            (from..=to).find_map(|t| self.poll(t))
        }

        fn outputs(&self) -> IndicatorState {
            self.device.lock_within().unwrap().state
        }
    }

    #[test]
    fn double_touch_inside_window_scores_both() {
        let mut rig = Rig::running();
        rig.arbiter.register_hit(Side::Red, 0);
        rig.poll(0);
        rig.arbiter.register_hit(Side::Green, 30);

        let decision = rig.poll_range(1, 100).unwrap();
        assert_eq!(decision.scorer, Side::Both);
        assert_eq!(decision.gap_ms, Some(30));
        assert_eq!(decision.decided_at_ms, 46);
        assert_eq!(rig.ledger.score(), Score { red: 1, green: 1 });
        assert_eq!(rig.outputs().indicator, Side::Both);
    }

    #[test]
    fn single_touch_scores_alone() {
        let mut rig = Rig::running();
        rig.arbiter.register_hit(Side::Red, 0);
        let decision = rig.poll_range(0, 100).unwrap();
        assert_eq!(decision.scorer, Side::Red);
        assert_eq!(decision.gap_ms, None);
        assert_eq!(rig.ledger.score(), Score { red: 1, green: 0 });
        assert_eq!(
            rig.outputs(),
            IndicatorState {
                indicator: Side::Red,
                buzzer: true
            }
        );
    }

    #[test]
    fn touch_outside_window_is_never_credited() {
        let mut rig = Rig::running();
        rig.arbiter.register_hit(Side::Red, 0);
        rig.arbiter.register_hit(Side::Green, 50);
        let decision = rig.poll(46).unwrap();
        assert_eq!(decision.scorer, Side::Red);
        assert_eq!(rig.ledger.score(), Score { red: 1, green: 0 });
    }

    #[test]
    fn late_touch_after_window_before_decision_is_dropped() {
        let mut rig = Rig::running();
        rig.arbiter.register_hit(Side::Red, 100);
        assert!(rig.poll(100).is_none());
        rig.arbiter.register_hit(Side::Green, 142);
        assert!(rig.poll(142).is_none());
        assert!(rig.arbiter.state().first_hit_ms.is_some());
        assert!(!rig.arbiter.state().green_received);

        let decision = rig.poll(146).unwrap();
        assert_eq!(decision.scorer, Side::Red);
    }

    #[test]
    fn no_decision_before_delay_elapses() {
        let mut rig = Rig::running();
        rig.arbiter.register_hit(Side::Green, 0);
        for t in 0..=45 {
            assert!(rig.poll(t).is_none(), "decided early at {t}");
        }
        assert!(!rig.arbiter.is_locked());
        assert!(rig.poll(46).is_some());
    }

    #[test]
    fn decision_locks_and_pauses_clock() {
        let mut rig = Rig::running();
        rig.arbiter.register_hit(Side::Green, 10);
        let decision = rig.poll(60).unwrap();

        assert!(rig.arbiter.is_locked());
        assert!(!rig.clock.is_running());
        assert!(matches!(decision.clock_event, Some(Event::ClockPaused { .. })));
        assert!(rig.effects.is_active());
    }

    #[test]
    fn locked_arbiter_ignores_new_touches() {
        let mut rig = Rig::running();
        rig.arbiter.register_hit(Side::Red, 0);
        rig.poll(46).unwrap();

        assert!(!rig.arbiter.register_hit(Side::Green, 100));
        assert!(rig.poll_range(100, 500).is_none());
        assert_eq!(rig.ledger.score(), Score { red: 1, green: 0 });
    }

    #[test]
    fn touch_while_clock_stopped_is_dropped() {
        let mut rig = Rig::running();
        rig.clock.toggle_start_pause(5);
        rig.arbiter.set_clock_running(false);

        assert!(!rig.arbiter.register_hit(Side::Red, 10));
        assert!(rig.poll_range(10, 200).is_none());
        assert_eq!(rig.arbiter.state(), ArbitrationState::default());
    }

    #[test]
    fn stale_pending_touch_is_drained_when_clock_stops() {
        let mut rig = Rig::running();
        rig.arbiter.register_hit(Side::Red, 10);
        rig.clock.toggle_start_pause(11);

        assert!(rig.poll_range(11, 200).is_none());
        assert!(!rig.board_pending());
    }

    #[test]
    fn open_window_is_judged_after_clock_expires() {
        let mut rig = Rig::running();
        rig.arbiter.register_hit(Side::Red, 0);
        rig.poll(0);
        rig.clock.toggle_start_pause(20);

        let decision = rig.poll(46).unwrap();
        assert_eq!(decision.scorer, Side::Red);
        assert!(decision.clock_event.is_none());
    }

    #[test]
    fn unlock_reopens_and_clears_outputs() {
        let mut rig = Rig::running();
        rig.arbiter.register_hit(Side::Both, 0);
        rig.poll(46).unwrap();
        assert_eq!(rig.outputs().indicator, Side::Both);

        rig.arbiter.unlock(&mut rig.effects);
        assert_eq!(rig.arbiter.state(), ArbitrationState::default());
        assert_eq!(rig.outputs(), IndicatorState::default());

        rig.clock.toggle_start_pause(100);
        rig.arbiter.set_clock_running(true);
        assert!(rig.arbiter.register_hit(Side::Green, 200));
        let decision = rig.poll(246).unwrap();
        assert_eq!(decision.scorer, Side::Green);
        assert_eq!(rig.ledger.score(), Score { red: 1, green: 2 });
    }

    #[test]
    fn earlier_green_absorbed_with_red_in_one_poll_is_a_double() {
        let mut rig = Rig::running();
        rig.arbiter.register_hit(Side::Red, 30);
        rig.arbiter.register_hit(Side::Green, 0);
        assert!(rig.poll(30).is_none());

        let state = rig.arbiter.state();
        assert!(state.red_received && state.green_received);

        let decision = rig.poll_range(31, 200).unwrap();
        assert_eq!(decision.scorer, Side::Both);
        assert_eq!(decision.gap_ms, Some(30));
        assert_eq!(rig.ledger.score(), Score { red: 1, green: 1 });
    }

    impl Rig {
        fn board_pending(&self) -> bool {
            self.arbiter.board.red.is_pending() || self.arbiter.board.green.is_pending()
        }
    }
}
