//! Post-decision light and sound sequence.
//!
//! After a touch is scored the buzzer sounds for `buzzer_ms` and the
//! indicator(s) stay lit for `light_ms`. The sequence is a pure function of
//! the time elapsed since `trigger()`; `decay()` is polled every cycle and
//! switches outputs off as their windows close.
//!
//! There is no cancellation. `force_clear()` turns the outputs off at once
//! and drops any turn-on write still waiting for a retry; the light-off
//! bookkeeping is untouched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::events::Event;
use crate::output::IndicatorSink;
use crate::score::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectTiming {
    pub buzzer_ms: u64,
    pub light_ms: u64,
}

impl Default for EffectTiming {
    fn default() -> Self {
        Self {
            buzzer_ms: 800,
            light_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveEffect {
    started_ms: u64,
    side: Side,
    /// The turn-on writes have landed on the device.
    asserted: bool,
    buzzer_done: bool,
}

pub struct EffectSequencer {
    timing: EffectTiming,
    output: Arc<dyn IndicatorSink>,
    active: Option<ActiveEffect>,
}

impl std::fmt::Debug for EffectSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectSequencer")
            .field("timing", &self.timing)
            .field("active", &self.active)
            .finish()
    }
}

impl EffectSequencer {
    pub fn new(timing: EffectTiming, output: Arc<dyn IndicatorSink>) -> Self {
        Self {
            timing,
            output,
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn timing(&self) -> EffectTiming {
        self.timing
    }

    /// Start the sequence for `side` at `start_ms`. A running sequence is
    /// replaced.
    pub fn trigger(&mut self, start_ms: u64, side: Side) {
        let mut effect = ActiveEffect {
            started_ms: start_ms,
            side,
            asserted: false,
            buzzer_done: false,
        };
        effect.asserted = self.assert_outputs(&effect, true);
        self.active = Some(effect);
    }

    /// Switch off whatever has outlived its window. Returns
    /// `Event::EffectsFinished` once the lights go out; no-op while idle.
    pub fn decay(&mut self, now_ms: u64) -> Option<Event> {
        let mut effect = self.active?;
        let elapsed = now_ms.saturating_sub(effect.started_ms);

        if elapsed > self.timing.light_ms {
            if let Err(e) = self.output.set_buzzer(false) {
                warn!(error = %e, "buzzer off skipped this cycle");
                return None;
            }
            if let Err(e) = self.output.set_indicator(Side::None) {
                warn!(error = %e, "indicator off skipped this cycle");
                return None;
            }
            self.active = None;
            debug!("effects finished");
            return Some(Event::EffectsFinished { at_ms: now_ms });
        }

        if !effect.asserted {
            let with_buzzer = elapsed <= self.timing.buzzer_ms;
            effect.asserted = self.assert_outputs(&effect, with_buzzer);
            if !with_buzzer {
                effect.buzzer_done = true;
            }
        }

        if effect.asserted && !effect.buzzer_done && elapsed > self.timing.buzzer_ms {
            match self.output.set_buzzer(false) {
                Ok(()) => effect.buzzer_done = true,
                Err(e) => warn!(error = %e, "buzzer off skipped this cycle"),
            }
        }

        self.active = Some(effect);
        None
    }

    /// Immediate override: outputs off now. A running sequence still
    /// finishes through `decay()` but never turns anything back on.
    pub fn force_clear(&mut self) {
        if let Some(effect) = self.active.as_mut() {
            effect.asserted = true;
            effect.buzzer_done = true;
        }
        if let Err(e) = self.output.set_indicator(Side::None) {
            warn!(error = %e, "forced indicator clear skipped");
        }
        if let Err(e) = self.output.set_buzzer(false) {
            warn!(error = %e, "forced buzzer clear skipped");
        }
    }

    fn assert_outputs(&self, effect: &ActiveEffect, with_buzzer: bool) -> bool {
        if with_buzzer {
            if let Err(e) = self.output.set_buzzer(true) {
                warn!(error = %e, "buzzer on deferred to next cycle");
                return false;
            }
        }
        if let Err(e) = self.output.set_indicator(effect.side) {
            warn!(error = %e, "indicator on deferred to next cycle");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutputError;
    use crate::output::{GuardedIndicator, IndicatorLog, IndicatorState, DEFAULT_LOCK_WAIT};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn sequencer() -> (EffectSequencer, Arc<GuardedIndicator<IndicatorLog>>) {
        let dev = Arc::new(GuardedIndicator::new(IndicatorLog::default(), DEFAULT_LOCK_WAIT));
        (EffectSequencer::new(EffectTiming::default(), dev.clone()), dev)
    }

    fn state(dev: &GuardedIndicator<IndicatorLog>) -> IndicatorState {
        dev.lock_within().unwrap().state
    }

    #[test]
    fn trigger_turns_everything_on() {
        let (mut seq, dev) = sequencer();
        seq.trigger(0, Side::Red);
        assert!(seq.is_active());
        assert_eq!(
            state(&dev),
            IndicatorState {
                indicator: Side::Red,
                buzzer: true
            }
        );
    }

    #[test]
    fn buzzer_stops_before_lights() {
        let (mut seq, dev) = sequencer();
        seq.trigger(0, Side::Both);

        assert!(seq.decay(800).is_none());
        assert!(state(&dev).buzzer);

        assert!(seq.decay(801).is_none());
        assert!(!state(&dev).buzzer);
        assert_eq!(state(&dev).indicator, Side::Both);

        assert!(seq.decay(3000).is_none());
        assert_eq!(seq.decay(3001), Some(Event::EffectsFinished { at_ms: 3001 }));
        assert_eq!(state(&dev), IndicatorState::default());
        assert!(!seq.is_active());
    }

    #[test]
    fn decay_after_finish_is_noop() {
        let (mut seq, dev) = sequencer();
        seq.trigger(0, Side::Green);
        seq.decay(5000);
        let writes = dev.lock_within().unwrap().writes.len();

        for t in [5001, 6000, 90_000] {
            assert!(seq.decay(t).is_none());
        }
        assert_eq!(dev.lock_within().unwrap().writes.len(), writes);
    }

    #[test]
    fn force_clear_keeps_bookkeeping() {
        let (mut seq, dev) = sequencer();
        seq.trigger(0, Side::Red);
        seq.force_clear();
        assert_eq!(state(&dev), IndicatorState::default());
        assert!(seq.is_active());
        assert!(seq.decay(3001).is_some());
    }

    /// Sink that times out for the first `failures` writes.
    struct Flaky {
        failures: AtomicU32,
        state: Mutex<IndicatorState>,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                state: Mutex::new(IndicatorState::default()),
            }
        }

        fn fail(&self) -> Result<(), OutputError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(OutputError::LockTimeout { waited_ms: 10 });
            }
            Ok(())
        }
    }

    impl IndicatorSink for Flaky {
        fn set_indicator(&self, side: Side) -> Result<(), OutputError> {
            self.fail()?;
            self.state.lock().unwrap().indicator = side;
            Ok(())
        }

        fn set_buzzer(&self, on: bool) -> Result<(), OutputError> {
            self.fail()?;
            self.state.lock().unwrap().buzzer = on;
            Ok(())
        }
    }

    #[test]
    fn timed_out_turn_on_is_reasserted_next_cycle() {
        let sink = Arc::new(Flaky::new(1));
        let mut seq = EffectSequencer::new(EffectTiming::default(), sink.clone());
        seq.trigger(0, Side::Red);
        assert_eq!(*sink.state.lock().unwrap(), IndicatorState::default());

        seq.decay(1);
        assert_eq!(
            *sink.state.lock().unwrap(),
            IndicatorState {
                indicator: Side::Red,
                buzzer: true
            }
        );
    }

    #[test]
    fn cleared_effect_is_not_reasserted() {
        let sink = Arc::new(Flaky::new(1));
        let mut seq = EffectSequencer::new(EffectTiming::default(), sink.clone());
        seq.trigger(0, Side::Red);
        seq.force_clear();

        assert!(seq.decay(1).is_none());
        assert_eq!(*sink.state.lock().unwrap(), IndicatorState::default());
        assert!(seq.decay(900).is_none());
        assert_eq!(*sink.state.lock().unwrap(), IndicatorState::default());
        assert!(seq.decay(3001).is_some());
        assert!(!seq.is_active());
    }

    #[test]
    fn timed_out_turn_off_retries_until_it_lands() {
        let sink = Arc::new(Flaky::new(0));
        let mut seq = EffectSequencer::new(EffectTiming::default(), sink.clone());
        seq.trigger(0, Side::Green);

        sink.failures.store(1, Ordering::SeqCst);
        assert!(seq.decay(3001).is_none());
        assert!(seq.is_active());

        assert!(seq.decay(3002).is_some());
        assert_eq!(*sink.state.lock().unwrap(), IndicatorState::default());
    }
}
