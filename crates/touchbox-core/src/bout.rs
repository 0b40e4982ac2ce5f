//! One match session.
//!
//! [`Bout`] owns the ledger, clock, effect sequencer and arbiter, plus the
//! handles to the display and indicator collaborators. The caller runs
//! [`Bout::poll`] in a loop and forwards operator input to the command
//! methods; sensors post touches through a [`HitRegistrar`] from any thread.
//!
//! ## Usage
//!
//! ```ignore
//! let mut bout = Bout::new(settings, time, display, indicator);
//! let sensors = bout.registrar();
//! bout.toggle_start_pause();
//! // In a loop:
//! bout.poll();
//! for event in bout.drain_events() { /* ... */ }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::arbiter::{ArbiterTiming, HitArbiter, HitRegistrar};
use crate::clock::{ClockSettings, ClockState, MatchClock};
use crate::effects::{EffectSequencer, EffectTiming};
use crate::error::ValidationError;
use crate::events::Event;
use crate::output::{DisplayObserver, DisplaySink, IndicatorSink};
use crate::score::{Score, ScoreLedger, Side};
use crate::storage::Config;
use crate::time::TimeSource;

/// Timing parameters for every component of a bout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoutSettings {
    pub arbiter: ArbiterTiming,
    pub effects: EffectTiming,
    pub clock: ClockSettings,
}

impl BoutSettings {
    /// Validated settings from a configuration.
    pub fn from_config(config: &Config) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            arbiter: ArbiterTiming {
                window_ms: config.arbitration.window_ms,
                eval_delay_ms: config.arbitration.eval_delay_ms,
            },
            effects: EffectTiming {
                buzzer_ms: config.effects.buzzer_ms,
                light_ms: config.effects.light_ms,
            },
            clock: ClockSettings {
                duration: config.clock.duration,
                rest_secs: config.clock.rest_secs,
                tick_ms: config.clock.tick_ms,
            },
        })
    }
}

pub struct Bout {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    time: Arc<dyn TimeSource>,
    arbiter: HitArbiter,
    ledger: ScoreLedger,
    clock: MatchClock,
    effects: EffectSequencer,
    display: Arc<dyn DisplaySink>,
    /// The last decision stopped a running clock.
    paused_by_touch: bool,
    events: Vec<Event>,
}

impl std::fmt::Debug for Bout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bout")
            .field("session_id", &self.session_id)
            .field("arbiter", &self.arbiter)
            .field("ledger", &self.ledger)
            .field("clock", &self.clock)
            .field("effects", &self.effects)
            .finish()
    }
}

impl Bout {
    /// Fresh session: score 0-0, clock stopped at the configured preset,
    /// outputs off. Both displays are refreshed once.
    pub fn new(
        settings: BoutSettings,
        time: Arc<dyn TimeSource>,
        display: Arc<dyn DisplaySink>,
        indicator: Arc<dyn IndicatorSink>,
    ) -> Self {
        let mut ledger = ScoreLedger::new();
        ledger.set_observer(Box::new(DisplayObserver::new(Arc::clone(&display))));

        let mut effects = EffectSequencer::new(settings.effects, indicator);
        effects.force_clear();

        let mut bout = Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            time,
            arbiter: HitArbiter::new(settings.arbiter),
            ledger,
            clock: MatchClock::new(settings.clock),
            effects,
            display,
            paused_by_touch: false,
            events: Vec::new(),
        };
        bout.ledger.reset(true);
        bout.refresh_clock();
        info!(session = %bout.session_id, "bout initialised");
        bout
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Handle for the sensor layer.
    pub fn registrar(&self) -> HitRegistrar {
        self.arbiter.registrar(Arc::clone(&self.time))
    }

    pub fn score(&self) -> Score {
        self.ledger.score()
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.snapshot()
    }

    pub fn is_locked(&self) -> bool {
        self.arbiter.is_locked()
    }

    pub fn effects_active(&self) -> bool {
        self.effects.is_active()
    }

    pub fn now_ms(&self) -> u64 {
        self.time.now_ms()
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            session_id: self.session_id,
            started_at: self.started_at,
            clock: self.clock.snapshot(),
            score: self.ledger.score(),
            locked: self.arbiter.is_locked(),
            at_ms: self.time.now_ms(),
        }
    }

    /// Take every event produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Poll loop ────────────────────────────────────────────────────

    /// One cooperative cycle: clock tick, arbitration, effect decay.
    pub fn poll(&mut self) {
        let now = self.time.now_ms();

        if let Some(event) = self.clock.tick(now) {
            self.record_clock(event);
        }

        if let Some(decision) = self.arbiter.evaluate_if_due(
            now,
            &mut self.ledger,
            &mut self.clock,
            &mut self.effects,
        ) {
            self.paused_by_touch = decision.clock_event.is_some();
            if let Some(event) = decision.clock_event {
                self.record_clock(event);
            }
            let score = self.ledger.score();
            self.events.push(Event::TouchScored {
                scorer: decision.scorer,
                gap_ms: decision.gap_ms,
                red: score.red,
                green: score.green,
                at_ms: decision.decided_at_ms,
            });
        }

        if let Some(event) = self.effects.decay(now) {
            self.events.push(event);
        }
    }

    // ── Operator commands ────────────────────────────────────────────

    pub fn toggle_start_pause(&mut self) {
        let now = self.time.now_ms();
        if let Some(event) = self.clock.toggle_start_pause(now) {
            self.paused_by_touch = false;
            self.record_clock(event);
        }
    }

    /// Unlock for the next point and resume the clock if the decision had
    /// stopped it.
    pub fn next_point(&mut self) {
        let resume = self.paused_by_touch;
        self.unlock_for_next_point();
        if resume && !self.clock.is_running() {
            self.toggle_start_pause();
        }
    }

    /// Single "next" button: after a decision it readies the next point and
    /// restarts a stopped clock; otherwise it starts or pauses the clock.
    pub fn next_or_toggle(&mut self) {
        if !self.arbiter.is_locked() {
            self.toggle_start_pause();
            return;
        }
        self.unlock_for_next_point();
        if !self.clock.is_running() {
            self.toggle_start_pause();
        }
    }

    /// Unlock, zero the score and reset the clock.
    pub fn full_reset(&mut self) {
        let now = self.time.now_ms();
        self.arbiter.unlock(&mut self.effects);
        self.paused_by_touch = false;
        self.ledger.reset(true);
        self.events.push(Event::BoutReset { at_ms: now });
        let event = self.clock.reset(now);
        self.record_clock(event);
        info!("full reset");
    }

    pub fn next_phase(&mut self) {
        let event = self.clock.next_phase(self.time.now_ms());
        self.paused_by_touch = false;
        self.record_clock(event);
    }

    pub fn toggle_duration_mode(&mut self) {
        let event = self.clock.toggle_duration_mode(self.time.now_ms());
        self.paused_by_touch = false;
        self.record_clock(event);
    }

    /// Manual correction, floored at zero.
    pub fn adjust_score(&mut self, side: Side, delta: i32) {
        if side == Side::None || delta == 0 {
            return;
        }
        self.ledger.adjust(side, delta);
        let score = self.ledger.score();
        info!(?side, delta, red = score.red, green = score.green, "score adjusted");
        self.events.push(Event::ScoreAdjusted {
            side,
            delta,
            red: score.red,
            green: score.green,
            at_ms: self.time.now_ms(),
        });
    }

    /// Overwrite both scores.
    pub fn set_scores(&mut self, red: u32, green: u32) {
        let before = self.ledger.score();
        self.ledger.set_scores(red, green, false);
        let now = self.time.now_ms();
        for (side, old, new) in [(Side::Red, before.red, red), (Side::Green, before.green, green)] {
            if old != new {
                self.events.push(Event::ScoreAdjusted {
                    side,
                    delta: (i64::from(new) - i64::from(old))
                        .clamp(i64::from(i32::MIN), i64::from(i32::MAX))
                        as i32,
                    red,
                    green,
                    at_ms: now,
                });
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn unlock_for_next_point(&mut self) {
        self.arbiter.unlock(&mut self.effects);
        self.paused_by_touch = false;
        self.ledger.reset(false);
        let score = self.ledger.score();
        self.events.push(Event::PointReady {
            red: score.red,
            green: score.green,
            at_ms: self.time.now_ms(),
        });
        info!(red = score.red, green = score.green, "next point");
    }

    /// Push a clock event, refresh the clock digits and republish the
    /// running flag to the sensor gate.
    fn record_clock(&mut self, event: Event) {
        self.events.push(event);
        self.refresh_clock();
    }

    fn refresh_clock(&self) {
        let readout = self.clock.readout();
        self.display.show_clock(readout.minutes, readout.seconds);
        self.arbiter.set_clock_running(self.clock.is_running());
    }
}
