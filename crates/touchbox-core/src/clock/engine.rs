//! Match clock implementation.
//!
//! The clock is a wall-clock-based countdown. It does not use internal
//! threads - the caller is responsible for calling `tick()` every poll cycle.
//!
//! ## States
//!
//! ```text
//! {Running, Stopped} x {Match, Rest}
//!
//! Match --next_phase--> Rest   (break-point saved, rest auto-starts)
//! Rest  --next_phase--> Match  (break-point restored, waits for start)
//! ```
//!
//! A finished match period cannot be restarted with `toggle_start_pause()`;
//! a finished rest period can.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::preset::{ClockReadout, ClockState, DurationPreset, MatchPhase, DEFAULT_REST_SECS};
use crate::events::Event;

/// Construction parameters for [`MatchClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSettings {
    pub duration: DurationPreset,
    pub rest_secs: u32,
    /// Milliseconds per clock second.
    pub tick_ms: u64,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            duration: DurationPreset::default(),
            rest_secs: DEFAULT_REST_SECS,
            tick_ms: 1000,
        }
    }
}

/// Countdown state machine for match and rest periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchClock {
    remaining_secs: u32,
    running: bool,
    phase: MatchPhase,
    duration: DurationPreset,
    breakpoint_secs: u32,
    rest_secs: u32,
    tick_ms: u64,
    /// Time of the last decrement, or of the last start.
    last_tick_ms: u64,
}

impl MatchClock {
    /// Stopped, in Match phase, loaded with the configured preset.
    pub fn new(settings: ClockSettings) -> Self {
        let secs = settings.duration.secs();
        Self {
            remaining_secs: secs,
            running: false,
            phase: MatchPhase::Match,
            duration: settings.duration,
            breakpoint_secs: secs,
            rest_secs: settings.rest_secs,
            tick_ms: settings.tick_ms,
            last_tick_ms: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_resting(&self) -> bool {
        self.phase == MatchPhase::Rest
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn breakpoint_secs(&self) -> u32 {
        self.breakpoint_secs
    }

    pub fn duration(&self) -> DurationPreset {
        self.duration
    }

    pub fn readout(&self) -> ClockReadout {
        ClockReadout::from_secs(self.remaining_secs)
    }

    pub fn snapshot(&self) -> ClockState {
        ClockState {
            remaining_secs: self.remaining_secs,
            running: self.running,
            phase: self.phase,
            duration: self.duration,
            breakpoint_secs: self.breakpoint_secs,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Call every poll cycle. Returns an event whenever a second elapsed,
    /// which is also the caller's cue to refresh the clock display.
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        if !self.running || self.remaining_secs == 0 {
            return None;
        }
        if now_ms.saturating_sub(self.last_tick_ms) < self.tick_ms {
            return None;
        }

        self.last_tick_ms = now_ms;
        self.remaining_secs -= 1;

        if self.remaining_secs == 0 {
            self.running = false;
            info!(phase = ?self.phase, "clock expired");
            return Some(Event::ClockExpired {
                phase: self.phase,
                at_ms: now_ms,
            });
        }

        debug!(remaining = self.remaining_secs, "clock tick");
        Some(Event::ClockTicked {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at_ms: now_ms,
        })
    }

    /// Flip between running and stopped.
    ///
    /// Refused when a match period has run out. A rest period at zero may
    /// still be started.
    pub fn toggle_start_pause(&mut self, now_ms: u64) -> Option<Event> {
        if self.remaining_secs == 0 && self.phase == MatchPhase::Match {
            debug!("start refused: match period finished");
            return None;
        }

        self.running = !self.running;
        if self.running {
            self.last_tick_ms = now_ms;
            Some(Event::ClockStarted {
                phase: self.phase,
                remaining_secs: self.remaining_secs,
                at_ms: now_ms,
            })
        } else {
            Some(Event::ClockPaused {
                phase: self.phase,
                remaining_secs: self.remaining_secs,
                at_ms: now_ms,
            })
        }
    }

    /// Match -> Rest or Rest -> Match.
    pub fn next_phase(&mut self, now_ms: u64) -> Event {
        match self.phase {
            MatchPhase::Match => {
                self.breakpoint_secs = self.remaining_secs;
                self.phase = MatchPhase::Rest;
                self.remaining_secs = self.rest_secs;
                self.running = true;
                self.last_tick_ms = now_ms;
                info!(breakpoint = self.breakpoint_secs, "entering rest");
            }
            MatchPhase::Rest => {
                self.phase = MatchPhase::Match;
                self.running = false;
                if self.breakpoint_secs > 0 {
                    self.remaining_secs = self.breakpoint_secs;
                } else {
                    self.load_preset();
                }
                info!(remaining = self.remaining_secs, "back to match");
            }
        }

        Event::PhaseChanged {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            running: self.running,
            breakpoint_secs: self.breakpoint_secs,
            at_ms: now_ms,
        }
    }

    /// Switch to the other preset. Always discards in-progress match time.
    pub fn toggle_duration_mode(&mut self, now_ms: u64) -> Event {
        self.phase = MatchPhase::Match;
        self.duration = self.duration.toggled();
        self.running = false;
        self.load_preset();
        info!(minutes = self.duration.minutes(), "duration preset switched");

        Event::DurationChanged {
            duration: self.duration,
            remaining_secs: self.remaining_secs,
            at_ms: now_ms,
        }
    }

    /// Reload the current phase's full length and stop.
    pub fn reset(&mut self, now_ms: u64) -> Event {
        self.running = false;
        match self.phase {
            MatchPhase::Rest => self.remaining_secs = self.rest_secs,
            MatchPhase::Match => self.load_preset(),
        }

        Event::ClockReset {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at_ms: now_ms,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn load_preset(&mut self) {
        self.remaining_secs = self.duration.secs();
        self.breakpoint_secs = self.remaining_secs;
    }
}
