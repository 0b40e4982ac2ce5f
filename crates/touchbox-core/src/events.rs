use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{ClockState, DurationPreset, MatchPhase};
use crate::score::{Score, Side};

/// Every state change of a bout produces an Event.
/// The caller drains them after each poll or command.
///
/// `at_ms` is the monotonic time of the [`crate::TimeSource`] driving the bout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ClockStarted {
        phase: MatchPhase,
        remaining_secs: u32,
        at_ms: u64,
    },
    ClockPaused {
        phase: MatchPhase,
        remaining_secs: u32,
        at_ms: u64,
    },
    /// One second elapsed on a running clock.
    ClockTicked {
        phase: MatchPhase,
        remaining_secs: u32,
        at_ms: u64,
    },
    /// The clock hit zero and stopped itself.
    ClockExpired {
        phase: MatchPhase,
        at_ms: u64,
    },
    PhaseChanged {
        phase: MatchPhase,
        remaining_secs: u32,
        running: bool,
        breakpoint_secs: u32,
        at_ms: u64,
    },
    DurationChanged {
        duration: DurationPreset,
        remaining_secs: u32,
        at_ms: u64,
    },
    ClockReset {
        phase: MatchPhase,
        remaining_secs: u32,
        at_ms: u64,
    },
    /// A hit decision was finalized and scored.
    TouchScored {
        scorer: Side,
        /// Timestamp gap between the two touches of a double.
        gap_ms: Option<u64>,
        red: u32,
        green: u32,
        at_ms: u64,
    },
    /// The light phase of the post-touch effect ran out.
    EffectsFinished {
        at_ms: u64,
    },
    /// Arbitration unlocked for the next point.
    PointReady {
        red: u32,
        green: u32,
        at_ms: u64,
    },
    BoutReset {
        at_ms: u64,
    },
    ScoreAdjusted {
        side: Side,
        delta: i32,
        red: u32,
        green: u32,
        at_ms: u64,
    },
    StateSnapshot {
        session_id: Uuid,
        started_at: DateTime<Utc>,
        clock: ClockState,
        score: Score,
        locked: bool,
        at_ms: u64,
    },
}

impl Event {
    /// Per-second clock ticks; callers printing a transcript usually skip these.
    pub fn is_tick(&self) -> bool {
        matches!(self, Event::ClockTicked { .. })
    }
}
