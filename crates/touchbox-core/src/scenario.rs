//! Scripted bouts.
//!
//! A scenario is a timeline of operator and sensor actions replayed against a
//! [`Bout`] driven by a [`ManualClock`], polling once per millisecond. It
//! makes arbitration and clock behaviour reproducible outside of tests.
//!
//! ```json
//! {
//!   "steps": [
//!     { "at_ms": 0,    "action": "toggle_start_pause" },
//!     { "at_ms": 1000, "action": "hit", "side": "red" },
//!     { "at_ms": 1030, "action": "hit", "side": "green" },
//!     { "at_ms": 5000, "action": "next_point" }
//!   ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bout::{Bout, BoutSettings};
use crate::error::Result;
use crate::events::Event;
use crate::output::{DisplayFrame, DisplayLog, GuardedIndicator, IndicatorLog, IndicatorState, DEFAULT_LOCK_WAIT};
use crate::score::Side;
use crate::time::ManualClock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Hit { side: Side },
    ToggleStartPause,
    NextPoint,
    NextOrToggle,
    FullReset,
    NextPhase,
    ToggleDuration,
    Adjust { side: Side, delta: i32 },
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Step>,
    /// Keep polling until this time even after the last step.
    #[serde(default)]
    pub run_until_ms: Option<u64>,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub events: Vec<Event>,
    pub display: Vec<DisplayFrame>,
    pub outputs: IndicatorState,
    pub snapshot: Event,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Last instant the replay polls.
    pub fn end_ms(&self) -> u64 {
        let last_step = self.steps.iter().map(|s| s.at_ms).max().unwrap_or(0);
        last_step.max(self.run_until_ms.unwrap_or(0))
    }

    /// Replay against a fresh bout. Steps sharing a timestamp apply in file
    /// order, before that millisecond's poll.
    pub fn run(&self, settings: BoutSettings) -> ScenarioReport {
        let time = Arc::new(ManualClock::new(0));
        let display = Arc::new(DisplayLog::new());
        let device = Arc::new(GuardedIndicator::new(IndicatorLog::default(), DEFAULT_LOCK_WAIT));
        let mut bout = Bout::new(settings, time.clone(), display.clone(), device.clone());
        let sensors = bout.registrar();

        let mut steps: Vec<&Step> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.at_ms);
        let mut pending = steps.into_iter().peekable();

        let mut events = Vec::new();
        for now in 0..=self.end_ms() {
            time.set(now);
            while let Some(step) = pending.next_if(|s| s.at_ms == now) {
                debug!(at_ms = now, action = ?step.action, "scenario step");
                match step.action {
                    Action::Hit { side } => {
                        sensors.register_hit(side, now);
                    }
                    Action::ToggleStartPause => bout.toggle_start_pause(),
                    Action::NextPoint => bout.next_point(),
                    Action::NextOrToggle => bout.next_or_toggle(),
                    Action::FullReset => bout.full_reset(),
                    Action::NextPhase => bout.next_phase(),
                    Action::ToggleDuration => bout.toggle_duration_mode(),
                    Action::Adjust { side, delta } => bout.adjust_score(side, delta),
                    Action::Snapshot => events.push(bout.snapshot()),
                }
            }
            bout.poll();
            events.extend(bout.drain_events());
        }

        let outputs = device
            .lock_within()
            .map(|log| log.state)
            .unwrap_or_default();

        ScenarioReport {
            events,
            display: display.frames(),
            outputs,
            snapshot: bout.snapshot(),
        }
    }
}
