mod engine;
mod preset;

pub use engine::{ClockSettings, MatchClock};
pub use preset::{ClockReadout, ClockState, DurationPreset, MatchPhase, DEFAULT_REST_SECS};
