//! # touchbox Core Library
//!
//! This library provides the decision core of an épée touch-scoring box:
//! judging whether two independently arriving blade touches are one touch or
//! a double, keeping the score, and running the match clock.
//!
//! ## Architecture
//!
//! - **Hit Arbiter**: Simultaneity-window judging with an evaluation delay,
//!   lock state between a decision and the next point
//! - **Match Clock**: A wall-clock-based countdown state machine with match
//!   and rest phases, two duration presets and break-point resumption
//! - **Effect Sequencer**: Time-boxed buzzer and indicator output after a
//!   decision
//! - **Score Ledger**: Two counters with a single change observer
//!
//! Nothing here owns a thread. The caller polls a [`Bout`] with time from a
//! [`TimeSource`]; sensors post touches through a [`HitRegistrar`] from any
//! thread.
//!
//! ## Key Components
//!
//! - [`Bout`]: The session context object and operator command surface
//! - [`HitArbiter`]: Touch arbitration
//! - [`MatchClock`]: Countdown state machine
//! - [`Config`]: Device configuration management

pub mod arbiter;
pub mod bout;
pub mod clock;
pub mod effects;
pub mod error;
pub mod events;
pub mod output;
pub mod scenario;
pub mod score;
pub mod storage;
pub mod time;

pub use arbiter::{ArbiterTiming, ArbitrationState, HitArbiter, HitDecision, HitRegistrar};
pub use bout::{Bout, BoutSettings};
pub use clock::{ClockReadout, ClockSettings, ClockState, DurationPreset, MatchClock, MatchPhase};
pub use effects::{EffectSequencer, EffectTiming};
pub use error::{ConfigError, CoreError, OutputError, ValidationError};
pub use events::Event;
pub use output::{DisplaySink, GuardedIndicator, IndicatorDriver, IndicatorSink};
pub use scenario::{Action, Scenario, ScenarioReport, Step};
pub use score::{Score, ScoreLedger, ScoreObserver, Side};
pub use storage::Config;
pub use time::{ManualClock, MonotonicClock, TimeSource};
