mod display;
mod indicator;

pub use display::{clamp_shown, DisplayFrame, DisplayLog, DisplayObserver, DisplaySink, MAX_SHOWN_SCORE};
pub use indicator::{
    GuardedIndicator, IndicatorDriver, IndicatorLog, IndicatorSink, IndicatorState,
    DEFAULT_LOCK_WAIT,
};
