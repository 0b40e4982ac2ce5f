//! Score ledger.
//!
//! Two non-negative counters and a single registered observer. Every
//! mutation, including a reset that leaves the score unchanged, notifies the
//! observer. No upper bound is enforced here; display clamping is the
//! display's business.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fencer side, or a combination of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Red,
    Green,
    Both,
    #[default]
    None,
}

impl Side {
    pub fn includes_red(self) -> bool {
        matches!(self, Side::Red | Side::Both)
    }

    pub fn includes_green(self) -> bool {
        matches!(self, Side::Green | Side::Both)
    }

    /// Combine per-side flags into a side.
    pub fn from_flags(red: bool, green: bool) -> Self {
        match (red, green) {
            (true, true) => Side::Both,
            (true, false) => Side::Red,
            (false, true) => Side::Green,
            (false, false) => Side::None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub red: u32,
    pub green: u32,
}

/// Receives every score change.
///
/// `is_reset` is true for resets and "next point" re-notifications, false
/// for ordinary increments and corrections.
pub trait ScoreObserver: Send {
    fn on_score_changed(&mut self, red: u32, green: u32, is_reset: bool);
}

pub struct ScoreLedger {
    score: Score,
    observer: Option<Box<dyn ScoreObserver>>,
}

impl std::fmt::Debug for ScoreLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreLedger")
            .field("score", &self.score)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for ScoreLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self {
            score: Score::default(),
            observer: None,
        }
    }

    /// Register the single listener, replacing any previous one.
    pub fn set_observer(&mut self, observer: Box<dyn ScoreObserver>) {
        self.observer = Some(observer);
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn red(&self) -> u32 {
        self.score.red
    }

    pub fn green(&self) -> u32 {
        self.score.green
    }

    pub fn add_red(&mut self) {
        self.score.red = self.score.red.saturating_add(1);
        self.notify(false);
    }

    pub fn add_green(&mut self) {
        self.score.green = self.score.green.saturating_add(1);
        self.notify(false);
    }

    pub fn add_both(&mut self) {
        self.score.red = self.score.red.saturating_add(1);
        self.score.green = self.score.green.saturating_add(1);
        self.notify(false);
    }

    /// Score `side`. `Side::None` changes nothing and notifies nobody.
    pub fn award(&mut self, side: Side) {
        match side {
            Side::Red => self.add_red(),
            Side::Green => self.add_green(),
            Side::Both => self.add_both(),
            Side::None => {}
        }
    }

    /// `total` zeroes both counters. Either way the observer hears
    /// `is_reset = true`, with the unchanged score when `total` is false.
    pub fn reset(&mut self, total: bool) {
        if total {
            self.score = Score::default();
        }
        self.notify(true);
    }

    /// Direct override for manual correction.
    pub fn set_scores(&mut self, red: u32, green: u32, is_reset: bool) {
        self.score = Score { red, green };
        self.notify(is_reset);
    }

    /// Add `delta` to the counter(s) of `side`, flooring at zero.
    pub fn adjust(&mut self, side: Side, delta: i32) {
        if side == Side::None {
            return;
        }
        if side.includes_red() {
            self.score.red = apply_delta(self.score.red, delta);
        }
        if side.includes_green() {
            self.score.green = apply_delta(self.score.green, delta);
        }
        self.notify(false);
    }

    fn notify(&mut self, is_reset: bool) {
        debug!(red = self.score.red, green = self.score.green, is_reset, "score changed");
        if let Some(observer) = self.observer.as_mut() {
            observer.on_score_changed(self.score.red, self.score.green, is_reset);
        }
    }
}

fn apply_delta(value: u32, delta: i32) -> u32 {
    if delta >= 0 {
        value.saturating_add(delta.unsigned_abs())
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}
