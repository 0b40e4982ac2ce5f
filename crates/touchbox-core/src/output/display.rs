//! Digit display collaborator.
//!
//! The core only reports numbers; formatting for a particular driver lives
//! behind [`DisplaySink`].

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::score::ScoreObserver;

/// Largest value a two-digit score field can show.
pub const MAX_SHOWN_SCORE: u32 = 99;

pub trait DisplaySink: Send + Sync {
    fn show_score(&self, red: u32, green: u32);
    fn show_clock(&self, minutes: u32, seconds: u32);
}

/// Clamp a score into the two-digit display range.
pub fn clamp_shown(score: u32) -> u32 {
    score.min(MAX_SHOWN_SCORE)
}

/// Forwards every ledger notification to a display.
pub struct DisplayObserver {
    display: Arc<dyn DisplaySink>,
}

impl DisplayObserver {
    pub fn new(display: Arc<dyn DisplaySink>) -> Self {
        Self { display }
    }
}

impl ScoreObserver for DisplayObserver {
    fn on_score_changed(&mut self, red: u32, green: u32, _is_reset: bool) {
        self.display.show_score(red, green);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DisplayFrame {
    Score { red: u32, green: u32 },
    Clock { minutes: u32, seconds: u32 },
}

/// Display that records what it was asked to show.
#[derive(Debug, Default)]
pub struct DisplayLog {
    frames: Mutex<Vec<DisplayFrame>>,
}

impl DisplayLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<DisplayFrame> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn last_score(&self) -> Option<(u32, u32)> {
        self.frames().into_iter().rev().find_map(|f| match f {
            DisplayFrame::Score { red, green } => Some((red, green)),
            _ => None,
        })
    }

    pub fn last_clock(&self) -> Option<(u32, u32)> {
        self.frames().into_iter().rev().find_map(|f| match f {
            DisplayFrame::Clock { minutes, seconds } => Some((minutes, seconds)),
            _ => None,
        })
    }

    fn push(&self, frame: DisplayFrame) {
        if let Ok(mut frames) = self.frames.lock() {
            frames.push(frame);
        }
    }
}

impl DisplaySink for DisplayLog {
    fn show_score(&self, red: u32, green: u32) {
        self.push(DisplayFrame::Score {
            red: clamp_shown(red),
            green: clamp_shown(green),
        });
    }

    fn show_clock(&self, minutes: u32, seconds: u32) {
        self.push(DisplayFrame::Clock { minutes, seconds });
    }
}
