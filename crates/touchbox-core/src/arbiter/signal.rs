//! Raw touch signals shared with the sensor layer.
//!
//! Sensors post touches from their own thread or task; the arbiter consumes
//! them on the poll loop. Each side's `(pending, timestamp)` pair lives in a
//! single `AtomicU64` so a reader can never see a timestamp from one touch
//! with the pending flag of another.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::score::Side;
use crate::time::TimeSource;

const PENDING: u64 = 1 << 63;
const TIMESTAMP_MASK: u64 = !PENDING;

/// One side's pending touch, packed as `pending << 63 | timestamp_ms`.
#[derive(Debug, Default)]
pub struct HitSignal(AtomicU64);

impl HitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pending with `timestamp_ms` in one store. Timestamps are
    /// truncated to 63 bits.
    pub fn register(&self, timestamp_ms: u64) {
        self.0
            .store(PENDING | (timestamp_ms & TIMESTAMP_MASK), Ordering::Release);
    }

    /// Consume the pending touch, if any, clearing it in the same step.
    pub fn take(&self) -> Option<u64> {
        unpack(self.0.swap(0, Ordering::AcqRel))
    }

    pub fn peek(&self) -> Option<u64> {
        unpack(self.0.load(Ordering::Acquire))
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.peek().is_some()
    }
}

fn unpack(word: u64) -> Option<u64> {
    (word & PENDING != 0).then_some(word & TIMESTAMP_MASK)
}

/// Signal slots plus the gate flags the arbiter publishes to producers.
#[derive(Debug, Default)]
pub(crate) struct SignalBoard {
    pub(crate) red: HitSignal,
    pub(crate) green: HitSignal,
    locked: AtomicBool,
    clock_running: AtomicBool,
}

impl SignalBoard {
    pub(crate) fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::Release);
    }

    pub(crate) fn set_clock_running(&self, running: bool) {
        self.clock_running.store(running, Ordering::Release);
    }

    pub(crate) fn accepts_hits(&self) -> bool {
        !self.locked.load(Ordering::Acquire) && self.clock_running.load(Ordering::Acquire)
    }

    /// Record a touch for `side`, or drop it (and any stale pending signal
    /// for that side) when the gate is closed. Returns whether it was kept.
    pub(crate) fn register(&self, side: Side, timestamp_ms: u64) -> bool {
        let accept = self.accepts_hits();
        for (included, slot) in [
            (side.includes_red(), &self.red),
            (side.includes_green(), &self.green),
        ] {
            if !included {
                continue;
            }
            if accept {
                slot.register(timestamp_ms);
            } else {
                slot.clear();
            }
        }

        if accept && side != Side::None {
            debug!(?side, timestamp_ms, "touch registered");
            true
        } else {
            debug!(?side, timestamp_ms, "touch dropped: arbitration closed");
            false
        }
    }

    pub(crate) fn clear_pending(&self) {
        self.red.clear();
        self.green.clear();
    }
}

/// Cloneable, thread-safe handle the sensor layer uses to post touches.
#[derive(Clone)]
pub struct HitRegistrar {
    board: Arc<SignalBoard>,
    time: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for HitRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HitRegistrar")
            .field("board", &self.board)
            .finish()
    }
}

impl HitRegistrar {
    pub(crate) fn new(board: Arc<SignalBoard>, time: Arc<dyn TimeSource>) -> Self {
        Self { board, time }
    }

    /// Post a touch for `side` observed at `timestamp_ms`.
    ///
    /// Dropped (returns false) while arbitration is locked or the clock is
    /// stopped.
    pub fn register_hit(&self, side: Side, timestamp_ms: u64) -> bool {
        self.board.register(side, timestamp_ms)
    }

    /// Post a touch stamped with the current time.
    pub fn touch(&self, side: Side) -> bool {
        self.register_hit(side, self.time.now_ms())
    }

    pub fn accepts_hits(&self) -> bool {
        self.board.accepts_hits()
    }
}
