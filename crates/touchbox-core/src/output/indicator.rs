//! Indicator lights and buzzer.
//!
//! The physical device is written both by the effect sequencer and by the
//! immediate clear on unlock, possibly from different threads. Writers go
//! through [`GuardedIndicator`], which serializes them behind a mutex
//! acquired with a bounded wait. A writer that cannot get the lock in time
//! gets [`OutputError::LockTimeout`] and must skip its write for the cycle.

use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::OutputError;
use crate::score::Side;

/// Default bounded wait for the device lock.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(10);

/// What the core asks of the indicator collaborator.
pub trait IndicatorSink: Send + Sync {
    /// Light the indicator(s) for `side`; `Side::None` turns them all off.
    fn set_indicator(&self, side: Side) -> Result<(), OutputError>;
    fn set_buzzer(&self, on: bool) -> Result<(), OutputError>;
}

/// Low-level device writes. Only ever called with the device lock held.
pub trait IndicatorDriver: Send {
    fn write_indicator(&mut self, side: Side);
    fn write_buzzer(&mut self, on: bool);
}

/// Mutex-guarded device with a bounded lock wait.
#[derive(Debug)]
pub struct GuardedIndicator<D> {
    device: Mutex<D>,
    wait: Duration,
}

impl<D: IndicatorDriver> GuardedIndicator<D> {
    pub fn new(driver: D, wait: Duration) -> Self {
        Self {
            device: Mutex::new(driver),
            wait,
        }
    }

    /// Acquire the device lock, giving up after the configured wait.
    pub fn lock_within(&self) -> Result<MutexGuard<'_, D>, OutputError> {
        let deadline = Instant::now() + self.wait;
        loop {
            match self.device.try_lock() {
                Ok(guard) => return Ok(guard),
                // A panicked writer leaves the device in whatever state it
                // wrote last; the next write overrides it.
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        let waited_ms = self.wait.as_millis() as u64;
                        warn!(waited_ms, "indicator lock timed out, write skipped");
                        return Err(OutputError::LockTimeout { waited_ms });
                    }
                    std::thread::yield_now();
                }
            }
        }
    }
}

impl<D: IndicatorDriver> IndicatorSink for GuardedIndicator<D> {
    fn set_indicator(&self, side: Side) -> Result<(), OutputError> {
        self.lock_within()?.write_indicator(side);
        Ok(())
    }

    fn set_buzzer(&self, on: bool) -> Result<(), OutputError> {
        self.lock_within()?.write_buzzer(on);
        Ok(())
    }
}

/// Output state as last written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorState {
    pub indicator: Side,
    pub buzzer: bool,
}

/// In-memory driver that remembers the current outputs and every write.
#[derive(Debug, Default, Clone)]
pub struct IndicatorLog {
    pub state: IndicatorState,
    pub writes: Vec<IndicatorState>,
}

impl IndicatorDriver for IndicatorLog {
    fn write_indicator(&mut self, side: Side) {
        self.state.indicator = side;
        self.writes.push(self.state);
    }

    fn write_buzzer(&mut self, on: bool) {
        self.state.buzzer = on;
        self.writes.push(self.state);
    }
}
