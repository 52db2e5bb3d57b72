//! Status polling loop
//!
//! Polls a [`StatusSource`] at a fixed cadence and hands every snapshot to
//! a caller-supplied observer. The loop is blocking and single-threaded; it
//! ends only when a poll fails, the observer fails, or an optional tick
//! bound is reached.

use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::debug;

use crate::jobs::{ControllerError, StatusSnapshot};

/// Default time between polls.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Something that can produce a fresh status snapshot.
pub trait StatusSource {
    fn poll(&self) -> Result<StatusSnapshot, ControllerError>;
}

/// One observation handed to the observer.
#[derive(Debug, Clone)]
pub struct Tick {
    /// Ordinal of this tick, starting at 1.
    pub number: u64,
    /// Time since the watch started.
    pub elapsed: Duration,
    /// Wall-clock time of the poll.
    pub at: DateTime<Local>,
    pub snapshot: StatusSnapshot,
}

impl Tick {
    /// `elapsed-seconds wall-clock-time snapshot`, as printed by `watch`.
    pub fn line(&self) -> String {
        format!(
            "{:.6} {} {}",
            self.elapsed.as_secs_f64(),
            self.at.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.snapshot
        )
    }
}

#[derive(Debug, Error)]
pub enum WatchError<E> {
    #[error("Status poll failed: {0}")]
    Poll(#[source] ControllerError),

    #[error("Observer failed: {0}")]
    Observer(E),
}

#[derive(Debug, Clone)]
pub struct StatusWatcher {
    interval: Duration,
    max_ticks: Option<u64>,
}

impl Default for StatusWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl StatusWatcher {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_ticks: None,
        }
    }

    /// Stop after `ticks` observations.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the loop. Returns the number of ticks observed when a tick bound
    /// ends it; otherwise only returns with an error.
    pub fn watch<F, E>(&self, source: &dyn StatusSource, mut observer: F) -> Result<u64, WatchError<E>>
    where
        F: FnMut(&Tick) -> Result<(), E>,
    {
        let started = Instant::now();
        let mut number = 0u64;

        loop {
            let snapshot = source.poll().map_err(WatchError::Poll)?;
            number += 1;

            let tick = Tick {
                number,
                elapsed: started.elapsed(),
                at: Local::now(),
                snapshot,
            };
            debug!(tick = number, total = tick.snapshot.total, "Polled status");
            observer(&tick).map_err(WatchError::Observer)?;

            if matches!(self.max_ticks, Some(max) if number >= max) {
                return Ok(number);
            }
            thread::sleep(self.interval);
        }
    }
}
