//! Cancellable countdowns for Quizline rounds.
//!
//! A round suspends in exactly one way: by waiting on a [`Countdown`]
//! handed out by a [`CooldownTimer`]. The countdown resolves either when
//! its time runs out or as soon as someone calls
//! [`CooldownTimer::abort`], whichever comes first.
//!
//! # Integration
//!
//! The timer lives inside the session state (behind its lock); the
//! countdown is moved out and awaited by the round task *without* holding
//! the lock, so other events (answers, aborts) keep flowing:
//!
//! ```ignore
//! let mut countdown = session.lock().await.cooldown.start(20);
//! while let Some(remaining) = countdown.wait_for_tick().await {
//!     // broadcast `remaining` to the room
//! }
//! match countdown.end() { /* Expired or Aborted */ }
//! ```
//!
//! Fixed pauses use the same primitive silently via [`Countdown::finish`],
//! so an abort also cuts a pause short.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// Spacing between two countdown ticks.
pub const TICK: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// CountdownEnd
// ---------------------------------------------------------------------------

/// How a countdown resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEnd {
    /// The full duration elapsed.
    Expired,
    /// [`CooldownTimer::abort`] was called (or the timer was dropped)
    /// before the duration elapsed.
    Aborted,
}

// ---------------------------------------------------------------------------
// CooldownTimer
// ---------------------------------------------------------------------------

/// Single-flight countdown source.
///
/// At most one countdown is outstanding at a time: starting a new one
/// aborts the previous one first.
#[derive(Debug, Default)]
pub struct CooldownTimer {
    active: Option<oneshot::Sender<()>>,
    started: u64,
}

impl CooldownTimer {
    /// Creates a timer with no countdown outstanding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a countdown of `seconds` and returns its handle.
    ///
    /// A countdown of 0 seconds resolves as [`CountdownEnd::Expired`] on
    /// its first wait.
    pub fn start(&mut self, seconds: u32) -> Countdown {
        if self.abort() {
            debug!(countdown = self.started, "outstanding countdown aborted by a new start");
        }
        let (tx, rx) = oneshot::channel();
        self.active = Some(tx);
        self.started += 1;
        debug!(countdown = self.started, seconds, "countdown started");
        Countdown::new(seconds, rx)
    }

    /// Resolves the outstanding countdown immediately.
    ///
    /// Returns `true` if a countdown was outstanding and has now been
    /// aborted, `false` if there was nothing to abort (none started, or
    /// the last one already resolved). Safe to call any number of times.
    pub fn abort(&mut self) -> bool {
        let Some(tx) = self.active.take() else {
            return false;
        };
        let aborted = tx.send(()).is_ok();
        if aborted {
            trace!(countdown = self.started, "countdown aborted");
        }
        aborted
    }

    /// Whether a countdown is currently outstanding.
    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Number of countdowns started over the timer's lifetime.
    pub fn started(&self) -> u64 {
        self.started
    }
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Handle to one running countdown.
///
/// Resolution happens exactly once: after [`wait_for_tick`](Self::wait_for_tick)
/// has returned `None`, every later call returns `None` immediately and
/// [`end`](Self::end) never changes again.
#[derive(Debug)]
pub struct Countdown {
    seconds: u32,
    remaining: u32,
    /// Deadline of the next tick. Advanced by exactly [`TICK`] each time
    /// so late wake-ups don't accumulate drift.
    next_tick: Instant,
    cancel: oneshot::Receiver<()>,
    end: Option<CountdownEnd>,
}

impl Countdown {
    fn new(seconds: u32, cancel: oneshot::Receiver<()>) -> Self {
        Self {
            seconds,
            remaining: seconds,
            next_tick: Instant::now() + TICK,
            cancel,
            end: None,
        }
    }

    /// Waits for the next one-second tick.
    ///
    /// Returns `Some(remaining)` after each elapsed second (the last tick
    /// reports `0`), then `None` once the countdown has resolved, either
    /// by expiry or by abort.
    pub async fn wait_for_tick(&mut self) -> Option<u32> {
        if self.end.is_some() {
            return None;
        }
        if self.remaining == 0 {
            self.resolve(CountdownEnd::Expired);
            return None;
        }

        tokio::select! {
            biased;
            _ = &mut self.cancel => {
                self.resolve(CountdownEnd::Aborted);
                None
            }
            () = time::sleep_until(self.next_tick) => {
                self.remaining -= 1;
                self.next_tick += TICK;
                trace!(remaining = self.remaining, "countdown tick");
                Some(self.remaining)
            }
        }
    }

    /// Runs the countdown to resolution without reporting ticks.
    pub async fn finish(mut self) -> CountdownEnd {
        while self.wait_for_tick().await.is_some() {}
        self.end.unwrap_or(CountdownEnd::Expired)
    }

    /// How the countdown resolved, or `None` while it is still running.
    pub fn end(&self) -> Option<CountdownEnd> {
        self.end
    }

    /// Total length in seconds.
    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    /// Seconds left before natural expiry.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    fn resolve(&mut self, end: CountdownEnd) {
        if self.end.is_some() {
            return;
        }
        self.end = Some(end);
        // Closing marks the timer side as idle, so a late abort is a no-op.
        self.cancel.close();
        debug!(?end, remaining = self.remaining, "countdown resolved");
    }
}
