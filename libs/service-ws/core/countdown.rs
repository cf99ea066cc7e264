//! Retry countdown between reconnection attempts.
//!
//! Two independent timers run while the client is disconnected:
//!
//! ```text
//! ┌──────────────────────┐
//! │  Tick Task           │   every 1s: report seconds remaining on the
//! │  (Tokio spawn)       │   tick channel, self-cancel at zero
//! └──────────────────────┘
//! ┌──────────────────────┐
//! │  Reconnect Deadline  │   one-shot sleep of delay + 1ms awaited by the
//! │  (manager task)      │   manager select loop; exactly one attempt is
//! └──────────────────────┘   scheduled per disconnect
//! ```
//!
//! The tick exists purely for progress visibility; the manager drains the
//! tick channel and logs the reports at the verbose level. The reconnection
//! attempt is scheduled independently of the tick. Both timers are cancelled
//! when a fresh connect request supersedes the countdown or the client shuts
//! down.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Fixed delay before a reconnection attempt
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Slack added to the delay when scheduling the one-shot attempt, so the
/// attempt always fires after the final countdown tick
pub const RETRY_SCHEDULE_SLACK: Duration = Duration::from_millis(1);

/// Countdown tick task: once per second, reports the seconds remaining on
/// `tick_tx`
///
/// Runs until the count reaches zero, a shutdown signal arrives, or the
/// shutdown channel is dropped.
pub async fn countdown_task(delay: Duration, tick_tx: Sender<u64>, shutdown_rx: Receiver<()>) {
    let mut remaining = delay.as_secs();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    // Skip the immediate first tick so the first log lands at +1s
    ticker.tick().await;
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    while remaining > 0 {
        match shutdown_rx.try_recv() {
            Ok(_) | Err(TryRecvError::Disconnected) => {
                trace!("countdown tick task cancelled");
                return;
            }
            Err(TryRecvError::Empty) => {}
        }

        ticker.tick().await;
        if tick_tx.send(remaining).is_err() {
            return;
        }
        remaining -= 1;
    }
}

/// A pending reconnection countdown
///
/// Cancelling (or dropping) the countdown stops the tick task; the deadline
/// itself lives in the manager's select loop.
pub struct RetryCountdown {
    delay: Duration,
    shutdown_tx: Sender<()>,
    tick_rx: Receiver<u64>,
    tick_handle: JoinHandle<()>,
}

impl RetryCountdown {
    /// Start the countdown: spawns the tick task and records the deadline
    pub fn start(delay: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let (tick_tx, tick_rx) = crossbeam_channel::unbounded();
        let tick_handle = tokio::spawn(countdown_task(delay, tick_tx, shutdown_rx));
        Self {
            delay,
            shutdown_tx,
            tick_rx,
            tick_handle,
        }
    }

    /// When the one reconnection attempt should fire, relative to start
    pub fn deadline(&self) -> Duration {
        self.delay + RETRY_SCHEDULE_SLACK
    }

    /// Seconds-remaining reports from the tick task, drained by the
    /// manager's wait loop
    pub fn ticks(&self) -> &Receiver<u64> {
        &self.tick_rx
    }

    /// Cancel the tick task (the attempt is superseded by the caller)
    pub fn cancel(self) {
        let _ = self.shutdown_tx.send(());
        self.tick_handle.abort();
    }
}
