//! Heartbeat loop
//!
//! Sends a ping carrying the last processed sequence on a fixed interval.
//! Consecutive send failures are counted; reaching the threshold ends the loop
//! with [`HeartbeatExit::ConnectionLost`], so each failure burst is reported once.

use crate::connection::FrameSender;
use kook_core::GatewayFrame;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Configuration for heartbeat behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub interval: Duration,
    /// Consecutive send failures that count as connection loss
    pub max_failures: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_failures: 3,
        }
    }
}

/// Consecutive-failure counter shared by the heartbeat loop and the reader
#[derive(Debug, Default)]
pub struct HeartbeatMonitor {
    failures: AtomicU32,
}

impl HeartbeatMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed send and return the new consecutive count
    pub fn record_failure(&self) -> u32 {
        self.failures.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// A successful send or a pong clears the streak
    pub fn reset(&self) {
        self.failures.store(0, Ordering::SeqCst);
    }

    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }
}

/// Why the heartbeat loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatExit {
    Cancelled,
    ConnectionLost { failures: u32 },
}

/// Run the heartbeat loop until cancelled or the failure threshold is reached
///
/// The first ping goes out one full interval after start.
pub async fn run_heartbeat<F>(
    sender: &dyn FrameSender,
    config: HeartbeatConfig,
    monitor: &HeartbeatMonitor,
    last_sequence: F,
    cancel: CancellationToken,
) -> HeartbeatExit
where
    F: Fn() -> u64,
{
    let start = tokio::time::Instant::now() + config.interval;
    let mut ticker = tokio::time::interval_at(start, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => return HeartbeatExit::Cancelled,
            _ = ticker.tick() => {}
        }

        let sn = last_sequence();
        match sender.send_frame(&GatewayFrame::ping(sn)).await {
            Ok(()) => {
                monitor.reset();
                tracing::trace!(sn, "Heartbeat sent");
            }
            Err(e) => {
                let failures = monitor.record_failure();
                tracing::warn!(
                    failures,
                    max_failures = config.max_failures,
                    error = %e,
                    "Heartbeat send failed"
                );
                if failures >= config.max_failures {
                    tracing::error!(failures, "Heartbeat failure threshold reached");
                    return HeartbeatExit::ConnectionLost { failures };
                }
            }
        }
    }
}
