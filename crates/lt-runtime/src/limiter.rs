use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// The permit source stopped producing; no further query can be paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("permit source closed")]
pub struct LimiterClosed;

/// Blocking permit operation completed before every query call.
///
/// A stalled limiter stalls the engine; that is backpressure, not an error.
#[async_trait]
pub trait RateLimiter: Send {
    async fn acquire(&mut self) -> Result<(), LimiterClosed>;
}

/// A receiver fed by hand (or by another task) acts as a permit source.
#[async_trait]
impl RateLimiter for mpsc::Receiver<()> {
    async fn acquire(&mut self) -> Result<(), LimiterClosed> {
        self.recv().await.ok_or(LimiterClosed)
    }
}

// ---------------------------------------------------------------------------
// PermitTicker
// ---------------------------------------------------------------------------

/// Periodic permit source: a timer task feeding a single-slot channel.
///
/// Unused permits do not accumulate. When the slot is full the tick is
/// dropped, so a slow consumer never receives a burst.
#[derive(Debug)]
pub struct PermitTicker {
    rx: mpsc::Receiver<()>,
}

impl PermitTicker {
    /// Spawn the ticking task. It stops when `cancel` fires or the ticker is
    /// dropped. The first permit is available immediately.
    pub fn spawn(interval: Duration, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(run_ticker(tx, interval, cancel));
        Self { rx }
    }
}

#[async_trait]
impl RateLimiter for PermitTicker {
    async fn acquire(&mut self) -> Result<(), LimiterClosed> {
        self.rx.recv().await.ok_or(LimiterClosed)
    }
}

#[tracing::instrument(name = "ticker", skip_all, fields(interval_ms = interval.as_millis() as u64))]
async fn run_ticker(tx: mpsc::Sender<()>, interval: Duration, cancel: CancellationToken) {
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tick.tick() => match tx.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => {}
                Err(TrySendError::Closed(())) => break,
            },
        }
    }
    lt_trace!(sys, "permit ticker stopped");
}
