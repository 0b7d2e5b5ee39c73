use std::sync::Arc;

use lt_core::{QueryClient, RawRecord, TailReason, TailRequest, TailResult};
use orion_error::op_context;
use orion_error::prelude::*;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::engine::{SessionSummary, TailEngine};
use crate::limiter::{PermitTicker, RateLimiter};
use crate::settings::EngineSettings;

// ---------------------------------------------------------------------------
// TailSession -- builder
// ---------------------------------------------------------------------------

/// Assembles one tailing session: request, store client, pacing and clock.
pub struct TailSession<Q> {
    request: TailRequest,
    client: Q,
    settings: EngineSettings,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl<Q> TailSession<Q>
where
    Q: QueryClient + 'static,
{
    pub fn new(request: TailRequest, client: Q) -> Self {
        Self {
            request,
            client,
            settings: EngineSettings::default(),
            clock: Arc::new(SystemClock),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The session stops when `parent` is cancelled (for example on a
    /// shutdown signal). Dropping the stream cancels only this session.
    pub fn with_cancel(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    /// Validate and spawn the engine paced by a [`PermitTicker`] at
    /// `poll_interval`. Must be called inside a tokio runtime.
    pub fn start(self) -> TailResult<TailStream> {
        let ticker = PermitTicker::spawn(self.settings.poll_interval, self.cancel.child_token());
        self.start_with_limiter(ticker)
    }

    /// Like [`start`](Self::start) with a caller-supplied permit source.
    pub fn start_with_limiter<L>(self, limiter: L) -> TailResult<TailStream>
    where
        L: RateLimiter + 'static,
    {
        let mut op = op_context!("tail-session-start").with_auto_log();
        op.record("source", self.request.source.as_str());

        let capacity = self.settings.output_capacity.max(1);
        let engine = TailEngine::new(
            self.request,
            self.client,
            limiter,
            self.clock,
            self.settings,
        )?;
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(engine.run(tx, self.cancel.clone()));

        op.mark_suc();
        Ok(TailStream {
            rx,
            handle: Some(handle),
            cancel: self.cancel,
            summary: None,
        })
    }
}

// ---------------------------------------------------------------------------
// TailStream -- consumer side
// ---------------------------------------------------------------------------

/// Lazy, cancelable sequence of matched records.
///
/// Yields records in emission order, then at most one terminal error, then
/// `None`. Dropping the stream cancels the session.
pub struct TailStream {
    rx: mpsc::Receiver<RawRecord>,
    handle: Option<JoinHandle<TailResult<SessionSummary>>>,
    cancel: CancellationToken,
    summary: Option<SessionSummary>,
}

impl TailStream {
    pub async fn next(&mut self) -> Option<TailResult<RawRecord>> {
        if let Some(record) = self.rx.recv().await {
            return Some(Ok(record));
        }
        let handle = self.handle.take()?;
        match handle.await {
            Ok(Ok(summary)) => {
                self.summary = Some(summary);
                None
            }
            Ok(Err(e)) => Some(Err(e)),
            Err(e) => Some(Err(StructError::from(TailReason::Aborted)
                .with_detail(format!("tail task join error: {e}")))),
        }
    }

    /// Terminal report, available once `next` has returned `None` after a
    /// clean end.
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Stop the session at its next suspension point. Records already
    /// queued are still yielded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for TailStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
