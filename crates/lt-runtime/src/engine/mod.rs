#[cfg(test)]
mod tests;

use std::sync::Arc;

use lt_core::{
    Cursor, MatchFilter, QueryClient, QueryError, RawRecord, SessionStats, TailReason,
    TailRequest, TailResult, WindowEnd,
};
use orion_error::prelude::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::limiter::RateLimiter;
use crate::settings::EngineSettings;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Why a session stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// A bounded window was exhausted and `follow` is off.
    Exhausted,
    /// The cancellation token fired.
    Cancelled,
    /// The consumer dropped its end of the output stream.
    ConsumerDisconnected,
    /// The permit source shut down.
    LimiterClosed,
}

/// Terminal report of a successful session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub stats: SessionStats,
    /// Lower bound the next window would have used.
    pub next_window_start: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Paging,
    Waiting,
}

enum Flow {
    Continue,
    Stop(SessionEnd),
}

// ---------------------------------------------------------------------------
// TailEngine
// ---------------------------------------------------------------------------

/// The polling state machine. Owns the [`Cursor`] exclusively and drives
/// `client` through `limiter`, emitting surviving records into a bounded
/// channel in arrival order.
pub struct TailEngine<Q, L> {
    request: TailRequest,
    filter: MatchFilter,
    pushdown: Option<String>,
    cursor: Cursor,
    client: Q,
    limiter: L,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    state: EngineState,
    attempts: u32,
    stats: SessionStats,
}

impl<Q, L> TailEngine<Q, L>
where
    Q: QueryClient,
    L: RateLimiter,
{
    /// Validate the request and compile its patterns. Nothing is queried
    /// here, so a rejected request never reaches the store.
    ///
    /// An unbounded end is resolved to `clock`'s current time for the first
    /// window; later windows keep advancing to "now".
    pub fn new(
        request: TailRequest,
        client: Q,
        limiter: L,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> TailResult<Self> {
        request.validate()?;
        let filter = MatchFilter::new(request.include.as_deref(), request.exclude.as_deref())?;
        let pushdown = filter.pushdown_literal().map(str::to_string);

        let first_end = match request.window_end {
            WindowEnd::Bounded(end) => end,
            WindowEnd::Unbounded => clock.now_millis(),
        };
        let cursor = Cursor::new(request.window_start, first_end, settings.overlap_millis());

        Ok(Self {
            request,
            filter,
            pushdown,
            cursor,
            client,
            limiter,
            clock,
            settings,
            state: EngineState::Paging,
            attempts: 0,
            stats: SessionStats::default(),
        })
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Drive the session to completion.
    ///
    /// Cancellation is observed at every suspension point (permit, query,
    /// output write); no record is emitted after it fires.
    #[tracing::instrument(
        name = "tail",
        skip_all,
        fields(source = %self.request.source, follow = self.request.follow)
    )]
    pub async fn run(
        mut self,
        out: mpsc::Sender<RawRecord>,
        cancel: CancellationToken,
    ) -> TailResult<SessionSummary> {
        lt_info!(
            sys,
            start = self.cursor.next_window_start(),
            end = self.cursor.window_end(),
            pushdown = self.pushdown.as_deref().unwrap_or(""),
            "tail session started"
        );

        let end = loop {
            let flow = match self.state {
                EngineState::Paging => self.page(&out, &cancel).await,
                EngineState::Waiting => self.wait(&out, &cancel).await,
            };
            match flow {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop(end)) => break end,
                Err(e) => {
                    lt_error!(
                        conn,
                        error = %e,
                        queries = self.stats.queries,
                        emitted = self.stats.emitted,
                        "tail session failed"
                    );
                    return Err(e);
                }
            }
        };

        let s = self.stats;
        lt_info!(
            sys,
            end = ?end,
            queries = s.queries,
            pages = s.pages,
            retries = s.retries,
            windows = s.windows,
            emitted = s.emitted,
            duplicates = s.duplicates,
            filtered = s.filtered,
            "tail session finished"
        );
        Ok(SessionSummary {
            end,
            stats: s,
            next_window_start: self.cursor.next_window_start(),
        })
    }

    // -- States -------------------------------------------------------------

    /// Paging: permit, then one query over the current window and token.
    async fn page(
        &mut self,
        out: &mpsc::Sender<RawRecord>,
        cancel: &CancellationToken,
    ) -> TailResult<Flow> {
        if let Some(end) = self.acquire(cancel).await {
            return Ok(Flow::Stop(end));
        }
        self.fetch(out, cancel).await
    }

    /// Waiting: the permit paces the loop. The window is then reopened up to
    /// "now" and queried without a token.
    async fn wait(
        &mut self,
        out: &mpsc::Sender<RawRecord>,
        cancel: &CancellationToken,
    ) -> TailResult<Flow> {
        if let Some(end) = self.acquire(cancel).await {
            return Ok(Flow::Stop(end));
        }
        self.cursor.open_window(self.clock.now_millis());
        self.state = EngineState::Paging;
        lt_trace!(
            pipe,
            start = self.cursor.next_window_start(),
            end = self.cursor.window_end(),
            "window opened"
        );
        self.fetch(out, cancel).await
    }

    // -- Steps --------------------------------------------------------------

    async fn acquire(&mut self, cancel: &CancellationToken) -> Option<SessionEnd> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Some(SessionEnd::Cancelled),
            permit = self.limiter.acquire() => permit.err().map(|_| SessionEnd::LimiterClosed),
        }
    }

    async fn fetch(
        &mut self,
        out: &mpsc::Sender<RawRecord>,
        cancel: &CancellationToken,
    ) -> TailResult<Flow> {
        let query = self.cursor.query(
            &self.request.source,
            self.request.stream_hint.as_deref(),
            self.pushdown.as_deref(),
        );
        self.stats.queries += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Flow::Stop(SessionEnd::Cancelled)),
            result = self.client.query(&query) => result,
        };

        let page = match result {
            Ok(page) => page,
            Err(QueryError::Retryable(msg)) => return self.retry(msg),
            Err(QueryError::Fatal(msg)) => {
                return Err(StructError::from(TailReason::FatalQuery).with_detail(msg));
            }
        };
        self.attempts = 0;
        self.stats.pages += 1;
        lt_debug!(
            conn,
            start = query.range_start,
            end = query.range_end,
            records = page.records.len(),
            more = page.next_token.is_some(),
            "page received"
        );

        for record in page.records {
            self.stats.received += 1;
            if !self.cursor.admit(&record) {
                self.stats.duplicates += 1;
                continue;
            }
            if !self.filter.matches(&record.body) {
                self.stats.filtered += 1;
                continue;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(Flow::Stop(SessionEnd::Cancelled)),
                sent = out.send(record) => {
                    if sent.is_err() {
                        return Ok(Flow::Stop(SessionEnd::ConsumerDisconnected));
                    }
                }
            }
            self.stats.emitted += 1;
        }

        if page.next_token.is_some() {
            self.cursor.set_token(page.next_token);
            return Ok(Flow::Continue);
        }
        Ok(self.finish_window())
    }

    /// The same window and token are retried after the next permit.
    fn retry(&mut self, msg: String) -> TailResult<Flow> {
        self.attempts += 1;
        if self.attempts > self.settings.max_retries {
            return Err(StructError::from(TailReason::RetriesExhausted).with_detail(format!(
                "{} consecutive transient failures, last: {msg}",
                self.attempts
            )));
        }
        self.stats.retries += 1;
        lt_warn!(
            conn,
            attempt = self.attempts,
            max_retries = self.settings.max_retries,
            error = %msg,
            "transient query failure, retrying"
        );
        Ok(Flow::Continue)
    }

    fn finish_window(&mut self) -> Flow {
        let advance = self.cursor.close_window();
        self.stats.windows += 1;
        self.stats.evicted += advance.evicted as u64;
        if advance.evicted > 0 {
            lt_debug!(
                res,
                evicted = advance.evicted,
                tracked = self.cursor.tracked_identities(),
                "dedup eviction"
            );
        }
        lt_debug!(
            pipe,
            closed_end = advance.closed_end,
            next_start = advance.next_start,
            "window exhausted"
        );

        // Only a bounded request without follow can run out of windows.
        if !self.request.follow && matches!(self.request.window_end, WindowEnd::Bounded(_)) {
            return Flow::Stop(SessionEnd::Exhausted);
        }
        self.state = EngineState::Waiting;
        Flow::Continue
    }
}
