use crate::dedup::Deduplicator;
use crate::query::LogQuery;
use crate::record::RawRecord;

/// Outcome of closing an exhausted window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAdvance {
    pub closed_end: i64,
    pub next_start: i64,
    pub evicted: usize,
}

/// Mutable tail position: the active window, the in-flight continuation
/// token and the dedup set.
///
/// Lower-bound policy on close: the next window starts at the latest record
/// timestamp observed so far, clamped into `[end - overlap, end]` and never
/// below the previous start. The clamp keeps consecutive windows at most
/// `overlap` apart, which also bounds the dedup set.
#[derive(Debug)]
pub struct Cursor {
    next_window_start: i64,
    window_end: i64,
    pagination_token: Option<String>,
    latest_observed: Option<i64>,
    overlap: i64,
    seen: Deduplicator,
}

impl Cursor {
    pub fn new(window_start: i64, window_end: i64, overlap_millis: i64) -> Self {
        Self {
            next_window_start: window_start,
            window_end: window_end.max(window_start),
            pagination_token: None,
            latest_observed: None,
            overlap: overlap_millis.max(0),
            seen: Deduplicator::new(),
        }
    }

    pub fn next_window_start(&self) -> i64 {
        self.next_window_start
    }

    pub fn window_end(&self) -> i64 {
        self.window_end
    }

    pub fn pagination_token(&self) -> Option<&str> {
        self.pagination_token.as_deref()
    }

    pub fn tracked_identities(&self) -> usize {
        self.seen.len()
    }

    /// Build the query for the current window and token.
    pub fn query(
        &self,
        source: &str,
        stream_hint: Option<&str>,
        filter: Option<&str>,
    ) -> LogQuery {
        LogQuery {
            source: source.to_string(),
            stream_hint: stream_hint.map(str::to_string),
            range_start: self.next_window_start,
            range_end: self.window_end,
            filter: filter.map(str::to_string),
            next_token: self.pagination_token.clone(),
        }
    }

    /// Record that `record` was received. Returns `false` if its identity
    /// was already delivered and must be suppressed.
    pub fn admit(&mut self, record: &RawRecord) -> bool {
        self.latest_observed = Some(
            self.latest_observed
                .map_or(record.timestamp, |ts| ts.max(record.timestamp)),
        );
        self.seen.should_emit(&record.id, record.timestamp)
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.pagination_token = token;
    }

    /// The current window is exhausted: evict stale identities and move the
    /// lower bound forward.
    pub fn close_window(&mut self) -> WindowAdvance {
        let end = self.window_end;
        let floor = end.saturating_sub(self.overlap);
        let candidate = self
            .latest_observed
            .map_or(floor, |ts| ts.max(floor))
            .min(end);
        self.next_window_start = self.next_window_start.max(candidate);
        self.pagination_token = None;
        let evicted = self.seen.evict_before(floor.min(self.next_window_start));
        WindowAdvance {
            closed_end: end,
            next_start: self.next_window_start,
            evicted,
        }
    }

    /// Open the next window ending at `now`. The end never regresses.
    pub fn open_window(&mut self, now: i64) {
        self.window_end = self.window_end.max(now);
        self.pagination_token = None;
    }
}
