use std::sync::Arc;

use async_trait::async_trait;

use crate::record::RawRecord;

/// One call against the remote store: the half-open range
/// `[range_start, range_end)` in epoch milliseconds, optionally resumed from
/// a continuation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub source: String,
    pub stream_hint: Option<String>,
    pub range_start: i64,
    pub range_end: i64,
    /// Substring the store may apply server-side. Only an optimisation; the
    /// engine filters locally regardless.
    pub filter: Option<String>,
    pub next_token: Option<String>,
}

/// One page of results. `next_token` is present while more pages exist for
/// the same range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPage {
    pub records: Vec<RawRecord>,
    pub next_token: Option<String>,
}

impl QueryPage {
    pub fn last(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            next_token: None,
        }
    }

    pub fn more(records: Vec<RawRecord>, token: impl Into<String>) -> Self {
        Self {
            records,
            next_token: Some(token.into()),
        }
    }
}

/// Failure classes a store surfaces to the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Throttling or another transient fault; the same call may succeed later.
    #[error("retryable query failure: {0}")]
    Retryable(String),
    /// Bad request, permission denied, unknown source.
    #[error("fatal query failure: {0}")]
    Fatal(String),
}

impl QueryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Paginated, time-ranged search over a remote log store.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, query: &LogQuery) -> Result<QueryPage, QueryError>;
}

#[async_trait]
impl<T: QueryClient + ?Sized> QueryClient for Arc<T> {
    async fn query(&self, query: &LogQuery) -> Result<QueryPage, QueryError> {
        (**self).query(query).await
    }
}
