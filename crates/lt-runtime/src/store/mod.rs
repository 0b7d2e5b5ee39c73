//! Concrete [`QueryClient`](lt_core::QueryClient) implementations.
//!
//! Both stores share one query model: records sorted by timestamp (stable
//! for equal timestamps), a half-open time range, an optional stream-name
//! prefix, an optional substring filter, fixed-size pages and opaque offset
//! continuation tokens.

mod file;
mod memory;

pub use file::{FileLogStore, destination_path};
pub use memory::MemoryLogStore;

use lt_core::{LogQuery, QueryError, QueryPage, RawRecord};

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Select the page of `records` (already sorted by timestamp) that answers
/// `query`.
pub(crate) fn select_page(
    records: &[RawRecord],
    query: &LogQuery,
    page_size: usize,
) -> Result<QueryPage, QueryError> {
    let offset = match query.next_token.as_deref() {
        None => 0,
        Some(token) => decode_token(token)?,
    };
    let page_size = page_size.max(1);

    let mut matched = records.iter().filter(|r| in_query(r, query)).skip(offset);
    let page: Vec<RawRecord> = matched.by_ref().take(page_size).cloned().collect();
    let next_token = matched
        .next()
        .is_some()
        .then(|| encode_token(offset + page.len()));

    Ok(QueryPage {
        records: page,
        next_token,
    })
}

fn in_query(record: &RawRecord, query: &LogQuery) -> bool {
    if record.timestamp < query.range_start || record.timestamp >= query.range_end {
        return false;
    }
    if let Some(ref hint) = query.stream_hint
        && !record
            .stream
            .as_deref()
            .is_some_and(|s| s.starts_with(hint.as_str()))
    {
        return false;
    }
    if let Some(ref needle) = query.filter
        && !record.body.contains(needle.as_str())
    {
        return false;
    }
    true
}

fn encode_token(offset: usize) -> String {
    format!("off:{offset}")
}

fn decode_token(token: &str) -> Result<usize, QueryError> {
    token
        .strip_prefix("off:")
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| QueryError::Fatal(format!("invalid continuation token {token:?}")))
}
