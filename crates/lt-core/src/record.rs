use serde::{Deserialize, Serialize};

/// One log entry as returned by a [`QueryClient`](crate::query::QueryClient).
///
/// `id` is opaque and stable: the same physical record carries the same id
/// no matter how many overlapping queries return it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    /// Event time in epoch milliseconds.
    pub timestamp: i64,
    pub body: String,
    /// Stream within the source the record was written to, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>, timestamp: i64, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            body: body.into(),
            stream: None,
        }
    }

    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = Some(stream.into());
        self
    }
}
