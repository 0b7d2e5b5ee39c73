use async_trait::async_trait;
use lt_core::{LogQuery, QueryClient, QueryError, QueryPage, RawRecord};
use tokio::sync::RwLock;

use super::{DEFAULT_PAGE_SIZE, select_page};

/// In-process log store. Records may be appended while a session tails it.
///
/// Tokens are offsets into the current record set, so records appended
/// behind an in-flight pagination shift later pages.
#[derive(Debug)]
pub struct MemoryLogStore {
    records: RwLock<Vec<RawRecord>>,
    page_size: usize,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            page_size: page_size.max(1),
        }
    }

    pub async fn append(&self, records: impl IntoIterator<Item = RawRecord>) {
        let mut guard = self.records.write().await;
        guard.extend(records);
        guard.sort_by_key(|r| r.timestamp);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryClient for MemoryLogStore {
    async fn query(&self, query: &LogQuery) -> Result<QueryPage, QueryError> {
        let records = self.records.read().await;
        select_page(&records, query, self.page_size)
    }
}
