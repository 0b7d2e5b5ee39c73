use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lt_core::{LogQuery, QueryClient, QueryError, QueryPage, RawRecord};
use orion_error::ErrorOwe;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{DEFAULT_PAGE_SIZE, select_page};
use crate::error::RuntimeResult;

/// File name of the JSONL destination backing log group `source`.
///
/// `/ec2/dnsspy` maps to `<root>/ec2_dnsspy.jsonl`.
pub fn destination_path(root: &Path, source: &str) -> PathBuf {
    let name: String = source
        .trim_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = if name.is_empty() { "default".to_string() } else { name };
    root.join(format!("{name}.jsonl"))
}

// ---------------------------------------------------------------------------
// FileLogStore
// ---------------------------------------------------------------------------

/// Log store backed by one JSONL file of [`RawRecord`]s per log group.
///
/// Every tokenless query re-reads the file, so lines appended by a writer
/// show up in the next follow window. Continuation tokens page through the
/// snapshot taken by the query that started the window.
pub struct FileLogStore {
    root: PathBuf,
    page_size: usize,
    snapshots: Mutex<HashMap<String, Arc<Vec<RawRecord>>>>,
}

impl FileLogStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: DEFAULT_PAGE_SIZE,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append records to the destination of `source`, creating it if needed.
    pub async fn append(&self, source: &str, records: &[RawRecord]) -> RuntimeResult<()> {
        let path = destination_path(&self.root, source);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.owe_sys()?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .owe_sys()?;
        let mut writer = tokio::io::BufWriter::new(file);
        for record in records {
            let line = serde_json::to_string(record).owe_data()?;
            writer.write_all(line.as_bytes()).await.owe_sys()?;
            writer.write_all(b"\n").await.owe_sys()?;
        }
        writer.flush().await.owe_sys()?;
        Ok(())
    }

    async fn load(&self, source: &str) -> Result<Vec<RawRecord>, QueryError> {
        let path = destination_path(&self.root, source);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| classify_io(&path, e))?;

        let mut records = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RawRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    lt_warn!(
                        conn,
                        path = %path.display(),
                        line = idx + 1,
                        error = %e,
                        "skipping malformed record"
                    );
                }
            }
        }
        records.sort_by_key(|r| r.timestamp);
        lt_trace!(conn, path = %path.display(), records = records.len(), "store snapshot loaded");
        Ok(records)
    }
}

/// A missing or unreadable log group never heals by retrying.
fn classify_io(path: &Path, e: std::io::Error) -> QueryError {
    match e.kind() {
        ErrorKind::NotFound => {
            QueryError::Fatal(format!("log group {} does not exist", path.display()))
        }
        ErrorKind::PermissionDenied => {
            QueryError::Fatal(format!("access denied reading {}: {e}", path.display()))
        }
        _ => QueryError::Retryable(format!("reading {}: {e}", path.display())),
    }
}

#[async_trait]
impl QueryClient for FileLogStore {
    async fn query(&self, query: &LogQuery) -> Result<QueryPage, QueryError> {
        let cached = match query.next_token {
            Some(_) => self.snapshots.lock().await.get(&query.source).cloned(),
            None => None,
        };
        let records = match cached {
            Some(records) => records,
            None => {
                let fresh = Arc::new(self.load(&query.source).await?);
                self.snapshots
                    .lock()
                    .await
                    .insert(query.source.clone(), Arc::clone(&fresh));
                fresh
            }
        };
        select_page(&records, query, self.page_size)
    }
}
