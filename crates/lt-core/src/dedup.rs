use std::collections::HashMap;

/// Remembers identities emitted recently so overlapping windows do not
/// deliver a record twice.
///
/// Each identity is stored with its record timestamp; [`evict_before`]
/// drops entries that can no longer be returned by a query, which keeps
/// the set bounded by the overlap width rather than the session length.
///
/// [`evict_before`]: Deduplicator::evict_before
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashMap<String, i64>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and marks `id` as seen if it was not tracked yet.
    pub fn should_emit(&mut self, id: &str, timestamp: i64) -> bool {
        if self.seen.contains_key(id) {
            return false;
        }
        self.seen.insert(id.to_string(), timestamp);
        true
    }

    /// Remove identities whose timestamp is strictly before `instant`.
    /// Returns the number of entries removed.
    pub fn evict_before(&mut self, instant: i64) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, ts| *ts >= instant);
        before - self.seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
