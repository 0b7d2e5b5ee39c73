/// Per-session counters, reported when the session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub queries: u64,
    pub pages: u64,
    pub retries: u64,
    pub windows: u64,
    pub received: u64,
    pub emitted: u64,
    pub duplicates: u64,
    pub filtered: u64,
    pub evicted: u64,
}
