use serde::Deserialize;

use crate::types::TimeBound;

/// `[tail]` section: what to read and how to filter it.
///
/// `source` is optional here because the CLI may derive it from the
/// provisioned log group instead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TailSection {
    pub source: Option<String>,
    pub stream_hint: Option<String>,
    /// Defaults to the session start time.
    pub start: Option<TimeBound>,
    /// Absent means unbounded.
    pub end: Option<TimeBound>,
    pub follow: bool,
    pub include: Option<String>,
    pub exclude: Option<String>,
}
