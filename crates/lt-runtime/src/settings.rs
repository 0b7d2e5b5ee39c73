use std::time::Duration;

use lt_config::{LogtailConfig, PacingConfig, TailSection};
use lt_core::TailRequest;
use orion_error::prelude::*;

use crate::error::{RuntimeReason, RuntimeResult};

/// Engine pacing knobs resolved from `[pacing]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub poll_interval: Duration,
    /// Width of the window overlap, which is also the dedup horizon.
    pub overlap: Duration,
    /// Consecutive transient failures tolerated before the session fails.
    pub max_retries: u32,
    /// Bound of the output channel between engine and consumer.
    pub output_capacity: usize,
}

impl EngineSettings {
    pub fn overlap_millis(&self) -> i64 {
        i64::try_from(self.overlap.as_millis()).unwrap_or(i64::MAX)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&PacingConfig::default())
    }
}

impl From<&PacingConfig> for EngineSettings {
    fn from(p: &PacingConfig) -> Self {
        Self {
            poll_interval: p.poll_interval.as_duration(),
            overlap: p.overlap.as_duration(),
            max_retries: p.max_retries,
            output_capacity: p.output_capacity.max(1),
        }
    }
}

impl From<&LogtailConfig> for EngineSettings {
    fn from(config: &LogtailConfig) -> Self {
        Self::from(&config.pacing)
    }
}

/// Resolve a `[tail]` section into a [`TailRequest`] against `now_millis`.
///
/// A missing start means "now"; a missing end leaves the window unbounded.
pub fn build_request(tail: &TailSection, now_millis: i64) -> RuntimeResult<TailRequest> {
    let source = tail
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            StructError::from(RuntimeReason::Config).with_detail("tail.source is required")
        })?;

    let start = tail.start.map_or(now_millis, |b| b.resolve(now_millis));
    let mut request = TailRequest::new(source, start).follow(tail.follow);
    if let Some(end) = tail.end {
        request = request.with_end(end.resolve(now_millis));
    }
    if let Some(ref hint) = tail.stream_hint {
        request = request.with_stream_hint(hint.clone());
    }
    if let Some(ref include) = tail.include {
        request = request.with_include(include.clone());
    }
    if let Some(ref exclude) = tail.exclude {
        request = request.with_exclude(exclude.clone());
    }
    Ok(request)
}
