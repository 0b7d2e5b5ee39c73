use std::time::Duration;

use serde::Deserialize;

use crate::types::HumanDuration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_OVERLAP: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_OUTPUT_CAPACITY: usize = 1000;

/// `[pacing]` section: call-rate ceiling and window/retry tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// One query permit is issued per interval.
    pub poll_interval: HumanDuration,
    /// How far consecutive follow windows intersect; also the dedup horizon.
    pub overlap: HumanDuration,
    /// Consecutive transient failures tolerated before the session fails.
    pub max_retries: u32,
    /// Bounded depth of the record stream handed to the consumer.
    pub output_capacity: usize,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL.into(),
            overlap: DEFAULT_OVERLAP.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
        }
    }
}
