pub mod logging;
pub mod logtail;
pub mod pacing;
pub mod provision;
pub mod tail;
pub mod types;
mod validate;

pub use logging::{LogFormat, LoggingConfig};
pub use logtail::LogtailConfig;
pub use pacing::PacingConfig;
pub use provision::{DEFAULT_LOG_GROUP_NAME, DEFAULT_QUERY_LOG_NAME, ProvisionConfig};
pub use tail::TailSection;
pub use types::{HumanDuration, TimeBound};
