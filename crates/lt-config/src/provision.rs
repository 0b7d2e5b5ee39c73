use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_LOG_GROUP_NAME: &str = "/ec2/dnsspy";
pub const DEFAULT_QUERY_LOG_NAME: &str = "ec2-dnsspy";
pub const DEFAULT_RETENTION_DAYS: u32 = 1;
pub const DEFAULT_STORE_DIR: &str = ".logtail";

/// `[provision]` section: naming of the log destination and its delivery
/// association.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub log_group_name: String,
    pub query_log_name: String,
    pub retention_days: u32,
    /// Root directory of the file-backed log store.
    pub store_dir: PathBuf,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            log_group_name: DEFAULT_LOG_GROUP_NAME.to_string(),
            query_log_name: DEFAULT_QUERY_LOG_NAME.to_string(),
            retention_days: DEFAULT_RETENTION_DAYS,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}
