use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::logging::LoggingConfig;
use crate::pacing::PacingConfig;
use crate::provision::ProvisionConfig;
use crate::tail::TailSection;
use crate::validate;

// ---------------------------------------------------------------------------
// Raw TOML structure (intermediate representation)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct LogtailConfigRaw {
    #[serde(default)]
    tail: TailSection,
    #[serde(default)]
    pacing: PacingConfig,
    #[serde(default)]
    provision: ProvisionConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// LogtailConfig (resolved, validated)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct LogtailConfig {
    pub tail: TailSection,
    pub pacing: PacingConfig,
    pub provision: ProvisionConfig,
    pub logging: LoggingConfig,
}

impl LogtailConfig {
    /// Read and parse a `logtail.toml` file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.as_ref().display()))?;
        content.parse()
    }

    /// Re-run validation after callers (the CLI) layered overrides on top.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate::validate(self)
    }
}

impl FromStr for LogtailConfig {
    type Err = anyhow::Error;

    /// Parse a TOML string into a validated [`LogtailConfig`].
    fn from_str(toml_str: &str) -> anyhow::Result<Self> {
        let raw: LogtailConfigRaw = toml::from_str(toml_str)?;

        let config = LogtailConfig {
            tail: raw.tail,
            pacing: raw.pacing,
            provision: raw.provision,
            logging: raw.logging,
        };

        validate::validate(&config)?;

        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
