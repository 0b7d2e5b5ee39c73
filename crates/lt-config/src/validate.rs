use crate::logtail::LogtailConfig;
use crate::types::TimeBound;

/// Internal validation, called during `LogtailConfig::from_str` / `load`.
pub(crate) fn validate(config: &LogtailConfig) -> anyhow::Result<()> {
    if config.pacing.poll_interval.as_duration().is_zero() {
        anyhow::bail!("pacing.poll_interval must be > 0");
    }

    if config.pacing.output_capacity == 0 {
        anyhow::bail!("pacing.output_capacity must be > 0");
    }

    if let Some(source) = &config.tail.source
        && source.trim().is_empty()
    {
        anyhow::bail!("tail.source must not be empty when set");
    }

    // Only absolute bounds can be compared without a clock.
    if let (Some(TimeBound::At(start)), Some(TimeBound::At(end))) =
        (&config.tail.start, &config.tail.end)
        && start > end
    {
        anyhow::bail!("tail.start ({start}) is after tail.end ({end})");
    }

    if config.provision.log_group_name.trim().is_empty() {
        anyhow::bail!("provision.log_group_name must not be empty");
    }

    if config.provision.store_dir.as_os_str().is_empty() {
        anyhow::bail!("provision.store_dir must not be empty");
    }

    Ok(())
}
