mod render;

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use lt_config::{LogtailConfig, TimeBound};
use lt_runtime::signal::wait_for_signal;
use lt_runtime::tracing_init::init_tracing;
use lt_runtime::{
    Clock, EngineSettings, FileLogStore, FileProvisioner, Provisioned, Provisioner, SystemClock,
    TailSession, TailStream, build_request,
};

use crate::render::{OutputFormat, write_header, write_record};

#[derive(Parser)]
#[command(
    name = "logtail",
    about = "Tail resolver query logs for an instance in (almost) real time"
)]
struct Cli {
    /// Path to a logtail.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail matching records to stdout
    Tail(TailArgs),
    /// Create the log destination and associate an instance with it
    Setup(ProvisionArgs),
    /// Remove the association, and the destination once nothing uses it
    Teardown(ProvisionArgs),
}

#[derive(Args)]
struct ProvisionArgs {
    /// Instance ID whose queries are delivered
    #[arg(short = 'i', long)]
    instance_id: String,

    /// Log group name receiving query records
    #[arg(short = 'l', long)]
    log_group_name: Option<String>,

    /// Name of the resolver query log association
    #[arg(short = 'r', long)]
    resolver_query_log_name: Option<String>,
}

#[derive(Args)]
struct TailArgs {
    /// Instance ID; provisions delivery and filters on it unless --grep is set
    #[arg(short = 'i', long)]
    instance_id: Option<String>,

    /// Log group name to tail
    #[arg(short = 'l', long)]
    log_group_name: Option<String>,

    /// Name of the resolver query log association
    #[arg(short = 'r', long)]
    resolver_query_log_name: Option<String>,

    /// Only streams whose name starts with this prefix
    #[arg(long)]
    stream: Option<String>,

    /// RFC 3339 instant or a duration ago (e.g. 10m). Default: now
    #[arg(long)]
    start: Option<TimeBound>,

    /// RFC 3339 instant or a duration ago. Default: unbounded
    #[arg(long)]
    end: Option<TimeBound>,

    /// Keep polling for new records
    #[arg(short = 'f', long)]
    follow: bool,

    /// Only records whose body matches this pattern
    #[arg(long)]
    grep: Option<String>,

    /// Drop records whose body matches this pattern
    #[arg(long)]
    grepv: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Default)]
    output: OutputFormat,

    /// Remove provisioned resources when the tail ends
    #[arg(long)]
    rm: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, base_dir) = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Tail(args) => {
            apply_names(
                &mut config,
                args.log_group_name.as_deref(),
                args.resolver_query_log_name.as_deref(),
            );
            let _guard = init_tracing(&config.logging, &base_dir)?;
            run_tail(config, &base_dir, args).await
        }
        Commands::Setup(args) => {
            apply_names(
                &mut config,
                args.log_group_name.as_deref(),
                args.resolver_query_log_name.as_deref(),
            );
            let _guard = init_tracing(&config.logging, &base_dir)?;
            let provisioner = FileProvisioner::new(config.provision, &base_dir);
            let provisioned = provisioner
                .ensure(&args.instance_id)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("{}", provisioned.destination.display());
            Ok(())
        }
        Commands::Teardown(args) => {
            apply_names(
                &mut config,
                args.log_group_name.as_deref(),
                args.resolver_query_log_name.as_deref(),
            );
            let _guard = init_tracing(&config.logging, &base_dir)?;
            let provisioner = FileProvisioner::new(config.provision.clone(), &base_dir);
            let provisioned = Provisioned {
                resource_id: args.instance_id,
                source: config.provision.log_group_name.clone(),
                destination: provisioner.destination(),
                association: config.provision.query_log_name.clone(),
                created: false,
            };
            provisioner
                .teardown(&provisioned)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))
        }
    }
}

/// Without `--config`, defaults apply and relative paths resolve against
/// the working directory.
fn load_config(path: Option<&Path>) -> Result<(LogtailConfig, PathBuf)> {
    match path {
        Some(path) => {
            let config_path = path
                .canonicalize()
                .map_err(|e| anyhow::anyhow!("config path '{}': {e}", path.display()))?;
            let config = LogtailConfig::load(&config_path)?;
            let base_dir = config_path
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| anyhow::anyhow!("config path has no parent directory"))?;
            Ok((config, base_dir))
        }
        None => Ok((LogtailConfig::default(), std::env::current_dir()?)),
    }
}

fn apply_names(config: &mut LogtailConfig, log_group: Option<&str>, query_log: Option<&str>) {
    if let Some(name) = log_group {
        config.provision.log_group_name = name.to_string();
        config.tail.source = Some(name.to_string());
    }
    if let Some(name) = query_log {
        config.provision.query_log_name = name.to_string();
    }
}

/// Layer command-line flags over the `[tail]` section.
fn apply_tail_args(config: &mut LogtailConfig, args: &TailArgs) {
    let tail = &mut config.tail;
    if tail.source.is_none() {
        tail.source = Some(config.provision.log_group_name.clone());
    }
    if args.stream.is_some() {
        tail.stream_hint = args.stream.clone();
    }
    if args.start.is_some() {
        tail.start = args.start;
    }
    if args.end.is_some() {
        tail.end = args.end;
    }
    tail.follow |= args.follow;
    if args.grep.is_some() {
        tail.include = args.grep.clone();
    } else if tail.include.is_none() {
        tail.include = args.instance_id.clone();
    }
    if args.grepv.is_some() {
        tail.exclude = args.grepv.clone();
    }
}

async fn run_tail(mut config: LogtailConfig, base_dir: &Path, args: TailArgs) -> Result<()> {
    apply_tail_args(&mut config, &args);
    config.validate()?;

    let provisioner = FileProvisioner::new(config.provision.clone(), base_dir);
    let provisioned = match args.instance_id.as_deref() {
        Some(id) => Some(
            provisioner
                .ensure(id)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?,
        ),
        None => None,
    };

    let request = build_request(&config.tail, SystemClock.now_millis())
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let store = FileLogStore::new(provisioner.root());

    let cancel = CancellationToken::new();
    let signal = tokio::spawn(wait_for_signal(cancel.clone()));

    let mut stream = TailSession::new(request, store)
        .with_settings(EngineSettings::from(&config))
        .with_cancel(&cancel)
        .start()
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let stdout = std::io::stdout();
    let outcome = drain(&mut stream, args.output, &mut stdout.lock()).await;

    if let Some(summary) = stream.summary() {
        tracing::info!(
            domain = "sys",
            end = ?summary.end,
            emitted = summary.stats.emitted,
            "tail finished"
        );
    }
    drop(stream);
    cancel.cancel();
    let _ = signal.await;

    if args.rm
        && let Some(ref provisioned) = provisioned
    {
        provisioner
            .teardown(provisioned)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;
    }

    outcome
}

/// Copy records to `out` until the session ends or the reader goes away.
/// A closed pipe (`logtail tail | head`) ends the stream without an error.
async fn drain(stream: &mut TailStream, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    let written = write_header(format, out).and_then(|()| out.flush());
    if let Some(result) = output_closed(written) {
        return result;
    }
    while let Some(item) = stream.next().await {
        let record = item.map_err(|e| anyhow::anyhow!("{e}"))?;
        let written = write_record(format, &record, out).and_then(|()| out.flush());
        if let Some(result) = output_closed(written) {
            return result;
        }
    }
    Ok(())
}

/// `Some` when writing must stop: `Ok` for a reader that hung up, `Err` otherwise.
fn output_closed(written: std::io::Result<()>) -> Option<Result<()>> {
    match written {
        Ok(()) => None,
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            tracing::debug!(domain = "sys", "output closed by reader");
            Some(Ok(()))
        }
        Err(e) => Some(Err(e.into())),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lt_core::{RawRecord, TailRequest};
    use lt_runtime::MemoryLogStore;

    use super::*;

    fn tail_args(argv: &[&str]) -> TailArgs {
        let mut full = vec!["logtail", "tail"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Tail(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn instance_id_becomes_the_default_include() {
        let args = tail_args(&["-i", "i-0abc"]);
        let mut config = LogtailConfig::default();
        apply_tail_args(&mut config, &args);
        assert_eq!(config.tail.include.as_deref(), Some("i-0abc"));
        assert_eq!(config.tail.source.as_deref(), Some("/ec2/dnsspy"));
        assert!(!config.tail.follow);
    }

    #[test]
    fn grep_overrides_instance_filter() {
        let args = tail_args(&["-i", "i-0abc", "--grep", "NXDOMAIN", "--grepv", "amazonaws"]);
        let mut config = LogtailConfig::default();
        apply_tail_args(&mut config, &args);
        assert_eq!(config.tail.include.as_deref(), Some("NXDOMAIN"));
        assert_eq!(config.tail.exclude.as_deref(), Some("amazonaws"));
    }

    #[test]
    fn names_and_bounds_parse() {
        let args = tail_args(&[
            "-l", "/custom/group", "-r", "custom-log", "--start", "10m", "--end",
            "2024-05-01T12:00:00Z", "-f", "-o", "json", "--rm",
        ]);
        let mut config = LogtailConfig::default();
        apply_names(
            &mut config,
            args.log_group_name.as_deref(),
            args.resolver_query_log_name.as_deref(),
        );
        apply_tail_args(&mut config, &args);

        assert_eq!(config.provision.log_group_name, "/custom/group");
        assert_eq!(config.provision.query_log_name, "custom-log");
        assert_eq!(config.tail.source.as_deref(), Some("/custom/group"));
        assert!(matches!(config.tail.start, Some(TimeBound::Ago(_))));
        assert!(matches!(config.tail.end, Some(TimeBound::At(_))));
        assert!(config.tail.follow);
        assert!(args.rm);
        assert_eq!(args.output, OutputFormat::Json);
    }

    struct FailingWriter(std::io::ErrorKind);

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(self.0.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn bounded_stream() -> TailStream {
        let store = MemoryLogStore::new();
        store
            .append(vec![
                RawRecord::new("1", 1_000, "one"),
                RawRecord::new("2", 2_000, "two"),
            ])
            .await;
        let settings = EngineSettings {
            poll_interval: Duration::from_millis(5),
            ..EngineSettings::default()
        };
        TailSession::new(TailRequest::new("grp", 0).with_end(10_000), store)
            .with_settings(settings)
            .start()
            .unwrap()
    }

    #[tokio::test]
    async fn drain_writes_every_record() {
        let mut stream = bounded_stream().await;
        let mut out = Vec::new();
        drain(&mut stream, OutputFormat::Json, &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), ["one", "two"]);
    }

    #[tokio::test]
    async fn closed_reader_ends_drain_cleanly() {
        let mut stream = bounded_stream().await;
        let mut out = FailingWriter(ErrorKind::BrokenPipe);
        assert!(drain(&mut stream, OutputFormat::Json, &mut out).await.is_ok());
        assert!(drain(&mut stream, OutputFormat::Default, &mut out).await.is_ok());
    }

    #[tokio::test]
    async fn other_write_errors_stop_drain() {
        let mut stream = bounded_stream().await;
        let mut out = FailingWriter(ErrorKind::PermissionDenied);
        assert!(drain(&mut stream, OutputFormat::Json, &mut out).await.is_err());
    }

    #[tokio::test]
    async fn session_failure_is_returned_from_drain() {
        let settings = EngineSettings {
            poll_interval: Duration::from_millis(5),
            ..EngineSettings::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let store = FileLogStore::new(dir.path());
        let mut stream = TailSession::new(TailRequest::new("/missing", 0).with_end(10), store)
            .with_settings(settings)
            .start()
            .unwrap();
        let mut out = Vec::new();
        assert!(drain(&mut stream, OutputFormat::Json, &mut out).await.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn bad_output_format_is_rejected() {
        assert!(Cli::try_parse_from(["logtail", "tail", "-o", "yaml"]).is_err());
    }
}
