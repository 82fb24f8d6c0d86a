use anyhow::Context;
use clap::{Parser, Subcommand};
use jlv::{OutputStyle, PipelineUpdate, RecordPipeline};
use jlv_core::config::{Config, SessionPolicy, TriggerMode};
use jlv_core::{Converter, RecordFilter};
use jlv_feeds::{FeedEvent, Locator, RemoteAuth, SshConfig, TailConfig, Watcher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Parser)]
#[command(name = "jlv", about = "JSON log viewer — tail structured logs, local or over SFTP")]
struct Cli {
    /// Write debug logs to /tmp/jlv-debug.log (tail -f to inspect).
    #[arg(long, global = true)]
    debug: bool,

    /// Read configuration from this file instead of ~/.config/jlv/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Follow a log file and print converted records.
    Tail(TailArgs),
    /// List *.log files in a local or remote directory.
    List(ListArgs),
}

#[derive(clap::Args)]
struct TailArgs {
    /// Path, sftp://[user@]host[:port]/path, or [user@]host:/path.
    locator: String,

    /// Poll interval in milliseconds (default from config).
    #[arg(long)]
    interval: Option<u64>,

    /// Also react to file change notifications (local files only).
    #[arg(long)]
    notify: bool,

    /// Read what is there once and exit.
    #[arg(long)]
    once: bool,

    /// Output style.
    #[arg(long, value_enum, default_value_t = OutputStyle::Compact)]
    style: OutputStyle,

    /// Shorthand for --style export.
    #[arg(long)]
    export: bool,

    /// Only show records of this level.
    #[arg(long)]
    level: Option<String>,

    /// Only show records of this tenant.
    #[arg(long)]
    tenant: Option<String>,

    /// Only show records containing this text.
    #[arg(long)]
    grep: Option<String>,

    /// Treat --grep as a regular expression.
    #[arg(long, requires = "grep")]
    regex: bool,

    #[command(flatten)]
    remote: RemoteArgs,
}

#[derive(clap::Args)]
struct ListArgs {
    /// Directory path, sftp://host/dir, or host:/dir.
    locator: String,

    #[command(flatten)]
    remote: RemoteArgs,
}

#[derive(clap::Args)]
struct RemoteArgs {
    /// Private key for SFTP authentication.
    #[arg(long)]
    identity: Option<PathBuf>,

    /// Environment variable holding the SFTP password.
    #[arg(long, conflicts_with = "identity")]
    password_env: Option<String>,

    /// Keep one SFTP session open between cycles.
    #[arg(long)]
    persistent_session: bool,
}

impl RemoteArgs {
    fn auth(&self) -> anyhow::Result<RemoteAuth> {
        if let Some(var) = &self.password_env {
            let password = std::env::var(var)
                .with_context(|| format!("environment variable {var} is not set"))?;
            return Ok(RemoteAuth::Password(password));
        }
        Ok(match &self.identity {
            Some(path) => RemoteAuth::KeyFile {
                path: path.clone(),
                passphrase: None,
            },
            None => RemoteAuth::Agent,
        })
    }

    fn tail_config(&self, config: &Config) -> anyhow::Result<TailConfig> {
        let mut tail = TailConfig::from_config(config)
            .with_auth(self.auth()?)
            .with_ssh_config(SshConfig::load());
        if self.persistent_session {
            tail.session = SessionPolicy::Persistent;
        }
        Ok(tail)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/jlv-debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
        tracing::info!("jlv debug log started, tail -f /tmp/jlv-debug.log");
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Tail(args) => tail(args, &config).await,
        Command::List(args) => list(args, &config),
    }
}

async fn tail(args: TailArgs, config: &Config) -> anyhow::Result<()> {
    let locator = Locator::parse(&args.locator)?;
    let mut tail_config = args.remote.tail_config(config)?;
    if args.notify {
        if locator.is_remote() {
            eprintln!("jlv: --notify has no effect on remote files; polling only");
        }
        tail_config = tail_config.with_trigger(TriggerMode::PollAndNotify);
    }

    let (watcher, mut events) = Watcher::open(&locator, &tail_config)
        .with_context(|| format!("cannot open {locator}"))?;

    let mut filter = RecordFilter::new();
    if let Some(text) = &args.grep {
        filter = filter.text(text, args.regex);
    }
    if let Some(tenant) = &args.tenant {
        filter = filter.tenant(tenant);
    }
    if let Some(level) = &args.level {
        filter = filter.level(level);
    }

    let style = if args.export { OutputStyle::Export } else { args.style };
    let mut pipeline = RecordPipeline::new(Converter::new(config.columns.layout()), filter);

    tokio::task::block_in_place(|| watcher.read_increment())?;
    drain(&mut events, &mut pipeline, style)?;

    if args.once {
        finish(&watcher, &pipeline);
        return Ok(());
    }

    let interval = args
        .interval
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.tail.interval());
    watcher.start_periodic(interval)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(event) => print_update(pipeline.apply(event), &pipeline, style)?,
                None => break,
            },
        }
    }

    tokio::task::block_in_place(|| finish(&watcher, &pipeline));
    Ok(())
}

fn finish(watcher: &Watcher, pipeline: &RecordPipeline) {
    watcher.dispose();
    let tenants: Vec<&str> = pipeline.tenants().collect();
    tracing::info!(file = watcher.name(), records = pipeline.seen(), ?tenants, "tail finished");
}

fn drain(
    events: &mut UnboundedReceiver<FeedEvent>,
    pipeline: &mut RecordPipeline,
    style: OutputStyle,
) -> anyhow::Result<()> {
    while let Ok(event) = events.try_recv() {
        print_update(pipeline.apply(event), pipeline, style)?;
    }
    Ok(())
}

fn print_update(update: PipelineUpdate, pipeline: &RecordPipeline, style: OutputStyle) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match update {
        PipelineUpdate::Reset => writeln!(out, "--- log file recreated; reading from start ---")?,
        PipelineUpdate::Failed(reason) => eprintln!("jlv: read failed: {reason}"),
        PipelineUpdate::Records { records, progress } => {
            for record in &records {
                writeln!(out, "{}", style.render(pipeline.converter(), record)?)?;
            }
            tracing::debug!(shown = records.len(), progress, "printed block");
        }
    }
    Ok(())
}

fn list(args: ListArgs, config: &Config) -> anyhow::Result<()> {
    let entries = match Locator::parse(&args.locator)? {
        Locator::Local(dir) => jlv_feeds::list_local(&dir)?,
        Locator::Remote(target) => {
            let tail_config = args.remote.tail_config(config)?;
            let endpoint = target.resolve(&tail_config.ssh, tail_config.default_port)?;
            jlv_feeds::list_remote(&endpoint, &tail_config.auth, Path::new(&target.path))?
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for entry in entries {
        writeln!(out, "{:>12}  {}", entry.size, entry.path.display())?;
    }
    Ok(())
}
