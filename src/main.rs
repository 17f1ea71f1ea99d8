//! Binary entrypoint for TriFlow.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use triflow::config::Configuration;
use triflow::events::{PlayerEvent, PlayerUpdate};
use triflow::scan;
use triflow::tasks::{console, files, player, surface};

#[derive(Debug, Parser)]
#[command(
    name = "triflow",
    version,
    about = "Play a folder of videos three at a time"
)]
struct Args {
    /// Folder to play (overrides library-path from the config)
    #[arg(value_name = "FOLDER")]
    folder: Option<PathBuf>,
    /// Path to YAML config
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Pause between a finished batch and the next one, e.g. "500ms"
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    settle_delay: Option<Duration>,
    /// Pretend every clip plays for this long, e.g. "8s"
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    clip_length: Option<Duration>,
    /// Drop clips whose files disappear from disk
    #[arg(long)]
    watch: bool,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut cfg = match &args.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(folder) = args.folder {
        cfg.library_path = folder;
    }
    if let Some(delay) = args.settle_delay {
        cfg.settle_delay = delay;
    }
    if args.clip_length.is_some() {
        cfg.clip_length = args.clip_length;
    }
    cfg.watch_library |= args.watch;
    let cfg = cfg.validated().context("invalid configuration values")?;
    tracing::debug!("effective configuration: {cfg:#?}");

    let scan_options = cfg.scan_options();
    let items = scan::select_folder(&cfg.library_path, &scan_options)
        .with_context(|| format!("selecting videos from {}", cfg.library_path.display()))?;
    tracing::info!(count = items.len(), "selected clips");

    // Channels (small/bounded)
    let (events_tx, events_rx) = mpsc::channel::<PlayerEvent>(64); // Console/Files/Surface -> Player
    let (updates_tx, updates_rx) = mpsc::channel::<PlayerUpdate>(64); // Player -> Surface

    events_tx
        .send(PlayerEvent::Load(items))
        .await
        .context("player channel closed before start")?;

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Player
    tasks.spawn({
        let options = cfg.player_options();
        let cancel = cancel.clone();
        async move {
            player::run(options, events_rx, updates_tx, cancel)
                .await
                .context("player task failed")
        }
    });

    // Surface
    tasks.spawn({
        let options = surface::SurfaceOptions {
            clip_length: cfg.clip_length,
        };
        let events_tx = events_tx.clone();
        let cancel = cancel.clone();
        async move {
            surface::run(options, updates_rx, events_tx, cancel)
                .await
                .context("surface task failed")
        }
    });

    // Library watcher
    if cfg.watch_library {
        tasks.spawn({
            let root = cfg.library_path.clone();
            let scan_options = scan_options.clone();
            let events_tx = events_tx.clone();
            let cancel = cancel.clone();
            async move {
                files::run(root, scan_options, events_tx, cancel)
                    .await
                    .context("files task failed")
            }
        });
    }

    // Console (Ctrl-D or `quit` cancels the pipeline)
    if io::stdin().is_terminal() {
        tracing::info!("commands: end <id> | del <id> | open <folder> | quit");
        let lines = console::spawn_stdin_reader()?;
        tasks.spawn({
            let events_tx = events_tx.clone();
            let cancel = cancel.clone();
            async move {
                console::run(lines, scan_options, events_tx, cancel)
                    .await
                    .context("console task failed")
            }
        });
    } else {
        tracing::debug!("stdin is not a terminal; console disabled");
    }
    drop(events_tx);

    // Run until cancelled or until any task gives up, then stop the rest.
    tokio::select! {
        _ = cancel.cancelled() => {}
        Some(res) = tasks.join_next() => {
            log_task_result(res);
            cancel.cancel();
        }
    }

    // Drain JoinSet (wait for other tasks to complete)
    while let Some(res) = tasks.join_next().await {
        log_task_result(res);
    }

    Ok(())
}

fn log_task_result(res: Result<Result<()>, tokio::task::JoinError>) {
    match res {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("task error: {e:?}"),
        Err(e) => tracing::error!("join error: {e}"),
    }
}
