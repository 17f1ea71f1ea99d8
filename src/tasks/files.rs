use crate::events::PlayerEvent;
use crate::scan::{ScanOptions, is_supported_video};
use anyhow::Result;
use notify::event::{ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Watch `root` and report eligible clips that disappear from disk.
///
/// New files are ignored: the queue only changes through an explicit selection.
#[instrument(skip_all, fields(root = %root.display()))]
pub async fn run(
    root: PathBuf,
    scan_options: ScanOptions,
    to_player: Sender<PlayerEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    // Bridge notify callback -> async channel
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(128);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;
    let mode = if scan_options.recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher.watch(&root, mode)?;
    info!(?mode, "library watcher initialized");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("cancel received; exiting files task");
                break;
            }

            Some(res) = watch_rx.recv() => match res {
                Ok(event) => {
                    for path in vanished_paths(event, &scan_options) {
                        info!(path = %path.display(), "fs: clip vanished");
                        if to_player.send(PlayerEvent::Vanished(path)).await.is_err() {
                            debug!("player channel closed; exiting files task");
                            return Ok(());
                        }
                    }
                }
                Err(err) => error!("watch error: {err}"),
            }
        }
    }
    Ok(())
}

fn vanished_paths(event: Event, scan_options: &ScanOptions) -> Vec<PathBuf> {
    let eligible = |p: &Path| is_supported_video(p, scan_options.extensions.as_deref());
    match event.kind {
        EventKind::Remove(RemoveKind::File | RemoveKind::Any) => {
            event.paths.into_iter().filter(|p| eligible(p.as_path())).collect()
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            // Moves are reported inconsistently across platforms; decide by existence.
            event
                .paths
                .into_iter()
                .filter(|p| eligible(p.as_path()) && !p.exists())
                .collect()
        }
        kind => {
            debug!(?kind, "fs: ignored");
            Vec::new()
        }
    }
}
