//! Headless stand-in for the playback surface.
//!
//! Mounts the current window by opening each clip's file, reports clips as
//! finished after a fixed clip length and drops handles when the player
//! releases an item.

use crate::events::{PlayerEvent, PlayerUpdate, WindowChanged};
use crate::item::{Item, ItemId};
use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;
use tokio::fs::File;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceOptions {
    /// How long every clip "plays". `None` leaves finishing to someone else.
    pub clip_length: Option<Duration>,
}

struct Mounted {
    item: Item,
    handle: Option<File>,
    ends_at: Option<Instant>,
}

#[instrument(skip_all)]
pub async fn run(
    options: SurfaceOptions,
    mut updates: Receiver<PlayerUpdate>,
    to_player: Sender<PlayerEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut mounted: HashMap<ItemId, Mounted> = HashMap::new();
    let mut round = None;

    loop {
        let next_end = mounted
            .values()
            .filter_map(|m| m.ends_at.map(|at| (at, m.item.id)))
            .min();
        let wake_at = next_end.map_or_else(Instant::now, |(at, _)| at);

        select! {
            _ = cancel.cancelled() => break,

            maybe_update = updates.recv() => match maybe_update {
                Some(PlayerUpdate::Window(window)) => {
                    render(&window);
                    if round != Some(window.round) {
                        // New batch: everything starts from the top.
                        mounted.clear();
                        round = Some(window.round);
                    }
                    remount(&mut mounted, &window, options.clip_length).await;
                }
                Some(PlayerUpdate::Released(item)) => {
                    let held = mounted
                        .remove(&item.id)
                        .is_some_and(|m| m.handle.is_some());
                    info!(id = %item.id, name = %item.name, held, "released");
                }
                None => {
                    debug!("player closed the update channel");
                    break;
                }
            },

            _ = sleep_until(wake_at), if next_end.is_some() => {
                if let Some((_, id)) = next_end {
                    if let Some(m) = mounted.get_mut(&id) {
                        m.ends_at = None;
                        debug!(%id, name = %m.item.name, "playback ended");
                    }
                    if to_player.send(PlayerEvent::Finished(id)).await.is_err() {
                        warn!("player channel closed");
                        break;
                    }
                }
            }
        }
    }

    let released = mounted.values().filter(|m| m.handle.is_some()).count();
    mounted.clear();
    info!(released, "surface torn down");
    Ok(())
}

async fn remount(
    mounted: &mut HashMap<ItemId, Mounted>,
    window: &WindowChanged,
    clip_length: Option<Duration>,
) {
    mounted.retain(|id, _| window.items.iter().any(|item| item.id == *id));

    for item in &window.items {
        if mounted.contains_key(&item.id) {
            continue;
        }
        let now = Instant::now();
        let (handle, ends_at) = match File::open(&item.path).await {
            Ok(file) => (Some(file), clip_length.map(|len| now + len)),
            Err(err) => {
                // An unplayable clip counts as finished so the batch can still move on.
                warn!(id = %item.id, path = %item.path.display(), "cannot open clip: {err}");
                (None, Some(now))
            }
        };
        mounted.insert(
            item.id,
            Mounted {
                item: item.clone(),
                handle,
                ends_at,
            },
        );
    }
}

fn render(window: &WindowChanged) {
    if window.queue_len == 0 {
        info!("no clips queued");
        return;
    }
    let slots: Vec<String> = window
        .items
        .iter()
        .map(|item| format!("{} {}", item.id, item.name))
        .collect();
    info!(
        round = window.round,
        position = window.cursor + 1,
        queued = window.queue_len,
        "now playing: {}",
        if slots.is_empty() {
            "-".to_string()
        } else {
            slots.join(" | ")
        }
    );
}
