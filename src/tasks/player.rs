//! Drives the batch controller from player events and publishes what to show.

use crate::batch::BatchController;
use crate::config::PlayerOptions;
use crate::events::{PlayerEvent, PlayerUpdate, WindowChanged};
use crate::item::Item;
use anyhow::Result;
use std::time::Instant;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{Instant as TokioInstant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Owns the batch controller and feeds it events one at a time.
///
/// Rules:
/// - `Load` replaces the queue; every previously queued item is released.
/// - `DeleteRequested` and `Vanished` remove one item and release it.
/// - `Finished` for unknown ids is dropped silently.
/// - The settle timer is re-armed from the controller after every event, so a
///   state change supersedes any pending advance.
/// - A `Window` update goes out whenever what should be on screen changed.
/// - On shutdown every remaining item is released.
#[instrument(skip_all, fields(batch_size = options.batch_size))]
pub async fn run(
    options: PlayerOptions,
    mut events: Receiver<PlayerEvent>,
    updates: Sender<PlayerUpdate>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut controller = BatchController::new(options.batch_size, options.settle_delay);
    let mut shown = snapshot(&controller);

    loop {
        let deadline = controller.advance_deadline();
        let wake_at = deadline.map_or_else(TokioInstant::now, TokioInstant::from_std);

        let released = select! {
            _ = cancel.cancelled() => break,

            maybe_ev = events.recv() => match maybe_ev {
                Some(ev) => apply(&mut controller, ev, Instant::now()),
                None => {
                    debug!("all event producers closed; stopping player");
                    break;
                }
            },

            _ = sleep_until(wake_at), if deadline.is_some() => {
                if controller.poll_advance(Instant::now()) {
                    info!(
                        cursor = controller.cursor(),
                        round = controller.round(),
                        "batch advanced"
                    );
                }
                Vec::new()
            }
        };

        for item in released {
            if updates.send(PlayerUpdate::Released(item)).await.is_err() {
                warn!("update channel closed");
                return Ok(());
            }
        }

        let current = snapshot(&controller);
        if current != shown {
            debug!(
                cursor = current.cursor,
                visible = current.items.len(),
                queued = current.queue_len,
                "window changed"
            );
            if updates
                .send(PlayerUpdate::Window(current.clone()))
                .await
                .is_err()
            {
                warn!("update channel closed");
                return Ok(());
            }
            shown = current;
        }
    }

    // Teardown: nothing stays queued, so every handle must go.
    let remaining = controller.initialize(Vec::new());
    let count = remaining.len();
    for item in remaining {
        if updates.send(PlayerUpdate::Released(item)).await.is_err() {
            debug!("surface gone before teardown finished");
            break;
        }
    }
    info!(released = count, "player stopped");
    Ok(())
}

fn apply(controller: &mut BatchController, ev: PlayerEvent, now: Instant) -> Vec<Item> {
    match ev {
        PlayerEvent::Load(items) => {
            info!(
                count = items.len(),
                batch_size = controller.batch_size(),
                "queue loaded"
            );
            controller.initialize(items)
        }
        PlayerEvent::Finished(id) => {
            if !controller.mark_finished(id, now) {
                debug!(%id, "finish ignored");
            }
            Vec::new()
        }
        PlayerEvent::DeleteRequested(id) => match controller.remove(id, now) {
            Some(item) => {
                info!(%id, name = %item.name, "removed on request");
                vec![item]
            }
            None => {
                debug!(%id, "delete ignored; not queued");
                Vec::new()
            }
        },
        PlayerEvent::Vanished(path) => match controller.remove_path(&path, now) {
            Some(item) => {
                info!(id = %item.id, path = %path.display(), "removed; file vanished");
                vec![item]
            }
            None => Vec::new(),
        },
    }
}

fn snapshot(controller: &BatchController) -> WindowChanged {
    WindowChanged {
        round: controller.round(),
        cursor: controller.cursor(),
        items: controller.current_window().to_vec(),
        queue_len: controller.queue().len(),
    }
}
