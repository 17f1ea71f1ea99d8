use std::fs;
use std::time::{Duration, Instant};

use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use triflow::events::{PlayerEvent, PlayerUpdate, WindowChanged};
use triflow::item::{Item, ItemId};
use triflow::tasks::surface::{self, SurfaceOptions};

async fn next_finished(rx: &mut mpsc::Receiver<PlayerEvent>) -> ItemId {
    match tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timeout waiting for finished event")
        .expect("surface channel closed")
    {
        PlayerEvent::Finished(id) => id,
        other => panic!("unexpected event {other:?}"),
    }
}

fn window(round: u64, items: &[Item], queue_len: usize) -> PlayerUpdate {
    PlayerUpdate::Window(WindowChanged {
        round,
        cursor: 0,
        items: items.to_vec(),
        queue_len,
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mounted_clips_finish_after_clip_length() {
    let tmp = tempdir().unwrap();
    let paths = ["a.mp4", "b.mp4"].map(|n| tmp.path().join(n));
    for p in &paths {
        fs::write(p, b"x").unwrap();
    }
    let items: Vec<Item> = paths.iter().map(Item::new).collect();

    let (updates_tx, updates_rx) = mpsc::channel::<PlayerUpdate>(8);
    let (events_tx, mut events_rx) = mpsc::channel::<PlayerEvent>(8);
    let cancel = CancellationToken::new();
    let clip = Duration::from_millis(150);
    let handle = tokio::spawn(surface::run(
        SurfaceOptions {
            clip_length: Some(clip),
        },
        updates_rx,
        events_tx,
        cancel.clone(),
    ));

    let started = Instant::now();
    updates_tx.send(window(0, &items, 2)).await.unwrap();

    let mut finished = vec![
        next_finished(&mut events_rx).await,
        next_finished(&mut events_rx).await,
    ];
    assert!(started.elapsed() >= clip, "finished too early");
    finished.sort();
    assert_eq!(finished, vec![items[0].id, items[1].id]);

    // Same round, same items: nothing replays.
    updates_tx.send(window(0, &items, 2)).await.unwrap();
    let quiet = tokio::time::timeout(clip * 3, events_rx.recv()).await;
    assert!(quiet.is_err(), "clip replayed without a new round");

    // A new round restarts playback of the same window.
    updates_tx.send(window(1, &items, 2)).await.unwrap();
    next_finished(&mut events_rx).await;
    next_finished(&mut events_rx).await;

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unopenable_clip_counts_as_finished() {
    let tmp = tempdir().unwrap();
    let missing = Item::new(tmp.path().join("gone.mp4"));

    let (updates_tx, updates_rx) = mpsc::channel::<PlayerUpdate>(8);
    let (events_tx, mut events_rx) = mpsc::channel::<PlayerEvent>(8);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(surface::run(
        SurfaceOptions { clip_length: None },
        updates_rx,
        events_tx,
        cancel.clone(),
    ));

    updates_tx
        .send(window(0, std::slice::from_ref(&missing), 1))
        .await
        .unwrap();
    assert_eq!(next_finished(&mut events_rx).await, missing.id);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn released_clip_never_reports_finished() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("a.mp4");
    fs::write(&path, b"x").unwrap();
    let item = Item::new(&path);

    let (updates_tx, updates_rx) = mpsc::channel::<PlayerUpdate>(8);
    let (events_tx, mut events_rx) = mpsc::channel::<PlayerEvent>(8);
    let cancel = CancellationToken::new();
    let clip = Duration::from_millis(200);
    let handle = tokio::spawn(surface::run(
        SurfaceOptions {
            clip_length: Some(clip),
        },
        updates_rx,
        events_tx,
        cancel.clone(),
    ));

    updates_tx
        .send(window(0, std::slice::from_ref(&item), 1))
        .await
        .unwrap();
    updates_tx
        .send(PlayerUpdate::Released(item.clone()))
        .await
        .unwrap();

    let quiet = tokio::time::timeout(clip * 3, events_rx.recv()).await;
    assert!(quiet.is_err(), "released clip still reported finished");

    cancel.cancel();
    handle.await.unwrap().unwrap();
}
