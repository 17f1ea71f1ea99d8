use std::path::PathBuf;

use crate::item::{Item, ItemId};

/// Inputs delivered to the player task, one at a time.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A new folder selection replaces the queue.
    Load(Vec<Item>),
    /// Playback of a clip reached its end.
    Finished(ItemId),
    /// The user asked for a clip to be dropped (swipe, `del` command, ...).
    DeleteRequested(ItemId),
    /// The media file behind a clip disappeared from disk.
    Vanished(PathBuf),
}

/// Snapshot of what should be on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowChanged {
    /// Bumped on every advance; a new round restarts playback even when the
    /// same items are shown again.
    pub round: u64,
    pub cursor: usize,
    pub items: Vec<Item>,
    pub queue_len: usize,
}

#[derive(Debug, Clone)]
pub enum PlayerUpdate {
    Window(WindowChanged),
    /// The item left the queue for good; whoever holds its handle must drop it.
    Released(Item),
}
