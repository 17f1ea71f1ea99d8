//! Batch-advance state machine.
//!
//! The controller exposes a sliding window over an ordered queue of items,
//! tracks which items of that window finished playing and advances the
//! window once all of them did, after a settle delay. Time is passed in by
//! the caller so the machine stays free of any runtime.

use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::item::{Item, ItemId};

pub const DEFAULT_BATCH_SIZE: usize = 3;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct BatchController {
    queue: Vec<Item>,
    cursor: usize,
    completed: HashSet<ItemId>,
    batch_size: usize,
    settle_delay: Duration,
    advance_at: Option<Instant>,
    round: u64,
}

impl Default for BatchController {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_SETTLE_DELAY)
    }
}

impl BatchController {
    /// `batch_size` is clamped to at least one item.
    pub fn new(batch_size: usize, settle_delay: Duration) -> Self {
        Self {
            queue: Vec::new(),
            cursor: 0,
            completed: HashSet::new(),
            batch_size: batch_size.max(1),
            settle_delay,
            advance_at: None,
            round: 0,
        }
    }

    /// Replace the queue and start over from the first batch.
    ///
    /// Returns the previous queue; those items left permanently.
    pub fn initialize(&mut self, items: Vec<Item>) -> Vec<Item> {
        let previous = std::mem::replace(&mut self.queue, items);
        self.cursor = 0;
        self.completed.clear();
        self.advance_at = None;
        self.round = 0;
        previous
    }

    pub fn current_window(&self) -> &[Item] {
        let start = self.cursor.min(self.queue.len());
        let end = (start + self.batch_size).min(self.queue.len());
        &self.queue[start..end]
    }

    pub fn queue(&self) -> &[Item] {
        &self.queue
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn is_finished(&self, id: ItemId) -> bool {
        self.completed.contains(&id)
    }

    pub fn finished_count(&self) -> usize {
        self.completed.len()
    }

    /// Number of advances since the last [`initialize`](Self::initialize).
    ///
    /// Distinguishes a fresh batch from the previous one when looping lands
    /// on the same window again.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// When the pending advance is due, if one is scheduled.
    pub fn advance_deadline(&self) -> Option<Instant> {
        self.advance_at
    }

    /// Record that `id` reached the end of playback.
    ///
    /// Ids that are not queued are ignored: a clip can end after it was
    /// deleted. Returns whether the completion set changed.
    pub fn mark_finished(&mut self, id: ItemId, now: Instant) -> bool {
        if !self.contains(id) || !self.completed.insert(id) {
            return false;
        }
        self.reevaluate(now);
        true
    }

    /// Drop `id` from the queue, keeping the window valid.
    ///
    /// Idempotent; returns the removed item the first time.
    pub fn remove(&mut self, id: ItemId, now: Instant) -> Option<Item> {
        let pos = self.queue.iter().position(|item| item.id == id)?;
        let removed = self.queue.remove(pos);

        self.completed.remove(&id);
        let queue = &self.queue;
        self.completed
            .retain(|done| queue.iter().any(|item| item.id == *done));

        if self.queue.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.queue.len() {
            // Nothing left at or after the cursor; start again from the top.
            self.cursor = 0;
            self.completed.clear();
        }

        self.reevaluate(now);
        Some(removed)
    }

    /// Remove whichever queued item refers to `path`.
    pub fn remove_path(&mut self, path: &Path, now: Instant) -> Option<Item> {
        let id = self.queue.iter().find(|item| item.path == path)?.id;
        self.remove(id, now)
    }

    /// Apply the pending advance if it is due. Returns whether it was applied.
    pub fn poll_advance(&mut self, now: Instant) -> bool {
        match self.advance_at {
            Some(at) if now >= at => {
                self.advance_at = None;
                if self.window_settled() {
                    self.advance();
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    fn contains(&self, id: ItemId) -> bool {
        self.queue.iter().any(|item| item.id == id)
    }

    fn window_settled(&self) -> bool {
        let window = self.current_window();
        !window.is_empty() && window.iter().all(|item| self.completed.contains(&item.id))
    }

    // Called after every real change: any pending advance is superseded and
    // the settle delay restarts if the window is still complete.
    fn reevaluate(&mut self, now: Instant) {
        self.advance_at = self
            .window_settled()
            .then(|| now + self.settle_delay);
    }

    fn advance(&mut self) {
        let next = self.cursor + self.batch_size;
        self.cursor = if next < self.queue.len() { next } else { 0 };
        self.completed.clear();
        self.round += 1;
    }
}
