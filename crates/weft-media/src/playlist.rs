//! Playlist engine
//!
//! Ordered items plus an optional shuffle permutation, a current index,
//! repeat/shuffle flags, and pre-roll: while the playlist is active, the item
//! following the current one in effective order is kept prepared so the
//! playback layer can transition without an audible gap.
//!
//! Effective order is the shuffle permutation when shuffle is enabled,
//! otherwise primary insertion order; wrapping happens only with repeat.
//! Every navigation and mutation entry point is defensively guarded: an
//! operation on an empty playlist or past a boundary is a no-op, never a
//! panic. There is no "move" (reorder) entry point at all; the explicit
//! insert/remove/replace/clear surface makes one unnecessary.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

use crate::backend::{BackendEvent, MediaBackend};
use crate::item::{ItemId, ItemStatus, MediaSource, PlaylistItem};
use crate::MediaError;

/// Notification raised by the playlist, in registration order
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistEvent {
    /// The tracked current item changed; old == new on a single-item repeat
    CurrentItemChanged {
        old: Option<ItemId>,
        new: Option<ItemId>,
    },
    /// An item completed its first-ever preparation
    ItemOpened(ItemId),
    /// An item hit an unrecoverable media error; no auto-advance happens
    ItemFailed { item: ItemId, error: MediaError },
    /// The last item in effective order finished and nothing follows
    PlaylistEnded,
}

type Observer = Box<dyn FnMut(&PlaylistEvent)>;

/// Sequenced collection of playable items with pre-roll
pub struct Playlist<B: MediaBackend> {
    backend: B,
    items: Vec<PlaylistItem>,
    /// Materialized permutation of item ids; empty unless shuffle is on
    shuffle_order: Vec<ItemId>,
    /// Index into primary order; None exactly when empty or never activated
    current: Option<usize>,
    /// The promoted current item, as reported through notifications
    current_item: Option<ItemId>,
    /// The designated pre-rolled successor, if any
    preroll: Option<ItemId>,
    repeat: bool,
    shuffle: bool,
    active: bool,
    /// Items currently in the Started state
    started: HashSet<ItemId>,
    next_id: u64,
    observers: Vec<Observer>,
}

impl<B: MediaBackend> Playlist<B> {
    /// Create an empty, inactive playlist over a backend
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            items: Vec::new(),
            shuffle_order: Vec::new(),
            current: None,
            current_item: None,
            preroll: None,
            repeat: false,
            shuffle: false,
            active: false,
            started: HashSet::new(),
            next_id: 0,
            observers: Vec::new(),
        }
    }

    /// The backend (primarily for inspection in tests)
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register a notification observer; observers run synchronously in
    /// registration order
    pub fn subscribe(&mut self, observer: impl FnMut(&PlaylistEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if there are no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current index into primary order
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// The promoted current item
    pub fn current_item_id(&self) -> Option<ItemId> {
        self.current_item
    }

    /// The designated pre-rolled successor
    pub fn preroll_item(&self) -> Option<ItemId> {
        self.preroll
    }

    /// Item by id
    pub fn item(&self, id: ItemId) -> Option<&PlaylistItem> {
        self.index_of(id).map(|i| &self.items[i])
    }

    /// Item by primary-order index
    pub fn item_at(&self, index: usize) -> Option<&PlaylistItem> {
        self.items.get(index)
    }

    /// All items in primary order
    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    /// The shuffle permutation (empty unless shuffle is enabled)
    pub fn shuffle_order(&self) -> &[ItemId] {
        &self.shuffle_order
    }

    /// Is shuffle enabled?
    pub fn is_shuffle(&self) -> bool {
        self.shuffle
    }

    /// Is repeat enabled?
    pub fn is_repeat(&self) -> bool {
        self.repeat
    }

    /// Is the playlist actively preparing/advancing?
    pub fn is_active(&self) -> bool {
        self.active
    }

    // ---- activation ----

    /// Mark active and begin preparing the item at the current index
    /// (defaulting to 0).
    pub fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        debug!("playlist activated");
        if self.items.is_empty() {
            return;
        }
        let cur = self.current.unwrap_or(0);
        self.current = Some(cur);
        self.items[cur].prepare(&mut self.backend);
    }

    /// Mark inactive and stop the current item
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        debug!("playlist deactivated");
        if let Some(id) = self.current_item {
            if let Some(idx) = self.index_of(id) {
                self.items[idx].stop(&mut self.backend);
                self.started.remove(&id);
            }
        }
    }

    // ---- playback of the current item ----

    /// Start (or resume) the current item
    pub fn play(&mut self) {
        if !self.active {
            return;
        }
        let Some(cur) = self.current else {
            return;
        };
        self.items[cur].start(&mut self.backend);
        self.after_possible_start(cur);
    }

    /// Pause the current item
    pub fn pause(&mut self) {
        if let Some(cur) = self.current {
            self.items[cur].pause(&mut self.backend);
            self.sync_started(cur);
        }
    }

    /// Stop the current item
    pub fn stop(&mut self) {
        if let Some(cur) = self.current {
            self.items[cur].stop(&mut self.backend);
            self.sync_started(cur);
        }
    }

    // ---- navigation ----

    /// Advance to the next item in effective order; no-op at the boundary
    /// without repeat. A single-item playlist self-repeats.
    pub fn move_next(&mut self) {
        self.advance(true);
    }

    /// Step back to the previous item in effective order; no-op at the
    /// boundary without repeat. A single-item playlist self-repeats.
    pub fn move_previous(&mut self) {
        self.advance(false);
    }

    fn advance(&mut self, forward: bool) {
        if !self.active || self.items.is_empty() {
            return;
        }
        let Some(cur) = self.current else {
            return;
        };

        if self.items.len() == 1 {
            // Self-repeat: the notification still fires, old == new.
            let id = self.items[0].id();
            self.current_item = Some(id);
            self.emit(PlaylistEvent::CurrentItemChanged {
                old: Some(id),
                new: Some(id),
            });
            self.items[0].start(&mut self.backend);
            self.sync_started(0);
            return;
        }

        let target = if forward {
            self.effective_next(cur)
        } else {
            self.effective_previous(cur)
        };
        let Some(t) = target else {
            trace!(forward, "navigation boundary without repeat");
            return;
        };
        // Pre-roll should have prepared the target already; start either way
        // and let the item self-prepare if it must.
        self.items[t].start(&mut self.backend);
        self.after_possible_start(t);
    }

    // ---- ordering flags ----

    /// Enable or disable repeat; wrap adjacency changes, so pre-roll is
    /// recomputed.
    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
        if self.active {
            self.set_next_item();
        }
    }

    /// Enable or disable shuffle, materializing or dropping the permutation
    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = shuffle;
        if shuffle {
            self.shuffle_order = self.items.iter().map(|i| i.id()).collect();
            self.shuffle_order.shuffle(&mut rand::thread_rng());
        } else {
            self.shuffle_order.clear();
        }
        if self.active {
            self.set_next_item();
        }
    }

    // ---- mutation entry points ----

    /// Insert sources at `index` (clamped), returning the new item ids.
    /// The current index shifts when insertion lands at or before it; under
    /// shuffle each new item takes a uniformly random shuffle position.
    pub fn insert(&mut self, index: usize, sources: Vec<MediaSource>) -> Vec<ItemId> {
        let index = index.min(self.items.len());
        let before = self.designated_next();
        let mut ids = Vec::with_capacity(sources.len());

        for (k, source) in sources.into_iter().enumerate() {
            let id = ItemId(self.next_id);
            self.next_id += 1;
            self.items.insert(index + k, PlaylistItem::new(id, source));
            if self.shuffle {
                let pos = rand::thread_rng().gen_range(0..=self.shuffle_order.len());
                self.shuffle_order.insert(pos, id);
            }
            ids.push(id);
        }

        if let Some(cur) = self.current {
            if index <= cur {
                self.current = Some(cur + ids.len());
            }
        }

        // An active playlist never sits without a current index while
        // non-empty.
        if self.active && self.current.is_none() && !self.items.is_empty() {
            self.current = Some(0);
            self.items[0].prepare(&mut self.backend);
        }

        if self.active && self.designated_next() != before {
            self.set_next_item();
        }
        ids
    }

    /// Remove `count` items starting at `start` (clamped). Removing the
    /// current item hands off to whichever item now occupies the vacated
    /// index, starting it only if the removed one was playing.
    pub fn remove_range(&mut self, start: usize, count: usize) {
        if start >= self.items.len() || count == 0 {
            return;
        }
        let count = count.min(self.items.len() - start);
        let removed: Vec<PlaylistItem> = self.items.drain(start..start + count).collect();
        let removed_ids: HashSet<ItemId> = removed.iter().map(|i| i.id()).collect();

        self.shuffle_order.retain(|id| !removed_ids.contains(id));
        if self.preroll.map_or(false, |p| removed_ids.contains(&p)) {
            self.preroll = None;
        }

        let mut removed_current: Option<(ItemId, bool)> = None;
        for mut item in removed {
            let id = item.id();
            if self.current_item == Some(id) {
                removed_current = Some((id, item.status() == ItemStatus::Started));
            }
            self.started.remove(&id);
            item.stop(&mut self.backend);
            self.backend.release(id);
        }

        if let Some(cur) = self.current {
            if cur >= start + count {
                self.current = Some(cur - count);
            } else if cur >= start {
                self.current = if self.items.is_empty() {
                    None
                } else {
                    Some(start.min(self.items.len() - 1))
                };
            }
        }

        if let Some((old_id, was_playing)) = removed_current {
            match self.current {
                None => {
                    self.current_item = None;
                    self.emit(PlaylistEvent::CurrentItemChanged {
                        old: Some(old_id),
                        new: None,
                    });
                }
                Some(nc) => {
                    let new_id = self.items[nc].id();
                    self.current_item = Some(new_id);
                    self.emit(PlaylistEvent::CurrentItemChanged {
                        old: Some(old_id),
                        new: Some(new_id),
                    });
                    if was_playing {
                        self.items[nc].start(&mut self.backend);
                        self.after_possible_start(nc);
                    }
                }
            }
        }

        if self.active {
            self.set_next_item();
        }
    }

    /// Replace existing slots starting at `start` with new sources, returning
    /// the new item ids. The replaced slot keeps its position in both orders.
    pub fn replace_range(&mut self, start: usize, sources: Vec<MediaSource>) -> Vec<ItemId> {
        if start >= self.items.len() {
            return Vec::new();
        }
        let count = sources.len().min(self.items.len() - start);
        let mut new_ids = Vec::with_capacity(count);
        let mut replaced_current: Option<(ItemId, bool)> = None;
        let mut preroll_hit = false;

        for (k, source) in sources.into_iter().take(count).enumerate() {
            let slot = start + k;
            let new_id = ItemId(self.next_id);
            self.next_id += 1;
            let mut old =
                std::mem::replace(&mut self.items[slot], PlaylistItem::new(new_id, source));
            let old_id = old.id();
            new_ids.push(new_id);

            if let Some(p) = self.shuffle_order.iter().position(|&x| x == old_id) {
                self.shuffle_order[p] = new_id;
            }
            self.started.remove(&old_id);
            if self.preroll == Some(old_id) {
                self.preroll = None;
                preroll_hit = true;
            }
            if self.current_item == Some(old_id) {
                replaced_current = Some((old_id, old.status() == ItemStatus::Started));
            }
            old.stop(&mut self.backend);
            self.backend.release(old_id);
        }

        if let Some((old_id, was_playing)) = replaced_current {
            let cur = self.current.unwrap_or(start);
            let new_id = self.items[cur].id();
            self.current_item = Some(new_id);
            self.emit(PlaylistEvent::CurrentItemChanged {
                old: Some(old_id),
                new: Some(new_id),
            });
            if was_playing {
                self.items[cur].start(&mut self.backend);
                self.after_possible_start(cur);
            }
            if self.active {
                self.set_next_item();
            }
        } else if preroll_hit && self.active {
            self.set_next_item();
        }
        new_ids
    }

    /// Bulk reset: stop the current item, release everything, clear the
    /// shuffle order, and drop the current index.
    pub fn clear(&mut self) {
        let old = self.current_item.take();
        if let Some(id) = old {
            if let Some(idx) = self.index_of(id) {
                self.items[idx].stop(&mut self.backend);
            }
        }
        for item in &self.items {
            self.backend.release(item.id());
        }
        self.items.clear();
        self.shuffle_order.clear();
        self.started.clear();
        self.preroll = None;
        self.current = None;
        if old.is_some() {
            self.emit(PlaylistEvent::CurrentItemChanged { old, new: None });
        }
    }

    // ---- lifecycle helpers over the started set ----

    /// Items currently in the Started state
    pub fn started_items(&self) -> Vec<ItemId> {
        self.started.iter().copied().collect()
    }

    /// Is any item playing?
    pub fn is_any_started(&self) -> bool {
        !self.started.is_empty()
    }

    /// Pause every started item (app went to background)
    pub fn pause_all(&mut self) {
        for id in self.started_items() {
            if let Some(idx) = self.index_of(id) {
                self.items[idx].pause(&mut self.backend);
                self.sync_started(idx);
            }
        }
    }

    /// Stop every started item
    pub fn stop_all(&mut self) {
        for id in self.started_items() {
            if let Some(idx) = self.index_of(id) {
                self.items[idx].stop(&mut self.backend);
                self.sync_started(idx);
            }
        }
    }

    // ---- backend completion handling ----

    /// Asynchronous completion from the platform player, re-entering on the
    /// owning thread.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Prepared {
                item,
                duration,
                tracks,
            } => {
                let Some(idx) = self.index_of(item) else {
                    return;
                };
                let Some(outcome) =
                    self.items[idx].mark_prepared(&mut self.backend, duration, tracks)
                else {
                    return;
                };
                if outcome.first_open {
                    self.emit(PlaylistEvent::ItemOpened(item));
                }
                // Promote when nothing is current yet and this is the item
                // the current index designates.
                if self.current_item.is_none() && self.current == Some(idx) {
                    self.current_item = Some(item);
                    self.emit(PlaylistEvent::CurrentItemChanged {
                        old: None,
                        new: Some(item),
                    });
                    self.set_next_item();
                }
                // The designated successor is ready: chain it to the active
                // item for the gapless handoff.
                if self.preroll == Some(item) {
                    if let Some(cur) = self.current_item {
                        if cur != item {
                            self.backend.set_next(cur, Some(item));
                        }
                    }
                }
                if outcome.auto_started {
                    self.handle_started(idx);
                }
            }
            BackendEvent::Started(item) => {
                let Some(idx) = self.index_of(item) else {
                    return;
                };
                if !self.items[idx].mark_started() {
                    return;
                }
                self.handle_started(idx);
            }
            BackendEvent::Completed(item) => {
                let Some(idx) = self.index_of(item) else {
                    return;
                };
                if !self.items[idx].mark_completed() {
                    return;
                }
                self.started.remove(&item);
                if self.repeat && self.items.len() == 1 {
                    // Single-item repeat loops without ever ending.
                    self.items[idx].start(&mut self.backend);
                    self.sync_started(idx);
                    return;
                }
                if self.effective_next(idx).is_none() {
                    self.emit(PlaylistEvent::PlaylistEnded);
                }
            }
            BackendEvent::Error(item, error) => {
                let Some(idx) = self.index_of(item) else {
                    return;
                };
                self.items[idx].mark_error();
                self.started.remove(&item);
                self.emit(PlaylistEvent::ItemFailed { item, error });
            }
        }
    }

    // ---- internals ----

    fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|i| i.id() == id)
    }

    /// Successor of `idx` in effective order, wrapping only with repeat
    fn effective_next(&self, idx: usize) -> Option<usize> {
        let n = self.items.len();
        if n == 0 {
            return None;
        }
        if self.shuffle {
            let id = self.items.get(idx)?.id();
            let pos = self.shuffle_order.iter().position(|&x| x == id)?;
            let next = if pos + 1 < self.shuffle_order.len() {
                pos + 1
            } else if self.repeat {
                0
            } else {
                return None;
            };
            self.index_of(self.shuffle_order[next])
        } else if idx + 1 < n {
            Some(idx + 1)
        } else if self.repeat {
            Some(0)
        } else {
            None
        }
    }

    /// Predecessor of `idx` in effective order, wrapping only with repeat
    fn effective_previous(&self, idx: usize) -> Option<usize> {
        let n = self.items.len();
        if n == 0 {
            return None;
        }
        if self.shuffle {
            let id = self.items.get(idx)?.id();
            let pos = self.shuffle_order.iter().position(|&x| x == id)?;
            let prev = if pos > 0 {
                pos - 1
            } else if self.repeat {
                self.shuffle_order.len() - 1
            } else {
                return None;
            };
            self.index_of(self.shuffle_order[prev])
        } else if idx > 0 {
            Some(idx - 1)
        } else if self.repeat {
            Some(n - 1)
        } else {
            None
        }
    }

    fn designated_next(&self) -> Option<ItemId> {
        self.current
            .and_then(|c| self.effective_next(c))
            .map(|i| self.items[i].id())
    }

    /// Recompute pre-roll: prepare the effective successor of the current
    /// item, or clear the chain link when nothing follows.
    fn set_next_item(&mut self) {
        if self.items.len() < 2 {
            self.preroll = None;
            if let Some(cur) = self.current_item {
                self.backend.set_next(cur, None);
            }
            return;
        }
        let Some(cur_idx) = self.current else {
            self.preroll = None;
            return;
        };
        match self.effective_next(cur_idx) {
            None => {
                self.preroll = None;
                if let Some(cur) = self.current_item {
                    self.backend.set_next(cur, None);
                }
            }
            Some(next_idx) => {
                let next_id = self.items[next_idx].id();
                self.preroll = Some(next_id);
                trace!(?next_id, "pre-rolling successor");
                match self.items[next_idx].status() {
                    ItemStatus::Prepared
                    | ItemStatus::Started
                    | ItemStatus::Paused
                    | ItemStatus::Finished => {
                        if let Some(cur) = self.current_item {
                            if cur != next_id {
                                self.backend.set_next(cur, Some(next_id));
                            }
                        }
                    }
                    ItemStatus::Uninitialized | ItemStatus::Stopped => {
                        self.items[next_idx].prepare(&mut self.backend);
                    }
                    // Chained once the in-flight preparation completes.
                    ItemStatus::Preparing => {}
                    // No automatic retry past a failed item.
                    ItemStatus::Error => {}
                }
            }
        }
    }

    /// An item entered Started: promote it, stopping the previous active item
    fn handle_started(&mut self, idx: usize) {
        let id = self.items[idx].id();
        self.started.insert(id);
        if self.current_item == Some(id) {
            return;
        }
        let old = self.current_item;
        if let Some(prev) = old {
            if let Some(pidx) = self.index_of(prev) {
                self.items[pidx].stop(&mut self.backend);
                self.started.remove(&prev);
            }
        }
        self.current_item = Some(id);
        self.current = self.index_of(id);
        debug!(?old, new = ?id, "current item changed");
        self.emit(PlaylistEvent::CurrentItemChanged {
            old,
            new: Some(id),
        });
        self.set_next_item();
    }

    fn after_possible_start(&mut self, idx: usize) {
        if self.items[idx].status() == ItemStatus::Started {
            self.handle_started(idx);
        }
    }

    fn sync_started(&mut self, idx: usize) {
        let item = &self.items[idx];
        if item.status() == ItemStatus::Started {
            self.started.insert(item.id());
        } else {
            self.started.remove(&item.id());
        }
    }

    fn emit(&mut self, event: PlaylistEvent) {
        trace!(?event, "notify");
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            observer(&event);
        }
        // Keep any observer subscribed during the walk.
        observers.append(&mut self.observers);
        self.observers = observers;
    }
}
