//! Playback backend seam
//!
//! The platform player is an external collaborator. The engine issues
//! fire-and-forget calls through [`MediaBackend`]; completions come back as
//! [`BackendEvent`]s marshalled onto the owning thread by the caller.

use std::time::Duration;

use crate::item::{ItemId, MediaSource, TrackInfo};
use crate::MediaError;

/// Platform playback layer, keyed by item
pub trait MediaBackend {
    /// Bind an item's source; called at most once per binding lifetime
    fn set_source(&mut self, item: ItemId, source: &MediaSource);
    /// Begin asynchronous preparation; completion arrives as a `BackendEvent`
    fn prepare_async(&mut self, item: ItemId);
    /// Start or restart playback
    fn start(&mut self, item: ItemId);
    /// Pause playback
    fn pause(&mut self, item: ItemId);
    /// Stop playback
    fn stop(&mut self, item: ItemId);
    /// Chain `next` to play gaplessly after `item`; `None` clears the link
    fn set_next(&mut self, item: ItemId, next: Option<ItemId>);
    /// Free the player resources behind an item
    fn release(&mut self, item: ItemId);
}

/// Asynchronous completion re-entering the engine
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Preparation finished; carries the discovered metadata
    Prepared {
        item: ItemId,
        duration: Duration,
        tracks: Vec<TrackInfo>,
    },
    /// Playback began on the player's own initiative, e.g. a chained
    /// successor taking over at a gapless transition
    Started(ItemId),
    /// Natural playback completion
    Completed(ItemId),
    /// Unrecoverable media error
    Error(ItemId, MediaError),
}

/// One recorded backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    SetSource(ItemId),
    PrepareAsync(ItemId),
    Start(ItemId),
    Pause(ItemId),
    Stop(ItemId),
    SetNext(ItemId, Option<ItemId>),
    Release(ItemId),
}

/// Call-recording backend: a test double standing in for the platform player
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
}

impl RecordingBackend {
    /// Create with an empty call log
    pub fn new() -> Self {
        Self::default()
    }

    /// Count occurrences of a specific call
    pub fn count(&self, call: BackendCall) -> usize {
        self.calls.iter().filter(|&&c| c == call).count()
    }
}

impl MediaBackend for RecordingBackend {
    fn set_source(&mut self, item: ItemId, _source: &MediaSource) {
        self.calls.push(BackendCall::SetSource(item));
    }

    fn prepare_async(&mut self, item: ItemId) {
        self.calls.push(BackendCall::PrepareAsync(item));
    }

    fn start(&mut self, item: ItemId) {
        self.calls.push(BackendCall::Start(item));
    }

    fn pause(&mut self, item: ItemId) {
        self.calls.push(BackendCall::Pause(item));
    }

    fn stop(&mut self, item: ItemId) {
        self.calls.push(BackendCall::Stop(item));
    }

    fn set_next(&mut self, item: ItemId, next: Option<ItemId>) {
        self.calls.push(BackendCall::SetNext(item, next));
    }

    fn release(&mut self, item: ItemId) {
        self.calls.push(BackendCall::Release(item));
    }
}
