//! Playlist items
//!
//! One playable media entry with its own prepare/play state machine. The
//! source is bound exactly once, at the first prepare; a stop/re-prepare
//! cycle reuses the binding. Error is a dead end until an explicit reset.

use std::time::Duration;

use tracing::{debug, warn};

use crate::backend::MediaBackend;

/// Stable item identity, assigned by the playlist and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ItemId(pub u64);

/// Where the media comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Uri(String),
    Bytes(Vec<u8>),
}

/// Track kind within a prepared item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
    Text,
}

/// Track metadata discovered during preparation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub kind: TrackKind,
    pub language: String,
}

/// Item playback status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemStatus {
    #[default]
    Uninitialized,
    Preparing,
    Prepared,
    Started,
    Paused,
    Stopped,
    Finished,
    Error,
}

/// Outcome of a successful preparation, for the playlist's bookkeeping
#[derive(Debug, Clone, Copy)]
pub(crate) struct PreparedOutcome {
    /// First-ever successful preparation of this item
    pub first_open: bool,
    /// A deferred start was honored and the item is now playing
    pub auto_started: bool,
}

/// One playable media entry
#[derive(Debug)]
pub struct PlaylistItem {
    id: ItemId,
    source: MediaSource,
    status: ItemStatus,
    open: bool,
    source_bound: bool,
    start_pending: bool,
    duration: Duration,
    tracks: Vec<TrackInfo>,
}

impl PlaylistItem {
    pub(crate) fn new(id: ItemId, source: MediaSource) -> Self {
        Self {
            id,
            source,
            status: ItemStatus::Uninitialized,
            open: false,
            source_bound: false,
            start_pending: false,
            duration: Duration::ZERO,
            tracks: Vec::new(),
        }
    }

    /// Stable identity
    #[inline]
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Current status
    #[inline]
    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Has this item ever been successfully prepared?
    #[inline]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Duration discovered at preparation; zero after an error
    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Track metadata discovered at preparation; empty after an error
    pub fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }

    /// The item's source locator
    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    /// Begin asynchronous preparation. The source is bound only on the first
    /// transition out of Uninitialized; later re-prepares reuse the binding.
    pub fn prepare<B: MediaBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        match self.status {
            ItemStatus::Uninitialized => {
                if !self.source_bound {
                    backend.set_source(self.id, &self.source);
                    self.source_bound = true;
                }
                self.status = ItemStatus::Preparing;
                backend.prepare_async(self.id);
                true
            }
            ItemStatus::Stopped => {
                self.status = ItemStatus::Preparing;
                backend.prepare_async(self.id);
                true
            }
            ItemStatus::Error => {
                warn!(id = ?self.id, "prepare on errored item; reset first");
                false
            }
            _ => false,
        }
    }

    /// Request playback. Self-prepares when needed; a start during an
    /// in-flight preparation is deferred and honored once prepared.
    pub fn start<B: MediaBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        match self.status {
            ItemStatus::Preparing => {
                self.start_pending = true;
                true
            }
            ItemStatus::Prepared
            | ItemStatus::Started
            | ItemStatus::Paused
            | ItemStatus::Finished => {
                backend.start(self.id);
                self.status = ItemStatus::Started;
                true
            }
            ItemStatus::Uninitialized | ItemStatus::Stopped => {
                self.prepare(backend);
                self.start_pending = true;
                true
            }
            ItemStatus::Error => false,
        }
    }

    /// Pause playback
    pub fn pause<B: MediaBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        if self.status == ItemStatus::Started {
            backend.pause(self.id);
            self.status = ItemStatus::Paused;
            true
        } else {
            false
        }
    }

    /// Stop playback; cancels any deferred start
    pub fn stop<B: MediaBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        match self.status {
            ItemStatus::Prepared
            | ItemStatus::Started
            | ItemStatus::Paused
            | ItemStatus::Finished => {
                backend.stop(self.id);
                self.status = ItemStatus::Stopped;
                self.start_pending = false;
                true
            }
            _ => false,
        }
    }

    /// Leave the Error state. The source binding is cleared so the next
    /// prepare re-binds it.
    pub fn reset(&mut self) {
        if self.status == ItemStatus::Error {
            self.status = ItemStatus::Uninitialized;
            self.source_bound = false;
            self.start_pending = false;
        }
    }

    /// Preparation completed. Returns None when no preparation was in flight.
    pub(crate) fn mark_prepared<B: MediaBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        duration: Duration,
        tracks: Vec<TrackInfo>,
    ) -> Option<PreparedOutcome> {
        if self.status != ItemStatus::Preparing {
            return None;
        }
        self.status = ItemStatus::Prepared;
        self.duration = duration;
        self.tracks = tracks;
        let first_open = !self.open;
        self.open = true;
        let auto_started = if self.start_pending {
            self.start_pending = false;
            backend.start(self.id);
            self.status = ItemStatus::Started;
            true
        } else {
            false
        };
        debug!(id = ?self.id, first_open, auto_started, "prepared");
        Some(PreparedOutcome {
            first_open,
            auto_started,
        })
    }

    /// The player reported playback beginning on its own initiative (a
    /// chained gapless transition). Returns false when the report is
    /// spurious for the item's state.
    pub(crate) fn mark_started(&mut self) -> bool {
        match self.status {
            ItemStatus::Prepared | ItemStatus::Paused | ItemStatus::Finished => {
                self.status = ItemStatus::Started;
                true
            }
            ItemStatus::Started => true,
            _ => false,
        }
    }

    /// Natural playback completion
    pub(crate) fn mark_completed(&mut self) -> bool {
        if self.status == ItemStatus::Started {
            self.status = ItemStatus::Finished;
            true
        } else {
            false
        }
    }

    /// Unrecoverable media error; metadata reads zero/empty from here on
    pub(crate) fn mark_error(&mut self) {
        self.status = ItemStatus::Error;
        self.duration = Duration::ZERO;
        self.tracks.clear();
        self.start_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, RecordingBackend};

    fn item() -> PlaylistItem {
        PlaylistItem::new(ItemId(1), MediaSource::Uri("a.mp3".into()))
    }

    #[test]
    fn test_source_bound_exactly_once() {
        let mut b = RecordingBackend::new();
        let mut it = item();

        assert!(it.prepare(&mut b));
        it.mark_prepared(&mut b, Duration::from_secs(3), Vec::new());
        assert!(it.stop(&mut b));
        assert!(it.prepare(&mut b));

        assert_eq!(b.count(BackendCall::SetSource(ItemId(1))), 1);
        assert_eq!(b.count(BackendCall::PrepareAsync(ItemId(1))), 2);
    }

    #[test]
    fn test_start_while_preparing_defers() {
        let mut b = RecordingBackend::new();
        let mut it = item();
        it.prepare(&mut b);

        assert!(it.start(&mut b));
        assert_eq!(it.status(), ItemStatus::Preparing);
        assert_eq!(b.count(BackendCall::Start(ItemId(1))), 0);

        let outcome = it
            .mark_prepared(&mut b, Duration::from_secs(3), Vec::new())
            .unwrap();
        assert!(outcome.auto_started);
        assert!(outcome.first_open);
        assert_eq!(it.status(), ItemStatus::Started);
        assert_eq!(b.count(BackendCall::Start(ItemId(1))), 1);
    }

    #[test]
    fn test_open_flag_only_first_preparation() {
        let mut b = RecordingBackend::new();
        let mut it = item();
        it.prepare(&mut b);
        let first = it
            .mark_prepared(&mut b, Duration::ZERO, Vec::new())
            .unwrap();
        assert!(first.first_open);

        it.stop(&mut b);
        it.prepare(&mut b);
        let second = it
            .mark_prepared(&mut b, Duration::ZERO, Vec::new())
            .unwrap();
        assert!(!second.first_open);
    }

    #[test]
    fn test_start_self_prepares_from_uninitialized() {
        let mut b = RecordingBackend::new();
        let mut it = item();
        assert!(it.start(&mut b));
        assert_eq!(it.status(), ItemStatus::Preparing);
        assert_eq!(b.count(BackendCall::PrepareAsync(ItemId(1))), 1);
    }

    #[test]
    fn test_pause_only_from_started() {
        let mut b = RecordingBackend::new();
        let mut it = item();
        assert!(!it.pause(&mut b));

        it.prepare(&mut b);
        it.mark_prepared(&mut b, Duration::ZERO, Vec::new());
        it.start(&mut b);
        assert!(it.pause(&mut b));
        assert_eq!(it.status(), ItemStatus::Paused);
        // Resume from paused goes straight back to started.
        assert!(it.start(&mut b));
        assert_eq!(it.status(), ItemStatus::Started);
    }

    #[test]
    fn test_finished_can_restart() {
        let mut b = RecordingBackend::new();
        let mut it = item();
        it.prepare(&mut b);
        it.mark_prepared(&mut b, Duration::ZERO, Vec::new());
        it.start(&mut b);
        assert!(it.mark_completed());
        assert_eq!(it.status(), ItemStatus::Finished);

        assert!(it.start(&mut b));
        assert_eq!(it.status(), ItemStatus::Started);
    }

    #[test]
    fn test_error_blocks_prepare_until_reset() {
        let mut b = RecordingBackend::new();
        let mut it = item();
        it.prepare(&mut b);
        it.mark_error();

        assert_eq!(it.duration(), Duration::ZERO);
        assert!(it.tracks().is_empty());
        assert!(!it.prepare(&mut b));
        assert!(!it.start(&mut b));

        it.reset();
        assert_eq!(it.status(), ItemStatus::Uninitialized);
        assert!(it.prepare(&mut b));
        // Reset cleared the binding, so the source is bound again.
        assert_eq!(b.count(BackendCall::SetSource(ItemId(1))), 2);
    }

    #[test]
    fn test_error_zeroes_metadata() {
        let mut b = RecordingBackend::new();
        let mut it = item();
        it.prepare(&mut b);
        it.mark_prepared(
            &mut b,
            Duration::from_secs(120),
            vec![TrackInfo {
                kind: TrackKind::Audio,
                language: "en".into(),
            }],
        );
        assert_eq!(it.duration(), Duration::from_secs(120));

        it.mark_error();
        assert_eq!(it.duration(), Duration::ZERO);
        assert!(it.tracks().is_empty());
    }

    #[test]
    fn test_player_initiated_start_report() {
        let mut b = RecordingBackend::new();
        let mut it = item();
        // Before preparation finishes the report is spurious.
        assert!(!it.mark_started());

        it.prepare(&mut b);
        assert!(!it.mark_started());
        it.mark_prepared(&mut b, Duration::ZERO, Vec::new());
        assert!(it.mark_started());
        assert_eq!(it.status(), ItemStatus::Started);
        // No engine-issued start call accompanies a player-initiated one.
        assert_eq!(b.count(BackendCall::Start(ItemId(1))), 0);
    }

    #[test]
    fn test_spurious_prepared_ignored() {
        let mut b = RecordingBackend::new();
        let mut it = item();
        assert!(it
            .mark_prepared(&mut b, Duration::ZERO, Vec::new())
            .is_none());
        assert_eq!(it.status(), ItemStatus::Uninitialized);
    }
}
