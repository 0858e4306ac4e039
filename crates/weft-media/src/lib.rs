//! Weft Media
//!
//! Media playlist engine: a sequenced collection of playable items with
//! independent prepare/play state machines, shuffle and repeat ordering, and
//! pre-roll of the next item for gapless transitions.
//!
//! Everything here runs on the thread that owns the playlist; the platform
//! player completes asynchronous prepares by re-entering through
//! [`Playlist::handle_backend_event`] on that same thread.

mod backend;
mod item;
mod playlist;

pub use backend::{BackendCall, BackendEvent, MediaBackend, RecordingBackend};
pub use item::{ItemId, ItemStatus, MediaSource, PlaylistItem, TrackInfo, TrackKind};
pub use playlist::{Playlist, PlaylistEvent};

/// Media error surfaced through item-failed notifications
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("playback aborted")]
    Aborted,

    #[error("network failure while buffering")]
    Network,

    #[error("decode failure")]
    Decode,

    #[error("source not supported: {0}")]
    SrcNotSupported(String),
}
