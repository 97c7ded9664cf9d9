//! Sync notification port (driven/secondary port)
//!
//! Defines the callback interface invoked whenever the engine creates,
//! updates or deletes a file in the local cache. Callers plug in an
//! observer to react to sync events (indexing, eventing, plain logging).
//!
//! ## Design Notes
//!
//! - `notify` is synchronous and must be cheap: it is called inline from
//!   whichever worker performed the action. Observers that need async or
//!   slow processing should hand the event off to their own channel.
//! - Observers must be safe to call concurrently from multiple workers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The kind of change a sync event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventKind {
    /// A file was downloaded for the first time.
    Created,
    /// An existing local file was replaced by a newer remote copy.
    Updated,
    /// A local file was deleted because it is no longer present remotely.
    Deleted,
}

impl std::fmt::Display for SyncEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncEventKind::Created => "create",
            SyncEventKind::Updated => "update",
            SyncEventKind::Deleted => "delete",
        };
        write!(f, "{s}")
    }
}

/// A single file-level sync event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    /// What happened.
    pub kind: SyncEventKind,
    /// Local path of the affected file.
    pub path: PathBuf,
}

impl SyncEvent {
    pub fn new(kind: SyncEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(SyncEventKind::Created, path)
    }

    pub fn updated(path: impl Into<PathBuf>) -> Self {
        Self::new(SyncEventKind::Updated, path)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(SyncEventKind::Deleted, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Port trait for receiving sync events.
pub trait ISyncObserver: Send + Sync {
    /// Called once per created, updated or deleted file.
    fn notify(&self, event: &SyncEvent);
}

/// Observer that discards every event. Useful as a default and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ISyncObserver for NullObserver {
    fn notify(&self, _event: &SyncEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_display_matches_wire_names() {
        assert_eq!(SyncEventKind::Created.to_string(), "create");
        assert_eq!(SyncEventKind::Updated.to_string(), "update");
        assert_eq!(SyncEventKind::Deleted.to_string(), "delete");
    }

    #[test]
    fn constructors_set_kind_and_path() {
        let e = SyncEvent::deleted("/cache/a.txt");
        assert_eq!(e.kind, SyncEventKind::Deleted);
        assert_eq!(e.path(), Path::new("/cache/a.txt"));
    }

    #[test]
    fn null_observer_accepts_events() {
        let obs = NullObserver;
        obs.notify(&SyncEvent::created("/cache/new.txt"));
    }
}
