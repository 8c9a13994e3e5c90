//! Observable events
//!
//! Events are explicit and typed; the logged name is fixed per variant.

use std::fmt;

/// Observable events in libris
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded and validated
    ConfigLoaded,
    /// Durable store opened
    StoreOpened,

    // Index lifecycle
    /// Index load from the durable store begins
    IndexLoadBegin,
    /// Index load complete
    IndexLoadComplete,
    /// Index load failed (FATAL)
    IndexLoadFailed,
    /// `load` called on an already loaded coordinator
    IndexReloaded,
    /// Hash index doubled its bucket array
    CacheResized,
    /// Point lookup missed the cache and fell back to the store
    CacheMiss,
    /// Store result written back into the cache
    CacheBackfill,
    /// Invariant check passed
    IndexVerified,
    /// Invariant check failed (FATAL)
    IndexCorrupted,

    // Writes
    /// Record committed and indexed
    RecordCreated,
    /// Record update committed and indexed
    RecordUpdated,
    /// Record removal committed and unindexed
    RecordRemoved,
    /// Loan opened; record marked unavailable
    RecordBorrowed,
    /// Loan closed; record marked available
    RecordReturned,
    /// Validation rejected a write before it reached the store
    WriteRejected,
    /// The durable store refused a write; indexes untouched
    CommitFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreOpened => "STORE_OPENED",

            Event::IndexLoadBegin => "INDEX_LOAD_BEGIN",
            Event::IndexLoadComplete => "INDEX_LOAD_COMPLETE",
            Event::IndexLoadFailed => "INDEX_LOAD_FAILED",
            Event::IndexReloaded => "INDEX_RELOADED",
            Event::CacheResized => "CACHE_RESIZED",
            Event::CacheMiss => "CACHE_MISS",
            Event::CacheBackfill => "CACHE_BACKFILL",
            Event::IndexVerified => "INDEX_VERIFIED",
            Event::IndexCorrupted => "INDEX_CORRUPTED",

            Event::RecordCreated => "RECORD_CREATED",
            Event::RecordUpdated => "RECORD_UPDATED",
            Event::RecordRemoved => "RECORD_REMOVED",
            Event::RecordBorrowed => "RECORD_BORROWED",
            Event::RecordReturned => "RECORD_RETURNED",
            Event::WriteRejected => "WRITE_REJECTED",
            Event::CommitFailed => "COMMIT_FAILED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::IndexLoadFailed | Event::IndexCorrupted)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_upper_snake_case() {
        let events = [
            Event::ConfigLoaded,
            Event::StoreOpened,
            Event::IndexLoadBegin,
            Event::IndexLoadComplete,
            Event::IndexLoadFailed,
            Event::IndexReloaded,
            Event::CacheResized,
            Event::CacheMiss,
            Event::CacheBackfill,
            Event::IndexVerified,
            Event::IndexCorrupted,
            Event::RecordCreated,
            Event::RecordUpdated,
            Event::RecordRemoved,
            Event::RecordBorrowed,
            Event::RecordReturned,
            Event::WriteRejected,
            Event::CommitFailed,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'), "{}", s);
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::IndexCorrupted.is_fatal());
        assert!(Event::IndexLoadFailed.is_fatal());
        assert!(!Event::CacheMiss.is_fatal());
    }
}
