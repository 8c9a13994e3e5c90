//! Index coordinator
//!
//! Owns the four record indexes and keeps them consistent with the durable
//! store.
//!
//! # API
//!
//! - `load(source)` - Populate all indexes from the store, once at startup
//! - `on_created(record)` / `on_updated(record)` / `on_removed(id)` - Apply a
//!   committed write; call only after the store accepted it
//! - `find_by_id(id, source)` - Read-through cached point lookup
//! - `find_by_title_prefix`, `find_by_author_prefix`, `find_by_genre_exact`
//!
//! String keys are lowercased before insertion and lookup. Queries are not
//! trimmed, so a query with leading whitespace only matches keys that have it.

use serde::{Deserialize, Serialize};

use crate::catalog::{Record, RecordId, RecordRef};
use crate::observability::{log_event_with_fields, Event};
use crate::store::RecordSource;

use super::errors::{IndexError, IndexResult};
use super::hash::{HashIndex, DEFAULT_CAPACITY};
use super::tree::OrderedMultiIndex;

/// How the string-keyed indexes react to a record update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Remove the previous handle from the title/author/genre indexes and
    /// file the updated record under its current keys
    #[default]
    Reindex,
    /// Refresh only the id cache. Title/author/genre lookups keep returning
    /// the handle filed when the record was created.
    KeepStale,
}

/// Index construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Initial bucket count of the id cache (must be positive)
    pub initial_capacity: usize,
    /// Update handling for the string-keyed indexes
    pub update_policy: UpdatePolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            update_policy: UpdatePolicy::default(),
        }
    }
}

/// Counters and sizes reported by [`IndexCoordinator::stats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub cached_records: usize,
    pub cache_capacity: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_backfills: u64,
    pub cache_resizes: u64,
    pub title_keys: usize,
    pub author_keys: usize,
    pub genre_keys: usize,
    pub title_depth: usize,
    pub author_depth: usize,
    pub genre_depth: usize,
}

/// Owner of the id cache and the title/author/genre indexes
pub struct IndexCoordinator {
    by_id: HashIndex<RecordId, RecordRef>,
    by_title: OrderedMultiIndex<String, RecordRef>,
    by_author: OrderedMultiIndex<String, RecordRef>,
    by_genre: OrderedMultiIndex<String, RecordRef>,
    update_policy: UpdatePolicy,
    loaded: bool,
    stats: IndexStats,
}

impl IndexCoordinator {
    /// Creates empty indexes
    pub fn new(config: IndexConfig) -> IndexResult<Self> {
        Ok(Self {
            by_id: HashIndex::with_capacity(config.initial_capacity)?,
            by_title: OrderedMultiIndex::new(),
            by_author: OrderedMultiIndex::new(),
            by_genre: OrderedMultiIndex::new(),
            update_policy: config.update_policy,
            loaded: false,
            stats: IndexStats::default(),
        })
    }

    /// Returns the configured update policy
    pub fn update_policy(&self) -> UpdatePolicy {
        self.update_policy
    }

    /// Populate all four indexes from the durable store.
    ///
    /// Meant to run exactly once, before any query. A second call is
    /// tolerated but does not deduplicate: the string indexes then hold every
    /// handle twice. Returns the number of records loaded.
    pub fn load<S: RecordSource + ?Sized>(&mut self, source: &S) -> IndexResult<usize> {
        if self.loaded {
            log_event_with_fields(Event::IndexReloaded, &[]);
        }
        log_event_with_fields(Event::IndexLoadBegin, &[]);

        let records = source.enumerate_all().map_err(|e| {
            let err = IndexError::load_failed(e.to_string());
            log_event_with_fields(Event::IndexLoadFailed, &[("reason", err.message())]);
            err
        })?;

        let count = records.len();
        for record in records {
            self.insert_all(record);
        }
        self.loaded = true;

        log_event_with_fields(
            Event::IndexLoadComplete,
            &[
                ("records", &count.to_string()),
                ("cache_capacity", &self.by_id.capacity().to_string()),
            ],
        );
        Ok(count)
    }

    /// Index a record the store has just committed
    pub fn on_created(&mut self, record: RecordRef) {
        self.insert_all(record);
    }

    /// Refresh the indexes for a record whose update the store has committed
    pub fn on_updated(&mut self, record: RecordRef) {
        let previous = self.cache_put(record.clone());

        match (self.update_policy, previous) {
            (UpdatePolicy::KeepStale, _) => {}
            (UpdatePolicy::Reindex, Some(previous)) => {
                self.unfile(&previous);
                self.file(record);
            }
            (UpdatePolicy::Reindex, None) => self.file(record),
        }
    }

    /// Drop every handle of a record the store has just deleted
    pub fn on_removed(&mut self, id: RecordId) {
        match self.by_id.remove(&id) {
            Some(previous) if self.update_policy == UpdatePolicy::Reindex => {
                self.unfile(&previous);
            }
            _ => {
                // Keys are unknown or may be stale, sweep everything
                let matches_id = |r: &RecordRef| r.id == id;
                self.by_title.remove_all_where(matches_id);
                self.by_author.remove_all_where(matches_id);
                self.by_genre.remove_all_where(matches_id);
            }
        }
    }

    /// Point lookup through the id cache.
    ///
    /// On a miss the store is consulted and a hit there is written back into
    /// the cache before returning. Absence is `Ok(None)`.
    pub fn find_by_id<S: RecordSource + ?Sized>(
        &mut self,
        id: RecordId,
        source: &S,
    ) -> IndexResult<Option<RecordRef>> {
        if let Some(record) = self.by_id.get(&id) {
            self.stats.cache_hits += 1;
            return Ok(Some(record.clone()));
        }

        self.stats.cache_misses += 1;
        log_event_with_fields(Event::CacheMiss, &[("id", &id.to_string())]);

        let fetched = source
            .fetch_by_id(id)
            .map_err(|e| IndexError::source_unavailable(e.to_string()))?;

        if let Some(record) = &fetched {
            self.cache_put(record.clone());
            self.stats.cache_backfills += 1;
            log_event_with_fields(Event::CacheBackfill, &[("id", &id.to_string())]);
        }
        Ok(fetched)
    }

    /// Records whose title starts with `text`, ignoring case
    pub fn find_by_title_prefix(&self, text: &str) -> Vec<RecordRef> {
        prefix_query(&self.by_title, text)
    }

    /// Records whose author starts with `text`, ignoring case
    pub fn find_by_author_prefix(&self, text: &str) -> Vec<RecordRef> {
        prefix_query(&self.by_author, text)
    }

    /// Records whose genre equals `text`, ignoring case
    pub fn find_by_genre_exact(&self, text: &str) -> Vec<RecordRef> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.by_genre.search(normalize(text).as_str()).to_vec()
    }

    /// Verify the structural invariants of all four indexes
    pub fn verify(&self) -> IndexResult<()> {
        let result = self
            .by_id
            .check_invariants()
            .and_then(|_| self.by_title.check_invariants("title"))
            .and_then(|_| self.by_author.check_invariants("author"))
            .and_then(|_| self.by_genre.check_invariants("genre"));

        match &result {
            Ok(()) => log_event_with_fields(
                Event::IndexVerified,
                &[("cached_records", &self.by_id.len().to_string())],
            ),
            Err(e) => log_event_with_fields(Event::IndexCorrupted, &[("reason", &e.to_string())]),
        }
        result
    }

    /// Returns cache counters and index sizes
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            cached_records: self.by_id.len(),
            cache_capacity: self.by_id.capacity(),
            title_keys: self.by_title.key_count(),
            author_keys: self.by_author.key_count(),
            genre_keys: self.by_genre.key_count(),
            title_depth: self.by_title.depth(),
            author_depth: self.by_author.depth(),
            genre_depth: self.by_genre.depth(),
            ..self.stats.clone()
        }
    }

    fn insert_all(&mut self, record: RecordRef) {
        self.cache_put(record.clone());
        self.file(record);
    }

    /// Upsert into the id cache, returning the handle it replaced
    fn cache_put(&mut self, record: RecordRef) -> Option<RecordRef> {
        let capacity = self.by_id.capacity();
        let previous = self.by_id.put(record.id, record);

        if self.by_id.capacity() != capacity {
            self.stats.cache_resizes += 1;
            log_event_with_fields(
                Event::CacheResized,
                &[
                    ("from", &capacity.to_string()),
                    ("to", &self.by_id.capacity().to_string()),
                    ("entries", &self.by_id.len().to_string()),
                ],
            );
        }
        previous
    }

    fn file(&mut self, record: RecordRef) {
        self.by_title.insert(normalize(&record.title), record.clone());
        self.by_author.insert(normalize(&record.author), record.clone());
        self.by_genre.insert(normalize(&record.genre), record);
    }

    fn unfile(&mut self, previous: &Record) {
        let id = previous.id;
        self.by_title.remove_where(normalize(&previous.title).as_str(), |r| r.id == id);
        self.by_author.remove_where(normalize(&previous.author).as_str(), |r| r.id == id);
        self.by_genre.remove_where(normalize(&previous.genre).as_str(), |r| r.id == id);
    }
}

/// Per-character lowercase fold, identical for keys and queries.
///
/// `str::to_lowercase` maps a word-final capital sigma to `ς`, which would
/// make a query fold differently from the longer key it is a prefix of.
fn normalize(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

fn prefix_query(index: &OrderedMultiIndex<String, RecordRef>, text: &str) -> Vec<RecordRef> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    index
        .search_by_prefix(&normalize(text))
        .into_iter()
        .cloned()
        .collect()
}
