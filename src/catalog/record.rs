//! Catalog record model

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Store-assigned record identifier
pub type RecordId = u32;

/// Shared, immutable handle to a record.
///
/// The store owns the canonical handle; indexes hold clones of it and can
/// never change the record's content.
pub type RecordRef = Arc<Record>;

/// Kind of catalog resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Printed or electronic book
    #[default]
    Book,
    /// Periodical
    Journal,
    /// Audio, video or other media
    Media,
}

impl ResourceKind {
    /// Returns the lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Book => "book",
            ResourceKind::Journal => "journal",
            ResourceKind::Media => "media",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A catalog record as persisted by the durable store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub author: String,
    pub publication_year: i32,
    pub genre: String,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub kind: ResourceKind,
}

fn default_available() -> bool {
    true
}

/// A record that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub title: String,
    pub author: String,
    pub publication_year: i32,
    pub genre: String,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub kind: ResourceKind,
}

impl RecordDraft {
    /// Create an available book draft
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        publication_year: i32,
        genre: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            publication_year,
            genre: genre.into(),
            is_available: true,
            kind: ResourceKind::Book,
        }
    }

    /// Set the resource kind
    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Turn the draft into a record with the given id
    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            title: self.title,
            author: self.author,
            publication_year: self.publication_year,
            genre: self.genre,
            is_available: self.is_available,
            kind: self.kind,
        }
    }
}
