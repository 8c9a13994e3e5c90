//! Index subsystem for libris
//!
//! Indexes are derived, in-memory-only state rebuilt from the durable store on
//! startup.
//!
//! # Design Principles
//!
//! - Derived state: indexes mirror the store, never the source of truth
//! - In-memory only: no persistence, no I/O
//! - Absence is a value: misses return `None` or an empty result
//!
//! # Invariants
//!
//! - Indexes are loaded once from the store before queries are served
//! - Index updates occur AFTER the store committed the write
//! - A key appears at most once in the id cache
//! - Every tree node holds at least one record, in BST order
//!
//! # Structures
//!
//! - [`HashIndex`]: chained hash table, the id cache
//! - [`OrderedMultiIndex`]: unbalanced BST with exact and prefix lookups
//! - [`IndexCoordinator`]: owns one of the former and three of the latter

mod coordinator;
mod errors;
mod hash;
mod tree;

pub use coordinator::{IndexConfig, IndexCoordinator, IndexStats, UpdatePolicy};
pub use errors::{IndexError, IndexErrorCode, IndexResult, Severity};
pub use hash::{DefaultBuildHasher, HashIndex, DEFAULT_CAPACITY};
pub use tree::OrderedMultiIndex;
