//! libris - A small records catalog with store-synchronized secondary indexes
//!
//! The durable store is the source of truth. Indexes are derived, in-memory
//! state rebuilt from the store on startup and refreshed after every commit.

pub mod catalog;
pub mod cli;
pub mod index;
pub mod observability;
pub mod store;
