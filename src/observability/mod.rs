//! Observability for libris
//!
//! Structured JSON logging of typed lifecycle events.
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes index or store state
//! 2. Synchronous, no background threads
//! 3. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use libris::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::IndexLoadComplete, &[("records", "42")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event at its default severity
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields at its default severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(default_severity(event), event.as_str(), fields);
}

fn default_severity(event: Event) -> Severity {
    match event {
        Event::CacheMiss | Event::CacheBackfill => Severity::Trace,
        Event::IndexReloaded | Event::WriteRejected => Severity::Warn,
        Event::CommitFailed => Severity::Error,
        e if e.is_fatal() => Severity::Fatal,
        _ => Severity::Info,
    }
}
