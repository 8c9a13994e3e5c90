//! CLI module for libris
//!
//! Provides the command-line interface:
//! - init: Create an empty record store
//! - add, update, remove: Write through the catalog
//! - borrow, return, overdue: Loans
//! - get, search, list: Read through the indexes
//! - verify, stats: Index diagnostics

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, KindArg, SearchField};
pub use commands::{
    add, borrow, execute, get, init, list, overdue, remove, return_record, run, run_command,
    search, stats, update, verify, RecordChanges,
};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
