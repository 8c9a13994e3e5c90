//! CLI argument definitions using clap
//!
//! Commands:
//! - libris init --config <path>
//! - libris add --title <t> --author <a> --year <y> --genre <g> [--kind <k>]
//! - libris get --id <id>
//! - libris search --by title|author|genre <query>
//! - libris update --id <id> [--title] [--author] [--year] [--genre] [--available]
//! - libris remove --id <id>
//! - libris borrow --id <id> --borrower <name> [--days <n>]
//! - libris return --id <id>
//! - libris list | overdue | verify | stats

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::catalog::{RecordId, ResourceKind, DEFAULT_LOAN_DAYS};

/// libris - an indexed record catalog
#[derive(Parser, Debug)]
#[command(name = "libris")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty record store
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,
    },

    /// Add a new record
    Add {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,

        #[arg(long)]
        title: String,

        #[arg(long)]
        author: String,

        /// Publication year
        #[arg(long)]
        year: i32,

        #[arg(long)]
        genre: String,

        #[arg(long, value_enum, default_value_t = KindArg::Book)]
        kind: KindArg,
    },

    /// Fetch one record by id
    Get {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,

        #[arg(long)]
        id: RecordId,
    },

    /// Search the title, author or genre index
    Search {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,

        /// Index to search
        #[arg(long, value_enum)]
        by: SearchField,

        /// Prefix (title, author) or exact value (genre), case-insensitive
        query: String,
    },

    /// Change fields of an existing record
    Update {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,

        #[arg(long)]
        id: RecordId,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        author: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        genre: Option<String>,

        /// Availability flag (true or false)
        #[arg(long)]
        available: Option<bool>,
    },

    /// Delete a record
    Remove {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,

        #[arg(long)]
        id: RecordId,
    },

    /// Lend a record
    Borrow {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,

        #[arg(long)]
        id: RecordId,

        #[arg(long)]
        borrower: String,

        /// Loan period in days
        #[arg(long, default_value_t = DEFAULT_LOAN_DAYS)]
        days: u32,
    },

    /// Return a borrowed record
    Return {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,

        #[arg(long)]
        id: RecordId,
    },

    /// List open loans past their due date
    Overdue {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,
    },

    /// List every record in id order
    List {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,
    },

    /// Check index invariants
    Verify {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,
    },

    /// Print index statistics
    Stats {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,
    },
}

/// Searchable index
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Author,
    Genre,
}

/// Resource kind as accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Book,
    Journal,
    Media,
}

impl From<KindArg> for ResourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Book => ResourceKind::Book,
            KindArg::Journal => ResourceKind::Journal,
            KindArg::Media => ResourceKind::Media,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
