//! CLI command implementations
//!
//! Every command except `init` follows the same boot sequence:
//! 1. Configuration load
//! 2. Store open (every line verified)
//! 3. Index load
//!
//! then performs one operation and returns its result as JSON.

use std::path::Path;

use serde_json::{json, Value};

use crate::catalog::{Library, Loan, Record, RecordDraft, RecordId, RecordRef};
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::store::{FileStore, RecordSource};

use super::args::{Command, KindArg, SearchField};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run a command and write its response to stdout
pub fn run_command(cmd: Command) -> CliResult<()> {
    match execute(cmd) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run a command and return the `data` payload of its response
pub fn execute(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Add {
            config,
            title,
            author,
            year,
            genre,
            kind,
        } => add(&config, title, author, year, genre, kind),
        Command::Get { config, id } => get(&config, id),
        Command::Search { config, by, query } => search(&config, by, &query),
        Command::Update {
            config,
            id,
            title,
            author,
            year,
            genre,
            available,
        } => {
            let changes = RecordChanges {
                title,
                author,
                year,
                genre,
                available,
            };
            update(&config, id, changes)
        }
        Command::Remove { config, id } => remove(&config, id),
        Command::Borrow {
            config,
            id,
            borrower,
            days,
        } => borrow(&config, id, &borrower, days),
        Command::Return { config, id } => return_record(&config, id),
        Command::Overdue { config } => overdue(&config),
        Command::List { config } => list(&config),
        Command::Verify { config } => verify(&config),
        Command::Stats { config } => stats(&config),
    }
}

/// Field changes requested by `update`
#[derive(Debug, Default)]
pub struct RecordChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub available: Option<bool>,
}

impl RecordChanges {
    fn apply(self, record: &mut Record) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(author) = self.author {
            record.author = author;
        }
        if let Some(year) = self.year {
            record.publication_year = year;
        }
        if let Some(genre) = self.genre {
            record.genre = genre;
        }
        if let Some(available) = self.available {
            record.is_available = available;
        }
    }
}

/// Create an empty record store
///
/// Fails if the store file already exists. Does not build any index.
pub fn init(config_path: &Path) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let store = FileStore::create(config.data_path())?;

    log_event_with_fields(
        Event::StoreOpened,
        &[("path", &config.data_file), ("records", "0")],
    );

    Ok(json!({"initialized": true, "data_file": store.path().display().to_string()}))
}

/// Validate and store a new record
pub fn add(
    config_path: &Path,
    title: String,
    author: String,
    year: i32,
    genre: String,
    kind: KindArg,
) -> CliResult<Value> {
    let mut library = boot(config_path)?;
    let draft = RecordDraft::new(title, author, year, genre).with_kind(kind.into());
    let record = library.add_record(draft)?;
    record_json(&record)
}

/// Fetch a record through the id cache
pub fn get(config_path: &Path, id: RecordId) -> CliResult<Value> {
    let mut library = boot(config_path)?;
    let record = library
        .get_record(id)?
        .ok_or_else(|| CliError::record_not_found(id))?;
    record_json(&record)
}

/// Prefix search on title or author, exact search on genre
pub fn search(config_path: &Path, by: SearchField, query: &str) -> CliResult<Value> {
    let library = boot(config_path)?;
    let records = match by {
        SearchField::Title => library.search_by_title(query),
        SearchField::Author => library.search_by_author(query),
        SearchField::Genre => library.search_by_genre(query),
    };
    records_json(&records)
}

/// Apply field changes to an existing record
pub fn update(config_path: &Path, id: RecordId, changes: RecordChanges) -> CliResult<Value> {
    let mut library = boot(config_path)?;
    let current = library
        .get_record(id)?
        .ok_or_else(|| CliError::record_not_found(id))?;

    let mut record = Record::clone(&current);
    changes.apply(&mut record);

    let record = library.update_record(record)?;
    record_json(&record)
}

/// Delete a record
pub fn remove(config_path: &Path, id: RecordId) -> CliResult<Value> {
    let mut library = boot(config_path)?;
    let removed = library.remove_record(id)?;
    Ok(json!({"removed": removed.id}))
}

/// Lend a record for `days` days starting today
pub fn borrow(config_path: &Path, id: RecordId, borrower: &str, days: u32) -> CliResult<Value> {
    let mut library = boot(config_path)?;
    let loan = library.borrow_record(id, borrower, days)?;
    Ok(serde_json::to_value(loan)?)
}

/// Close the open loan of a record
pub fn return_record(config_path: &Path, id: RecordId) -> CliResult<Value> {
    let mut library = boot(config_path)?;
    let loan = library.return_record(id)?;
    Ok(serde_json::to_value(loan)?)
}

/// Open loans past their due date, each with its record's title
pub fn overdue(config_path: &Path) -> CliResult<Value> {
    let library = boot(config_path)?;
    let loans = library.overdue()?;

    let mut entries = Vec::with_capacity(loans.len());
    for loan in &loans {
        let title = library
            .store()
            .fetch_by_id(loan.record_id)?
            .map(|record| record.title.clone());
        entries.push(loan_json(loan, title)?);
    }
    Ok(json!({"count": entries.len(), "loans": entries}))
}

/// List every record in id order
pub fn list(config_path: &Path) -> CliResult<Value> {
    let library = boot(config_path)?;
    records_json(&library.all_records()?)
}

/// Check the structural invariants of every index
pub fn verify(config_path: &Path) -> CliResult<Value> {
    let library = boot(config_path)?;
    library.verify()?;
    Ok(json!({"verified": true}))
}

/// Index statistics after load
pub fn stats(config_path: &Path) -> CliResult<Value> {
    let library = boot(config_path)?;
    Ok(serde_json::to_value(library.stats())?)
}

fn load_config(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.log_severity()?);

    log_event_with_fields(
        Event::ConfigLoaded,
        &[("path", &config_path.display().to_string())],
    );
    Ok(config)
}

/// Load configuration, open the store and build the indexes
fn boot(config_path: &Path) -> CliResult<Library<FileStore>> {
    let config = load_config(config_path)?;
    let data_path = config.data_path();

    if !data_path.exists() {
        return Err(CliError::not_initialized());
    }

    let store = FileStore::open(data_path)?;
    log_event_with_fields(
        Event::StoreOpened,
        &[
            ("path", &config.data_file),
            ("records", &store.len().to_string()),
        ],
    );

    Ok(Library::open(store, config.index_config())?)
}

fn record_json(record: &RecordRef) -> CliResult<Value> {
    Ok(serde_json::to_value(record.as_ref())?)
}

fn loan_json(loan: &Loan, title: Option<String>) -> CliResult<Value> {
    let mut value = serde_json::to_value(loan)?;
    if let Some(fields) = value.as_object_mut() {
        fields.insert("title".to_string(), json!(title));
    }
    Ok(value)
}

fn records_json(records: &[RecordRef]) -> CliResult<Value> {
    let records: Vec<&Record> = records.iter().map(|r| r.as_ref()).collect();
    Ok(json!({
        "count": records.len(),
        "records": serde_json::to_value(records)?,
    }))
}
