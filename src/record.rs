//! Defines the record model and the database queries for the `records` table.

use rusqlite::{Connection, Row};
use time::Date;

use crate::Error;

/// Alias for the integer type the database assigns to each record.
pub type RecordId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income logged through the bot.
///
/// Records are never updated or deleted once inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The ID the database assigned to the record.
    pub id: RecordId,
    /// The day the money was spent or earned.
    pub date: Date,
    /// The amount of money.
    ///
    /// Negative amounts are income, zero or positive amounts are expenses.
    pub amount: f64,
    /// A freeform label such as "groceries" or "salary".
    pub category: String,
    /// An optional note, empty when the user did not write one.
    pub comment: String,
}

impl Record {
    /// Whether the record is income rather than an expense.
    pub fn is_income(&self) -> bool {
        self.amount < 0.0
    }
}

/// A record that has not been written to the database yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// The day the money was spent or earned.
    pub date: Date,
    /// The signed amount, see [Record::amount].
    pub amount: f64,
    /// A freeform label.
    pub category: String,
    /// An optional note, may be empty.
    pub comment: String,
}

impl NewRecord {
    /// Attach the ID assigned by the database.
    pub fn with_id(self, id: RecordId) -> Record {
        Record {
            id,
            date: self.date,
            amount: self.amount,
            category: self.category,
            comment: self.comment,
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the `records` table if it does not exist yet.
///
/// Safe to call before every write, existing rows are left untouched.
///
/// # Errors
/// Returns an [Error::StoreBusy] if another connection holds the lock, or an
/// [Error::SqlError] for any other SQL error.
pub fn ensure_schema(connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            amount REAL NOT NULL,
            category TEXT NOT NULL,
            comment TEXT
        )",
        (),
    )?;

    Ok(())
}

/// Insert `record` and return the ID the database assigned to it.
///
/// # Errors
/// Returns an [Error::StoreBusy] if another connection holds the lock, or an
/// [Error::SqlError] for any other SQL error.
pub fn insert_record(record: &NewRecord, connection: &Connection) -> Result<RecordId, Error> {
    connection.execute(
        "INSERT INTO records (date, amount, category, comment) VALUES (?1, ?2, ?3, ?4)",
        (
            record.date,
            record.amount,
            &record.category,
            &record.comment,
        ),
    )?;

    Ok(connection.last_insert_rowid())
}

/// Get every record in the database.
///
/// Returns an empty list if the `records` table has not been created yet, so
/// that read-only callers never have to create it.
///
/// # Errors
/// Returns an [Error::SqlError] if the query fails or a row cannot be mapped
/// to a [Record].
pub fn get_all_records(connection: &Connection) -> Result<Vec<Record>, Error> {
    let table_exists: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'records')",
        (),
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(Vec::new());
    }

    connection
        .prepare("SELECT id, date, amount, category, comment FROM records ORDER BY id DESC")?
        .query_map((), map_record_row)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::from)
}

/// Map a row with the columns `id, date, amount, category, comment` to a [Record].
fn map_record_row(row: &Row) -> Result<Record, rusqlite::Error> {
    let comment: Option<String> = row.get(4)?;

    Ok(Record {
        id: row.get(0)?,
        date: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        comment: comment.unwrap_or_default(),
    })
}
