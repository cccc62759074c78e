//! Access to the record store and the bounded retry loop used for writes.

use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use rusqlite::{Connection, OpenFlags};

use crate::{
    Error,
    record::{NewRecord, Record, RecordId, ensure_schema, get_all_records, insert_record},
};

/// How long a read-only connection waits for a writer to release its lock.
pub const READ_BUSY_TIMEOUT: Duration = Duration::from_millis(100);

/// Storage for financial records.
///
/// The SQLite implementation is [SqliteRecordStore]. Tests substitute their
/// own implementations to simulate lock contention.
pub trait RecordStore: Send + Sync {
    /// Create the record table if it does not exist. A no-op otherwise.
    fn ensure_schema(&self) -> Result<(), Error>;

    /// Append `record` and return its assigned ID.
    ///
    /// Returns [Error::StoreBusy] when another writer holds the lock.
    fn append(&self, record: &NewRecord) -> Result<RecordId, Error>;

    /// Get every record. The order is not significant.
    fn load_all(&self) -> Result<Vec<Record>, Error>;
}

/// A [RecordStore] backed by a SQLite database file.
#[derive(Debug)]
pub struct SqliteRecordStore {
    connection: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Wrap an open connection.
    pub fn new(connection: Connection) -> Self {
        Self {
            connection: Mutex::new(connection),
        }
    }

    /// Open the database at `path` for reading and writing, creating the file if needed.
    ///
    /// The busy timeout is set to zero so that lock contention is reported
    /// straight away and handled by [append_with_retry].
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let connection = Connection::open(path)?;
        connection.busy_timeout(Duration::ZERO)?;

        Ok(Self::new(connection))
    }

    /// Open the database at `path` for reading only.
    ///
    /// Reads wait at most [READ_BUSY_TIMEOUT] for a writer before failing
    /// with [Error::StoreBusy].
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the file does not exist or cannot be opened.
    pub fn open_read_only(path: &Path) -> Result<Self, Error> {
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        connection.busy_timeout(READ_BUSY_TIMEOUT)?;

        Ok(Self::new(connection))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }
}

impl RecordStore for SqliteRecordStore {
    fn ensure_schema(&self) -> Result<(), Error> {
        let connection = self.lock()?;
        ensure_schema(&connection)
    }

    fn append(&self, record: &NewRecord) -> Result<RecordId, Error> {
        let connection = self.lock()?;
        ensure_schema(&connection)?;
        insert_record(record, &connection)
    }

    fn load_all(&self) -> Result<Vec<Record>, Error> {
        let connection = self.lock()?;
        get_all_records(&connection)
    }
}

/// How often and how patiently a write is retried while the store is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// The total number of attempts, including the first.
    pub max_attempts: u32,
    /// The pause between two consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(200),
        }
    }
}

/// Append `record` to `store`, retrying while the store reports [Error::StoreBusy].
///
/// `sleep` is called with [RetryPolicy::delay] between attempts, never after
/// the last one. Production code passes [std::thread::sleep].
///
/// # Errors
/// Returns [Error::StoreBusyRetriesExhausted] if every attempt found the store
/// busy. Any other error is returned from the attempt that produced it,
/// without retrying.
pub fn append_with_retry<S>(
    store: &S,
    record: &NewRecord,
    policy: RetryPolicy,
    mut sleep: impl FnMut(Duration),
) -> Result<RecordId, Error>
where
    S: RecordStore + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match store.append(record) {
            Ok(id) => {
                tracing::info!(
                    "Saved record {id}: {} {} {:?} {:?}",
                    record.date,
                    record.amount,
                    record.category,
                    record.comment
                );
                return Ok(id);
            }
            Err(Error::StoreBusy) => {
                tracing::warn!("Database is locked, attempt {attempt}/{max_attempts}");

                if attempt < max_attempts {
                    sleep(policy.delay);
                }
            }
            Err(error) => {
                tracing::error!("Could not save record: {error}");
                return Err(error);
            }
        }
    }

    tracing::error!("Could not save record: the database was locked for {max_attempts} attempts");
    Err(Error::StoreBusyRetriesExhausted {
        attempts: max_attempts,
    })
}
