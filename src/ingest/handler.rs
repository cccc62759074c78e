//! Turns one chat message into one saved record and one reply.

use std::{sync::Arc, time::Duration};

use time::Date;

use crate::{
    Error,
    ingest::{parse::parse_message, replies},
    record::{NewRecord, Record},
    store::{RecordStore, RetryPolicy, append_with_retry},
    timezone::local_today,
};

/// Parses chat messages and appends the resulting records to a [RecordStore].
///
/// Every message gets exactly one reply, errors are logged and turned into
/// reply text rather than returned.
#[derive(Clone)]
pub struct IngestionHandler {
    store: Arc<dyn RecordStore>,
    retry_policy: RetryPolicy,
    local_timezone: Option<String>,
    sleep: fn(Duration),
}

impl IngestionHandler {
    /// Create a handler that writes to `store`.
    ///
    /// `local_timezone` is a canonical timezone name such as
    /// "Pacific/Auckland" used to date records. When it is `None` the
    /// system's local offset is used.
    pub fn new(
        store: Arc<dyn RecordStore>,
        retry_policy: RetryPolicy,
        local_timezone: Option<String>,
    ) -> Self {
        Self {
            store,
            retry_policy,
            local_timezone,
            sleep: std::thread::sleep,
        }
    }

    /// Replace the function used to wait between retries.
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    /// Reply to `text`, dating any new record with today's local date.
    pub fn handle_message(&self, text: &str) -> &'static str {
        self.respond(text, || local_today(self.local_timezone.as_deref()))
    }

    /// Reply to `text`, dating any new record with `today`.
    pub fn handle_message_on(&self, text: &str, today: Date) -> &'static str {
        self.respond(text, || Ok(today))
    }

    /// Parse `text` and append it to the store as a record dated `today`.
    ///
    /// # Errors
    /// Returns an:
    /// - [Error::InvalidFormat] or [Error::InvalidAmount] if `text` could not
    ///   be parsed, in which case the store is not touched,
    /// - [Error::StoreBusyRetriesExhausted] if the store stayed locked,
    /// - any other error reported by the store.
    pub fn ingest(&self, text: &str, today: Date) -> Result<Record, Error> {
        let entry = parse_message(text)?;

        let record = NewRecord {
            date: today,
            amount: entry.amount,
            category: entry.category,
            comment: entry.comment,
        };

        let id = append_with_retry(self.store.as_ref(), &record, self.retry_policy, self.sleep)?;

        Ok(record.with_id(id))
    }

    fn respond(&self, text: &str, today: impl FnOnce() -> Result<Date, Error>) -> &'static str {
        tracing::info!("Received message: {text:?}");

        if let Some(reply) = command_reply(text) {
            return reply;
        }

        let result = today().and_then(|today| self.ingest(text, today));

        reply_for(result)
    }
}

/// The reply for a `/command`, or `None` if `text` is not a command.
fn command_reply(text: &str) -> Option<&'static str> {
    let command = text.trim().strip_prefix('/')?;
    let command = command.split_whitespace().next().unwrap_or_default();
    // Group chats address commands as "/start@bot_name".
    let command = command.split('@').next().unwrap_or_default();

    match command {
        "start" | "help" => Some(replies::WELCOME),
        _ => Some(replies::USAGE),
    }
}

fn reply_for(result: Result<Record, Error>) -> &'static str {
    match result {
        Ok(_) => replies::SAVED,
        Err(Error::InvalidFormat(field_count)) => {
            tracing::debug!("Rejected message with {field_count} fields");
            replies::USAGE
        }
        Err(Error::InvalidAmount(amount)) => {
            tracing::debug!("Rejected message with amount {amount:?}");
            replies::INVALID_AMOUNT
        }
        Err(error @ Error::StoreBusyRetriesExhausted { .. }) => {
            tracing::error!("Could not save record, database busy: {error}");
            replies::SAVE_FAILED
        }
        Err(error @ (Error::SqlError(_) | Error::StoreBusy)) => {
            tracing::error!("Could not save record, database error: {error}");
            replies::SAVE_FAILED
        }
        Err(error) => {
            tracing::error!("Unexpected error while handling message: {error}");
            replies::UNEXPECTED
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        ingest::replies,
        store::{RecordStore, RetryPolicy, SqliteRecordStore, test_utils::FlakyStore},
    };

    use super::IngestionHandler;

    fn get_handler(store: Arc<dyn RecordStore>) -> IngestionHandler {
        IngestionHandler::new(store, RetryPolicy::default(), Some("Etc/UTC".to_owned()))
            .with_sleep(|_| {})
    }

    #[test]
    fn saves_record_with_parsed_fields() {
        let store = Arc::new(FlakyStore::default());
        let handler = get_handler(store.clone());

        let reply = handler.handle_message_on("groceries, 1200.5", date!(2024 - 01 - 10));

        assert_eq!(reply, replies::SAVED);
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date!(2024 - 01 - 10));
        assert_eq!(records[0].amount, 1200.5);
        assert_eq!(records[0].category, "groceries");
        assert_eq!(records[0].comment, "");
    }

    #[test]
    fn ingest_returns_the_saved_record() {
        let store = Arc::new(FlakyStore::default());
        let handler = get_handler(store.clone());

        let record = handler
            .ingest("salary, -50000, january", date!(2024 - 01 - 05))
            .unwrap();

        assert_eq!(record.id, 1);
        assert_eq!(record.amount, -50000.0);
        assert_eq!(record.comment, "january");
        assert!(record.is_income());
    }

    #[test]
    fn wrong_field_count_replies_with_usage_and_does_not_write() {
        let store = Arc::new(FlakyStore::default());
        let handler = get_handler(store.clone());

        for text in ["groceries", "a, 1, b, c", "", "   "] {
            let reply = handler.handle_message_on(text, date!(2024 - 01 - 10));

            assert_eq!(reply, replies::USAGE, "input {text:?}");
        }
        assert_eq!(store.attempts(), 0);
    }

    #[test]
    fn non_numeric_amount_replies_with_hint_and_does_not_write() {
        let store = Arc::new(FlakyStore::default());
        let handler = get_handler(store.clone());

        let reply = handler.handle_message_on("groceries, twelve", date!(2024 - 01 - 10));

        assert_eq!(reply, replies::INVALID_AMOUNT);
        assert_eq!(store.attempts(), 0);
    }

    #[test]
    fn ingest_reports_parse_errors() {
        let handler = get_handler(Arc::new(FlakyStore::default()));

        assert_eq!(
            handler.ingest("groceries", date!(2024 - 01 - 10)),
            Err(Error::InvalidFormat(1))
        );
    }

    #[test]
    fn succeeds_when_store_frees_up_on_last_attempt() {
        let store = Arc::new(FlakyStore::busy_for(4));
        let handler = get_handler(store.clone());

        let reply = handler.handle_message_on("groceries, 1200", date!(2024 - 01 - 10));

        assert_eq!(reply, replies::SAVED);
        assert_eq!(store.attempts(), 5);
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn reports_failure_when_store_stays_busy() {
        let store = Arc::new(FlakyStore::busy_for(5));
        let handler = get_handler(store.clone());

        let reply = handler.handle_message_on("groceries, 1200", date!(2024 - 01 - 10));

        assert_eq!(reply, replies::SAVE_FAILED);
        assert_eq!(store.attempts(), 5);
        assert!(store.records().is_empty());
    }

    #[test]
    fn reports_failure_on_sql_error() {
        let store = Arc::new(FlakyStore::failing_with(|| {
            Error::SqlError(rusqlite::Error::InvalidQuery)
        }));
        let handler = get_handler(store.clone());

        let reply = handler.handle_message_on("groceries, 1200", date!(2024 - 01 - 10));

        assert_eq!(reply, replies::SAVE_FAILED);
        assert_eq!(store.attempts(), 1);
    }

    #[test]
    fn unexpected_errors_get_generic_reply() {
        let store = Arc::new(FlakyStore::failing_with(|| Error::DatabaseLockError));
        let handler = get_handler(store);

        let reply = handler.handle_message_on("groceries, 1200", date!(2024 - 01 - 10));

        assert_eq!(reply, replies::UNEXPECTED);
    }

    #[test]
    fn invalid_timezone_gets_generic_reply() {
        let store = Arc::new(FlakyStore::default());
        let handler = IngestionHandler::new(
            store.clone(),
            RetryPolicy::default(),
            Some("Not/AZone".to_owned()),
        );

        let reply = handler.handle_message("groceries, 1200");

        assert_eq!(reply, replies::UNEXPECTED);
        assert_eq!(store.attempts(), 0);
    }

    #[test]
    fn start_and_help_commands_reply_with_welcome() {
        let store = Arc::new(FlakyStore::default());
        let handler = get_handler(store.clone());

        for text in ["/start", "/help", "/start@budget_bot", " /start now"] {
            assert_eq!(handler.handle_message(text), replies::WELCOME, "input {text:?}");
        }
        assert_eq!(store.attempts(), 0);
    }

    #[test]
    fn unknown_command_replies_with_usage() {
        let handler = get_handler(Arc::new(FlakyStore::default()));

        assert_eq!(handler.handle_message("/stats"), replies::USAGE);
    }

    #[test]
    fn saves_to_sqlite() {
        let store = Arc::new(SqliteRecordStore::new(Connection::open_in_memory().unwrap()));
        let handler = get_handler(store.clone());

        handler.handle_message_on("transport, 800, bus pass", date!(2024 - 01 - 12));

        let records = store.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "transport");
        assert_eq!(records[0].comment, "bus pass");
    }
}
