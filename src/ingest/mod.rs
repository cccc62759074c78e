//! Ingestion of chat messages into the record store.
//!
//! A message such as `groceries, 1200, weekly shop` is parsed into a record,
//! dated with today's local date and appended to the store, retrying while
//! the database is locked by another connection.

mod handler;
mod parse;
pub mod replies;
mod webhook;

pub use handler::IngestionHandler;
pub use webhook::{BotState, telegram_webhook, verify_secret_token};
