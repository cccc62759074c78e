//! Budget Bot records income and expenses sent as chat messages and shows
//! monthly summaries of them on a web dashboard.
//!
//! The crate is split along the two processes that share one SQLite file:
//! - the bot (see `src/bin/bot.rs`) parses messages such as `groceries, 1200`
//!   and appends them to the `records` table,
//! - the dashboard (see `src/bin/dashboard.rs`) reads every record and renders
//!   per-month and per-category rollups.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::response::{IntoResponse, Response};
use axum_server::Handle;
use tokio::signal;

use crate::internal_server_error::InternalServerError;

mod dashboard;
mod endpoints;
mod html;
mod ingest;
mod internal_server_error;
mod logging;
mod not_found;
mod record;
mod routing;
mod store;
mod timezone;

pub use dashboard::{DashboardState, RecordCache};
pub use ingest::{BotState, IngestionHandler, replies};
pub use logging::setup_logging;
pub use record::{NewRecord, Record, RecordId};
pub use routing::{build_bot_router, build_dashboard_router};
pub use store::{
    READ_BUSY_TIMEOUT, RecordStore, RetryPolicy, SqliteRecordStore, append_with_retry,
};
pub use timezone::local_today;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The message did not split into two or three comma separated fields.
    #[error("expected 2 or 3 comma separated fields, got {0}")]
    InvalidFormat(usize),

    /// The amount field of a message could not be parsed as a finite number.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// Another connection holds the database lock.
    ///
    /// This error is transient, the write should be retried.
    #[error("the database is busy")]
    StoreBusy,

    /// The database stayed busy for every attempt of a retried write.
    #[error("the database was still busy after {attempts} attempts")]
    StoreBusyRetriesExhausted {
        /// How many times the write was attempted.
        attempts: u32,
    },

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// A period string was not of the form `YYYY-MM`.
    #[error("invalid period \"{0}\", expected YYYY-MM")]
    InvalidPeriod(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked,
                    extended_code: _,
                },
                _,
            ) => Error::StoreBusy,
            error => Error::SqlError(error),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidTimezone(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}
