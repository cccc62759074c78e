use std::{
    io::{self, BufRead, Write},
    net::SocketAddr,
    path::PathBuf,
    process::exit,
    sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use tower_http::trace::TraceLayer;

use budget_bot::{
    BotState, IngestionHandler, RecordStore, RetryPolicy, SqliteRecordStore, build_bot_router,
    graceful_shutdown, setup_logging,
};

/// The chat bot for budget_bot.
///
/// Serves a Telegram webhook, or with `--stdin`, replies to messages typed
/// into the terminal.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database. Created if it does not exist.
    #[arg(long)]
    db_path: PathBuf,

    /// The port to serve the webhook from.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// The canonical timezone used to date records, e.g. "Pacific/Auckland".
    /// Defaults to the system's local timezone.
    #[arg(long)]
    timezone: Option<String>,

    /// How many times to try saving a record while the database is busy.
    #[arg(long, default_value_t = RetryPolicy::default().max_attempts)]
    retry_attempts: u32,

    /// How many milliseconds to wait between attempts to save a record.
    #[arg(long, default_value_t = 200)]
    retry_delay_ms: u64,

    /// File path to write debug logs to.
    #[arg(long, default_value = "debug.log")]
    log_path: PathBuf,

    /// Read messages from stdin and print the replies instead of serving the webhook.
    #[arg(long)]
    stdin: bool,

    /// The secret token given to Telegram's `setWebhook`.
    #[arg(long, env = "TELEGRAM_WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(error) = setup_logging(&args.log_path) {
        eprintln!("Could not create log file {:#?}: {error}", args.log_path);
        exit(1);
    }

    let store = match SqliteRecordStore::open(&args.db_path) {
        Ok(store) => store,
        Err(error) => {
            tracing::error!("Could not open database {:#?}: {error}", args.db_path);
            exit(1);
        }
    };

    if let Err(error) = store.ensure_schema() {
        tracing::error!("Could not create the records table: {error}");
        exit(1);
    }

    let retry_policy = RetryPolicy {
        max_attempts: args.retry_attempts,
        delay: Duration::from_millis(args.retry_delay_ms),
    };
    let handler = IngestionHandler::new(Arc::new(store), retry_policy, args.timezone);

    if args.stdin {
        match tokio::task::spawn_blocking(move || reply_to_stdin(&handler)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::error!("Could not read from stdin: {error}");
                exit(1);
            }
            Err(error) => {
                tracing::error!("Stdin task failed: {error}");
                exit(1);
            }
        }

        return;
    }

    if args.webhook_secret.is_none() {
        tracing::warn!("No webhook secret set, accepting updates from any client");
    }

    let state = BotState {
        handler,
        webhook_secret: args.webhook_secret,
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_bot_router(state));

    tracing::info!("Webhook server listening on {}", addr);
    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server error: {error}");
        exit(1);
    }
}

/// Print one reply for every line read from stdin until it is closed.
fn reply_to_stdin(handler: &IngestionHandler) -> io::Result<()> {
    reply_to_lines(handler, io::stdin().lock(), io::stdout())
}

/// Write exactly one reply to `output` for every line of `input`, blank lines included.
fn reply_to_lines(
    handler: &IngestionHandler,
    input: impl BufRead,
    mut output: impl Write,
) -> io::Result<()> {
    write!(output, "> ")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        writeln!(output, "{}", handler.handle_message(&line))?;

        write!(output, "> ")?;
        output.flush()?;
    }

    writeln!(output)?;

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        .on_failure(());

    router.layer(tracing_layer)
}
