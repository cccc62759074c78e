use std::{net::SocketAddr, path::PathBuf, process::exit, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use tower_http::trace::TraceLayer;

use budget_bot::{
    DashboardState, RecordCache, SqliteRecordStore, build_dashboard_router, graceful_shutdown,
    setup_logging,
};

/// The web dashboard for budget_bot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: PathBuf,

    /// The port to serve the dashboard from.
    #[arg(short, long, default_value_t = 8501)]
    port: u16,

    /// How many seconds to reuse loaded records before reading the database again.
    #[arg(long, default_value_t = RecordCache::DEFAULT_TTL.as_secs())]
    cache_ttl_secs: u64,

    /// File path to write debug logs to.
    #[arg(long, default_value = "debug.log")]
    log_path: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(error) = setup_logging(&args.log_path) {
        eprintln!("Could not create log file {:#?}: {error}", args.log_path);
        exit(1);
    }

    let store = match SqliteRecordStore::open_read_only(&args.db_path) {
        Ok(store) => store,
        Err(error) => {
            tracing::error!("Could not open database {:#?}: {error}", args.db_path);
            exit(1);
        }
    };

    let state = DashboardState::new(
        Arc::new(store),
        RecordCache::new(Duration::from_secs(args.cache_ttl_secs)),
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_dashboard_router(state));

    tracing::info!("HTTP server listening on {}", addr);
    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server error: {error}");
        exit(1);
    }
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
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
