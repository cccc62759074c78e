//! Router configuration for the dashboard server and the bot's webhook server.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post},
};

use crate::{
    dashboard::{DashboardState, get_dashboard_page},
    endpoints,
    ingest::{BotState, telegram_webhook, verify_secret_token},
    logging::logging_middleware,
    not_found::get_404_not_found,
};

/// Return a router with the dashboard's routes.
pub fn build_dashboard_router(state: DashboardState) -> Router {
    Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Return a router with the Telegram webhook route.
///
/// The secret token is checked before the body is read, then every update
/// and reply is logged.
pub fn build_bot_router(state: BotState) -> Router {
    Router::new()
        .route(endpoints::TELEGRAM_WEBHOOK, post(telegram_webhook))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), verify_secret_token))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
