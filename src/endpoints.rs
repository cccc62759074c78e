//! The API endpoints URIs.

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The page summarizing the records.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The route Telegram posts bot updates to.
pub const TELEGRAM_WEBHOOK: &str = "/api/telegram/webhook";
