//! Dashboard module
//!
//! Provides an overview page summarizing the records of one month, with
//! filters for the month and the categories shown.

mod aggregation;
mod cache;
mod cards;
mod charts;
mod handlers;
mod period;
mod tables;

pub use cache::RecordCache;
pub use handlers::{DashboardState, get_dashboard_page};
