//! Dashboard module
//!
//! Combines period totals, the most recent transactions and the current
//! week's chart series into one response.

mod handlers;
mod view_model;

pub use handlers::{get_dashboard, get_dashboard_summary};
pub use view_model::{DashboardFilters, DashboardViewModel, PeriodSummary, build};
