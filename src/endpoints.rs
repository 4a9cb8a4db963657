//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}',
//! use [format_endpoint].

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to create many transactions at once.
pub const BULK_TRANSACTIONS: &str = "/api/transactions/bulk";
/// The route to delete many transactions at once.
pub const DELETE_TRANSACTIONS: &str = "/api/transactions/delete";
/// The route for the total income recorded today.
pub const TODAY_INCOME: &str = "/api/transactions/today_income";
/// The route to get, update or delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route for income and expense totals over a period.
pub const SUMMARY: &str = "/api/summary";
/// The route for per-month totals in a year.
pub const MONTHLY_SUMMARY: &str = "/api/summary/monthly";
/// The route for per-year totals.
pub const YEARLY_SUMMARY: &str = "/api/summary/yearly";
/// The route for the average monthly income and expense.
pub const AVERAGE_SUMMARY: &str = "/api/summary/averages";
/// The route for per-kind statistics.
pub const STATISTICS: &str = "/api/statistics";
/// The route for the dashboard data.
pub const DASHBOARD: &str = "/api/dashboard";
/// The route for the dashboard's period summary and weekly charts.
pub const DASHBOARD_SUMMARY: &str = "/api/dashboard/summary";
/// The route to download transactions as CSV.
pub const EXPORT_CSV: &str = "/export/csv";
/// The route to download the full transactions report as a PDF.
pub const EXPORT_PDF: &str = "/export/pdf";
/// The route to download the summary report as a PDF.
pub const DASHBOARD_DOWNLOAD: &str = "/dashboard/download";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// Paths without a parameter are returned unchanged.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_endpoint(endpoints::TRANSACTION, 7), "/api/transactions/7");
/// ```
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| param_start + offset + 1);

    format!(
        "{}{id}{}",
        &endpoint_path[..param_start],
        &endpoint_path[param_end..]
    )
}
