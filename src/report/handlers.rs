//! File download endpoints for CSV and PDF reports.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    aggregation::AggregationResult,
    app_state::ReportConfig,
    report::{ReportFormat, ReportLayout, render},
    timezone::local_now,
    transaction::TransactionQuery,
    user::{UserID, get_user_by_id},
};

/// How many of the most recent transactions the summary report lists.
const SUMMARY_REPORT_LIMIT: u64 = 10;

/// The state needed to render reports.
#[derive(Debug, Clone)]
pub struct ReportState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// How reports are presented.
    pub report_config: ReportConfig,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            report_config: state.report_config.clone(),
        }
    }
}

/// A route handler that downloads every transaction as CSV.
pub async fn export_csv(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let now = local_now(&state.local_timezone)?;
    let file_name = format!("transactions_{}.csv", now.date());

    build_report(&state, user_id, ReportFormat::Csv, None)
        .map(|bytes| attachment("text/csv", &file_name, bytes))
}

/// A route handler that downloads every transaction as a PDF report.
pub async fn export_pdf(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let layout = ReportLayout::Transactions;

    build_report(&state, user_id, ReportFormat::Pdf(layout), None)
        .map(|bytes| attachment("application/pdf", layout.file_name(), bytes))
}

/// A route handler that downloads the summary totals and the most recent
/// transactions as a PDF report.
pub async fn download_dashboard_report(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let layout = ReportLayout::Summary;

    build_report(
        &state,
        user_id,
        ReportFormat::Pdf(layout),
        Some(SUMMARY_REPORT_LIMIT),
    )
    .map(|bytes| attachment("application/pdf", layout.file_name(), bytes))
}

/// Read the owner's transactions and render them. Totals always cover every
/// transaction, `limit` only shortens the listed rows.
fn build_report(
    state: &ReportState,
    user_id: UserID,
    format: ReportFormat,
    limit: Option<u64>,
) -> Result<Vec<u8>, Error> {
    let generated_at = local_now(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let owner = get_user_by_id(user_id, &connection)?;
    let transactions = TransactionQuery::new(user_id).fetch(&connection)?;
    let aggregation = AggregationResult::from_transactions(&transactions, &[]);

    let listed = match limit {
        Some(limit) => &transactions[..transactions.len().min(limit as usize)],
        None => &transactions[..],
    };

    let bytes = render(
        &owner,
        listed,
        &aggregation,
        format,
        generated_at,
        &state.report_config,
    )
    .inspect_err(|error| tracing::error!("could not render {format:?} report: {error}"))?;

    tracing::info!(
        "rendered {format:?} report of {} transactions for user {user_id}",
        listed.len()
    );

    Ok(bytes)
}

fn attachment(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
