//! JSON endpoints for summaries and statistics.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::IntoResponse,
};
use axum_extra::extract::Query;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    aggregation::{
        reduce::{Bucket, GroupKey},
        summary::{
            KindCount, KindStatistics, average_monthly_totals, count_by_kind,
            count_in_amount_range, distinct_kinds, kind_statistics, monthly_totals,
            summarize_with, yearly_totals,
        },
    },
    period::Period,
    timezone::local_today,
    transaction::{TransactionKind, TransactionQuery},
    user::UserID,
};

/// The state needed to compute summaries.
#[derive(Debug, Clone)]
pub struct AggregationState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for AggregationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The query string for [get_summary].
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// One of today, week, month, year or custom-range. Defaults to month.
    pub period: Option<String>,
    /// Start of a custom range.
    pub start_date: Option<Date>,
    /// End of a custom range.
    pub end_date: Option<Date>,
    /// Groupings to include, e.g. `group=day&group=kind`.
    #[serde(default)]
    pub group: Vec<GroupKey>,
}

/// A route handler for the totals over a period, with optional groupings.
pub async fn get_summary(
    State(state): State<AggregationState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<SummaryQuery>,
) -> Result<impl IntoResponse, Error> {
    let today = local_today(&state.local_timezone)?;
    let date_range =
        Period::from_query(query.period.as_deref(), query.start_date, query.end_date)
            .resolve(today);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    summarize_with(
        &TransactionQuery::new(user_id).date_range(date_range),
        &query.group,
        &connection,
    )
    .map(Json)
}

/// The query string for [get_monthly_summary].
#[derive(Debug, Default, Deserialize)]
pub struct MonthlySummaryQuery {
    /// The year to summarise, defaults to the current year.
    pub year: Option<i32>,
}

/// Monthly totals for one year.
#[derive(Debug, Serialize)]
pub struct MonthlySummary {
    /// The year the months are in.
    pub year: i32,
    /// Totals for the months that have transactions.
    pub months: Vec<Bucket>,
}

/// A route handler for the per-month totals of a year.
pub async fn get_monthly_summary(
    State(state): State<AggregationState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthlySummaryQuery>,
) -> Result<impl IntoResponse, Error> {
    let year = match query.year {
        Some(year) => year,
        None => local_today(&state.local_timezone)?.year(),
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let months = monthly_totals(user_id, year, &connection)?;

    Ok(Json(MonthlySummary { year, months }))
}

/// Yearly totals.
#[derive(Debug, Serialize)]
pub struct YearlySummary {
    /// Totals for the years that have transactions.
    pub years: Vec<Bucket>,
}

/// A route handler for the per-year totals.
pub async fn get_yearly_summary(
    State(state): State<AggregationState>,
    Extension(user_id): Extension<UserID>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let years = yearly_totals(user_id, &connection)?;

    Ok(Json(YearlySummary { years }))
}

/// A route handler for the average monthly income and expense.
pub async fn get_average_summary(
    State(state): State<AggregationState>,
    Extension(user_id): Extension<UserID>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    average_monthly_totals(user_id, &connection).map(Json)
}

/// The query string for [get_statistics].
#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    /// Lower bound for the amount range count.
    pub min_amount: Option<Decimal>,
    /// Upper bound for the amount range count.
    pub max_amount: Option<Decimal>,
}

/// Statistics over all of a user's transactions.
#[derive(Debug, Serialize)]
pub struct Statistics {
    /// The total number of transactions.
    pub total_count: usize,
    /// Statistics for income.
    pub income: KindStatistics,
    /// Statistics for expenses.
    pub expense: KindStatistics,
    /// The number of transactions of each kind that has any.
    pub count_by_kind: Vec<KindCount>,
    /// The kinds that have at least one transaction.
    pub distinct_kinds: Vec<TransactionKind>,
    /// How many transactions fall in the requested amount range, if both
    /// bounds were given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_range_count: Option<usize>,
}

/// A route handler for per-kind statistics.
pub async fn get_statistics(
    State(state): State<AggregationState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<StatisticsQuery>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let count_by_kind = count_by_kind(user_id, &connection)?;

    let amount_range_count = match (query.min_amount, query.max_amount) {
        (Some(min), Some(max)) => Some(count_in_amount_range(user_id, min, max, &connection)?),
        _ => None,
    };

    Ok(Json(Statistics {
        total_count: count_by_kind.iter().map(|count| count.count).sum(),
        income: kind_statistics(user_id, TransactionKind::Income, &connection)?,
        expense: kind_statistics(user_id, TransactionKind::Expense, &connection)?,
        distinct_kinds: distinct_kinds(user_id, &connection)?,
        count_by_kind,
        amount_range_count,
    }))
}
