//! Composes summaries into the data the dashboard shows.

use rusqlite::Connection;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    aggregation::{AggregationResult, WeeklySeries, summarize_with, weekly_series},
    period::{DatePredicate, Period},
    transaction::{Transaction, TransactionKind, TransactionQuery},
    user::UserID,
};

/// Optional filters that narrow the dashboard totals and recent transactions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DashboardFilters {
    /// Only include transactions of this kind.
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<TransactionKind>,
    /// Earliest date, inclusive.
    pub start_date: Option<Date>,
    /// Latest date, inclusive.
    pub end_date: Option<Date>,
}

/// Everything the dashboard page needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardViewModel {
    /// Totals over the filtered transactions.
    #[serde(flatten)]
    pub totals: AggregationResult,
    /// The most recent filtered transactions, newest first.
    pub recent_transactions: Vec<Transaction>,
    /// Income for each day of the current week. Not affected by the filters.
    pub weekly_income: Vec<Decimal>,
    /// Day names for `weekly_income`.
    pub week_days_labels: Vec<&'static str>,
    /// The kind filter that was applied, if any.
    #[serde(rename = "selected_type")]
    pub selected_kind: Option<TransactionKind>,
    /// The start date filter that was applied, if any.
    pub start_date: Option<Date>,
    /// The end date filter that was applied, if any.
    pub end_date: Option<Date>,
}

/// Assemble the dashboard for `owner`.
///
/// `filters` narrow the totals and the `recent_limit` most recent
/// transactions. The weekly income chart always shows the week containing
/// `today`.
///
/// # Errors
/// Returns an error if the transactions cannot be read.
pub fn build(
    owner: UserID,
    filters: &DashboardFilters,
    today: Date,
    recent_limit: u64,
    connection: &Connection,
) -> Result<DashboardViewModel, Error> {
    let mut query = TransactionQuery::new(owner).date_range(DatePredicate {
        start: filters.start_date,
        end: filters.end_date,
    });

    if let Some(kind) = filters.kind {
        query = query.kind(kind);
    }

    let totals = summarize_with(&query, &[], connection)?;
    let recent_transactions = query.limit(recent_limit).fetch(connection)?;
    let week = weekly_series(owner, today, connection)?;

    Ok(DashboardViewModel {
        totals,
        recent_transactions,
        weekly_income: week.income,
        week_days_labels: week.labels,
        selected_kind: filters.kind,
        start_date: filters.start_date,
        end_date: filters.end_date,
    })
}

/// Period totals and the current week's chart data, as plain numbers for
/// charting libraries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    /// Total income in the period.
    pub income: f64,
    /// Total expenses in the period.
    pub expense: f64,
    /// Income minus expenses in the period.
    pub balance: f64,
    /// Income for each day of the current week.
    pub weekly_income: Vec<f64>,
    /// Expenses for each day of the current week.
    pub weekly_expense: Vec<f64>,
    /// Day names for the weekly series.
    pub week_labels: Vec<&'static str>,
}

/// Summarise `period` relative to `today`, with the current week's series.
///
/// # Errors
/// Returns an error if the transactions cannot be read.
pub fn period_summary(
    owner: UserID,
    period: Period,
    today: Date,
    connection: &Connection,
) -> Result<PeriodSummary, Error> {
    let totals = summarize_with(
        &TransactionQuery::new(owner).date_range(period.resolve(today)),
        &[],
        connection,
    )?;
    let WeeklySeries {
        income,
        expense,
        labels,
        ..
    } = weekly_series(owner, today, connection)?;

    Ok(PeriodSummary {
        income: to_float(totals.total_income),
        expense: to_float(totals.total_expense),
        balance: to_float(totals.net_balance),
        weekly_income: income.into_iter().map(to_float).collect(),
        weekly_expense: expense.into_iter().map(to_float).collect(),
        week_labels: labels,
    })
}

fn to_float(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}
