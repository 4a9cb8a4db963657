//! Owner-scoped summaries that read from the database and reduce in memory.
//!
//! None of these functions treat an empty ledger as an error: a user with no
//! transactions gets zero totals and empty groupings.

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, Duration, Weekday};

use crate::{
    Error,
    aggregation::reduce::{
        Bucket, GroupKey, Statistic, daily_series, group_totals, reduce, series_dates,
    },
    period::{DatePredicate, start_of_week, year_bounds},
    transaction::{SortOrder, Transaction, TransactionKind, TransactionQuery},
    user::UserID,
};

/// The number of days in the weekly charts.
pub const DAYS_IN_WEEK: usize = 7;

/// Income and expense totals, optionally broken down into buckets.
///
/// Results are derived on every request and never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    /// The sum of all income.
    pub total_income: Decimal,
    /// The sum of all expenses.
    pub total_expense: Decimal,
    /// `total_income - total_expense`.
    pub net_balance: Decimal,
    /// Totals per date, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_day: Option<Vec<Bucket>>,
    /// Totals per month, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_month: Option<Vec<Bucket>>,
    /// Totals per year, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_year: Option<Vec<Bucket>>,
    /// Totals per kind, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_kind: Option<Vec<Bucket>>,
}

impl AggregationResult {
    /// Total `transactions` and compute each grouping in `groupings`.
    pub fn from_transactions(transactions: &[Transaction], groupings: &[GroupKey]) -> Self {
        let total_income = reduce(
            transactions
                .iter()
                .filter(|t| t.kind == TransactionKind::Income),
            Statistic::Sum,
        );
        let total_expense = reduce(
            transactions
                .iter()
                .filter(|t| t.kind == TransactionKind::Expense),
            Statistic::Sum,
        );

        let mut result = Self {
            total_income,
            total_expense,
            net_balance: total_income - total_expense,
            ..Default::default()
        };

        for &key in groupings {
            let buckets = Some(group_totals(transactions, key));

            match key {
                GroupKey::Day => result.by_day = buckets,
                GroupKey::Month => result.by_month = buckets,
                GroupKey::Year => result.by_year = buckets,
                GroupKey::Kind => result.by_kind = buckets,
            }
        }

        result
    }
}

/// Total `owner`'s income and expenses in `date_range`.
///
/// # Errors
/// Returns [Error::SqlError] if the transactions cannot be read.
pub fn summarize(
    owner: UserID,
    date_range: DatePredicate,
    connection: &Connection,
) -> Result<AggregationResult, Error> {
    summarize_with(
        &TransactionQuery::new(owner).date_range(date_range),
        &[],
        connection,
    )
}

/// Total the transactions selected by `query` and add the requested groupings.
///
/// # Errors
/// Returns an error if the query fails.
pub fn summarize_with(
    query: &TransactionQuery,
    groupings: &[GroupKey],
    connection: &Connection,
) -> Result<AggregationResult, Error> {
    let transactions = query.fetch(connection)?;

    Ok(AggregationResult::from_transactions(
        &transactions,
        groupings,
    ))
}

/// Daily income and expense for the Monday to Sunday week around a date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySeries {
    /// The Monday the series starts on.
    pub start: Date,
    /// Short day names, "Mon" through "Sun".
    pub labels: Vec<&'static str>,
    /// Income per day, zero for days without income.
    pub income: Vec<Decimal>,
    /// Expenses per day, zero for days without expenses.
    pub expense: Vec<Decimal>,
}

/// Build the 7-day chart data for the week containing `reference_date`.
///
/// # Errors
/// Returns [Error::SqlError] if the transactions cannot be read.
pub fn weekly_series(
    owner: UserID,
    reference_date: Date,
    connection: &Connection,
) -> Result<WeeklySeries, Error> {
    let start = start_of_week(reference_date);
    let end = start + Duration::days(DAYS_IN_WEEK as i64 - 1);

    let transactions = TransactionQuery::new(owner)
        .date_range(DatePredicate::between(start, end))
        .fetch(connection)?;

    Ok(WeeklySeries {
        start,
        labels: series_dates(start, DAYS_IN_WEEK)
            .into_iter()
            .map(|date| weekday_label(date.weekday()))
            .collect(),
        income: daily_series(&transactions, TransactionKind::Income, start, DAYS_IN_WEEK),
        expense: daily_series(&transactions, TransactionKind::Expense, start, DAYS_IN_WEEK),
    })
}

fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "Mon",
        Weekday::Tuesday => "Tue",
        Weekday::Wednesday => "Wed",
        Weekday::Thursday => "Thu",
        Weekday::Friday => "Fri",
        Weekday::Saturday => "Sat",
        Weekday::Sunday => "Sun",
    }
}

/// Statistics over every transaction of one kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindStatistics {
    /// The kind the statistics are for.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// How many transactions there are.
    pub count: usize,
    /// The sum of their amounts.
    pub total: Decimal,
    /// The mean amount, rounded to two decimal places.
    pub average: Decimal,
    /// The transaction with the smallest amount, the earliest one on ties.
    pub smallest: Option<Transaction>,
    /// The transaction with the largest amount, the earliest one on ties.
    pub largest: Option<Transaction>,
}

/// Compute [KindStatistics] for `owner`'s transactions of `kind`.
///
/// # Errors
/// Returns [Error::SqlError] if the transactions cannot be read.
pub fn kind_statistics(
    owner: UserID,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<KindStatistics, Error> {
    let transactions = TransactionQuery::new(owner)
        .kind(kind)
        .sort_order(SortOrder::OldestFirst)
        .fetch(connection)?;

    let mut smallest: Option<&Transaction> = None;
    let mut largest: Option<&Transaction> = None;

    for transaction in &transactions {
        if smallest.is_none_or(|current| transaction.amount < current.amount) {
            smallest = Some(transaction);
        }

        if largest.is_none_or(|current| transaction.amount > current.amount) {
            largest = Some(transaction);
        }
    }

    Ok(KindStatistics {
        kind,
        count: transactions.len(),
        total: reduce(&transactions, Statistic::Sum),
        average: reduce(&transactions, Statistic::Average),
        smallest: smallest.cloned(),
        largest: largest.cloned(),
    })
}

/// How many transactions an owner has of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindCount {
    /// The kind being counted.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The number of transactions.
    pub count: usize,
}

/// Count `owner`'s transactions per kind. Kinds without transactions are left out.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn count_by_kind(owner: UserID, connection: &Connection) -> Result<Vec<KindCount>, Error> {
    let mut counts = connection
        .prepare(
            "SELECT kind, COUNT(id) FROM \"transaction\" WHERE user_id = :user_id GROUP BY kind",
        )?
        .query_map(&[(":user_id", &owner.as_i64())], |row| {
            Ok(KindCount {
                kind: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    counts.sort_by_key(|count| count.kind);

    Ok(counts)
}

/// The kinds `owner` has recorded at least one transaction of.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn distinct_kinds(owner: UserID, connection: &Connection) -> Result<Vec<TransactionKind>, Error> {
    Ok(count_by_kind(owner, connection)?
        .into_iter()
        .map(|count| count.kind)
        .collect())
}

/// Count `owner`'s transactions with `min <= amount <= max`.
///
/// # Errors
/// Returns an error if a bound is too large to store or the query fails.
pub fn count_in_amount_range(
    owner: UserID,
    min: Decimal,
    max: Decimal,
    connection: &Connection,
) -> Result<usize, Error> {
    TransactionQuery::new(owner)
        .amount_between(min, max)
        .count(connection)
}

/// `owner`'s transactions dated from `days` days before `today` up to `today`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn transactions_within_last_days(
    owner: UserID,
    days: u32,
    today: Date,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let start = today
        .checked_sub(Duration::days(days.into()))
        .unwrap_or(Date::MIN);

    TransactionQuery::new(owner)
        .date_range(DatePredicate::between(start, today))
        .fetch(connection)
}

/// The total income `owner` recorded for `today`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn today_income(owner: UserID, today: Date, connection: &Connection) -> Result<Decimal, Error> {
    let transactions = TransactionQuery::new(owner)
        .kind(TransactionKind::Income)
        .date_range(DatePredicate::on(today))
        .fetch(connection)?;

    Ok(reduce(&transactions, Statistic::Sum))
}

/// Income and expense totals for each month of `year` that has transactions.
///
/// # Errors
/// Returns [Error::InvalidField] if `year` is out of range, or
/// [Error::SqlError] if the query fails.
pub fn monthly_totals(
    owner: UserID,
    year: i32,
    connection: &Connection,
) -> Result<Vec<Bucket>, Error> {
    let transactions = TransactionQuery::new(owner)
        .date_range(year_bounds(year)?)
        .fetch(connection)?;

    Ok(group_totals(&transactions, GroupKey::Month))
}

/// Income and expense totals for each year that has transactions.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn yearly_totals(owner: UserID, connection: &Connection) -> Result<Vec<Bucket>, Error> {
    let transactions = TransactionQuery::new(owner).fetch(connection)?;

    Ok(group_totals(&transactions, GroupKey::Year))
}

/// The average income and expense per month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonthlyAverages {
    /// The mean of the monthly income totals.
    pub average_monthly_income: Decimal,
    /// The mean of the monthly expense totals.
    pub average_monthly_expense: Decimal,
}

/// Average the monthly income and expense totals of `owner`.
///
/// Each kind is averaged over the months that have at least one transaction
/// of that kind, so a month with only expenses does not lower the income
/// average. A kind with no transactions averages to zero.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn average_monthly_totals(
    owner: UserID,
    connection: &Connection,
) -> Result<MonthlyAverages, Error> {
    Ok(MonthlyAverages {
        average_monthly_income: average_month_total(owner, TransactionKind::Income, connection)?,
        average_monthly_expense: average_month_total(owner, TransactionKind::Expense, connection)?,
    })
}

fn average_month_total(
    owner: UserID,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let transactions = TransactionQuery::new(owner).kind(kind).fetch(connection)?;
    let months = group_totals(&transactions, GroupKey::Month);

    if months.is_empty() {
        return Ok(Decimal::ZERO);
    }

    // Only one kind was fetched, so one of the two totals is always zero.
    let total: Decimal = months
        .iter()
        .map(|month| month.total_income + month.total_expense)
        .sum();
    let mut average = (total / Decimal::from(months.len()))
        .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
    average.rescale(2);

    Ok(average)
}
