//! In-memory reductions over transactions.
//!
//! Every statistic the service reports is some combination of a [Statistic]
//! and, optionally, a [GroupKey]. All arithmetic is done in [Decimal] so
//! totals are exact.

use std::{collections::BTreeMap, fmt::Display};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use time::{Date, Duration};

use crate::transaction::{Transaction, TransactionKind};

/// A reduction over transaction amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// The total of all amounts.
    Sum,
    /// The mean amount, rounded to two decimal places.
    Average,
    /// The smallest amount.
    Min,
    /// The largest amount.
    Max,
    /// How many transactions there are.
    Count,
}

/// How transactions are split into buckets before reducing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    /// By calendar date.
    Day,
    /// By calendar month.
    Month,
    /// By calendar year.
    Year,
    /// By income or expense.
    Kind,
}

/// The key identifying one bucket of a grouping.
///
/// Keys order chronologically, or income before expense for [GroupKey::Kind].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    /// A single date.
    Day(Date),
    /// A calendar month, `month` is 1 to 12.
    Month {
        /// The year the month is in.
        year: i32,
        /// The month number.
        month: u8,
    },
    /// A calendar year.
    Year(i32),
    /// A transaction kind.
    Kind(TransactionKind),
}

impl BucketKey {
    /// The bucket that `transaction` falls into when grouping by `key`.
    pub fn of(key: GroupKey, transaction: &Transaction) -> Self {
        match key {
            GroupKey::Day => BucketKey::Day(transaction.date),
            GroupKey::Month => BucketKey::Month {
                year: transaction.date.year(),
                month: transaction.date.month() as u8,
            },
            GroupKey::Year => BucketKey::Year(transaction.date.year()),
            GroupKey::Kind => BucketKey::Kind(transaction.kind),
        }
    }
}

impl Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketKey::Day(date) => write!(f, "{date}"),
            BucketKey::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            BucketKey::Year(year) => write!(f, "{year:04}"),
            BucketKey::Kind(kind) => write!(f, "{kind}"),
        }
    }
}

impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Income and expense totals for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    /// Which bucket this is, e.g. "2024-01" for a month.
    pub key: BucketKey,
    /// The sum of income in the bucket.
    pub total_income: Decimal,
    /// The sum of expenses in the bucket.
    pub total_expense: Decimal,
}

/// The value of one statistic for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupValue {
    /// Which bucket this is.
    pub key: BucketKey,
    /// The statistic for the transactions in the bucket.
    pub value: Decimal,
}

/// Reduce the amounts of `transactions` to a single number.
///
/// Empty input gives zero for every statistic.
pub fn reduce<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    statistic: Statistic,
) -> Decimal {
    let mut count = 0u64;
    let mut sum = Decimal::ZERO;
    let mut min: Option<Decimal> = None;
    let mut max: Option<Decimal> = None;

    for transaction in transactions {
        let amount = transaction.amount;
        count += 1;
        sum += amount;
        min = Some(min.map_or(amount, |current| current.min(amount)));
        max = Some(max.map_or(amount, |current| current.max(amount)));
    }

    match statistic {
        Statistic::Sum => sum,
        Statistic::Average if count == 0 => Decimal::ZERO,
        Statistic::Average => (sum / Decimal::from(count))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        Statistic::Min => min.unwrap_or(Decimal::ZERO),
        Statistic::Max => max.unwrap_or(Decimal::ZERO),
        Statistic::Count => Decimal::from(count),
    }
}

/// Reduce each bucket of `transactions` separately.
///
/// Only buckets that contain at least one transaction are returned, in key
/// order.
pub fn reduce_grouped(
    transactions: &[Transaction],
    key: GroupKey,
    statistic: Statistic,
) -> Vec<GroupValue> {
    let mut buckets: BTreeMap<BucketKey, Vec<&Transaction>> = BTreeMap::new();

    for transaction in transactions {
        buckets
            .entry(BucketKey::of(key, transaction))
            .or_default()
            .push(transaction);
    }

    buckets
        .into_iter()
        .map(|(key, members)| GroupValue {
            key,
            value: reduce(members, statistic),
        })
        .collect()
}

/// Sum income and expenses separately for each bucket.
///
/// Only buckets that contain at least one transaction are returned, in key
/// order.
pub fn group_totals(transactions: &[Transaction], key: GroupKey) -> Vec<Bucket> {
    let mut buckets: BTreeMap<BucketKey, Bucket> = BTreeMap::new();

    for transaction in transactions {
        let bucket_key = BucketKey::of(key, transaction);
        let bucket = buckets.entry(bucket_key).or_insert(Bucket {
            key: bucket_key,
            total_income: Decimal::ZERO,
            total_expense: Decimal::ZERO,
        });

        match transaction.kind {
            TransactionKind::Income => bucket.total_income += transaction.amount,
            TransactionKind::Expense => bucket.total_expense += transaction.amount,
        }
    }

    buckets.into_values().collect()
}

/// Sum the amounts of `kind` for each of the `days` days starting at `start`.
///
/// Unlike [group_totals], days without transactions are included as zero so
/// the result always has `days` entries.
pub fn daily_series(
    transactions: &[Transaction],
    kind: TransactionKind,
    start: Date,
    days: usize,
) -> Vec<Decimal> {
    let mut series = vec![Decimal::ZERO; days];

    for transaction in transactions.iter().filter(|t| t.kind == kind) {
        let offset = (transaction.date - start).whole_days();

        if let Some(total) = usize::try_from(offset)
            .ok()
            .and_then(|index| series.get_mut(index))
        {
            *total += transaction.amount;
        }
    }

    series
}

/// The dates covered by [daily_series] for the same `start` and `days`.
pub fn series_dates(start: Date, days: usize) -> Vec<Date> {
    (0..days as i64)
        .map(|offset| start + Duration::days(offset))
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::{OffsetDateTime, macros::date};

    use crate::{
        transaction::{Transaction, TransactionKind},
        user::UserID,
    };

    use super::{
        BucketKey, GroupKey, Statistic, daily_series, group_totals, reduce, reduce_grouped,
        series_dates,
    };

    fn transaction(cents: i64, kind: TransactionKind, date: time::Date) -> Transaction {
        let now = OffsetDateTime::UNIX_EPOCH;
        Transaction {
            id: 0,
            owner: UserID::new(1),
            title: "test".to_owned(),
            amount: Decimal::new(cents, 2),
            kind,
            date,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_input_reduces_to_zero() {
        let none: [Transaction; 0] = [];

        for statistic in [
            Statistic::Sum,
            Statistic::Average,
            Statistic::Min,
            Statistic::Max,
            Statistic::Count,
        ] {
            assert_eq!(reduce(&none, statistic), Decimal::ZERO, "{statistic:?}");
        }
        assert!(reduce_grouped(&none, GroupKey::Day, Statistic::Sum).is_empty());
        assert!(group_totals(&none, GroupKey::Month).is_empty());
    }

    #[test]
    fn reduces_amounts() {
        let transactions = [
            transaction(1000, TransactionKind::Expense, date!(2024 - 01 - 01)),
            transaction(250, TransactionKind::Expense, date!(2024 - 01 - 02)),
            transaction(100, TransactionKind::Income, date!(2024 - 01 - 03)),
        ];

        assert_eq!(reduce(&transactions, Statistic::Sum), Decimal::new(1350, 2));
        assert_eq!(reduce(&transactions, Statistic::Average), Decimal::new(450, 2));
        assert_eq!(reduce(&transactions, Statistic::Min), Decimal::new(100, 2));
        assert_eq!(reduce(&transactions, Statistic::Max), Decimal::new(1000, 2));
        assert_eq!(reduce(&transactions, Statistic::Count), Decimal::from(3));
    }

    #[test]
    fn average_rounds_half_away_from_zero() {
        let transactions = [
            transaction(1, TransactionKind::Expense, date!(2024 - 01 - 01)),
            transaction(2, TransactionKind::Expense, date!(2024 - 01 - 01)),
            transaction(2, TransactionKind::Expense, date!(2024 - 01 - 01)),
            transaction(0, TransactionKind::Expense, date!(2024 - 01 - 01)),
        ];

        // 0.05 / 4 = 0.0125
        assert_eq!(reduce(&transactions, Statistic::Average), Decimal::new(1, 2));
        assert_eq!(
            reduce(&transactions[..2], Statistic::Average),
            Decimal::new(2, 2)
        );
    }

    #[test]
    fn groups_in_key_order() {
        let transactions = [
            transaction(300, TransactionKind::Income, date!(2024 - 02 - 10)),
            transaction(100, TransactionKind::Income, date!(2023 - 12 - 31)),
            transaction(200, TransactionKind::Expense, date!(2024 - 02 - 01)),
        ];

        let by_month = reduce_grouped(&transactions, GroupKey::Month, Statistic::Count);
        let keys: Vec<_> = by_month.iter().map(|group| group.key.to_string()).collect();

        assert_eq!(keys, ["2023-12", "2024-02"]);
        assert_eq!(by_month[1].value, Decimal::from(2));
    }

    #[test]
    fn group_totals_split_income_and_expense() {
        let transactions = [
            transaction(50000, TransactionKind::Income, date!(2024 - 01 - 01)),
            transaction(20000, TransactionKind::Expense, date!(2024 - 01 - 01)),
            transaction(30000, TransactionKind::Income, date!(2024 - 01 - 15)),
        ];

        let by_kind = group_totals(&transactions, GroupKey::Kind);
        let by_day = group_totals(&transactions, GroupKey::Day);

        assert_eq!(by_kind.len(), 2);
        assert_eq!(by_kind[0].key, BucketKey::Kind(TransactionKind::Income));
        assert_eq!(by_kind[0].total_income, Decimal::from(800));
        assert_eq!(by_kind[1].total_expense, Decimal::from(200));
        assert_eq!(by_day.len(), 2);
        assert_eq!(by_day[0].total_income, Decimal::from(500));
        assert_eq!(by_day[0].total_expense, Decimal::from(200));
    }

    #[test]
    fn daily_series_fills_missing_days_with_zero() {
        let monday = date!(2024 - 01 - 15);
        let transactions = [
            transaction(1000, TransactionKind::Income, date!(2024 - 01 - 16)),
            transaction(500, TransactionKind::Income, date!(2024 - 01 - 20)),
            transaction(700, TransactionKind::Expense, date!(2024 - 01 - 20)),
            transaction(900, TransactionKind::Income, date!(2024 - 01 - 22)),
        ];

        let series = daily_series(&transactions, TransactionKind::Income, monday, 7);
        let ad_hoc = group_totals(&transactions[..3], GroupKey::Day);

        assert_eq!(series.len(), 7);
        assert_eq!(
            series,
            [0, 1000, 0, 0, 0, 500, 0].map(|cents| Decimal::new(cents, 2))
        );
        assert_eq!(ad_hoc.len(), 2);
    }

    #[test]
    fn series_dates_are_consecutive() {
        let dates = series_dates(date!(2024 - 02 - 26), 7);

        assert_eq!(dates.first(), Some(&date!(2024 - 02 - 26)));
        assert_eq!(dates.last(), Some(&date!(2024 - 03 - 03)));
    }
}
