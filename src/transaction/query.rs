//! A closed set of filters for reading one user's transactions.

use std::ops::Bound;

use rusqlite::{Connection, types::Value};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    Error,
    database_id::TransactionId,
    period::DatePredicate,
    transaction::{
        Transaction, TransactionKind,
        core::{TRANSACTION_COLUMNS, amount_to_cents, map_transaction_row},
    },
    user::UserID,
};

/// The order to return transactions in.
///
/// Ties are always broken by creation order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recent date first. Transactions on the same date keep the order
    /// they were created in.
    #[default]
    NewestFirst,
    /// Oldest date first, then creation order.
    OldestFirst,
    /// Smallest amount first.
    AmountAscending,
    /// Largest amount first.
    AmountDescending,
}

/// Builds an owner-scoped query over the transaction table.
///
/// Every filter narrows the result. Filters that are not set do not restrict
/// anything, so `TransactionQuery::new(owner)` selects every transaction the
/// owner has.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQuery {
    owner: UserID,
    kinds: Vec<TransactionKind>,
    excluded_kinds: Vec<TransactionKind>,
    date_range: DatePredicate,
    min_amount: Bound<Decimal>,
    max_amount: Bound<Decimal>,
    title_keyword: Option<String>,
    ids: Option<Vec<TransactionId>>,
    has_notes: Option<bool>,
    sort_order: SortOrder,
    limit: Option<u64>,
    offset: u64,
}

impl TransactionQuery {
    /// Select all of `owner`'s transactions.
    pub fn new(owner: UserID) -> Self {
        Self {
            owner,
            kinds: Vec::new(),
            excluded_kinds: Vec::new(),
            date_range: DatePredicate::all(),
            min_amount: Bound::Unbounded,
            max_amount: Bound::Unbounded,
            title_keyword: None,
            ids: None,
            has_notes: None,
            sort_order: SortOrder::default(),
            limit: None,
            offset: 0,
        }
    }

    /// The user the query is scoped to.
    pub fn owner(&self) -> UserID {
        self.owner
    }

    /// Only select transactions of `kind`. May be called repeatedly to allow
    /// several kinds.
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Only select transactions whose kind is in `kinds`.
    pub fn kinds(mut self, kinds: impl IntoIterator<Item = TransactionKind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    /// Skip transactions of `kind`.
    pub fn exclude_kind(mut self, kind: TransactionKind) -> Self {
        self.excluded_kinds.push(kind);
        self
    }

    /// Only select transactions dated inside `date_range`.
    pub fn date_range(mut self, date_range: DatePredicate) -> Self {
        self.date_range = date_range;
        self
    }

    /// Set the lower bound on the amount.
    pub fn min_amount(mut self, bound: Bound<Decimal>) -> Self {
        self.min_amount = bound;
        self
    }

    /// Set the upper bound on the amount.
    pub fn max_amount(mut self, bound: Bound<Decimal>) -> Self {
        self.max_amount = bound;
        self
    }

    /// Only select transactions with `min <= amount <= max`.
    pub fn amount_between(self, min: Decimal, max: Decimal) -> Self {
        self.min_amount(Bound::Included(min))
            .max_amount(Bound::Included(max))
    }

    /// Only select transactions whose title contains `keyword`, ignoring
    /// ASCII case.
    pub fn title_contains(mut self, keyword: &str) -> Self {
        self.title_keyword = Some(keyword.to_owned());
        self
    }

    /// Only select the transactions in `ids`.
    pub fn ids(mut self, ids: Vec<TransactionId>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Only select transactions with (`true`) or without (`false`) notes.
    pub fn has_notes(mut self, has_notes: bool) -> Self {
        self.has_notes = Some(has_notes);
        self
    }

    /// Set the order of the results.
    pub fn sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Return at most `limit` transactions.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` matching transactions.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Run the query.
    ///
    /// # Errors
    /// Returns [Error::AmountOutOfRange] if an amount bound cannot be stored
    /// as cents, or [Error::SqlError] if the query fails.
    pub fn fetch(&self, connection: &Connection) -> Result<Vec<Transaction>, Error> {
        let (where_clause, mut params) = self.where_clause()?;

        let order_clause = match self.sort_order {
            SortOrder::NewestFirst => "ORDER BY date DESC, id ASC",
            SortOrder::OldestFirst => "ORDER BY date ASC, id ASC",
            SortOrder::AmountAscending => "ORDER BY amount_cents ASC, id ASC",
            SortOrder::AmountDescending => "ORDER BY amount_cents DESC, id ASC",
        };

        let mut sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE {where_clause} {order_clause}"
        );

        if self.limit.is_some() || self.offset > 0 {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Value::Integer(self.limit.map_or(-1, to_sql_integer)));
            params.push(Value::Integer(to_sql_integer(self.offset)));
        }

        tracing::debug!("fetching transactions: {sql}");

        connection
            .prepare(&sql)?
            .query_map(rusqlite::params_from_iter(params), map_transaction_row)?
            .map(|transaction_result| transaction_result.map_err(Error::SqlError))
            .collect()
    }

    /// Count the matching transactions, ignoring the limit and offset.
    ///
    /// # Errors
    /// Returns [Error::AmountOutOfRange] if an amount bound cannot be stored
    /// as cents, or [Error::SqlError] if the query fails.
    pub fn count(&self, connection: &Connection) -> Result<usize, Error> {
        let (where_clause, params) = self.where_clause()?;

        connection
            .query_row(
                &format!("SELECT COUNT(id) FROM \"transaction\" WHERE {where_clause}"),
                rusqlite::params_from_iter(params),
                |row| row.get(0),
            )
            .map_err(|error| error.into())
    }

    fn where_clause(&self) -> Result<(String, Vec<Value>), Error> {
        let mut clauses = vec!["user_id = ?".to_owned()];
        let mut params = vec![Value::Integer(self.owner.as_i64())];

        if !self.kinds.is_empty() {
            clauses.push(format!("kind IN ({})", placeholders(self.kinds.len())));
            params.extend(kind_values(&self.kinds));
        }

        if !self.excluded_kinds.is_empty() {
            clauses.push(format!(
                "kind NOT IN ({})",
                placeholders(self.excluded_kinds.len())
            ));
            params.extend(kind_values(&self.excluded_kinds));
        }

        if let Some(start) = self.date_range.start {
            clauses.push("date >= ?".to_owned());
            params.push(Value::Text(start.to_string()));
        }

        if let Some(end) = self.date_range.end {
            clauses.push("date <= ?".to_owned());
            params.push(Value::Text(end.to_string()));
        }

        match self.min_amount {
            Bound::Included(amount) => {
                clauses.push("amount_cents >= ?".to_owned());
                params.push(Value::Integer(amount_to_cents(amount)?));
            }
            Bound::Excluded(amount) => {
                clauses.push("amount_cents > ?".to_owned());
                params.push(Value::Integer(amount_to_cents(amount)?));
            }
            Bound::Unbounded => {}
        }

        match self.max_amount {
            Bound::Included(amount) => {
                clauses.push("amount_cents <= ?".to_owned());
                params.push(Value::Integer(amount_to_cents(amount)?));
            }
            Bound::Excluded(amount) => {
                clauses.push("amount_cents < ?".to_owned());
                params.push(Value::Integer(amount_to_cents(amount)?));
            }
            Bound::Unbounded => {}
        }

        if let Some(keyword) = &self.title_keyword {
            clauses.push("title LIKE ? ESCAPE '\\'".to_owned());
            params.push(Value::Text(format!("%{}%", escape_like(keyword))));
        }

        match &self.ids {
            Some(ids) if ids.is_empty() => clauses.push("0".to_owned()),
            Some(ids) => {
                clauses.push(format!("id IN ({})", placeholders(ids.len())));
                params.extend(ids.iter().map(|&id| Value::Integer(id)));
            }
            None => {}
        }

        match self.has_notes {
            Some(true) => clauses.push("notes IS NOT NULL".to_owned()),
            Some(false) => clauses.push("notes IS NULL".to_owned()),
            None => {}
        }

        Ok((clauses.join(" AND "), params))
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn kind_values(kinds: &[TransactionKind]) -> impl Iterator<Item = Value> + '_ {
    kinds
        .iter()
        .map(|kind| Value::Text(kind.as_str().to_owned()))
}

fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());

    for character in keyword.chars() {
        if matches!(character, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(character);
    }

    escaped
}

fn to_sql_integer(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use std::ops::Bound;

    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        period::DatePredicate,
        test_utils::{create_test_user, get_test_connection},
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::{SortOrder, TransactionQuery};

    fn titles(transactions: &[Transaction]) -> Vec<&str> {
        transactions.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn only_returns_owners_transactions() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        for (owner, title) in [(alice, "mine"), (bob, "theirs")] {
            create_transaction(
                Transaction::build(
                    owner,
                    title,
                    Decimal::ONE,
                    TransactionKind::Income,
                    date!(2024 - 01 - 01),
                ),
                &conn,
            )
            .unwrap();
        }

        let got = TransactionQuery::new(alice).fetch(&conn).unwrap();

        assert_eq!(titles(&got), ["mine"]);
    }

    #[test]
    fn orders_by_date_then_creation() {
        let conn = get_test_connection();
        let owner = create_test_user("alice", &conn);
        for (title, date) in [
            ("old", date!(2024 - 01 - 01)),
            ("new a", date!(2024 - 01 - 02)),
            ("new b", date!(2024 - 01 - 02)),
        ] {
            create_transaction(
                Transaction::build(owner, title, Decimal::ONE, TransactionKind::Expense, date),
                &conn,
            )
            .unwrap();
        }

        let newest = TransactionQuery::new(owner).fetch(&conn).unwrap();
        let oldest = TransactionQuery::new(owner)
            .sort_order(SortOrder::OldestFirst)
            .fetch(&conn)
            .unwrap();

        assert_eq!(titles(&newest), ["new a", "new b", "old"]);
        assert_eq!(titles(&oldest), ["old", "new a", "new b"]);
    }

    #[test]
    fn orders_by_amount_then_creation() {
        let conn = get_test_connection();
        let owner = create_test_user("alice", &conn);
        for (title, cents) in [("ten", 10_00), ("five", 5_00), ("also ten", 10_00)] {
            create_transaction(
                Transaction::build(
                    owner,
                    title,
                    Decimal::new(cents, 2),
                    TransactionKind::Expense,
                    date!(2024 - 01 - 01),
                ),
                &conn,
            )
            .unwrap();
        }

        let ascending = TransactionQuery::new(owner)
            .sort_order(SortOrder::AmountAscending)
            .fetch(&conn)
            .unwrap();
        let descending = TransactionQuery::new(owner)
            .sort_order(SortOrder::AmountDescending)
            .fetch(&conn)
            .unwrap();

        assert_eq!(titles(&ascending), ["five", "ten", "also ten"]);
        assert_eq!(titles(&descending), ["ten", "also ten", "five"]);
    }

    #[test]
    fn combines_filters() {
        let conn = get_test_connection();
        let owner = create_test_user("alice", &conn);
        for (title, cents, kind, date, notes) in [
            ("Coffee", 450, TransactionKind::Expense, date!(2024 - 01 - 05), None),
            ("Coffee beans", 2200, TransactionKind::Expense, date!(2024 - 01 - 06), Some("1kg")),
            ("Coffee refund", 450, TransactionKind::Income, date!(2024 - 01 - 07), None),
            ("Rent", 50000, TransactionKind::Expense, date!(2024 - 01 - 08), None),
            ("Coffee", 450, TransactionKind::Expense, date!(2024 - 02 - 01), None),
        ] {
            create_transaction(
                Transaction::build(owner, title, Decimal::new(cents, 2), kind, date)
                    .notes(notes.map(str::to_owned)),
                &conn,
            )
            .unwrap();
        }

        let query = TransactionQuery::new(owner)
            .kind(TransactionKind::Expense)
            .date_range(DatePredicate::between(
                date!(2024 - 01 - 01),
                date!(2024 - 01 - 31),
            ))
            .title_contains("coffee");

        assert_eq!(
            titles(&query.fetch(&conn).unwrap()),
            ["Coffee beans", "Coffee"]
        );
        assert_eq!(
            titles(&query.clone().has_notes(false).fetch(&conn).unwrap()),
            ["Coffee"]
        );
        assert_eq!(
            titles(
                &query
                    .max_amount(Bound::Excluded(Decimal::new(450, 2)))
                    .fetch(&conn)
                    .unwrap()
            ),
            Vec::<&str>::new()
        );
    }

    #[test]
    fn amount_bounds_are_inclusive() {
        let conn = get_test_connection();
        let owner = create_test_user("alice", &conn);
        for cents in [999, 1000, 2000, 2001] {
            create_transaction(
                Transaction::build(
                    owner,
                    &cents.to_string(),
                    Decimal::new(cents, 2),
                    TransactionKind::Expense,
                    date!(2024 - 01 - 01),
                ),
                &conn,
            )
            .unwrap();
        }

        let count = TransactionQuery::new(owner)
            .amount_between(Decimal::TEN, Decimal::from(20))
            .count(&conn)
            .unwrap();

        assert_eq!(count, 2);
    }

    #[test]
    fn keyword_wildcards_are_literal() {
        let conn = get_test_connection();
        let owner = create_test_user("alice", &conn);
        for title in ["100% juice", "1000 apples"] {
            create_transaction(
                Transaction::build(
                    owner,
                    title,
                    Decimal::ONE,
                    TransactionKind::Expense,
                    date!(2024 - 01 - 01),
                ),
                &conn,
            )
            .unwrap();
        }

        let got = TransactionQuery::new(owner)
            .title_contains("100%")
            .fetch(&conn)
            .unwrap();

        assert_eq!(titles(&got), ["100% juice"]);
    }

    #[test]
    fn excluded_kinds_and_id_sets() {
        let conn = get_test_connection();
        let owner = create_test_user("alice", &conn);
        let income = create_transaction(
            Transaction::build(
                owner,
                "Pay",
                Decimal::ONE,
                TransactionKind::Income,
                date!(2024 - 01 - 01),
            ),
            &conn,
        )
        .unwrap();
        let expense = create_transaction(
            Transaction::build(
                owner,
                "Lunch",
                Decimal::ONE,
                TransactionKind::Expense,
                date!(2024 - 01 - 01),
            ),
            &conn,
        )
        .unwrap();

        let without_income = TransactionQuery::new(owner)
            .exclude_kind(TransactionKind::Income)
            .fetch(&conn)
            .unwrap();
        let by_id = TransactionQuery::new(owner)
            .ids(vec![income.id])
            .fetch(&conn)
            .unwrap();
        let empty_ids = TransactionQuery::new(owner).ids(vec![]).count(&conn).unwrap();

        assert_eq!(without_income, vec![expense]);
        assert_eq!(by_id, vec![income]);
        assert_eq!(empty_ids, 0);
    }

    #[test]
    fn limit_and_offset_page_results() {
        let conn = get_test_connection();
        let owner = create_test_user("alice", &conn);
        for day in 1..=5u8 {
            create_transaction(
                Transaction::build(
                    owner,
                    &format!("day {day}"),
                    Decimal::ONE,
                    TransactionKind::Expense,
                    time::Date::from_calendar_date(2024, time::Month::January, day).unwrap(),
                ),
                &conn,
            )
            .unwrap();
        }

        let page = TransactionQuery::new(owner)
            .limit(2)
            .offset(1)
            .fetch(&conn)
            .unwrap();
        let skipped = TransactionQuery::new(owner).offset(3).fetch(&conn).unwrap();

        assert_eq!(titles(&page), ["day 4", "day 3"]);
        assert_eq!(titles(&skipped), ["day 2", "day 1"]);
        assert_eq!(TransactionQuery::new(owner).limit(2).count(&conn), Ok(5));
    }
}
