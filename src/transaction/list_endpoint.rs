//! Endpoints for reading transactions in bulk.

use std::ops::Bound;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use axum_extra::extract::Query;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::Date;

use crate::{
    Error,
    aggregation::today_income,
    period::DatePredicate,
    timezone::local_today,
    transaction::{
        SortOrder, Transaction, TransactionKind, TransactionQuery, state::TransactionState,
    },
    user::UserID,
};

/// Filters for listing transactions. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilters {
    /// Only list transactions of this kind.
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<TransactionKind>,
    /// Earliest date, inclusive.
    pub start_date: Option<Date>,
    /// Latest date, inclusive.
    pub end_date: Option<Date>,
    /// Case-insensitive substring of the title.
    pub keyword: Option<String>,
    /// Smallest amount, inclusive.
    pub min_amount: Option<Decimal>,
    /// Largest amount, inclusive.
    pub max_amount: Option<Decimal>,
    /// Maximum number of transactions to return.
    pub limit: Option<u64>,
    /// Number of matching transactions to skip.
    pub offset: Option<u64>,
    /// The order to list transactions in, newest first by default.
    pub sort: Option<SortOrder>,
}

impl TransactionFilters {
    fn to_query(&self, owner: UserID) -> TransactionQuery {
        let mut query = TransactionQuery::new(owner).date_range(DatePredicate {
            start: self.start_date,
            end: self.end_date,
        });

        if let Some(kind) = self.kind {
            query = query.kind(kind);
        }

        if let Some(keyword) = self.keyword.as_deref().filter(|keyword| !keyword.is_empty()) {
            query = query.title_contains(keyword);
        }

        if let Some(min) = self.min_amount {
            query = query.min_amount(Bound::Included(min));
        }

        if let Some(max) = self.max_amount {
            query = query.max_amount(Bound::Included(max));
        }

        if let Some(sort) = self.sort {
            query = query.sort_order(sort);
        }

        query
    }
}

/// A page of transactions.
#[derive(Debug, Serialize)]
pub struct TransactionList {
    /// How many transactions match the filters, ignoring `limit` and `offset`.
    pub total: usize,
    /// The matching transactions in the requested order.
    pub transactions: Vec<Transaction>,
}

/// A route handler for listing the user's transactions.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(filters): Query<TransactionFilters>,
) -> Result<impl IntoResponse, Error> {
    let query = filters.to_query(user_id);
    tracing::debug!("listing transactions with {query:?}");

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let total = query.count(&connection)?;

    let mut page = query;
    if let Some(limit) = filters.limit {
        page = page.limit(limit);
    }
    if let Some(offset) = filters.offset {
        page = page.offset(offset);
    }

    let transactions = page.fetch(&connection)?;

    Ok(Json(TransactionList {
        total,
        transactions,
    }))
}

/// A route handler for the total income recorded for the local date.
pub async fn today_income_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<impl IntoResponse, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let total = today_income(user_id, today, &connection)?;

    Ok(Json(json!({
        "today_income": total,
        "date": today,
    })))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::Value;
    use time::{OffsetDateTime, macros::date};

    use crate::{
        endpoints,
        test_utils::{TestClient, create_test_user, get_test_state, insert_transaction},
        transaction::TransactionKind,
    };

    fn seeded_client() -> TestClient {
        let state = get_test_state();
        let owner = {
            let conn = state.db_connection.lock().unwrap();
            let owner = create_test_user("alice", &conn);
            let other = create_test_user("bob", &conn);
            insert_transaction(owner, "Coffee beans", 18_50, TransactionKind::Expense, date!(2024 - 02 - 01), &conn);
            insert_transaction(owner, "Salary", 4000_00, TransactionKind::Income, date!(2024 - 02 - 15), &conn);
            insert_transaction(owner, "Coffee", 4_20, TransactionKind::Expense, date!(2024 - 03 - 01), &conn);
            insert_transaction(other, "Coffee", 5_00, TransactionKind::Expense, date!(2024 - 03 - 01), &conn);
            owner
        };

        TestClient::new(state, owner)
    }

    #[tokio::test]
    async fn lists_own_transactions_newest_first() {
        let client = seeded_client();

        let response = client.get(endpoints::TRANSACTIONS).await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["total"], 3);
        let titles: Vec<&str> = body["transactions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|transaction| transaction["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["Coffee", "Salary", "Coffee beans"]);
    }

    #[tokio::test]
    async fn filters_by_keyword_and_kind() {
        let client = seeded_client();

        let body = client
            .get(endpoints::TRANSACTIONS)
            .add_query_param("keyword", "coffee")
            .add_query_param("type", "expense")
            .add_query_param("min_amount", "10")
            .await
            .json::<Value>();

        assert_eq!(body["total"], 1);
        assert_eq!(body["transactions"][0]["title"], "Coffee beans");
    }

    #[tokio::test]
    async fn limit_and_offset_keep_total() {
        let client = seeded_client();

        let body = client
            .get(endpoints::TRANSACTIONS)
            .add_query_param("limit", 1)
            .add_query_param("offset", 1)
            .await
            .json::<Value>();

        assert_eq!(body["total"], 3);
        assert_eq!(body["transactions"].as_array().unwrap().len(), 1);
        assert_eq!(body["transactions"][0]["title"], "Salary");
    }

    #[tokio::test]
    async fn sorts_by_amount() {
        let client = seeded_client();

        let body = client
            .get(endpoints::TRANSACTIONS)
            .add_query_param("sort", "amount_descending")
            .await
            .json::<Value>();

        assert_eq!(body["transactions"][0]["title"], "Salary");
        assert_eq!(body["transactions"][2]["title"], "Coffee");
    }

    #[tokio::test]
    async fn empty_filters_are_ignored() {
        let client = seeded_client();

        let body = client
            .get(endpoints::TRANSACTIONS)
            .add_query_param("keyword", "")
            .add_query_param("start_date", "")
            .await
            .json::<Value>();

        assert_eq!(body["total"], 3);
    }

    #[tokio::test]
    async fn today_income_sums_income_for_today() {
        let client = seeded_client();
        let today = OffsetDateTime::now_utc().date();
        {
            let conn = client.connection();
            insert_transaction(client.owner, "Tips", 12_00, TransactionKind::Income, today, &conn);
            insert_transaction(client.owner, "Gift", 8_00, TransactionKind::Income, today, &conn);
            insert_transaction(client.owner, "Lunch", 15_00, TransactionKind::Expense, today, &conn);
        }

        let body = client.get(endpoints::TODAY_INCOME).await.json::<Value>();

        let total: Decimal = serde_json::from_value(body["today_income"].clone()).unwrap();
        assert_eq!(total, Decimal::from(20));
    }
}
