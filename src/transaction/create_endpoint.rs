//! Defines the endpoints for creating transactions.

use axum::{
    Extension, Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    endpoints::{self, format_endpoint},
    timezone::local_today,
    transaction::{
        Transaction, TransactionKind, bulk_create_transactions, core::create_transaction,
        form::TransactionForm, state::TransactionState,
    },
    user::UserID,
};

/// A route handler for creating a new transaction from a form.
///
/// Responds with `201 Created` and the new transaction as JSON.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<TransactionForm>,
) -> Result<impl IntoResponse, Error> {
    let today = local_today(&state.local_timezone)?;
    let builder = form.validate(user_id, today)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = create_transaction(builder, &connection)
        .inspect_err(|error| tracing::error!("could not create transaction: {error}"))?;

    tracing::info!("user {user_id} created transaction {}", transaction.id);

    Ok((
        StatusCode::CREATED,
        [(
            header::LOCATION,
            format_endpoint(endpoints::TRANSACTION, transaction.id),
        )],
        Json(transaction),
    ))
}

/// One transaction in a bulk create request.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkTransaction {
    /// A short label for the transaction.
    pub title: String,
    /// The amount of money.
    pub amount: Decimal,
    /// Whether the money was earned or spent.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// When the transaction happened, defaults to today.
    #[serde(default)]
    pub date: Option<Date>,
    /// Optional free text notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// A route handler for creating many transactions from a JSON array.
///
/// Entries are stored as given: they are not validated like form
/// submissions. Either every entry is created or none are.
pub async fn bulk_create_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(entries): Json<Vec<BulkTransaction>>,
) -> Result<impl IntoResponse, Error> {
    let today = local_today(&state.local_timezone)?;

    let builders = entries
        .into_iter()
        .map(|entry| {
            Transaction::build(
                user_id,
                &entry.title,
                entry.amount,
                entry.kind,
                entry.date.unwrap_or(today),
            )
            .notes(entry.notes)
        })
        .collect();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = bulk_create_transactions(builders, &connection)
        .inspect_err(|error| tracing::error!("could not bulk create transactions: {error}"))?;

    tracing::info!("user {user_id} created {} transactions", transactions.len());

    Ok((StatusCode::CREATED, Json(transactions)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::json;
    use time::OffsetDateTime;

    use crate::{
        endpoints,
        test_utils::{TestClient, create_test_user, get_test_state},
        transaction::{Transaction, TransactionKind, count_transactions, get_transaction},
    };

    fn test_client() -> TestClient {
        let state = get_test_state();
        let owner = create_test_user("alice", &state.db_connection.lock().unwrap());

        TestClient::new(state, owner)
    }

    #[tokio::test]
    async fn can_create_transaction() {
        let client = test_client();

        let response = client
            .post(endpoints::TRANSACTIONS)
            .form(&[
                ("title", "Groceries"),
                ("amount", "45.90"),
                ("type", "expense"),
                ("date", "2024-03-02"),
                ("notes", ""),
            ])
            .await;

        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.header("location"), "/api/transactions/1");
        let transaction = response.json::<Transaction>();
        assert_eq!(transaction.title, "Groceries");
        assert_eq!(transaction.amount, Decimal::new(4590, 2));
        assert_eq!(transaction.kind, TransactionKind::Expense);
        assert_eq!(transaction.notes, None);
    }

    #[tokio::test]
    async fn missing_date_defaults_to_today() {
        let client = test_client();

        let transaction = client
            .post(endpoints::TRANSACTIONS)
            .form(&[("title", "Pay"), ("amount", "10"), ("type", "income")])
            .await
            .json::<Transaction>();

        assert_eq!(transaction.date, OffsetDateTime::now_utc().date());
    }

    #[tokio::test]
    async fn invalid_amount_is_rejected_with_field() {
        let client = test_client();

        let response = client
            .post(endpoints::TRANSACTIONS)
            .form(&[("title", "Refund"), ("amount", "-5"), ("type", "income")])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<serde_json::Value>()["field"], "amount");
        let connection = client.connection();
        assert_eq!(count_transactions(client.owner, &connection), Ok(0));
    }

    #[tokio::test]
    async fn bulk_create_stores_every_entry() {
        let client = test_client();

        let response = client
            .post(endpoints::BULK_TRANSACTIONS)
            .json(&json!([
                {"title": "Rent", "amount": "1200.00", "type": "expense", "date": "2024-01-01"},
                {"title": "Pay", "amount": 3000, "type": "income", "date": "2024-01-02", "notes": "Jan"},
            ]))
            .await;

        response.assert_status(StatusCode::CREATED);
        let created = response.json::<Vec<Transaction>>();
        assert_eq!(created.len(), 2);
        let connection = client.connection();
        let pay = get_transaction(client.owner, created[1].id, &connection).unwrap();
        assert_eq!(pay.amount, Decimal::from(3000));
        assert_eq!(pay.notes.as_deref(), Some("Jan"));
    }
}
