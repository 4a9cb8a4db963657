//! Endpoints for reading and replacing a single transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::Form;

use crate::{
    Error,
    database_id::TransactionId,
    transaction::{
        core::{get_transaction, update_transaction},
        form::TransactionForm,
        state::TransactionState,
    },
    user::UserID,
};

/// A route handler for getting one of the user's transactions as JSON.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_transaction(user_id, transaction_id, &connection).map(Json)
}

/// A route handler for replacing a transaction with a validated form.
///
/// A form without a date keeps the transaction's stored date.
pub async fn edit_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    Form(form): Form<TransactionForm>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let existing = get_transaction(user_id, transaction_id, &connection)?;
    let builder = form.validate(user_id, existing.date)?;

    let transaction = update_transaction(transaction_id, builder, &connection).inspect_err(
        |error| tracing::warn!("could not update transaction {transaction_id}: {error}"),
    )?;

    tracing::info!("user {user_id} updated transaction {transaction_id}");

    Ok(Json(transaction))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{TestClient, create_test_user, get_test_state, insert_transaction},
        transaction::{Transaction, TransactionKind, get_transaction},
    };

    #[tokio::test]
    async fn gets_own_transaction() {
        let state = get_test_state();
        let (owner, transaction) = {
            let connection = state.db_connection.lock().unwrap();
            let owner = create_test_user("alice", &connection);
            let transaction = insert_transaction(
                owner,
                "Pay",
                100_00,
                TransactionKind::Income,
                date!(2024 - 01 - 01),
                &connection,
            );
            (owner, transaction)
        };
        let client = TestClient::new(state, owner);

        let response = client
            .get(&format_endpoint(endpoints::TRANSACTION, transaction.id))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Transaction>(), transaction);
    }

    #[tokio::test]
    async fn other_users_transaction_is_not_found() {
        let state = get_test_state();
        let (bob, transaction) = {
            let connection = state.db_connection.lock().unwrap();
            let alice = create_test_user("alice", &connection);
            let bob = create_test_user("bob", &connection);
            let transaction = insert_transaction(
                alice,
                "Pay",
                100_00,
                TransactionKind::Income,
                date!(2024 - 01 - 01),
                &connection,
            );
            (bob, transaction)
        };
        let client = TestClient::new(state, bob);
        let path = format_endpoint(endpoints::TRANSACTION, transaction.id);

        client.get(&path).await.assert_status(StatusCode::NOT_FOUND);
        client
            .put(&path)
            .form(&[("title", "Mine now"), ("amount", "1"), ("type", "income")])
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn edit_replaces_fields() {
        let state = get_test_state();
        let (owner, transaction) = {
            let connection = state.db_connection.lock().unwrap();
            let owner = create_test_user("alice", &connection);
            let transaction = insert_transaction(
                owner,
                "Lunch",
                12_00,
                TransactionKind::Expense,
                date!(2024 - 01 - 01),
                &connection,
            );
            (owner, transaction)
        };
        let client = TestClient::new(state, owner);

        let response = client
            .put(&format_endpoint(endpoints::TRANSACTION, transaction.id))
            .form(&[
                ("title", "Dinner"),
                ("amount", "30.5"),
                ("type", "expense"),
                ("date", "2024-01-03"),
                ("notes", "with friends"),
            ])
            .await;

        response.assert_status_ok();
        let stored = get_transaction(owner, transaction.id, &client.connection()).unwrap();
        assert_eq!(stored.title, "Dinner");
        assert_eq!(stored.amount, Decimal::new(3050, 2));
        assert_eq!(stored.date, date!(2024 - 01 - 03));
        assert_eq!(stored.notes.as_deref(), Some("with friends"));
    }

    #[tokio::test]
    async fn edit_validates_form() {
        let state = get_test_state();
        let (owner, transaction) = {
            let connection = state.db_connection.lock().unwrap();
            let owner = create_test_user("alice", &connection);
            let transaction = insert_transaction(
                owner,
                "Lunch",
                12_00,
                TransactionKind::Expense,
                date!(2024 - 01 - 01),
                &connection,
            );
            (owner, transaction)
        };
        let client = TestClient::new(state, owner);

        let response = client
            .put(&format_endpoint(endpoints::TRANSACTION, transaction.id))
            .form(&[("title", ""), ("amount", "30.5"), ("type", "expense")])
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            get_transaction(owner, transaction.id, &client.connection()),
            Ok(transaction)
        );
    }

    #[tokio::test]
    async fn edit_without_date_keeps_stored_date() {
        let state = get_test_state();
        let (owner, transaction) = {
            let connection = state.db_connection.lock().unwrap();
            let owner = create_test_user("alice", &connection);
            let transaction = insert_transaction(
                owner,
                "Lunch",
                12_00,
                TransactionKind::Expense,
                date!(2024 - 01 - 01),
                &connection,
            );
            (owner, transaction)
        };
        let client = TestClient::new(state, owner);

        client
            .put(&format_endpoint(endpoints::TRANSACTION, transaction.id))
            .form(&[("title", "Brunch"), ("amount", "14"), ("type", "expense")])
            .await
            .assert_status_ok();

        let stored = get_transaction(owner, transaction.id, &client.connection()).unwrap();
        assert_eq!(stored.title, "Brunch");
        assert_eq!(stored.date, date!(2024 - 01 - 01));
    }
}
