//! Endpoints for deleting one or many transactions.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::TransactionId,
    transaction::{
        core::{delete_transaction, delete_transactions},
        state::TransactionState,
    },
    user::UserID,
};

/// A route handler for deleting one transaction, responds with `204 No Content`.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_transaction(user_id, transaction_id, &connection).inspect_err(|error| {
        tracing::warn!("Could not delete transaction {transaction_id}: {error}")
    })?;

    tracing::info!("user {user_id} deleted transaction {transaction_id}");

    Ok(StatusCode::NO_CONTENT)
}

/// The body of a bulk delete request.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteTransactionsRequest {
    /// The transactions to delete.
    pub ids: Vec<TransactionId>,
}

/// The result of a bulk delete.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct DeleteTransactionsResponse {
    /// How many transactions were deleted.
    pub deleted: usize,
}

/// A route handler for deleting a set of transactions.
///
/// If any ID is missing or belongs to another user nothing is deleted and
/// the response is `404 Not Found`.
pub async fn delete_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<DeleteTransactionsRequest>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let deleted = delete_transactions(user_id, &request.ids, &connection)
        .inspect_err(|error| tracing::warn!("Could not delete transactions: {error}"))?;

    tracing::info!("user {user_id} deleted {deleted} transactions");

    Ok(Json(DeleteTransactionsResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use time::macros::date;

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{TestClient, create_test_user, get_test_state, insert_transaction},
        transaction::{TransactionKind, count_transactions},
    };

    use super::{DeleteTransactionsRequest, DeleteTransactionsResponse};

    #[tokio::test]
    async fn deletes_transaction() {
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
        let path = format_endpoint(endpoints::TRANSACTION, transaction.id);

        client
            .delete(&path)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        client
            .delete(&path)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bulk_delete_with_foreign_id_changes_nothing() {
        let state = get_test_state();
        let (alice, bob, ids) = {
            let connection = state.db_connection.lock().unwrap();
            let alice = create_test_user("alice", &connection);
            let bob = create_test_user("bob", &connection);
            let mine = insert_transaction(
                alice,
                "Lunch",
                12_00,
                TransactionKind::Expense,
                date!(2024 - 01 - 01),
                &connection,
            );
            let theirs = insert_transaction(
                bob,
                "Rent",
                900_00,
                TransactionKind::Expense,
                date!(2024 - 01 - 01),
                &connection,
            );
            (alice, bob, vec![mine.id, theirs.id])
        };
        let client = TestClient::new(state, alice);

        client
            .post(endpoints::DELETE_TRANSACTIONS)
            .json(&DeleteTransactionsRequest { ids })
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let connection = client.connection();
        assert_eq!(count_transactions(alice, &connection), Ok(1));
        assert_eq!(count_transactions(bob, &connection), Ok(1));
    }

    #[tokio::test]
    async fn bulk_delete_reports_count() {
        let state = get_test_state();
        let (owner, ids) = {
            let connection = state.db_connection.lock().unwrap();
            let owner = create_test_user("alice", &connection);
            let ids = (0..3)
                .map(|i| {
                    insert_transaction(
                        owner,
                        &format!("#{i}"),
                        1_00,
                        TransactionKind::Expense,
                        date!(2024 - 01 - 01),
                        &connection,
                    )
                    .id
                })
                .collect();
            (owner, ids)
        };
        let client = TestClient::new(state, owner);

        let response = client
            .post(endpoints::DELETE_TRANSACTIONS)
            .json(&DeleteTransactionsRequest { ids })
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<DeleteTransactionsResponse>(),
            DeleteTransactionsResponse { deleted: 3 }
        );
    }
}
