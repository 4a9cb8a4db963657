//! Vetri Finance is a personal finance service for recording income and
//! expenses.
//!
//! This library provides the ledger store, the aggregation and reporting
//! engine, and a JSON/file-download API over them. Authentication happens
//! upstream: every route expects the owner to be identified by a trusted
//! header set by the authenticating proxy.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use rust_decimal::Decimal;
use serde_json::json;
use tokio::signal;

mod aggregation;
mod app_state;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod identity;
mod logging;
mod period;
mod report;
mod routing;
mod timezone;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use aggregation::{
    AggregationResult, Bucket, BucketKey, GroupKey, GroupValue, Statistic, WeeklySeries,
    reduce, reduce_grouped, summarize, summarize_with, transactions_within_last_days,
    weekly_series,
};
pub use app_state::{AppState, ReportConfig};
pub use dashboard::{DashboardFilters, DashboardViewModel, PeriodSummary, build as build_dashboard};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use period::{DatePredicate, Period};
pub use report::{ReportFormat, ReportLayout, render};
pub use routing::build_router;
pub use timezone::get_local_offset;
pub use transaction::{
    SortOrder, Transaction, TransactionBuilder, TransactionKind, TransactionQuery,
    bulk_create_transactions, create_transaction,
};
pub use user::{User, UserID, count_users, create_user, delete_user, get_user_by_id};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A field submitted by the client failed validation.
    ///
    /// The client should correct `field` and resubmit the request.
    #[error("{field}: {message}")]
    InvalidField {
        /// The name of the offending field, as it appears in the request.
        field: &'static str,
        /// A message describing how to fix the field.
        message: String,
    },

    /// An amount could not be stored as a whole number of cents.
    #[error("the amount {0} is too large to store")]
    AmountOutOfRange(Decimal),

    /// The user ID used to create or query a transaction does not refer to a
    /// registered user.
    #[error("the user ID {0} does not refer to a registered user")]
    InvalidOwner(UserID),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource belongs to them.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a transaction that does not exist or belongs to
    /// another user.
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete one or more transactions that do not exist or belong
    /// to another user. Nothing was deleted.
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// A CSV or PDF report could not be written.
    #[error("could not render the report: {0}")]
    ReportRenderError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidField { .. } | Error::AmountOutOfRange(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::InvalidOwner(_)
            | Error::NotFound
            | Error::UpdateMissingTransaction
            | Error::DeleteMissingTransaction => StatusCode::NOT_FOUND,
            Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::InvalidTimezoneError(_)
            | Error::ReportRenderError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            Error::InvalidField { field, message } => json!({
                "error": message,
                "field": field,
            }),
            Error::AmountOutOfRange(_) => json!({
                "error": self.to_string(),
                "field": "amount",
            }),
            // Any errors that are not handled above are not intended to be shown to the client.
            error if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("An unexpected error occurred: {}", error);
                json!({
                    "error": "An unexpected error occurred, check the server logs for more details.",
                })
            }
            error => json!({ "error": error.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use serde_json::Value;

    use crate::Error;

    async fn body_json(error: Error) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_names_field() {
        let (status, body) = body_json(Error::InvalidField {
            field: "amount",
            message: "Amount must be greater than zero.".to_owned(),
        })
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "amount");
        assert_eq!(body["error"], "Amount must be greater than zero.");
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let (status, _) = body_json(Error::DeleteMissingTransaction).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn internal_errors_are_not_shown_to_client() {
        let (status, body) = body_json(Error::ReportRenderError("disk full".to_owned())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().contains("disk full"));
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }
}
