//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::{
    AppState,
    aggregation::{
        get_average_summary, get_monthly_summary, get_statistics, get_summary, get_yearly_summary,
    },
    dashboard::{get_dashboard, get_dashboard_summary},
    endpoints,
    identity::identify_owner,
    logging::logging_middleware,
    report::{download_dashboard_report, export_csv, export_pdf},
    transaction::{
        bulk_create_transactions_endpoint, create_transaction_endpoint,
        delete_transaction_endpoint, delete_transactions_endpoint, edit_transaction_endpoint,
        get_transaction_endpoint, list_transactions_endpoint, today_income_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Every route requires the owner header, see [identify_owner].
pub fn build_router(state: AppState) -> Router {
    let transaction_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::BULK_TRANSACTIONS,
            post(bulk_create_transactions_endpoint),
        )
        .route(
            endpoints::DELETE_TRANSACTIONS,
            post(delete_transactions_endpoint),
        )
        .route(endpoints::TODAY_INCOME, get(today_income_endpoint))
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(edit_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        );

    let summary_routes = Router::new()
        .route(endpoints::SUMMARY, get(get_summary))
        .route(endpoints::MONTHLY_SUMMARY, get(get_monthly_summary))
        .route(endpoints::YEARLY_SUMMARY, get(get_yearly_summary))
        .route(endpoints::AVERAGE_SUMMARY, get(get_average_summary))
        .route(endpoints::STATISTICS, get(get_statistics))
        .route(endpoints::DASHBOARD, get(get_dashboard))
        .route(endpoints::DASHBOARD_SUMMARY, get(get_dashboard_summary));

    let download_routes = Router::new()
        .route(endpoints::EXPORT_CSV, get(export_csv))
        .route(endpoints::EXPORT_PDF, get(export_pdf))
        .route(endpoints::DASHBOARD_DOWNLOAD, get(download_dashboard_report));

    transaction_routes
        .merge(summary_routes)
        .merge(download_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), identify_owner))
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

async fn get_404_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "The requested resource could not be found." })),
    )
}
