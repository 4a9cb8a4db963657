//! Middleware that identifies the owner of each request.
//!
//! Authentication happens before requests reach this service. The
//! authenticating proxy forwards the user's ID in a trusted header, which is
//! checked against the user table here.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    user::{UserID, get_user_by_id},
};

/// The state needed for the identity middleware.
#[derive(Debug, Clone)]
pub struct IdentityState {
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The lowercase name of the header that carries the user ID.
    pub owner_header: String,
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            owner_header: state.owner_header.clone(),
        }
    }
}

/// Middleware function that reads the owner's user ID from the owner header.
///
/// The user ID is placed into the request and the request executed normally if
/// it refers to a registered user, otherwise `401 Unauthorized` is returned.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn identify_owner(
    State(state): State<IdentityState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id = match owner_from_header(&state, &request) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    request.extensions_mut().insert(user_id);
    next.run(request).await
}

fn owner_from_header(state: &IdentityState, request: &Request) -> Result<UserID, Response> {
    let Some(value) = request.headers().get(state.owner_header.as_str()) else {
        tracing::warn!(
            "rejected {} {}: missing {} header",
            request.method(),
            request.uri().path(),
            state.owner_header
        );
        return Err(unauthorized());
    };

    let Some(id) = value
        .to_str()
        .ok()
        .and_then(|text| text.trim().parse::<i64>().ok())
    else {
        tracing::warn!("rejected request with malformed owner ID {value:?}");
        return Err(unauthorized());
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError.into_response())?;

    match get_user_by_id(UserID::new(id), &connection) {
        Ok(user) => Ok(user.id),
        Err(Error::NotFound) => {
            tracing::warn!("rejected request for unknown user {id}");
            Err(unauthorized())
        }
        Err(error) => Err(error.into_response()),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "The request does not identify a registered user." })),
    )
        .into_response()
}
