use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::{HeaderName, HeaderValue, Method};
use axum_test::{TestRequest, TestServer};
use rusqlite::Connection;

use crate::{AppState, build_router, user::UserID};

/// Sends requests to the full router as one user.
pub(crate) struct TestClient {
    pub server: TestServer,
    pub owner: UserID,
    owner_header: HeaderName,
    db_connection: Arc<Mutex<Connection>>,
}

impl TestClient {
    pub fn new(state: AppState, owner: UserID) -> Self {
        let owner_header =
            HeaderName::try_from(state.owner_header.as_str()).expect("invalid owner header");
        let db_connection = state.db_connection.clone();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        Self {
            server,
            owner,
            owner_header,
            db_connection,
        }
    }

    /// The database behind the server, for arranging and checking state.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.db_connection.lock().expect("Could not acquire database lock")
    }

    pub fn request(&self, method: Method, path: &str) -> TestRequest {
        self.server
            .method(method, path)
            .add_header(self.owner_header.clone(), HeaderValue::from(self.owner.as_i64()))
    }

    pub fn get(&self, path: &str) -> TestRequest {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> TestRequest {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> TestRequest {
        self.request(Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> TestRequest {
        self.request(Method::DELETE, path)
    }
}
