#![allow(missing_docs)]

pub(crate) mod http;

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::Date;

use crate::{
    AppState,
    db::initialize,
    transaction::{Transaction, TransactionKind, create_transaction},
    user::{UserID, create_user},
};

pub(crate) use http::TestClient;

/// An in-memory database with every table created.
pub(crate) fn get_test_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&conn).expect("Could not initialize database");
    conn
}

#[track_caller]
pub(crate) fn create_test_user(username: &str, connection: &Connection) -> UserID {
    create_user(username, connection)
        .expect("Could not create test user")
        .id
}

/// Insert a transaction of `cents` minor units.
#[track_caller]
pub(crate) fn insert_transaction(
    owner: UserID,
    title: &str,
    cents: i64,
    kind: TransactionKind,
    date: Date,
    connection: &Connection,
) -> Transaction {
    create_transaction(
        Transaction::build(owner, title, Decimal::new(cents, 2), kind, date),
        connection,
    )
    .expect("Could not create test transaction")
}

/// App state over an in-memory database in UTC.
pub(crate) fn get_test_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    AppState::new(connection, "Etc/UTC").expect("Could not create app state")
}
