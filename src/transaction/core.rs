//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, Row, Transaction as SqlTransaction, TransactionBehavior};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{Error, database_id::TransactionId, transaction::TransactionKind, user::UserID};

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that owns the transaction.
    #[serde(rename = "user_id")]
    pub owner: UserID,
    /// A short label for the transaction.
    pub title: String,
    /// The amount of money spent or earned, always to two decimal places.
    pub amount: Decimal,
    /// Whether the money was earned or spent.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// When the transaction happened.
    pub date: Date,
    /// Free text notes, `None` if the user did not write any.
    pub notes: Option<String>,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    pub updated_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        owner: UserID,
        title: &str,
        amount: Decimal,
        kind: TransactionKind,
        date: Date,
    ) -> TransactionBuilder {
        TransactionBuilder {
            owner,
            title: title.to_owned(),
            amount,
            kind,
            date,
            notes: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// The builder holds everything the caller controls. The store assigns the
/// ID and the timestamps when the builder is passed to [create_transaction].
///
/// # Examples
///
/// ```ignore
/// use rust_decimal::Decimal;
/// use time::macros::date;
///
/// let builder = Transaction::build(
///         owner,
///         "Groceries",
///         Decimal::new(4599, 2),
///         TransactionKind::Expense,
///         date!(2025-01-15),
///     )
///     .notes(Some("Weekly shop".to_owned()));
/// let transaction = create_transaction(builder, &connection)?;
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The user that owns the transaction.
    pub owner: UserID,

    /// A short label for the transaction, e.g. "Salary" or "Groceries".
    pub title: String,

    /// The monetary amount of the transaction.
    ///
    /// Amounts are stored as whole cents, so anything past the second decimal
    /// place is rounded half away from zero.
    pub amount: Decimal,

    /// Whether the money was earned or spent.
    pub kind: TransactionKind,

    /// The date when the transaction occurred.
    pub date: Date,

    /// Optional notes. Blank notes are stored as `None`.
    pub notes: Option<String>,
}

impl TransactionBuilder {
    /// Set the notes for the transaction.
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    fn normalised_notes(&self) -> Option<&str> {
        self.notes
            .as_deref()
            .filter(|notes| !notes.trim().is_empty())
    }
}

// ============================================================================
// AMOUNT CONVERSION
// ============================================================================

/// Convert `amount` to a whole number of cents for storage.
///
/// # Errors
/// Returns [Error::AmountOutOfRange] if the amount does not fit in an `i64`.
pub fn amount_to_cents(amount: Decimal) -> Result<i64, Error> {
    amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or(Error::AmountOutOfRange(amount))
}

/// Convert a whole number of cents from the database into an amount.
pub fn cents_to_amount(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, user_id, title, amount_cents, kind, date, notes, created_at, updated_at";

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidOwner] if the builder's owner is not a registered user,
/// - or [Error::AmountOutOfRange] if the amount is too large to store,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount_cents = amount_to_cents(builder.amount)?;
    let now = OffsetDateTime::now_utc();

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" \
             (user_id, title, amount_cents, kind, date, notes, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                builder.owner.as_i64(),
                &builder.title,
                amount_cents,
                builder.kind,
                builder.date,
                builder.normalised_notes(),
                now,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidOwner(builder.owner),
            error => error.into(),
        })?;

    Ok(transaction)
}

/// Create many transactions at once.
///
/// The builders are inserted in order inside a single SQL transaction, so
/// either all of them are created or none are. Builders are not validated.
///
/// # Errors
/// Returns the first error [create_transaction] returns for any builder.
pub fn bulk_create_transactions(
    builders: Vec<TransactionBuilder>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let transactions = builders
        .into_iter()
        .map(|builder| create_transaction(builder, &sql_transaction))
        .collect::<Result<Vec<_>, _>>()?;

    sql_transaction.commit()?;

    Ok(transactions)
}

/// Retrieve the transaction `id` belonging to `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by `owner`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    owner: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id AND user_id = :user_id"
        ))?
        .query_one(
            &[(":id", &id), (":user_id", &owner.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Replace the fields of transaction `id` with those in `builder`.
///
/// The transaction must belong to `builder.owner`. The store sets
/// `updated_at`; the ID and `created_at` never change.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a transaction
///   owned by `builder.owner`,
/// - or [Error::AmountOutOfRange] if the amount is too large to store,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount_cents = amount_to_cents(builder.amount)?;

    connection
        .prepare(&format!(
            "UPDATE \"transaction\" \
             SET title = ?1, amount_cents = ?2, kind = ?3, date = ?4, notes = ?5, updated_at = ?6 \
             WHERE id = ?7 AND user_id = ?8 \
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                &builder.title,
                amount_cents,
                builder.kind,
                builder.date,
                builder.normalised_notes(),
                OffsetDateTime::now_utc(),
                id,
                builder.owner.as_i64(),
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingTransaction,
            error => error.into(),
        })
}

/// Delete the transaction `id` belonging to `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if `id` does not refer to a transaction
///   owned by `owner`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_transaction(
    owner: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = :id AND user_id = :user_id",
        &[(":id", &id), (":user_id", &owner.as_i64())],
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Delete every transaction in `ids`, all of which must belong to `owner`.
///
/// Duplicate IDs are ignored. If any ID does not refer to a transaction owned
/// by `owner`, nothing is deleted.
///
/// Returns the number of transactions deleted.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if any ID is missing or owned by someone else,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_transactions(
    owner: UserID,
    ids: &[TransactionId],
    connection: &Connection,
) -> Result<usize, Error> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let mut params = Vec::with_capacity(ids.len() + 1);
    params.push(owner.as_i64());
    params.extend(ids.iter().copied());

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let owned_count: usize = sql_transaction.query_row(
        &format!(
            "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = ? AND id IN ({placeholders})"
        ),
        rusqlite::params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    if owned_count != ids.len() {
        tracing::debug!(
            "refusing to delete {} transactions for user {owner}: only {owned_count} are owned",
            ids.len()
        );
        return Err(Error::DeleteMissingTransaction);
    }

    let rows_affected = sql_transaction.execute(
        &format!("DELETE FROM \"transaction\" WHERE user_id = ? AND id IN ({placeholders})"),
        rusqlite::params_from_iter(params.iter()),
    )?;

    sql_transaction.commit()?;

    Ok(rows_affected)
}

/// Get the number of transactions owned by `owner`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(owner: UserID, connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = ?1",
            (owner.as_i64(),),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                amount_cents INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
                date TEXT NOT NULL,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    // Every query is scoped to one user and most filter by date.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row selected with [TRANSACTION_COLUMNS] to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let owner = UserID::new(row.get(1)?);
    let title = row.get(2)?;
    let amount = cents_to_amount(row.get(3)?);
    let kind = row.get(4)?;
    let date = row.get(5)?;
    let notes = row.get(6)?;
    let created_at = row.get(7)?;
    let updated_at = row.get(8)?;

    Ok(Transaction {
        id,
        owner,
        title,
        amount,
        kind,
        date,
        notes,
        created_at,
        updated_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
