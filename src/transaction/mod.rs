//! Transactions: the ledger's single record type.
//!
//! This module contains:
//! - The `Transaction` model, its `TransactionKind` and the `TransactionBuilder`
//! - Store functions for creating, reading, updating and deleting transactions
//! - `TransactionQuery`, the owner-scoped filter used by every read path
//! - The JSON endpoints for managing transactions

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod form;
mod kind;
mod list_endpoint;
mod query;
mod state;

pub use core::{
    Transaction, TransactionBuilder, bulk_create_transactions, count_transactions,
    create_transaction, create_transaction_table, delete_transaction, delete_transactions,
    get_transaction, update_transaction,
};
pub use create_endpoint::{bulk_create_transactions_endpoint, create_transaction_endpoint};
pub use delete_endpoint::{delete_transaction_endpoint, delete_transactions_endpoint};
pub use edit_endpoint::{edit_transaction_endpoint, get_transaction_endpoint};
pub use kind::TransactionKind;
pub use list_endpoint::{list_transactions_endpoint, today_income_endpoint};
pub use query::{SortOrder, TransactionQuery};
