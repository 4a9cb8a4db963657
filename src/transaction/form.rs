//! Validation for transactions submitted through the create and edit forms.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    transaction::{Transaction, TransactionBuilder, TransactionKind},
    user::UserID,
};

/// The longest title, in characters, that a form may submit.
pub const MAX_TITLE_LENGTH: usize = 100;

/// The largest amount a form may submit: ten digits, two after the point.
fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

/// The form data for creating or editing a transaction.
///
/// The amount is kept as text so that a malformed number is reported against
/// the amount field instead of rejecting the whole request.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionForm {
    /// A short label for the transaction.
    pub title: String,
    /// The amount as typed by the user, e.g. "12.50".
    pub amount: String,
    /// Whether the money was earned or spent.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// When the transaction happened. Defaults to today for new transactions
    /// and to the stored date for edits.
    #[serde(default)]
    pub date: Option<Date>,
    /// Optional free text notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl TransactionForm {
    /// Check the form and turn it into a builder for `owner`.
    ///
    /// A missing date is replaced with `default_date`.
    ///
    /// # Errors
    /// Returns [Error::InvalidField] naming the first field that failed
    /// validation.
    pub fn validate(self, owner: UserID, default_date: Date) -> Result<TransactionBuilder, Error> {
        let title = self.title.trim();

        if title.is_empty() {
            return Err(invalid("title", "Enter a title."));
        }

        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(invalid(
                "title",
                format!("Title must be at most {MAX_TITLE_LENGTH} characters."),
            ));
        }

        let amount = parse_amount(&self.amount)?;

        Ok(
            Transaction::build(owner, title, amount, self.kind, self.date.unwrap_or(default_date))
                .notes(self.notes),
        )
    }
}

fn parse_amount(text: &str) -> Result<Decimal, Error> {
    let amount = Decimal::from_str(text.trim())
        .map_err(|_| invalid("amount", "Enter a number, e.g. 12.50."))?
        .normalize();

    if amount <= Decimal::ZERO {
        return Err(invalid("amount", "Amount must be greater than zero."));
    }

    if amount.scale() > 2 {
        return Err(invalid(
            "amount",
            "Amount must have at most two decimal places.",
        ));
    }

    let max_amount = max_amount();
    if amount > max_amount {
        return Err(invalid("amount", format!("Amount must be at most {max_amount}.")));
    }

    Ok(amount)
}

fn invalid(field: &'static str, message: impl Into<String>) -> Error {
    Error::InvalidField {
        field,
        message: message.into(),
    }
}
