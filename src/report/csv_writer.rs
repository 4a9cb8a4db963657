//! Writes transactions as CSV.

use crate::{Error, transaction::Transaction};

const HEADER: [&str; 5] = ["Title", "Amount", "Type", "Date", "Notes"];

/// Write `transactions` as CSV rows in the order given, after a header row.
///
/// Amounts have two decimal places, types are lowercase and dates are
/// `YYYY-MM-DD`. Missing notes are written as empty fields.
pub(crate) fn render_csv(transactions: &[Transaction]) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(HEADER).map_err(csv_error)?;

    for transaction in transactions {
        writer
            .write_record([
                transaction.title.as_str(),
                &format!("{:.2}", transaction.amount),
                transaction.kind.as_str(),
                &transaction.date.to_string(),
                transaction.notes.as_deref().unwrap_or_default(),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::ReportRenderError(error.to_string()))
}

fn csv_error(error: csv::Error) -> Error {
    tracing::error!("could not write CSV record: {error}");
    Error::ReportRenderError(error.to_string())
}
