//! Downloadable CSV and PDF reports of a user's transactions.
//!
//! Rendering is a pure function of its inputs: it never reads from or writes
//! to the database, and the generation time is passed in by the caller.

mod csv_writer;
mod format;
mod handlers;
mod pdf;

use time::OffsetDateTime;

use crate::{
    Error, aggregation::AggregationResult, app_state::ReportConfig, transaction::Transaction,
    user::User,
};

pub use handlers::{download_dashboard_report, export_csv, export_pdf};

/// The PDF report variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLayout {
    /// Every transaction the user has.
    Transactions,
    /// The most recent transactions under the summary totals.
    Summary,
}

impl ReportLayout {
    /// The title printed in the header band.
    pub fn title(self) -> &'static str {
        match self {
            ReportLayout::Transactions => "Financial Dashboard Report",
            ReportLayout::Summary => "Vetri Finance - Financial Summary Report",
        }
    }

    /// The heading above the transaction table.
    pub fn table_heading(self) -> &'static str {
        match self {
            ReportLayout::Transactions => "Transactions",
            ReportLayout::Summary => "Recent Transactions",
        }
    }

    /// The file name offered to the browser.
    pub fn file_name(self) -> &'static str {
        match self {
            ReportLayout::Transactions => "transactions_report.pdf",
            ReportLayout::Summary => "VetriFinance_Report.pdf",
        }
    }
}

/// The output format of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// One row per transaction after a header row.
    Csv,
    /// A paginated A4 document.
    Pdf(ReportLayout),
}

/// Render `transactions` and the `aggregation` totals as `format`.
///
/// Transactions are written in the order given. The CSV format ignores
/// `aggregation`, `generated_at` and `config`.
pub fn render(
    owner: &User,
    transactions: &[Transaction],
    aggregation: &AggregationResult,
    format: ReportFormat,
    generated_at: OffsetDateTime,
    config: &ReportConfig,
) -> Result<Vec<u8>, Error> {
    match format {
        ReportFormat::Csv => csv_writer::render_csv(transactions),
        ReportFormat::Pdf(layout) => {
            pdf::render_pdf(owner, transactions, aggregation, layout, generated_at, config)
        }
    }
}
