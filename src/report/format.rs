//! Text formatting shared by the report layouts.

use numfmt::{Formatter, Precision};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use time::{Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use unicode_segmentation::UnicodeSegmentation;

use crate::Error;

/// The max number of graphemes of a title shown in a PDF table row.
pub(crate) const MAX_TITLE_GRAPHEMES: usize = 20;

const DISPLAY_DATE: &[BorrowedFormatItem<'static>] = format_description!("[day]-[month]-[year]");
const TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Formats amounts with a currency symbol, thousands separators and two
/// decimal places, e.g. "$1,234.50".
pub(crate) struct CurrencyFormatter {
    positive: Formatter,
    negative: Formatter,
    symbol: String,
}

impl CurrencyFormatter {
    pub fn new(symbol: &str) -> Result<Self, Error> {
        let formatter = |prefix: &str| {
            Formatter::currency(prefix)
                .map(|formatter| formatter.precision(Precision::Decimals(0)))
                .map_err(|error| {
                    Error::ReportRenderError(format!("invalid currency symbol {prefix:?}: {error}"))
                })
        };

        Ok(Self {
            positive: formatter(symbol)?,
            negative: formatter(&format!("-{symbol}"))?,
            symbol: symbol.to_owned(),
        })
    }

    pub fn format(&self, amount: Decimal) -> String {
        let amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let is_negative = amount.is_sign_negative() && !amount.is_zero();
        let whole = amount.abs().trunc();
        let cents = ((amount.abs() - whole) * Decimal::ONE_HUNDRED)
            .to_u32()
            .unwrap_or_default();

        // numfmt renders zero as a bare "0" and drops trailing zeros from the
        // fraction, so only the whole part goes through it.
        let whole_string = match (whole.is_zero(), is_negative) {
            (true, true) => format!("-{}0", self.symbol),
            (true, false) => format!("{}0", self.symbol),
            (false, true) => self.negative.fmt_string(whole.to_f64().unwrap_or_default()),
            (false, false) => self.positive.fmt_string(whole.to_f64().unwrap_or_default()),
        };

        format!("{whole_string}.{cents:02}")
    }
}

/// Shorten `title` to [MAX_TITLE_GRAPHEMES] graphemes.
pub(crate) fn truncate_title(title: &str) -> String {
    title.graphemes(true).take(MAX_TITLE_GRAPHEMES).collect()
}

/// A date as `DD-MM-YYYY`.
pub(crate) fn display_date(date: Date) -> String {
    date.format(DISPLAY_DATE).unwrap_or_else(|_| date.to_string())
}

/// A timestamp as `YYYY-MM-DD HH:MM`.
pub(crate) fn timestamp(datetime: OffsetDateTime) -> String {
    datetime
        .format(TIMESTAMP)
        .unwrap_or_else(|_| datetime.date().to_string())
}

/// Replace characters the base-14 fonts cannot show with '?' and encode the
/// rest as Latin-1 bytes.
pub(crate) fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|character| u8::try_from(u32::from(character)).unwrap_or(b'?'))
        .collect()
}
