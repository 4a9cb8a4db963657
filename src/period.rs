//! Named reporting periods and the inclusive date ranges they resolve to.

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use crate::Error;

/// An inclusive date range where either side may be unbounded.
///
/// The default predicate matches every date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePredicate {
    /// The earliest matching date, if any.
    pub start: Option<Date>,
    /// The latest matching date, if any.
    pub end: Option<Date>,
}

impl DatePredicate {
    /// A predicate that matches every date.
    pub fn all() -> Self {
        Self::default()
    }

    /// A predicate that matches `start` through `end`, inclusive.
    pub fn between(start: Date, end: Date) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// A predicate that matches `date` only.
    pub fn on(date: Date) -> Self {
        Self::between(date, date)
    }

    /// Whether `date` falls inside the range.
    pub fn matches(&self, date: Date) -> bool {
        self.start.is_none_or(|start| start <= date) && self.end.is_none_or(|end| date <= end)
    }
}

/// A named span of time that reports and summaries are filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// The reference date only.
    Today,
    /// Monday through Sunday of the reference date's week.
    Week,
    /// The reference date's calendar month.
    Month,
    /// The reference date's calendar year.
    Year,
    /// A caller supplied range. A missing bound leaves that side open.
    Custom {
        /// The first day of the range.
        start: Option<Date>,
        /// The last day of the range.
        end: Option<Date>,
    },
    /// No date filtering.
    All,
}

impl Period {
    /// Parse a period token as sent by clients.
    ///
    /// `start` and `end` are only used by `custom-range` (or `custom`).
    /// Tokens that are not recognised mean no date filtering, they are never
    /// an error.
    pub fn parse(token: &str, start: Option<Date>, end: Option<Date>) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "today" => Period::Today,
            "week" => Period::Week,
            "month" => Period::Month,
            "year" => Period::Year,
            "custom-range" | "custom" => Period::Custom { start, end },
            other => {
                tracing::debug!("unknown period \"{other}\", not filtering by date");
                Period::All
            }
        }
    }

    /// Parse an optional token from a query string, defaulting to [Period::Month].
    pub fn from_query(token: Option<&str>, start: Option<Date>, end: Option<Date>) -> Self {
        Self::parse(token.unwrap_or("month"), start, end)
    }

    /// Resolve the period to a concrete date range relative to `reference`.
    pub fn resolve(self, reference: Date) -> DatePredicate {
        match self {
            Period::Today => DatePredicate::on(reference),
            Period::Week => week_bounds(reference),
            Period::Month => month_bounds(reference.year(), reference.month()),
            Period::Year => year_containing(reference),
            Period::Custom { start, end } => DatePredicate { start, end },
            Period::All => DatePredicate::all(),
        }
    }
}

/// Query string parameters that select a [Period].
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    /// The period token, defaults to "month".
    pub period: Option<String>,
    /// Start of a custom range.
    pub start_date: Option<Date>,
    /// End of a custom range.
    pub end_date: Option<Date>,
}

impl PeriodQuery {
    /// The period the query asks for.
    pub fn period(&self) -> Period {
        Period::from_query(self.period.as_deref(), self.start_date, self.end_date)
    }
}

/// The Monday that starts the week containing `date`.
pub fn start_of_week(date: Date) -> Date {
    date - Duration::days(date.weekday().number_days_from_monday() as i64)
}

fn week_bounds(anchor_date: Date) -> DatePredicate {
    let start = start_of_week(anchor_date);

    DatePredicate::between(start, start + Duration::days(6))
}

fn month_bounds(year: i32, month: Month) -> DatePredicate {
    let start = Date::from_calendar_date(year, month, 1).expect("invalid month start date");
    let end = Date::from_calendar_date(year, month, month.length(year))
        .expect("invalid month end date");

    DatePredicate::between(start, end)
}

fn year_containing(date: Date) -> DatePredicate {
    DatePredicate {
        start: month_bounds(date.year(), Month::January).start,
        end: month_bounds(date.year(), Month::December).end,
    }
}

/// The first and last day of `year`.
///
/// # Errors
/// Returns [Error::InvalidField] if `year` is outside the supported calendar.
pub fn year_bounds(year: i32) -> Result<DatePredicate, Error> {
    match (
        Date::from_calendar_date(year, Month::January, 1),
        Date::from_calendar_date(year, Month::December, 31),
    ) {
        (Ok(start), Ok(end)) => Ok(DatePredicate::between(start, end)),
        _ => Err(Error::InvalidField {
            field: "year",
            message: format!("{year} is not a supported year."),
        }),
    }
}
