//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{Error, db::initialize};

/// The default header used to carry the authenticated owner's ID.
pub const DEFAULT_OWNER_HEADER: &str = "x-owner-id";

/// The default number of recent transactions shown on the dashboard.
pub const DEFAULT_RECENT_LIMIT: u64 = 10;

/// Settings that control how reports are presented.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// The symbol placed before amounts in PDF reports, e.g. "$".
    pub currency_symbol: String,
    /// The application name printed in PDF footers.
    pub app_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_owned(),
            app_name: "Vetri Finance".to_owned(),
        }
    }
}

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// The request header that the authenticating proxy uses to pass the
    /// owner's user ID.
    pub owner_header: String,

    /// How reports are presented.
    pub report_config: ReportConfig,

    /// How many recent transactions the dashboard lists.
    pub recent_limit: u64,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, local_timezone: &str) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            db_connection: connection,
            local_timezone: local_timezone.to_owned(),
            owner_header: DEFAULT_OWNER_HEADER.to_owned(),
            report_config: ReportConfig::default(),
            recent_limit: DEFAULT_RECENT_LIMIT,
        })
    }

    /// Use `header` instead of [DEFAULT_OWNER_HEADER] to identify the owner.
    pub fn with_owner_header(mut self, header: &str) -> Self {
        self.owner_header = header.to_ascii_lowercase();
        self
    }

    /// Set the report presentation settings.
    pub fn with_report_config(mut self, report_config: ReportConfig) -> Self {
        self.report_config = report_config;
        self
    }

    /// Set how many recent transactions the dashboard lists.
    pub fn with_recent_limit(mut self, recent_limit: u64) -> Self {
        self.recent_limit = recent_limit;
        self
    }
}
