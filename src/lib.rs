//! ClearBooks timesheet client
//!
//! This library logs in to ClearBooks through its web login form, downloads
//! the timesheet CSV report over a date range in chunks and turns it into a
//! dataset with Working Days and financial Quarter columns.

pub mod config;
pub mod error;
pub mod helpers;
pub mod models;
pub mod retrieval;
pub mod session;

pub use config::{ClearBooksConfig, Credentials};
pub use error::{Error, Result};
pub use session::Session;

// Re-export key types for convenience
pub use helpers::report::Report;
pub use models::period::{CB_START_DATE, DateRange, ONE_YEAR};
pub use models::timesheet::{FiscalQuarter, TimesheetEntry, TimesheetRecord, Timesheets};
pub use retrieval::ReportSource;

/// Log in, download timesheets over `range` and log out again.
pub fn get_timesheets(
    config: &ClearBooksConfig,
    credentials: Credentials,
    range: &DateRange,
) -> Result<Timesheets> {
    Session::scoped(config, credentials, |session| session.get_timesheets(range))
}
