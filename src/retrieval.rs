use chrono::NaiveDate;
use tracing::info;

use crate::error::Result;
use crate::helpers::report::Report;
use crate::models::{period::DateRange, timesheet::Timesheets};

/// Anything that can produce the timesheet report for one date window.
pub trait ReportSource {
    fn fetch_report(&self, from: NaiveDate, to: NaiveDate) -> Result<Report>;
}

/// Fetches `range` one chunk at a time, in date order, and concatenates the
/// results. A reversed range makes no requests and yields no rows.
pub fn collect_timesheets<S>(source: &S, range: &DateRange) -> Result<Timesheets>
where
    S: ReportSource + ?Sized,
{
    info!("Fetching timesheets from {} in steps of {:?}", range, range.step);

    let mut columns: Vec<String> = Vec::new();
    let mut chunks = Vec::new();

    for (from, to) in range.chunks() {
        let report = source.fetch_report(from, to)?;

        for column in report.columns {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        chunks.push(report.entries);
    }

    let chunk_count = chunks.len();
    let timesheets = Timesheets::from_chunks(&columns, chunks);
    info!(
        "Collected {} timesheet rows from {} chunks",
        timesheets.len(),
        chunk_count
    );

    Ok(timesheets)
}
