use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::timesheet::{
    DATE, DAYS, EMPLOYEE, HOURS, MINUTES, REPORT_COLUMNS, TIME, TimesheetEntry, claim_column_name,
};

/// Date format accepted in ClearBooks report URLs.
pub const URL_DATE_FORMAT: &str = "%d/%m/%Y";

/// ClearBooks returns no CSV data unless at least one filter is set.
pub const EMPLOYEE_FILTER: (&str, &str) = ("filter[employee_id]", "*");

/// Without the filter-submit marker ClearBooks answers with HTTP 500.
pub const FILTER_SUBMIT: (&str, &str) = ("filter-submit", "Find");

/// One parsed report: its header row and the rows under it. Columns other
/// than the timesheet ones carry their plot-safe, de-duplicated names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    pub columns: Vec<String>,
    pub entries: Vec<TimesheetEntry>,
}

/// Query string for a CSV report covering `[from, to]`.
pub fn report_query(from: NaiveDate, to: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("csv", "1".to_string()),
        ("from", from.format(URL_DATE_FORMAT).to_string()),
        ("to", to.format(URL_DATE_FORMAT).to_string()),
        (EMPLOYEE_FILTER.0, EMPLOYEE_FILTER.1.to_string()),
        (FILTER_SUBMIT.0, FILTER_SUBMIT.1.to_string()),
    ]
}

/// Turns a report body into rows. An empty body is how ClearBooks answers a
/// range with no bookings, so it yields an empty report.
pub fn read_report(from: NaiveDate, to: NaiveDate, body: &str) -> Result<Report> {
    if body.trim().is_empty() {
        warn!("No timesheet data returned from {} to {}", from, to);
        return Ok(Report::default());
    }

    let report = parse_report(body)?;
    info!(
        "Parsed {} timesheet rows from {} to {}",
        report.entries.len(),
        from,
        to
    );
    Ok(report)
}

pub fn parse_report(body: &str) -> Result<Report> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    let headers: Vec<String> = headers.iter().map(normalize_header_name).collect();
    let (layout, columns) = Layout::new(&headers)?;

    let mut entries = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, lines are 1-based
        let line = idx + 2;
        let record = result?;
        if record.iter().all(str::is_empty) {
            debug!("Skipping blank line {}", line);
            continue;
        }
        entries.push(layout.entry(&record, line)?);
    }

    Ok(Report { columns, entries })
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Column positions of a report's header row.
struct Layout {
    employee: usize,
    date: usize,
    time: usize,
    days: usize,
    hours: usize,
    minutes: usize,
    /// Position and unique plot-safe name of every other column.
    extra: Vec<(usize, String)>,
}

impl Layout {
    /// Locates the timesheet columns and names the rest. Returns the layout
    /// and the header row with every extra column under its final name.
    fn new(headers: &[String]) -> Result<(Self, Vec<String>)> {
        let mut index: HashMap<&'static str, usize> = HashMap::new();
        let mut taken = BTreeSet::new();
        let mut columns = Vec::with_capacity(headers.len());
        let mut extra = Vec::new();

        for (idx, name) in headers.iter().enumerate() {
            let known = REPORT_COLUMNS
                .iter()
                .copied()
                .find(|known| *known == name.as_str() && !index.contains_key(*known));

            match known {
                Some(known) => {
                    index.insert(known, idx);
                    columns.push(name.clone());
                }
                None => {
                    let resolved = claim_column_name(name, &mut taken);
                    columns.push(resolved.clone());
                    extra.push((idx, resolved));
                }
            }
        }

        let find = |name: &'static str| index.get(name).copied().ok_or(Error::MissingColumn(name));

        let layout = Layout {
            employee: find(EMPLOYEE)?,
            date: find(DATE)?,
            time: find(TIME)?,
            days: find(DAYS)?,
            hours: find(HOURS)?,
            minutes: find(MINUTES)?,
            extra,
        };
        Ok((layout, columns))
    }

    fn entry(&self, record: &StringRecord, line: usize) -> Result<TimesheetEntry> {
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let date = parse_date(cell(self.date)).ok_or_else(|| Error::InvalidField {
            line,
            column: DATE,
            value: cell(self.date).to_string(),
        })?;
        let time = parse_time(cell(self.time)).ok_or_else(|| Error::InvalidField {
            line,
            column: TIME,
            value: cell(self.time).to_string(),
        })?;

        let number = |idx: usize, column: &'static str| -> Result<f64> {
            let value = cell(idx);
            if value.is_empty() {
                return Ok(0.0);
            }
            value.parse::<f64>().map_err(|_| Error::InvalidField {
                line,
                column,
                value: value.to_string(),
            })
        };

        let extra = self
            .extra
            .iter()
            .map(|(idx, name)| (name.clone(), cell(*idx).to_string()))
            .collect::<BTreeMap<_, _>>();

        Ok(TimesheetEntry {
            employee: cell(self.employee).to_string(),
            datetime: NaiveDateTime::new(date, time),
            days: number(self.days, DAYS)?,
            hours: number(self.hours, HOURS)?,
            minutes: number(self.minutes, MINUTES)?,
            extra,
        })
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    if value.is_empty() {
        return Some(NaiveTime::MIN);
    }

    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}
