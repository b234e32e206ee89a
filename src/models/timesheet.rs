use chrono::{Datelike, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    fmt, io,
};
use tracing::warn;

use crate::error::Result;

pub const HOURS_PER_DAY: f64 = 8.0;
pub const MINUTES_PER_DAY: f64 = HOURS_PER_DAY * 60.0;

pub const EMPLOYEE: &str = "Employee";
pub const DATE: &str = "Date";
pub const TIME: &str = "Time";
pub const DATETIME: &str = "Datetime";
pub const DAYS: &str = "Days";
pub const HOURS: &str = "Hours";
pub const MINUTES: &str = "Minutes";
pub const WORKING_DAYS: &str = "Working Days";
pub const QUARTER: &str = "Quarter";

/// Columns every ClearBooks timesheet report carries.
pub const REPORT_COLUMNS: [&str; 6] = [EMPLOYEE, DATE, TIME, DAYS, HOURS, MINUTES];

/// Names no other column may take in a processed dataset.
const RESERVED_COLUMNS: [&str; 9] = [
    EMPLOYEE,
    DATE,
    TIME,
    DATETIME,
    DAYS,
    HOURS,
    MINUTES,
    WORKING_DAYS,
    QUARTER,
];

/// One row of a ClearBooks timesheet report, Date and Time already combined.
#[derive(Clone, Debug, PartialEq)]
pub struct TimesheetEntry {
    pub employee: String,
    pub datetime: NaiveDateTime,
    pub days: f64,
    pub hours: f64,
    pub minutes: f64,
    /// Every other report column, keyed by header.
    pub extra: BTreeMap<String, String>,
}

impl TimesheetEntry {
    pub fn working_days(&self) -> f64 {
        self.days + self.hours / HOURS_PER_DAY + self.minutes / MINUTES_PER_DAY
    }
}

/// Financial quarter of a fiscal year running April to March.
///
/// `year` is the calendar year the fiscal year ends in, so January 2015
/// falls in `2015Q4` and April 2015 in `2016Q1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiscalQuarter {
    pub year: i32,
    pub quarter: u8,
}

impl FiscalQuarter {
    pub fn of<D: Datelike>(date: &D) -> Self {
        let month0 = date.month0();
        // April is month0 3
        let shifted = (month0 + 9) % 12;
        let year = if month0 >= 3 { date.year() + 1 } else { date.year() };

        Self {
            year,
            quarter: (shifted / 3 + 1) as u8,
        }
    }
}

impl fmt::Display for FiscalQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

impl Serialize for FiscalQuarter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A processed timesheet row carrying the derived columns.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimesheetRecord {
    #[serde(rename = "Employee")]
    pub employee: String,
    #[serde(rename = "Datetime")]
    pub datetime: NaiveDateTime,
    #[serde(rename = "Days")]
    pub days: f64,
    #[serde(rename = "Hours")]
    pub hours: f64,
    #[serde(rename = "Minutes")]
    pub minutes: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
    #[serde(rename = "Working Days")]
    pub working_days: f64,
    #[serde(rename = "Quarter")]
    pub quarter: FiscalQuarter,
}

impl From<TimesheetEntry> for TimesheetRecord {
    fn from(entry: TimesheetEntry) -> Self {
        let working_days = entry.working_days();
        let quarter = FiscalQuarter::of(&entry.datetime);

        let mut taken = BTreeSet::new();
        let extra = entry
            .extra
            .into_iter()
            .map(|(name, value)| (claim_column_name(&name, &mut taken), value))
            .collect();

        TimesheetRecord {
            employee: entry.employee,
            datetime: entry.datetime,
            days: entry.days,
            hours: entry.hours,
            minutes: entry.minutes,
            extra,
            working_days,
            quarter,
        }
    }
}

impl TimesheetRecord {
    /// Value of a dataset column rendered as text.
    pub fn field(&self, column: &str) -> Option<Cow<'_, str>> {
        match column {
            EMPLOYEE => Some(Cow::Borrowed(self.employee.as_str())),
            DATETIME => Some(Cow::Owned(self.datetime.format("%Y-%m-%d %H:%M:%S").to_string())),
            DAYS => Some(Cow::Owned(self.days.to_string())),
            HOURS => Some(Cow::Owned(self.hours.to_string())),
            MINUTES => Some(Cow::Owned(self.minutes.to_string())),
            WORKING_DAYS => Some(Cow::Owned(self.working_days.to_string())),
            QUARTER => Some(Cow::Owned(self.quarter.to_string())),
            other => self.extra.get(other).map(|value| Cow::Borrowed(value.as_str())),
        }
    }
}

/// Rewrites a leading underscore to a period; plotting tools choke on
/// underscore-prefixed names.
pub fn plot_safe_name(name: &str) -> Cow<'_, str> {
    match name.strip_prefix('_') {
        Some(rest) => Cow::Owned(format!(".{rest}")),
        None => Cow::Borrowed(name),
    }
}

/// Plot-safe name for an extra column, unique among `taken` and the
/// timesheet columns. A clash gets a `.1`, `.2`, ... suffix so no value is
/// lost.
pub fn claim_column_name(name: &str, taken: &mut BTreeSet<String>) -> String {
    let base = plot_safe_name(name).into_owned();
    let mut claimed = base.clone();
    let mut n = 0;
    while RESERVED_COLUMNS.contains(&claimed.as_str()) || taken.contains(&claimed) {
        n += 1;
        claimed = format!("{base}.{n}");
    }

    if claimed != base {
        warn!("Column {:?} clashes with another column, keeping it as {:?}", name, claimed);
    }
    taken.insert(claimed.clone());
    claimed
}

/// All timesheet rows over a date range, in date-chunk order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timesheets {
    pub columns: Vec<String>,
    pub records: Vec<TimesheetRecord>,
}

impl Timesheets {
    /// Concatenates fetched chunks in order and derives Working Days and
    /// Quarter. `columns` holds the raw report headers seen, in order.
    pub fn from_chunks<I>(columns: &[String], chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<TimesheetEntry>>,
    {
        let records = chunks
            .into_iter()
            .flatten()
            .map(TimesheetRecord::from)
            .collect();

        Timesheets {
            columns: output_columns(columns),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimesheetRecord> {
        self.records.iter()
    }

    pub fn head(&self, n: usize) -> &[TimesheetRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Total working days booked per employee, smallest total first.
    pub fn working_days_by_employee(&self) -> Vec<(String, f64)> {
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for record in &self.records {
            *totals.entry(record.employee.as_str()).or_default() += record.working_days;
        }

        let mut totals: Vec<(String, f64)> = totals
            .into_iter()
            .map(|(employee, total)| (employee.to_string(), total))
            .collect();
        totals.sort_by(|a, b| a.1.total_cmp(&b.1));
        totals
    }

    /// Working days summed per employee and fiscal quarter.
    pub fn working_days_by_quarter(&self) -> BTreeMap<String, BTreeMap<FiscalQuarter, f64>> {
        let mut pivot: BTreeMap<String, BTreeMap<FiscalQuarter, f64>> = BTreeMap::new();
        for record in &self.records {
            *pivot
                .entry(record.employee.clone())
                .or_default()
                .entry(record.quarter)
                .or_default() += record.working_days;
        }
        pivot
    }

    /// Writes the dataset as CSV with a header row.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(&self.columns)?;

        for record in &self.records {
            out.write_record(
                self.columns
                    .iter()
                    .map(|column| record.field(column).unwrap_or_default().into_owned()),
            )?;
        }

        out.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Timesheets {
    type Item = &'a TimesheetRecord;
    type IntoIter = std::slice::Iter<'a, TimesheetRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn output_columns(raw: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(raw.len() + 2);
    let mut taken = BTreeSet::new();

    for name in raw {
        let name = match name.as_str() {
            DATE | TIME => DATETIME.to_string(),
            known if REPORT_COLUMNS.contains(&known) => known.to_string(),
            other => claim_column_name(other, &mut taken),
        };
        if !columns.contains(&name) {
            columns.push(name);
        }
    }

    for required in [EMPLOYEE, DATETIME, DAYS, HOURS, MINUTES, WORKING_DAYS, QUARTER] {
        if !columns.iter().any(|column| column == required) {
            columns.push(required.to_string());
        }
    }

    columns
}
