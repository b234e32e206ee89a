use chrono::{Days, Local, NaiveDate};
use std::fmt;

/// Earliest date ClearBooks holds timesheets for.
pub const CB_START_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2013, 1, 1) {
    Some(date) => date,
    None => panic!("invalid ClearBooks start date"),
};

/// Large requests get no response from ClearBooks; one year at a time works.
pub const ONE_YEAR: Days = Days::new(365);

/// An inclusive date range fetched `step` days at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub step: Days,
}

impl Default for DateRange {
    fn default() -> Self {
        Self::since(CB_START_DATE)
    }
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            step: ONE_YEAR,
        }
    }

    /// From `from` up to and including today.
    pub fn since(from: NaiveDate) -> Self {
        Self::new(from, Local::now().date_naive())
    }

    pub fn with_step(mut self, step: Days) -> Self {
        self.step = step;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    /// The request windows covering this range, in date order.
    pub fn chunks(&self) -> Chunks {
        Chunks {
            next: Some(self.from),
            to: self.to,
            step: self.step,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.from, self.to)
    }
}

/// Iterator over `(from, to)` windows of a [`DateRange`].
///
/// Each window ends `step` days after it starts (or at the end of the range)
/// and the next one starts the following day, so windows never overlap and
/// never skip a day.
#[derive(Clone, Debug)]
pub struct Chunks {
    next: Option<NaiveDate>,
    to: NaiveDate,
    step: Days,
}

impl Iterator for Chunks {
    type Item = (NaiveDate, NaiveDate);

    fn next(&mut self) -> Option<Self::Item> {
        let from = self.next.filter(|from| *from <= self.to)?;

        let end = from
            .checked_add_days(self.step)
            .map_or(self.to, |target| target.min(self.to));

        self.next = end.succ_opt();
        Some((from, end))
    }
}
