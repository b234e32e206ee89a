pub mod period;
pub mod timesheet;
