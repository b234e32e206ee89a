use chrono::{Days, Local};
use tracing::info;
use tracing_subscriber::EnvFilter;

use clearbooks::{ClearBooksConfig, Credentials, DateRange, Session};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let credentials = Credentials::from_env()?;
    let config = ClearBooksConfig::default();

    let one_year_ago = Local::now().date_naive() - Days::new(365);
    let range = DateRange::since(one_year_ago);
    info!("Summarising timesheets from {}", range);

    // The session stays logged in across every chunk request
    let timesheets = {
        let session = Session::open(&config, credentials)?;
        session.get_timesheets(&range)?
    };

    // Top few rows
    for record in timesheets.head(5) {
        println!(
            "{:<24} {}  {:>8.4} days  {}",
            record.employee, record.datetime, record.working_days, record.quarter
        );
    }
    println!();

    // Total time booked by employee
    for (employee, total) in timesheets.working_days_by_employee() {
        println!("{employee:<24} {total:>10.2}");
    }

    Ok(())
}
