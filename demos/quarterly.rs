use chrono::{Days, Local};
use std::collections::BTreeSet;
use tracing_subscriber::EnvFilter;

use clearbooks::{ClearBooksConfig, Credentials, DateRange, FiscalQuarter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let credentials = Credentials::from_env()?;
    let one_year_ago = Local::now().date_naive() - Days::new(365);

    let timesheets = clearbooks::get_timesheets(
        &ClearBooksConfig::default(),
        credentials,
        &DateRange::since(one_year_ago),
    )?;

    // Working days by employee, by quarter
    let pivot = timesheets.working_days_by_quarter();
    let quarters: BTreeSet<FiscalQuarter> = pivot.values().flat_map(|row| row.keys().copied()).collect();

    print!("{:<24}", "Employee");
    for quarter in &quarters {
        print!(" {:>8}", quarter.to_string());
    }
    println!();

    for (employee, row) in &pivot {
        print!("{employee:<24}");
        for quarter in &quarters {
            match row.get(quarter) {
                Some(days) => print!(" {days:>8.2}"),
                None => print!(" {:>8}", "-"),
            }
        }
        println!();
    }

    Ok(())
}
