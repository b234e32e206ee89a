//! Dump timesheets to stdout as CSV, or as JSON lines with `--json`.
//!
//! Usage: `export [FROM] [STEP_DAYS] [--json]` where FROM is YYYY-MM-DD.

use anyhow::Context;
use chrono::{Days, NaiveDate};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

use clearbooks::{CB_START_DATE, ClearBooksConfig, Credentials, DateRange, ONE_YEAR, Session};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|arg| arg == "--json");
    let mut positional = args.iter().filter(|arg| !arg.starts_with("--"));

    let from = match positional.next() {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .with_context(|| format!("invalid start date {value:?}"))?,
        None => CB_START_DATE,
    };
    let step = match positional.next() {
        Some(value) => Days::new(value.parse().with_context(|| format!("invalid step {value:?}"))?),
        None => ONE_YEAR,
    };

    let credentials = Credentials::from_env()?;
    let config = ClearBooksConfig::default();
    let range = DateRange::since(from).with_step(step);

    let timesheets = Session::scoped(&config, credentials, |session| session.get_timesheets(&range))?;

    let stdout = io::stdout().lock();
    if json {
        let mut out = io::BufWriter::new(stdout);
        for record in &timesheets {
            serde_json::to_writer(&mut out, record)?;
            writeln!(out)?;
        }
        out.flush()?;
    } else {
        timesheets.write_csv(stdout)?;
    }

    Ok(())
}
