use chrono::NaiveDate;
use reqwest::{
    Url,
    blocking::{Client, Response},
};
use tracing::{debug, error, info};

use crate::{
    config::{ClearBooksConfig, Credentials},
    error::{Error, Result},
    helpers::report::{self, Report},
    models::{period::DateRange, timesheet::Timesheets},
    retrieval::{self, ReportSource},
};

/// A logged-in ClearBooks HTTP session.
///
/// The underlying client keeps the login cookies. It is released exactly once,
/// by [`Session::close`] or when the session is dropped, whichever comes first.
pub struct Session {
    client: Option<Client>,
    timesheet_url: String,
}

impl Session {
    /// Build a client and log in with `credentials`.
    pub fn open(config: &ClearBooksConfig, credentials: Credentials) -> Result<Self> {
        info!("Building ClearBooks HTTP client");
        let client = match Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to build ClearBooks client: {}", e);
                return Err(e.into());
            }
        };

        let login_url = config.login_url();
        let login_url = Url::parse(&login_url).map_err(|e| {
            error!("Invalid ClearBooks login URL {}: {}", login_url, e);
            Error::InvalidUrl {
                url: login_url.clone(),
                reason: e.to_string(),
            }
        })?;

        // The client is dropped with this frame if login fails.
        login(&client, &login_url, &credentials)?;

        Ok(Session {
            client: Some(client),
            timesheet_url: config.timesheet_url(),
        })
    }

    /// Open a session, run `f` with it and release it again on every path.
    pub fn scoped<T, F>(config: &ClearBooksConfig, credentials: Credentials, f: F) -> Result<T>
    where
        F: FnOnce(&Session) -> Result<T>,
    {
        let mut session = Session::open(config, credentials)?;
        let result = f(&session);
        session.close();
        result
    }

    /// Download timesheets over `range`, one chunk at a time.
    ///
    /// ClearBooks gets no response for requests covering a lot of data, most
    /// likely an internal timeout, so large ranges are split by `range.step`.
    pub fn get_timesheets(&self, range: &DateRange) -> Result<Timesheets> {
        retrieval::collect_timesheets(self, range)
    }

    /// Download one CSV timesheet report covering `[from, to]`.
    ///
    /// Large ranges make ClearBooks fail; use [`Session::get_timesheets`].
    pub fn fetch_chunk(&self, from: NaiveDate, to: NaiveDate) -> Result<Report> {
        let client = self.client()?;

        debug!("Requesting timesheets from {} to {}", from, to);
        let response = client
            .get(&self.timesheet_url)
            .query(&report::report_query(from, to))
            .send()
            .map_err(|e| {
                error!("Failed to send timesheet request: {}", e);
                Error::from(e)
            })?;

        let body = ensure_success(&self.timesheet_url, response)?.text()?;
        report::read_report(from, to, &body)
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_none()
    }

    /// Release the HTTP client. Later requests fail with
    /// [`Error::SessionClosed`].
    pub fn close(&mut self) {
        if let Some(client) = self.client.take() {
            drop(client);
            info!("Closed ClearBooks session");
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or(Error::SessionClosed)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl ReportSource for Session {
    fn fetch_report(&self, from: NaiveDate, to: NaiveDate) -> Result<Report> {
        self.fetch_chunk(from, to)
    }
}

fn login(client: &Client, login_url: &Url, credentials: &Credentials) -> Result<()> {
    info!("Logging in to ClearBooks as {}", credentials.username);

    let form = [
        ("email", credentials.username.as_str()),
        ("password", credentials.password.as_str()),
    ];
    let response = client.post(login_url.clone()).form(&form).send().map_err(|e| {
        error!("Failed to send login request: {}", e);
        Error::from(e)
    })?;
    let response = ensure_success(login_url.as_str(), response)?;

    // Bad credentials redirect back to the login page with a success status.
    if response.url() == login_url {
        error!("Incorrect username or password.");
        return Err(Error::Authentication);
    }

    info!("Logged in to ClearBooks, landed on {}", response.url());
    Ok(())
}

fn ensure_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .unwrap_or_else(|_| "Unknown error".to_string());
    error!("ClearBooks returned error status {}: {}", status, error_text);

    Err(Error::Status {
        url: url.to_string(),
        status,
    })
}
