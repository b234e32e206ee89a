use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A credential was neither passed explicitly nor set in the environment.
    #[error("cannot log in: please set the {variable} environment variable")]
    Configuration { variable: &'static str },

    /// ClearBooks redirected the login form back to itself.
    #[error("incorrect username or password")]
    Authentication,

    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("malformed timesheet report: {0}")]
    Csv(#[from] csv::Error),

    #[error("timesheet report has no {0} column")]
    MissingColumn(&'static str),

    #[error("line {line}: cannot parse {column} value {value:?}")]
    InvalidField {
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("session has already been closed")]
    SessionClosed,
}

impl Error {
    /// Transport failures: a request that never completed or completed with a
    /// non-success status.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Status { .. } | Error::Http(_))
    }
}
