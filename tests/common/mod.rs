//! In-process stand-in for the ClearBooks login form and timesheet report.

#![allow(dead_code)]

use axum::{
    Form, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use std::{
    collections::HashMap,
    io,
    net::TcpListener,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use clearbooks::{ClearBooksConfig, Credentials};

pub const ACCOUNT: &str = "acme";
pub const USER: &str = "alice@example.com";
pub const PASSWORD: &str = "correct horse";
const SESSION_COOKIE: &str = "cb_session=valid";

pub const HEADER: &str = "Date,Time,Employee,Days,Hours,Minutes,_project\n";

#[derive(Default)]
pub struct Remote {
    pub login_status: Option<StatusCode>,
    pub report_status: Option<StatusCode>,
    /// Report bodies keyed by the `from` query parameter; anything else is
    /// answered with an empty body.
    pub bodies: HashMap<String, String>,
    pub login_attempts: AtomicUsize,
    pub report_queries: Mutex<Vec<HashMap<String, String>>>,
}

impl Remote {
    pub fn with_body(mut self, from: &str, rows: &str) -> Self {
        self.bodies.insert(from.to_string(), format!("{HEADER}{rows}"));
        self
    }

    pub fn login_attempts(&self) -> usize {
        self.login_attempts.load(Ordering::SeqCst)
    }

    pub fn report_queries(&self) -> Vec<HashMap<String, String>> {
        self.report_queries.lock().unwrap().clone()
    }
}

pub struct FakeClearBooks {
    pub base_url: String,
    pub port: u16,
    pub remote: Arc<Remote>,
}

impl FakeClearBooks {
    pub fn start(remote: Remote) -> Self {
        let remote = Arc::new(remote);
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let port = listener.local_addr().unwrap().port();
        let base_url = format!("http://127.0.0.1:{port}");

        let app = Router::new()
            .route("/account/action/login/", get(login_page).post(login))
            .route(&format!("/{ACCOUNT}/accounting/home/dashboard"), get(dashboard))
            .route(&format!("/{ACCOUNT}/accounting/timetracking/view/"), get(report))
            .with_state(remote.clone());

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        FakeClearBooks {
            base_url,
            port,
            remote,
        }
    }

    pub fn config(&self) -> ClearBooksConfig {
        ClearBooksConfig::new(ACCOUNT)
            .with_base_url(&self.base_url)
            .with_timeout(Duration::from_secs(5))
    }

    /// Same server, reached through `host` spelled exactly as given.
    pub fn config_for_host(&self, host: &str) -> ClearBooksConfig {
        self.config()
            .with_base_url(format!("http://{host}:{}", self.port))
    }
}

pub fn credentials() -> Credentials {
    Credentials::new(USER, PASSWORD)
}

async fn login_page() -> &'static str {
    "<html><form action=\"/account/action/login/\"></form></html>"
}

async fn dashboard() -> &'static str {
    "<html>dashboard</html>"
}

async fn login(
    State(remote): State<Arc<Remote>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    remote.login_attempts.fetch_add(1, Ordering::SeqCst);

    if let Some(status) = remote.login_status {
        return status.into_response();
    }

    let valid = form.get("email").map(String::as_str) == Some(USER)
        && form.get("password").map(String::as_str) == Some(PASSWORD);

    if valid {
        (
            [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/"))],
            Redirect::to(&format!("/{ACCOUNT}/accounting/home/dashboard")),
        )
            .into_response()
    } else {
        Redirect::to("/account/action/login/").into_response()
    }
}

async fn report(
    State(remote): State<Arc<Remote>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    remote.report_queries.lock().unwrap().push(query.clone());

    let logged_in = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|cookies| cookies.contains(SESSION_COOKIE));
    if !logged_in {
        return StatusCode::FORBIDDEN.into_response();
    }

    if query.get("filter-submit").map(String::as_str) != Some("Find") {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if query.get("filter[employee_id]").map(String::as_str) != Some("*") {
        return String::new().into_response();
    }
    if let Some(status) = remote.report_status {
        return status.into_response();
    }

    let body = query
        .get("from")
        .and_then(|from| remote.bodies.get(from))
        .cloned()
        .unwrap_or_default();
    body.into_response()
}

/// Log sink for asserting on emitted warnings.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a subscriber writing into the returned buffer.
pub fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs)
}
