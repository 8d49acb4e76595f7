//! Fake Outlook REST endpoint for integration testing
//!
//! A `tiny_http` server on a free local port. Routes map a request path
//! (without query) to a status and a JSON body; `{base}` in a body is
//! replaced by the server's API base so paging links point back at it.
//! Every request is recorded with the headers the client sent.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_http::{Header, Response, Server};

pub const API_PATH: &str = "/api/v2.0";

#[derive(Debug, Clone)]
pub struct Recorded {
    /// Path and query exactly as received.
    pub url: String,
    pub authorization: Option<String>,
    pub anchor_mailbox: Option<String>,
    pub accept: Option<String>,
}

impl Recorded {
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }

    /// Decoded query pairs.
    pub fn query(&self) -> Vec<(String, String)> {
        url::Url::parse(&format!("http://fake{}", self.url))
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

#[derive(Default)]
pub struct Routes {
    routes: HashMap<String, (u16, String)>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// `path` is relative to the API base, e.g. `me/Calendars`.
    pub fn ok(self, path: &str, body: &str) -> Self {
        self.status(path, 200, body)
    }

    pub fn status(mut self, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .insert(format!("{API_PATH}/{path}"), (status, body.to_string()));
        self
    }
}

pub struct FakeOutlookServer {
    base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

fn header(request: &tiny_http::Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

impl FakeOutlookServer {
    pub fn start(routes: Routes) -> Self {
        // probe for a free port, then hand it to tiny_http
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let server = Server::http(format!("127.0.0.1:{port}")).unwrap();
        let base = format!("http://127.0.0.1:{port}{API_PATH}");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let requests = requests.clone();
            let stop = stop.clone();
            let base = base.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let Ok(Some(request)) = server.recv_timeout(Duration::from_millis(50)) else {
                        continue;
                    };
                    let recorded = Recorded {
                        url: request.url().to_string(),
                        authorization: header(&request, "Authorization"),
                        anchor_mailbox: header(&request, "X-AnchorMailbox"),
                        accept: header(&request, "Accept"),
                    };
                    let (status, body) = routes
                        .routes
                        .get(recorded.path())
                        .cloned()
                        .unwrap_or_else(|| {
                            (
                                404,
                                r#"{"error":{"code":"ErrorInvalidUrl","message":"no route"}}"#
                                    .to_string(),
                            )
                        });
                    requests.lock().unwrap().push(recorded);

                    let response = Response::from_string(body.replace("{base}", &base))
                        .with_status_code(status)
                        .with_header(
                            Header::from_bytes("Content-Type", "application/json").unwrap(),
                        );
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            base,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeOutlookServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}
