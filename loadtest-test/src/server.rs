//! Exposes an in-process mock of the target API for use in integration tests.
//!
//! ```
//! use loadtest_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = TestServer::builder().token("abc123").start().await;
//!    let host = server.url("/");
//!    // point the load test at `host`, then inspect `server.requests()`...
//! }
//! ```

use std::collections::HashSet;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex, PoisonError};

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// A request received by the [`TestServer`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    /// The HTTP method, such as `"GET"`.
    pub method: String,
    /// The request path, without query.
    pub path: String,
    /// The value of the `Authorization` header, if sent.
    pub authorization: Option<String>,
    /// The JSON body, if the request had one.
    pub body: Option<Value>,
}

#[derive(Debug)]
struct MockApi {
    token: String,
    reject_login: bool,
    companies: Vec<String>,
    projects: Vec<String>,
    users_to_invite: Vec<String>,
    failing_paths: HashSet<String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockApi {
    fn respond(&self, method: &Method, path: &str) -> Response {
        if self.failing_paths.contains(path) {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        match (method.as_str(), segments.as_slice()) {
            ("POST", ["api", "auth", "login"]) if self.reject_login => {
                StatusCode::UNAUTHORIZED.into_response()
            }
            ("POST", ["api", "auth", "login"]) => {
                Json(json!({ "token": self.token, "tokenType": "Bearer" })).into_response()
            }
            ("GET", ["api", "company"]) => {
                let companies: Vec<_> = self
                    .companies
                    .iter()
                    .map(|id| json!({ "id": id, "name": format!("company {id}") }))
                    .collect();
                Json(companies).into_response()
            }
            ("GET", ["api", "company", _, "project"]) => {
                let projects: Vec<_> = self
                    .projects
                    .iter()
                    .map(|id| json!({ "id": id, "name": format!("project {id}") }))
                    .collect();
                Json(projects).into_response()
            }
            ("GET", ["api", "company", _, "user-to-invite"]) => {
                let users: Vec<_> = self
                    .users_to_invite
                    .iter()
                    .map(|id| json!({ "userId": id, "username": format!("user {id}") }))
                    .collect();
                Json(users).into_response()
            }
            ("GET", _) => Json(json!([])).into_response(),
            _ => Json(json!({})).into_response(),
        }
    }
}

async fn handle(
    State(api): State<Arc<MockApi>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    api.requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_owned(),
            authorization,
            body: serde_json::from_slice(&body).ok(),
        });

    api.respond(&method, uri.path())
}

/// Builder to configure the data served by a [`TestServer`].
#[derive(Debug)]
pub struct TestServerBuilder {
    token: String,
    reject_login: bool,
    companies: Vec<String>,
    projects: Vec<String>,
    users_to_invite: Vec<String>,
    failing_paths: HashSet<String>,
}

fn owned<I: IntoIterator<Item = S>, S: Into<String>>(items: I) -> Vec<String> {
    items.into_iter().map(Into::into).collect()
}

impl TestServerBuilder {
    /// The token returned by the login endpoint.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Makes the login endpoint answer `401 Unauthorized`.
    pub fn reject_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    /// Ids of the companies listed by `GET /api/company`.
    pub fn companies<I: IntoIterator<Item = S>, S: Into<String>>(mut self, ids: I) -> Self {
        self.companies = owned(ids);
        self
    }

    /// Ids of the projects listed for every company.
    pub fn projects<I: IntoIterator<Item = S>, S: Into<String>>(mut self, ids: I) -> Self {
        self.projects = owned(ids);
        self
    }

    /// Ids of the users that can be invited into every company.
    pub fn users_to_invite<I: IntoIterator<Item = S>, S: Into<String>>(mut self, ids: I) -> Self {
        self.users_to_invite = owned(ids);
        self
    }

    /// Makes every request to `path` answer `500 Internal Server Error`.
    pub fn fail(mut self, path: impl Into<String>) -> Self {
        self.failing_paths.insert(path.into());
        self
    }

    /// Starts the server on a random port on localhost.
    pub async fn start(self) -> TestServer {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let api = Arc::new(MockApi {
            token: self.token,
            reject_login: self.reject_login,
            companies: self.companies,
            projects: self.projects,
            users_to_invite: self.users_to_invite,
            failing_paths: self.failing_paths,
            requests: Mutex::default(),
        });
        let router = Router::new().fallback(handle).with_state(Arc::clone(&api));

        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router).await.unwrap();
        });

        TestServer {
            handle,
            socket,
            api,
        }
    }
}

/// An in-process mock of the target API for use in integration tests.
///
/// The server accepts any request and records it. It serves the configured companies, projects
/// and invitable users, empty lists for every other `GET`, and `{}` for every other request.
/// It listens on a random available port on localhost and stops when dropped.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    api: Arc<MockApi>,
}

impl TestServer {
    /// Starts a server with one company, two projects and one user to invite.
    pub async fn new() -> Self {
        Self::builder().start().await
    }

    /// Returns a builder to configure the served data.
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder {
            token: "test-token".into(),
            reject_login: false,
            companies: owned(["company-0"]),
            projects: owned(["project-0", "project-1"]),
            users_to_invite: owned(["user-0"]),
            failing_paths: HashSet::new(),
        }
    }

    /// Returns a full URL pointing to the given path.
    ///
    /// This URL uses `localhost` as hostname.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("http://localhost:{}/{}", self.socket.port(), path)
    }

    /// All requests received so far, in order of arrival.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.api
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests received so far with the given method and path.
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == method && request.path == path)
            .collect()
    }

    /// Forgets all requests received so far.
    pub fn clear(&self) {
        self.api
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
