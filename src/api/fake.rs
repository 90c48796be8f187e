//! In-memory [`Transport`] for tests.
//!
//! Routes are matched on path and, when given, on the exact parameter list.
//! Every request is recorded so tests can assert how many network calls a
//! flow made.
//!
//! ```
//! use cat_breeds::api::{ApiResponse, Transport, fake::FakeTransport};
//! use serde_json::json;
//!
//! # tokio_test_block_on(async {
//! let fake = FakeTransport::new();
//! fake.respond("/images/0XYvRd7oD", ApiResponse::new(json!({"id": "0XYvRd7oD"})));
//!
//! let response = fake.get("/images/0XYvRd7oD", vec![]).await.unwrap();
//! assert_eq!(response.data["id"], "0XYvRd7oD");
//! assert_eq!(fake.call_count("/images/0XYvRd7oD"), 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::{ApiError, ApiResponse, Params, Transport};

/// A request seen by [`FakeTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub path: String,
    pub params: Params,
}

#[derive(Debug, Clone)]
enum Reply {
    Ok(ApiResponse),
    Status(u16),
    Offline(String),
}

#[derive(Debug, Clone)]
struct Route {
    path: String,
    params: Option<Params>,
    reply: Reply,
}

#[derive(Debug, Default)]
struct Inner {
    routes: Vec<Route>,
    calls: Vec<Request>,
}

/// Scripted responses keyed by path (and optionally parameters).
///
/// Later routes win over earlier ones for the same request, so a test can
/// change what an endpoint returns mid-flow. Unmatched requests get a 404.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Mutex<Inner>>,
    latency: Duration,
}

impl FakeTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every reply by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn route(&self, path: &str, params: Option<Params>, reply: Reply) {
        self.lock().routes.push(Route {
            path: path.to_owned(),
            params,
            reply,
        });
    }

    /// Answers any request to `path`.
    pub fn respond(&self, path: &str, response: ApiResponse) {
        self.route(path, None, Reply::Ok(response));
    }

    /// Answers requests to `path` with exactly these parameters.
    pub fn respond_to(&self, path: &str, params: &[(&str, &str)], response: ApiResponse) {
        self.route(path, Some(owned(params)), Reply::Ok(response));
    }

    /// Fails requests to `path` with an HTTP status.
    pub fn fail(&self, path: &str, status: u16) {
        self.route(path, None, Reply::Status(status));
    }

    /// Fails requests to `path` as if the network were down.
    pub fn disconnect(&self, path: &str, message: &str) {
        self.route(path, None, Reply::Offline(message.to_owned()));
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Request> {
        self.lock().calls.clone()
    }

    /// Requests made to `path`, whatever their parameters.
    #[must_use]
    pub fn call_count(&self, path: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.path == path).count()
    }

    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    fn reply_for(&self, request: &Request) -> Reply {
        let inner = self.lock();
        inner
            .routes
            .iter()
            .rev()
            .find(|route| {
                route.path == request.path
                    && route
                        .params
                        .as_ref()
                        .is_none_or(|params| *params == request.params)
            })
            .map_or(Reply::Status(404), |route| route.reply.clone())
    }
}

fn owned(params: &[(&str, &str)]) -> Params {
    params
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

impl Transport for FakeTransport {
    fn get(&self, path: &str, params: Params) -> BoxFuture<'static, Result<ApiResponse, ApiError>> {
        let request = Request {
            path: path.to_owned(),
            params,
        };
        let reply = self.reply_for(&request);
        self.lock().calls.push(request);
        let latency = self.latency;

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            match reply {
                Reply::Ok(response) => Ok(response),
                Reply::Status(status) => Err(ApiError::Status { status }),
                Reply::Offline(message) => Err(ApiError::Transport(message)),
            }
        }
        .boxed()
    }
}
