//! The HTTP collaborator: `GET(path, params) -> {data, headers}`.
//!
//! Everything above this module talks to a [`Transport`], never to reqwest
//! directly, so fetchers can be exercised against [`fake::FakeTransport`].

pub mod fake;
pub mod http;

use std::collections::HashMap;
use std::fmt;

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::subscription::query::QueryError;

pub use http::{DEFAULT_BASE_URL, HttpTransport};

/// Why a request failed.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid API key header: {0}")]
    InvalidApiKey(String),

    #[error("{0}")]
    Transport(String),

    #[error("Request failed with status code {status}")]
    Status { status: u16 },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("missing response header {0}")]
    MissingHeader(&'static str),

    #[error("invalid response header {name}: {value:?}")]
    InvalidHeader { name: &'static str, value: String },
}

impl From<ApiError> for QueryError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(_) => Self::NetworkError(err.to_string()),
            _ => Self::FetchError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// A decoded JSON response and its headers (names lower-cased).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    pub data: Value,
    pub headers: HashMap<String, String>,
}

impl ApiResponse {
    #[must_use]
    pub fn new(data: Value) -> Self {
        Self {
            data,
            headers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl ToString) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Query string parameters, in order.
pub type Params = Vec<(String, String)>;

/// Issues GET requests relative to a fixed base URL.
pub trait Transport: fmt::Debug + Send + Sync + 'static {
    fn get(&self, path: &str, params: Params) -> BoxFuture<'static, Result<ApiResponse, ApiError>>;
}
