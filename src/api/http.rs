use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

use super::{ApiError, ApiResponse, Params, Transport};

pub const DEFAULT_BASE_URL: &str = "https://api.thecatapi.com/v1/";

const API_KEY_HEADER: &str = "x-api-key";

/// [`Transport`] over reqwest, bound to a base URL and an optional API key.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Fails if `base_url` does not parse or `api_key` is not a valid header
    /// value.
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, ApiError> {
        let base_url = parse_base_url(base_url)?;

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let mut value =
                HeaderValue::from_str(key).map_err(|e| ApiError::InvalidApiKey(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }
}

/// Parses `url`, forcing a trailing slash so relative joins keep the path.
fn parse_base_url(url: &str) -> Result<Url, ApiError> {
    let normalized = if url.ends_with('/') {
        url.to_owned()
    } else {
        format!("{url}/")
    };
    Url::parse(&normalized).map_err(|e| ApiError::InvalidBaseUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })
}

impl Transport for HttpTransport {
    fn get(&self, path: &str, params: Params) -> BoxFuture<'static, Result<ApiResponse, ApiError>> {
        let url = self.url(path);
        let client = self.client.clone();

        async move {
            let url = url?;
            debug!(%url, ?params, "GET");
            let response = client
                .get(url)
                .query(&params)
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                });
            }

            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_owned(), value.to_owned()))
                })
                .collect();

            let data = response
                .json::<Value>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))?;

            Ok(ApiResponse { data, headers })
        }
        .boxed()
    }
}
