//! HTTP client abstraction for model downloads.

use std::fmt;
use std::time::Duration;

/// Errors from fetching a model definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Client could not be built.
    Client(String),
    /// Request failed before a response arrived.
    Request(String),
    /// Server answered with a non-success status.
    Status { url: String, status: u16 },
    /// Response body could not be read.
    Body(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Client(msg) => write!(f, "Failed to create HTTP client: {}", msg),
            FetchError::Request(msg) => write!(f, "Request failed: {}", msg),
            FetchError::Status { url, status } => write!(f, "HTTP {} from {}", status, url),
            FetchError::Body(msg) => write!(f, "Failed to read response: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Blocking HTTP GET.
///
/// The registry calls this from `spawn_blocking`, so implementations may block.
pub trait HttpClient: Send + Sync {
    /// Fetch `url` and return the body.
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP client backed by `reqwest::blocking`.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Client with a 60 second timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(60))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tilescale/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| FetchError::Body(e.to_string()))
    }
}
