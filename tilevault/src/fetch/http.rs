//! HTTP client abstraction for testability.

use std::time::Duration;

use thiserror::Error;

/// Errors from a single tile request.
///
/// All variants are treated as transient by the batch fetcher: the tile
/// is skipped, never retried, and the batch continues.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Client construction or transport failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status code.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Trait for HTTP GET operations.
///
/// Allows dependency injection of a mock client in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the given per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Http(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| FetchError::Http(format!("failed to read response: {e}")))
    }
}
