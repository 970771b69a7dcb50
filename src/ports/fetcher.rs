use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Per-request timeout applied to every asset download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub headers: Vec<(String, String)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            headers: Vec::new(),
        }
    }
}

impl FetchOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("server responded with HTTP {0}")]
    Status(u16),

    #[error("response body was empty")]
    Empty,

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode payload: {0}")]
    Decode(String),
}

/// Remote asset download. Success means a 2xx answer with a non-empty body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Bytes, FetchError>;
}
