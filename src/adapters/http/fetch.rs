use crate::ports::fetcher::{AssetFetcher, FetchError, FetchOptions};
use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use reqwest::Client;

/// Downloads assets over HTTP(S) and decodes inline `data:` URLs.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_remote(&self, url: &str, options: &FetchOptions) -> Result<Bytes, FetchError> {
        let mut request = self.client.get(url).timeout(options.timeout);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify(e, options))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| classify(e, options))?;
        if body.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(body)
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Bytes, FetchError> {
        let url = url.trim();
        if url.starts_with("data:") {
            return decode_data_url(url);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }
        self.fetch_remote(url, options).await
    }
}

fn classify(err: reqwest::Error, options: &FetchOptions) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(options.timeout)
    } else if err.is_builder() {
        FetchError::InvalidUrl(err.to_string())
    } else {
        FetchError::Network(err.to_string())
    }
}

/// Decode `data:[<mime>][;base64],<payload>`.
pub fn decode_data_url(url: &str) -> Result<Bytes, FetchError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| FetchError::InvalidUrl(String::from("data url without payload")))?;

    let data = if meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| FetchError::Decode(e.to_string()))?
    } else {
        payload.as_bytes().to_vec()
    };

    if data.is_empty() {
        return Err(FetchError::Empty);
    }
    Ok(Bytes::from(data))
}
