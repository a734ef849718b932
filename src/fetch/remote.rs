//! Remote repositories: where fetched configs come from.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::ConfigError;
use crate::mapper::Mapper;

/// Source of remote configuration payloads.
///
/// One operation: fetch a deserialized value or fail with a transport or
/// payload error. Failure handling (retry, backoff) is the caller's call;
/// the core never retries.
#[async_trait]
pub trait RemoteRepository<T>: Send + Sync {
    async fn fetch(&self) -> Result<T, ConfigError>;
}

/// Built-in remote repository issuing a GET against a fixed URL and
/// decoding the body through the resource's mapper.
pub struct HttpRemoteRepository<T> {
    url: Url,
    client: reqwest::Client,
    mapper: Arc<dyn Mapper<T>>,
}

impl<T> std::fmt::Debug for HttpRemoteRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemoteRepository")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl<T> HttpRemoteRepository<T> {
    /// Build a repository for `url`, validating it up front.
    pub fn new(url: &str, mapper: Arc<dyn Mapper<T>>) -> Result<Self, ConfigError> {
        let url = Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_owned()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        }
        Ok(Self {
            url,
            client: reqwest::Client::new(),
            mapper,
        })
    }
}

#[async_trait]
impl<T: Send + Sync> RemoteRepository<T> for HttpRemoteRepository<T> {
    async fn fetch(&self) -> Result<T, ConfigError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| ConfigError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfigError::Http {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_owned(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ConfigError::Transport(e.to_string()))?;
        if body.is_empty() {
            return Err(ConfigError::EmptyPayload);
        }

        self.mapper.from_text(&body)
    }
}
