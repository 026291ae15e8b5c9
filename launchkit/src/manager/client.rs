//! Version metadata client.
//!
//! Fetches the version server's document for one distribution channel and
//! caches it for [`METADATA_TTL`]. A cached document is never mutated; on
//! expiry or [`invalidate`](MetadataClient::invalidate) it is dropped and the
//! next fetch replaces it.
//!
//! A failed fetch is not cached.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::error::{ManagerError, ManagerResult};
use super::traits::{BoxFuture, MetadataClient};
use crate::package::{ServerResponse, VersionMetadata};

/// Freshness window of a fetched metadata document.
pub const METADATA_TTL: Duration = Duration::from_secs(6 * 3600);

/// Distribution channel served by a version server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Global,
    Cn,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Cn => "cn",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised channel name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown channel '{0}' (expected 'global' or 'cn')")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "cn" => Ok(Self::Cn),
            _ => Err(UnknownChannel(s.to_string())),
        }
    }
}

/// HTTP client for the version server of one channel.
///
/// The channel is fixed at construction; switching channels means building
/// a new client.
pub struct HttpMetadataClient {
    client: Client,
    channel: Channel,
    url: String,
    timeout: Duration,
    cache: MokaCache<Channel, Arc<VersionMetadata>>,
}

impl HttpMetadataClient {
    /// Create a client for `channel` served at `url`.
    pub fn new(channel: Channel, url: impl Into<String>, timeout: Duration) -> ManagerResult<Self> {
        Self::with_ttl(channel, url, timeout, METADATA_TTL)
    }

    /// Create a client with a custom cache freshness window.
    pub fn with_ttl(
        channel: Channel,
        url: impl Into<String>,
        timeout: Duration,
        ttl: Duration,
    ) -> ManagerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ManagerError::HttpError(e.to_string()))?;

        let cache = MokaCache::builder()
            .max_capacity(4)
            .time_to_live(ttl)
            .build();

        Ok(Self {
            client,
            channel,
            url: url.into(),
            timeout,
            cache,
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and validate the document, bypassing the cache.
    async fn fetch_remote(&self) -> ManagerResult<VersionMetadata> {
        info!(channel = %self.channel, url = %self.url, "fetching version metadata");

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                ManagerError::Timeout {
                    url: self.url.clone(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                ManagerError::MetadataFetchFailed {
                    url: self.url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ManagerError::MetadataFetchFailed {
                url: self.url.clone(),
                reason: format!("HTTP status {}", status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ManagerError::MetadataFetchFailed {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        parse_response(&self.url, &body)
    }
}

/// Decode a version server response body.
///
/// Distinguishes a body that is not a valid envelope, an envelope carrying
/// an application-level error, and a document violating its invariants.
pub fn parse_response(url: &str, body: &str) -> ManagerResult<VersionMetadata> {
    let envelope: ServerResponse =
        serde_json::from_str(body).map_err(|e| ManagerError::MetadataParseFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if !envelope.is_ok() {
        return Err(ManagerError::MetadataRejected {
            url: url.to_string(),
            retcode: envelope.retcode,
            message: envelope.message,
        });
    }

    let data = envelope.data.ok_or_else(|| ManagerError::MetadataParseFailed {
        url: url.to_string(),
        reason: "response has no data".to_string(),
    })?;

    data.validate().map_err(|source| ManagerError::InvalidMetadata {
        url: url.to_string(),
        source,
    })?;

    Ok(data)
}

impl MetadataClient for HttpMetadataClient {
    fn fetch(&self) -> BoxFuture<'_, ManagerResult<Arc<VersionMetadata>>> {
        Box::pin(async move {
            if let Some(cached) = self.cache.get(&self.channel).await {
                debug!(channel = %self.channel, "version metadata served from cache");
                return Ok(cached);
            }

            let metadata = Arc::new(self.fetch_remote().await?);
            self.cache.insert(self.channel, Arc::clone(&metadata)).await;

            info!(
                channel = %self.channel,
                latest = %metadata.latest_version(),
                pre_download = metadata.pre_download_game.is_some(),
                "version metadata updated"
            );
            Ok(metadata)
        })
    }

    fn invalidate(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.cache.invalidate(&self.channel).await;
            debug!(channel = %self.channel, "version metadata cache invalidated");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/resource";

    #[test]
    fn test_channel_parse_and_display() {
        assert_eq!("global".parse::<Channel>(), Ok(Channel::Global));
        assert_eq!(" CN ".parse::<Channel>(), Ok(Channel::Cn));
        assert!("eu".parse::<Channel>().is_err());
        assert_eq!(Channel::Cn.to_string(), "cn");
    }

    #[test]
    fn test_parse_response_ok() {
        let body = r#"{
            "retcode": 0,
            "message": "OK",
            "data": {
                "game": {
                    "latest": { "name": "game_4.0.0.zip", "version": "4.0.0", "path": "https://cdn/game_4.0.0.zip" },
                    "diffs": []
                }
            }
        }"#;

        let data = parse_response(URL, body).unwrap();
        assert_eq!(data.latest_version(), "4.0.0");
        assert!(data.pre_download_game.is_none());
    }

    #[test]
    fn test_parse_response_rejected() {
        let body = r#"{ "retcode": -501, "message": "system busy", "data": null }"#;

        match parse_response(URL, body) {
            Err(ManagerError::MetadataRejected { retcode, message, .. }) => {
                assert_eq!(retcode, -501);
                assert_eq!(message, "system busy");
            }
            other => panic!("Expected MetadataRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_garbage() {
        assert!(matches!(
            parse_response(URL, "<html>maintenance</html>"),
            Err(ManagerError::MetadataParseFailed { .. })
        ));
    }

    #[test]
    fn test_parse_response_invalid_document() {
        let body = r#"{
            "retcode": 0,
            "message": "OK",
            "data": {
                "game": {
                    "latest": { "name": "game_4.0.0.zip", "version": "4.0.0", "path": "p" },
                    "diffs": [
                        { "name": "a.zip", "version": "3.9.0", "path": "p" },
                        { "name": "b.zip", "version": "3.9.0", "path": "p" }
                    ]
                }
            }
        }"#;

        assert!(matches!(
            parse_response(URL, body),
            Err(ManagerError::InvalidMetadata { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_fetch_failure() {
        let client = HttpMetadataClient::new(
            Channel::Global,
            "http://127.0.0.1:9/resource",
            Duration::from_secs(2),
        )
        .unwrap();

        let result = client.fetch().await;
        assert!(matches!(
            result,
            Err(ManagerError::MetadataFetchFailed { .. }) | Err(ManagerError::Timeout { .. })
        ));
    }
}
