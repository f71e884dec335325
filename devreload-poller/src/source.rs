//! Where a poller gets the current server version from.

use async_trait::async_trait;
use url::Url;

use crate::config::PollerConfig;
use crate::error::{CheckError, PollerError};
use crate::version::{Version, VersionResponse};

/// Source of the server's current version
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Fetch the version the server is currently serving
    async fn fetch_version(&self) -> Result<Version, CheckError>;
}

/// Fetches the version from a development server over HTTP.
///
/// Sends a plain `GET` with reqwest's default headers and decodes the body as
/// `{"version": ...}`.
#[derive(Debug, Clone)]
pub struct HttpVersionSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpVersionSource {
    /// Build a source for the endpoint described by `config`
    pub fn new(config: &PollerConfig) -> Result<Self, PollerError> {
        let url = config.check_url()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PollerError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, url })
    }

    /// Build a source around an existing client
    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    /// The endpoint this source queries
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn decode(body: &str) -> Result<Version, CheckError> {
        serde_json::from_str::<VersionResponse>(body)
            .map(|response| response.version)
            .map_err(|e| CheckError::Parse(e.to_string()))
    }
}

#[async_trait]
impl VersionSource for HttpVersionSource {
    async fn fetch_version(&self) -> Result<Version, CheckError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| CheckError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| CheckError::Network(e.to_string()))?;

        Self::decode(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CHECK_PATH;

    fn source_for(server: &mockito::ServerGuard) -> HttpVersionSource {
        let config = PollerConfig::new().with_base_url(server.url());
        HttpVersionSource::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_text_version() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", DEFAULT_CHECK_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"version":"abc123"}"#)
            .create_async()
            .await;

        let version = source_for(&server).fetch_version().await.unwrap();
        assert_eq!(version, Version::text("abc123"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_counter_version() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", DEFAULT_CHECK_PATH)
            .with_status(200)
            .with_body(r#"{"version": 4}"#)
            .create_async()
            .await;

        let version = source_for(&server).fetch_version().await.unwrap();
        assert_eq!(version, Version::counter(4));
    }

    #[tokio::test]
    async fn test_server_error_is_http_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", DEFAULT_CHECK_PATH)
            .with_status(500)
            .with_body(r#"{"version":"abc123"}"#)
            .create_async()
            .await;

        match source_for(&server).fetch_version().await {
            Err(CheckError::HttpStatus { status }) => assert_eq!(status, 500),
            other => panic!("Expected HttpStatus error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", DEFAULT_CHECK_PATH)
            .with_status(200)
            .with_body("<html>rebuilding</html>")
            .create_async()
            .await;

        assert!(matches!(
            source_for(&server).fetch_version().await,
            Err(CheckError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Bind then drop a listener so the port is known to be closed
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = PollerConfig::new().with_base_url(format!("http://127.0.0.1:{port}"));
        let source = HttpVersionSource::new(&config).unwrap();

        assert!(matches!(
            source.fetch_version().await,
            Err(CheckError::Network(_))
        ));
    }

    #[test]
    fn test_decode_missing_version_field() {
        assert!(matches!(
            HttpVersionSource::decode(r#"{"status":"ok"}"#),
            Err(CheckError::Parse(_))
        ));
    }
}
