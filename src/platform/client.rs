//! HTTP client for media stream requests

use crate::core::video_info::FormatDescriptor;
use crate::error::TubeError;
use crate::platform::extractor::{MediaStream, StreamEvent};
use futures_util::{stream, StreamExt};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default User-Agent when the format does not dictate one
pub const DEFAULT_USER_AGENT: &str = concat!("tubedl/", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Opens media URLs as event streams
#[derive(Debug, Clone)]
pub struct MediaClient {
    client: Client,
}

impl MediaClient {
    /// Create a media client with default configuration
    pub fn new() -> Result<Self, TubeError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a media client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self, TubeError> {
        // No total timeout: long downloads must not be cut off mid-stream
        let client = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Request the media URL of `format`.
    ///
    /// The returned stream yields one [`StreamEvent::Response`] followed by
    /// the body chunks in arrival order.
    pub async fn open(&self, format: &FormatDescriptor) -> Result<MediaStream, TubeError> {
        let url = Url::parse(&format.url)?;
        debug!("Opening stream for itag {} ({})", format.itag, url.host_str().unwrap_or("-"));

        let mut request = self.client.get(url);
        for (name, value) in &format.http_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Media request for itag {} failed with {}", format.itag, status);
            return Err(TubeError::HttpStatus(status.as_u16()));
        }

        let content_length = parse_content_length(response.headers());
        debug!("Media response content-length: {:?}", content_length);

        let head = stream::once(async move {
            Ok::<_, TubeError>(StreamEvent::Response { content_length })
        });
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(StreamEvent::Data).map_err(TubeError::from));

        Ok(head.chain(body).boxed())
    }
}

/// Parse the `content-length` header
pub fn parse_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_content_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_content_length(&headers), None);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("5000"));
        assert_eq!(parse_content_length(&headers), Some(5000));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("bogus"));
        assert_eq!(parse_content_length(&headers), None);
    }

    #[test]
    fn test_http_client_config_default() {
        let config = HttpClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("tubedl/"));
    }

    #[tokio::test]
    async fn test_open_emits_response_then_data() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/videoplayback")
            .match_header("x-test", "1")
            .with_status(200)
            .with_header("content-length", "11")
            .with_body("hello world")
            .create_async()
            .await;

        let mut format = FormatDescriptor::new("18", "mp4")
            .with_url(&format!("{}/videoplayback", server.url()));
        format.http_headers.insert("X-Test".to_string(), "1".to_string());

        let client = MediaClient::new().unwrap();
        let events: Vec<StreamEvent> = client
            .open(&format)
            .await
            .unwrap()
            .map(|event| event.unwrap())
            .collect()
            .await;

        mock.assert_async().await;
        assert_eq!(
            events[0],
            StreamEvent::Response {
                content_length: Some(11)
            }
        );
        let body: Vec<u8> = events[1..]
            .iter()
            .flat_map(|event| match event {
                StreamEvent::Data(chunk) => chunk.to_vec(),
                other => panic!("unexpected event: {:?}", other),
            })
            .collect();
        assert_eq!(body, b"hello world");
    }

    #[tokio::test]
    async fn test_open_rejects_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/videoplayback")
            .with_status(403)
            .create_async()
            .await;

        let format = FormatDescriptor::new("18", "mp4")
            .with_url(&format!("{}/videoplayback", server.url()));

        let client = MediaClient::new().unwrap();
        let err = client.open(&format).await.err().unwrap();
        assert!(matches!(err, TubeError::HttpStatus(403)));
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_url() {
        let client = MediaClient::new().unwrap();
        let err = client
            .open(&FormatDescriptor::new("18", "mp4"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TubeError::UrlError(_)));
    }
}
