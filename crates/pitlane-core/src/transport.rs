//! Request transport
//!
//! The client talks to the device through [`Transport`], so tests can swap
//! the network for a scripted in-memory device. [`HttpTransport`] is the
//! production implementation on top of reqwest.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::endpoint::Endpoint;
use crate::error::TransportError;

/// User agent for device requests
const USER_AGENT: &str = concat!("pitlane/", env!("CARGO_PKG_VERSION"));

/// Something that can carry a request to the device
pub trait Transport: Send + Sync {
    /// Where requests go, for display
    fn base_url(&self) -> &str;

    /// GET the endpoint and return the parsed JSON body
    fn get(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;

    /// Headers-only request; succeeds when any HTTP response arrives
    fn head(&self, endpoint: &Endpoint) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// HTTP transport for the controller's web server
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.base_url, config.request_timeout())
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

impl Transport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, endpoint: &Endpoint) -> Result<Value, TransportError> {
        let url = self.url(endpoint);
        debug!("GET {}", endpoint);

        let response = self
            .client
            .get(&url)
            .query(&endpoint.query())
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        // The firmware sends its JSON envelope with error statuses too,
        // so the body is parsed whatever the status code
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        serde_json::from_slice(&body)
            .map_err(|e| TransportError::Body(format!("HTTP {}: {}", status, e)))
    }

    async fn head(&self, endpoint: &Endpoint) -> Result<(), TransportError> {
        debug!("HEAD {}", endpoint);

        self.client
            .head(self.url(endpoint))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Unreachable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let transport =
            HttpTransport::new("http://192.168.0.20:8080/", Duration::from_secs(3)).unwrap();

        assert_eq!(transport.base_url(), "http://192.168.0.20:8080");
        assert_eq!(
            transport.url(&Endpoint::TrafficLightPreviousStop),
            "http://192.168.0.20:8080/api/traffic-light/previous-stop"
        );
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            base_url: "http://pico.local".to_string(),
            ..Config::default()
        };
        let transport = HttpTransport::from_config(&config).unwrap();
        assert_eq!(transport.url(&Endpoint::LapStatus), "http://pico.local/api/lap/status");
    }

    #[tokio::test]
    async fn test_unreachable_device_is_a_transport_error() {
        // Grab a free port, then close it so the connection is refused
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let base_url = format!("http://127.0.0.1:{}", port);
        let transport = HttpTransport::new(&base_url, Duration::from_millis(500)).unwrap();

        let err = transport.get(&Endpoint::LedStatus).await.unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));

        let err = transport.head(&Endpoint::LedStatus).await.unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
    }
}
