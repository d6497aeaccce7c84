//! Gateway client for forwarding records to a remote readings store.
//!
//! Records are posted one at a time as JSON to `<gateway>/api/readings`
//! with a bearer token. [`HttpSink`] wraps the async client in a private
//! current-thread runtime so it can serve as a synchronous [`EventSink`].

use crate::core::EventRecord;
use crate::sink::{EventSink, SinkError};
use serde::Serialize;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway host (default: 127.0.0.1)
    pub host: String,
    /// Gateway port
    pub port: u16,
    /// Bearer authentication token
    pub token: String,
}

impl GatewayConfig {
    pub fn new(host: impl Into<String>, port: u16, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            token: token.into(),
        }
    }

    /// Parse a `host:port` or `http://host:port` address.
    pub fn from_address(address: &str, token: impl Into<String>) -> Result<Self, GatewayError> {
        let trimmed = address
            .trim()
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let (host, port) = trimmed.rsplit_once(':').ok_or_else(|| {
            GatewayError::Config(format!("Gateway address '{address}' is missing a port"))
        })?;
        let port: u16 = port
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid port number '{port}': {e}")))?;
        if host.is_empty() {
            return Err(GatewayError::Config(format!(
                "Gateway address '{address}' is missing a host"
            )));
        }
        Ok(Self::new(host, port, token))
    }

    /// Get the full gateway URL.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Get the readings ingest endpoint URL.
    pub fn ingest_url(&self) -> String {
        format!("{}/api/readings", self.url())
    }

    /// Get the health check endpoint URL.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.url())
    }
}

/// Gateway client error types.
#[derive(Debug)]
pub enum GatewayError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Config(msg) => write!(f, "Gateway config error: {msg}"),
            GatewayError::Network(msg) => write!(f, "Gateway network error: {msg}"),
            GatewayError::Server { status, message } => {
                write!(f, "Gateway server error ({status}): {message}")
            }
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for SinkError {
    fn from(e: GatewayError) -> Self {
        SinkError::Unavailable(e.to_string())
    }
}

/// Body posted for each record.
#[derive(Debug, Serialize)]
struct ReadingPayload<'a> {
    device_id: &'a str,
    #[serde(flatten)]
    record: &'a EventRecord,
}

/// Async gateway client.
pub struct GatewayClient {
    config: GatewayConfig,
    client: reqwest::Client,
    device_id: String,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Device ID from hostname + instance
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let device_id = format!(
            "ocular-{}-{}",
            hostname,
            &uuid::Uuid::new_v4().to_string()[..8]
        );

        Ok(Self {
            config,
            client,
            device_id,
        })
    }

    /// Test connection to the gateway.
    pub async fn test_connection(&self) -> Result<bool, GatewayError> {
        let response = self
            .client
            .get(self.config.health_url())
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    /// Post one record.
    pub async fn send_record(&self, record: &EventRecord) -> Result<(), GatewayError> {
        let payload = ReadingPayload {
            device_id: &self.device_id,
            record,
        };

        let response = self
            .client
            .post(self.config.ingest_url())
            .header("Authorization", format!("Bearer {}", self.config.token))
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

/// Synchronous sink posting every record to the gateway.
pub struct HttpSink {
    inner: GatewayClient,
    runtime: tokio::runtime::Runtime,
}

impl HttpSink {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: GatewayClient::new(config)?,
            runtime,
        })
    }

    /// Test connection to the gateway.
    pub fn test_connection(&self) -> Result<bool, GatewayError> {
        self.runtime.block_on(self.inner.test_connection())
    }

    pub fn device_id(&self) -> &str {
        self.inner.device_id()
    }
}

impl EventSink for HttpSink {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError> {
        self.runtime
            .block_on(self.inner.send_record(record))
            .map_err(SinkError::from)
    }
}
