use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::Value;

use super::error::TransportError;

/// Request timeout used when none is configured (30 seconds).
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// A JSON-over-HTTP channel to a document store.
///
/// Implementations return the parsed response body whatever the HTTP status:
/// CouchDB reports failures as JSON error objects and callers inspect those.
#[async_trait]
pub trait Transport: Send + Sync {
	async fn request(
		&self,
		method: Method,
		url: &str,
		body: Option<&Value>,
	) -> Result<Value, TransportError>;
}

/// Options for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
	/// Skip TLS certificate verification.
	pub insecure: bool,
	pub timeout_ms: u64,
}

impl Default for TransportConfig {
	fn default() -> Self {
		Self {
			insecure: true,
			timeout_ms: DEFAULT_TIMEOUT_MS,
		}
	}
}

impl TransportConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

/// [`Transport`] backed by a `reqwest` client. No retries are attempted.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: Client,
}

impl HttpTransport {
	pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
		if config.insecure {
			warn!("TLS certificate verification is disabled");
		}

		let client = Client::builder()
			.danger_accept_invalid_certs(config.insecure)
			.timeout(config.timeout())
			.build()
			.map_err(|e| TransportError::Client(e.to_string()))?;

		Ok(Self { client })
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn request(
		&self,
		method: Method,
		url: &str,
		body: Option<&Value>,
	) -> Result<Value, TransportError> {
		debug!("{} {}", method, url);

		let mut req = self
			.client
			.request(method.clone(), url)
			.header(CONTENT_TYPE, "application/json");
		if let Some(b) = body {
			req = req.json(b);
		}

		let response = req.send().await.map_err(|e| {
			debug!("{} {} failed: {}", method, url, e);
			TransportError::unreachable(e.to_string())
		})?;

		let status = response.status();
		let bytes = response.bytes().await.map_err(|e| {
			debug!("{} {} body read failed: {}", method, url, e);
			TransportError::unreachable(e.to_string())
		})?;

		serde_json::from_slice(&bytes).map_err(|e| {
			debug!(
				"{} {} returned a non-JSON body (status {}): {}",
				method, url, status, e
			);
			TransportError::unreachable(format!("invalid JSON (status {}): {}", status, e))
		})
	}
}

/// Appends `path` to a database URL, tolerating a trailing slash on the base.
pub fn endpoint(url: &str, path: &str) -> String {
	format!("{}/{}", url.trim_end_matches('/'), path)
}
