//! Backend trait and the shared JSON-over-HTTP transport

use crate::message::EmailMessage;
use crate::{ApiError, EmailError, EmailResult};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Default timeout for ESP API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can deliver email messages.
#[async_trait]
pub trait EmailBackend: Send + Sync {
	/// Send every message, returning how many were accepted.
	///
	/// Stops at the first message that fails.
	async fn send_messages(&self, messages: &[EmailMessage]) -> EmailResult<usize>;
}

/// Raw HTTP answer from an ESP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EspResponse {
	status: u16,
	body: String,
}

impl EspResponse {
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		Self {
			status,
			body: body.into(),
		}
	}

	pub fn status(&self) -> u16 {
		self.status
	}

	pub fn body(&self) -> &str {
		&self.body
	}

	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Whether the ESP sent no body at all.
	pub fn is_empty(&self) -> bool {
		self.body.is_empty()
	}

	pub fn json(&self) -> Result<Value, serde_json::Error> {
		serde_json::from_str(&self.body)
	}
}

/// POSTs serialized payloads to an ESP API.
///
/// Transport failures become [`EmailError::Request`]; non-2xx responses
/// become [`EmailError::Api`] carrying the status, body and payload.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	esp_name: String,
	api_url: String,
	client: Client,
}

impl HttpTransport {
	/// Create a transport with its own client.
	///
	/// `api_url` must already end with `/`; see
	/// [`normalize_api_url`](crate::settings::normalize_api_url).
	pub fn new(esp_name: impl Into<String>, api_url: impl Into<String>, timeout: Duration) -> EmailResult<Self> {
		let client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| EmailError::ImproperlyConfigured(format!("Failed to create HTTP client: {}", e)))?;

		Ok(Self::with_client(esp_name, api_url, client))
	}

	/// Create a transport with a custom client
	pub fn with_client(esp_name: impl Into<String>, api_url: impl Into<String>, client: Client) -> Self {
		Self {
			esp_name: esp_name.into(),
			api_url: api_url.into(),
			client,
		}
	}

	pub fn api_url(&self) -> &str {
		&self.api_url
	}

	pub fn endpoint_url(&self, endpoint: &str) -> String {
		format!("{}{}", self.api_url, endpoint)
	}

	pub async fn post_json(
		&self,
		endpoint: &str,
		headers: &[(&str, &str)],
		body: String,
	) -> EmailResult<EspResponse> {
		let url = self.endpoint_url(endpoint);
		tracing::debug!(esp = %self.esp_name, url = %url, bytes = body.len(), "posting ESP payload");

		let mut request = self.client.post(&url);
		for (name, value) in headers {
			request = request.header(*name, *value);
		}

		let response = request
			.body(body.clone())
			.send()
			.await
			.map_err(|e| EmailError::Request(format!("{} API request failed: {}", self.esp_name, e)))?;

		let status = response.status().as_u16();
		let text = response
			.text()
			.await
			.map_err(|e| EmailError::Request(format!("{} API response unreadable: {}", self.esp_name, e)))?;
		let response = EspResponse::new(status, text);

		if !response.is_success() {
			return Err(ApiError::new(
				&self.esp_name,
				format!("{} API response {}", self.esp_name, status),
			)
			.with_response(&response)
			.with_payload(body)
			.into());
		}

		Ok(response)
	}
}
