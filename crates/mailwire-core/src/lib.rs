//! # mailwire core
//!
//! Vendor-neutral building blocks shared by every mailwire ESP backend.
//!
//! ## Features
//!
//! - **EmailMessage**: validated message model with ESP extensions (tags,
//!   metadata, merge data, templates, scheduled sending)
//! - **EspPayload**: setter trait each backend implements, driven in a fixed
//!   order by [`payload::drive_payload`]
//! - **SendStatus**: per-recipient delivery status parsed from ESP responses
//! - **HttpTransport**: JSON-over-HTTP transport built on `reqwest`
//! - **Settings helpers**: environment lookup with prefixed and bare keys
//!
//! ## Example
//!
//! ```rust
//! use mailwire_core::EmailMessage;
//!
//! let message = EmailMessage::builder()
//!     .from("Shop <orders@example.com>")
//!     .to(vec!["customer@example.com".to_string()])
//!     .subject("Your order")
//!     .body("Thanks for your order!")
//!     .tag("orders")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(message.from_email().addr_spec(), "orders@example.com");
//! assert_eq!(message.tags(), ["orders"]);
//! ```

pub mod address;
pub mod backend;
pub mod headers;
pub mod message;
pub mod payload;
pub mod settings;
pub mod status;

use std::fmt;
use thiserror::Error;

pub use address::EmailAddress;
pub use backend::{EmailBackend, EspResponse, HttpTransport};
pub use headers::CaseInsensitiveHeaders;
pub use message::{
	Alternative, Attachment, EmailMessage, EmailMessageBuilder, MergeData, MergeMetadata,
	Metadata, SendAt,
};
pub use payload::{EspPayload, RecipientKind, SendDefaults, UnsupportedFeatures, drive_payload};
pub use status::{DeliveryStatus, RecipientStatus, SendStatus};

#[derive(Debug, Error)]
pub enum EmailError {
	#[error("Invalid email address: {0}")]
	InvalidAddress(String),

	#[error("Missing required field: {0}")]
	MissingField(String),

	#[error("Invalid header: {0}")]
	InvalidHeader(String),

	#[error("Header injection attempt detected: {0}")]
	HeaderInjection(String),

	/// The ESP has no equivalent for a requested message feature.
	#[error("{esp_name} does not support {}", .features.join(", "))]
	UnsupportedFeature {
		esp_name: String,
		features: Vec<String>,
	},

	#[error(transparent)]
	Api(Box<ApiError>),

	#[error("Request error: {0}")]
	Request(String),

	#[error("Improperly configured: {0}")]
	ImproperlyConfigured(String),

	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl EmailError {
	/// Whether this error only reports features the ESP cannot express.
	pub fn is_unsupported_feature(&self) -> bool {
		matches!(self, EmailError::UnsupportedFeature { .. })
	}

	/// Attach the message being sent to an API error, for diagnostics.
	///
	/// Other error kinds are returned unchanged.
	pub fn with_email_message(self, message: &EmailMessage) -> Self {
		match self {
			EmailError::Api(api) => EmailError::Api(Box::new(api.with_email_message(message))),
			other => other,
		}
	}
}

impl From<serde_json::Error> for EmailError {
	fn from(err: serde_json::Error) -> Self {
		EmailError::Serialization(err.to_string())
	}
}

impl From<reqwest::Error> for EmailError {
	fn from(err: reqwest::Error) -> Self {
		EmailError::Request(err.to_string())
	}
}

impl From<ApiError> for EmailError {
	fn from(err: ApiError) -> Self {
		EmailError::Api(Box::new(err))
	}
}

/// An ESP accepted the HTTP exchange but its response could not be used.
///
/// Carries everything needed to diagnose the failure: the serialized request
/// payload, the raw response and the message that was being sent.
#[derive(Debug, Clone)]
pub struct ApiError {
	description: String,
	esp_name: String,
	status_code: Option<u16>,
	payload: Option<String>,
	response_body: Option<String>,
	email_message: Option<EmailMessage>,
}

impl ApiError {
	pub fn new(esp_name: impl Into<String>, description: impl Into<String>) -> Self {
		Self {
			description: description.into(),
			esp_name: esp_name.into(),
			status_code: None,
			payload: None,
			response_body: None,
			email_message: None,
		}
	}

	pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
		self.payload = Some(payload.into());
		self
	}

	pub fn with_response(mut self, response: &EspResponse) -> Self {
		self.status_code = Some(response.status());
		self.response_body = Some(response.body().to_string());
		self
	}

	pub fn with_email_message(mut self, message: &EmailMessage) -> Self {
		self.email_message = Some(message.clone());
		self
	}

	pub fn description(&self) -> &str {
		&self.description
	}

	pub fn esp_name(&self) -> &str {
		&self.esp_name
	}

	pub fn status_code(&self) -> Option<u16> {
		self.status_code
	}

	pub fn payload(&self) -> Option<&str> {
		self.payload.as_deref()
	}

	pub fn response_body(&self) -> Option<&str> {
		self.response_body.as_deref()
	}

	pub fn email_message(&self) -> Option<&EmailMessage> {
		self.email_message.as_ref()
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.description)?;
		if let Some(status) = self.status_code {
			write!(f, "\n{} API response {}", self.esp_name, status)?;
		}
		if let Some(body) = self.response_body.as_deref().filter(|b| !b.is_empty()) {
			write!(f, ": {}", body)?;
		}
		if let Some(message) = &self.email_message {
			let recipients: Vec<&str> = message.all_recipients().map(|a| a.addr_spec()).collect();
			write!(
				f,
				"\nSending a message to {} with subject {:?}",
				recipients.join(", "),
				message.subject()
			)?;
		}
		Ok(())
	}
}

impl std::error::Error for ApiError {}

pub type EmailResult<T> = std::result::Result<T, EmailError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_unsupported_feature_message_lists_features() {
		let err = EmailError::UnsupportedFeature {
			esp_name: "Brevo".to_string(),
			features: vec!["inline attachments".to_string(), "multiple html parts".to_string()],
		};

		assert!(err.is_unsupported_feature());
		assert_eq!(
			err.to_string(),
			"Brevo does not support inline attachments, multiple html parts"
		);
	}

	#[rstest]
	fn test_api_error_display_includes_response_and_message() {
		// Arrange
		let message = EmailMessage::builder()
			.from("from@example.com")
			.to(vec!["to@example.com".to_string()])
			.subject("Hello")
			.build()
			.unwrap();
		let response = EspResponse::new(200, r#"{"foo": "bar"}"#);

		// Act
		let err = EmailError::from(
			ApiError::new("Brevo", "Invalid Brevo API response format").with_response(&response),
		)
		.with_email_message(&message);

		// Assert
		let text = err.to_string();
		assert!(text.starts_with("Invalid Brevo API response format"));
		assert!(text.contains(r#"Brevo API response 200: {"foo": "bar"}"#));
		assert!(text.contains("to@example.com"));
		assert!(!err.is_unsupported_feature());
	}

	#[rstest]
	fn test_with_email_message_leaves_other_errors_alone() {
		let message = EmailMessage::builder()
			.from("from@example.com")
			.build()
			.unwrap();

		let err = EmailError::Request("timed out".to_string()).with_email_message(&message);

		assert!(matches!(err, EmailError::Request(ref s) if s == "timed out"));
	}
}
