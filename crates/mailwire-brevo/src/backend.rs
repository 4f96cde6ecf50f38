//! Brevo email backend
//!
//! Builds a [`BrevoPayload`] per message, POSTs it to `smtp/email` and turns
//! the response into a per-recipient [`SendStatus`].

use crate::ESP_NAME;
use crate::payload::BrevoPayload;
use crate::settings::BrevoSettings;
use async_trait::async_trait;
use mailwire_core::{
	ApiError, DeliveryStatus, EmailBackend, EmailError, EmailMessage, EmailResult, EspPayload,
	EspResponse, HttpTransport, RecipientStatus, SendDefaults, SendStatus, drive_payload,
};
use reqwest::Client;
use serde_json::Value;

/// Brevo email backend
///
/// # Examples
///
/// ```no_run
/// use mailwire_brevo::{BrevoBackend, BrevoSettings};
/// use mailwire_core::{EmailBackend, EmailMessage};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = BrevoBackend::from_env()?;
///
///     let email = EmailMessage::builder()
///         .from("sender@example.com")
///         .to(vec!["recipient@example.com".to_string()])
///         .subject("Test")
///         .body("Hello!")
///         .build()?;
///
///     let sent = backend.send_messages(&[email]).await?;
///     assert_eq!(sent, 1);
///     Ok(())
/// }
/// ```
pub struct BrevoBackend {
	api_key: String,
	transport: HttpTransport,
	ignore_unsupported_features: bool,
	send_defaults: SendDefaults,
}

impl BrevoBackend {
	/// Create a backend from settings. The API key is required.
	pub fn new(settings: BrevoSettings) -> EmailResult<Self> {
		Self::check_api_key(&settings)?;
		let transport = HttpTransport::new(ESP_NAME, settings.api_url(), settings.timeout())?;
		Ok(Self::from_parts(settings, transport))
	}

	/// Create a Brevo backend with custom client
	///
	/// The client's own timeout applies; `settings.timeout_secs` is ignored.
	pub fn with_client(settings: BrevoSettings, client: Client) -> EmailResult<Self> {
		Self::check_api_key(&settings)?;
		let transport = HttpTransport::with_client(ESP_NAME, settings.api_url(), client);
		Ok(Self::from_parts(settings, transport))
	}

	/// Create a backend configured from environment variables
	pub fn from_env() -> EmailResult<Self> {
		Self::new(BrevoSettings::from_env()?)
	}

	fn check_api_key(settings: &BrevoSettings) -> EmailResult<()> {
		if settings.api_key.trim().is_empty() {
			return Err(EmailError::ImproperlyConfigured(format!(
				"{} backend requires an api_key",
				ESP_NAME
			)));
		}
		Ok(())
	}

	fn from_parts(settings: BrevoSettings, transport: HttpTransport) -> Self {
		Self {
			api_key: settings.api_key,
			transport,
			ignore_unsupported_features: settings.ignore_unsupported_features,
			send_defaults: settings.send_defaults,
		}
	}

	/// The API base URL, ending with `/`.
	pub fn api_url(&self) -> &str {
		self.transport.api_url()
	}

	/// Translate a message into a Brevo payload. No I/O.
	///
	/// Fails with [`EmailError::UnsupportedFeature`] when the message uses
	/// features Brevo cannot express, unless the backend is configured to
	/// ignore them.
	pub fn build_message_payload(
		&self,
		message: &EmailMessage,
		defaults: &SendDefaults,
	) -> EmailResult<BrevoPayload> {
		let mut payload = BrevoPayload::new(message.is_batch());
		drive_payload(&mut payload, message, defaults);
		payload
			.unsupported_features()
			.check(ESP_NAME, self.ignore_unsupported_features)?;
		Ok(payload)
	}

	fn request_headers(&self) -> [(&str, &str); 3] {
		[
			("api-key", self.api_key.as_str()),
			("Content-Type", "application/json"),
			("Accept", "application/json"),
		]
	}

	/// Map Brevo's response onto every recipient of the payload.
	///
	/// Brevo gives no per-recipient detail on success, so everyone starts
	/// out queued. A single `messageId` applies to all recipients; batch
	/// `messageIds` line up with the "to" recipients by position, and anyone
	/// not covered (cc, bcc, or extra "to" addresses) keeps no id.
	pub fn parse_recipient_status(
		&self,
		response: &EspResponse,
		payload: &BrevoPayload,
		message: &EmailMessage,
	) -> EmailResult<SendStatus> {
		let mut message_id = None;
		let mut message_ids = Vec::new();

		if !response.is_empty() {
			let parsed = response.json().map_err(|_| {
				Self::api_error("Invalid JSON in Brevo API response", response, payload, message)
			})?;

			match (parsed.get("messageId"), parsed.get("messageIds")) {
				(Some(id), _) => message_id = id_string(id),
				(None, Some(Value::Array(ids))) => message_ids = ids.iter().map(id_string).collect(),
				(None, Some(Value::Null)) => {}
				_ => {
					return Err(Self::api_error(
						"Invalid Brevo API response format",
						response,
						payload,
						message,
					));
				}
			}
		}

		let mut status: SendStatus = payload
			.all_recipients()
			.iter()
			.map(|recipient| {
				(
					recipient.addr_spec().to_string(),
					RecipientStatus::new(message_id.clone(), DeliveryStatus::Queued),
				)
			})
			.collect();

		for (to, id) in payload.to_recipients().iter().zip(message_ids) {
			status.insert(to.addr_spec(), RecipientStatus::new(id, DeliveryStatus::Queued));
		}

		Ok(status)
	}

	fn api_error(
		description: &str,
		response: &EspResponse,
		payload: &BrevoPayload,
		message: &EmailMessage,
	) -> EmailError {
		let mut error = ApiError::new(ESP_NAME, description)
			.with_response(response)
			.with_email_message(message);
		if let Ok(body) = payload.serialize_data() {
			error = error.with_payload(body);
		}
		error.into()
	}

	/// Send one message and report the status of each recipient.
	pub async fn send_message(&self, message: &EmailMessage) -> EmailResult<SendStatus> {
		let payload = self.build_message_payload(message, &self.send_defaults)?;
		let body = payload.serialize_data()?;

		let response = self
			.transport
			.post_json(BrevoPayload::API_ENDPOINT, &self.request_headers(), body)
			.await
			.map_err(|e| e.with_email_message(message))?;

		let status = self.parse_recipient_status(&response, &payload, message)?;
		tracing::debug!(
			esp = ESP_NAME,
			recipients = status.len(),
			message_id = status.message_id().unwrap_or_default(),
			batch = payload.is_batch(),
			"message accepted"
		);
		Ok(status)
	}
}

fn id_string(value: &Value) -> Option<String> {
	match value {
		Value::Null => None,
		Value::String(id) => Some(id.clone()),
		other => Some(other.to_string()),
	}
}

#[async_trait]
impl EmailBackend for BrevoBackend {
	async fn send_messages(&self, messages: &[EmailMessage]) -> EmailResult<usize> {
		let mut sent = 0;
		for message in messages {
			self.send_message(message).await?;
			sent += 1;
		}
		Ok(sent)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn backend() -> BrevoBackend {
		BrevoBackend::with_client(BrevoSettings::new("test-api-key"), Client::new()).unwrap()
	}

	#[fixture]
	fn message() -> EmailMessage {
		EmailMessage::builder()
			.from("from@example.com")
			.to(vec!["to1@example.com".to_string(), "to2@example.com".to_string()])
			.cc(vec!["cc@example.com".to_string()])
			.bcc(vec!["bcc@example.com".to_string()])
			.subject("Subject")
			.body("Body")
			.build()
			.unwrap()
	}

	fn status_of<'a>(status: &'a SendStatus, addr: &str) -> (Option<&'a str>, DeliveryStatus) {
		let recipient = status.get(addr).unwrap();
		(recipient.message_id.as_deref(), recipient.status)
	}

	#[rstest]
	fn test_new_requires_api_key() {
		let result = BrevoBackend::with_client(BrevoSettings::default(), Client::new());

		assert!(matches!(result, Err(EmailError::ImproperlyConfigured(_))));
	}

	#[rstest]
	#[case("https://api.brevo.com/v3/", "https://api.brevo.com/v3/")]
	#[case("http://localhost:8025/v3", "http://localhost:8025/v3/")]
	fn test_api_url_is_normalized(#[case] api_url: &str, #[case] expected: &str) {
		let settings = BrevoSettings::new("key").with_api_url(api_url);

		let backend = BrevoBackend::with_client(settings, Client::new()).unwrap();

		assert_eq!(backend.api_url(), expected);
	}

	#[rstest]
	fn test_request_headers_carry_api_key(backend: BrevoBackend) {
		let headers = backend.request_headers();

		assert!(headers.contains(&("api-key", "test-api-key")));
		assert!(headers.contains(&("Content-Type", "application/json")));
	}

	#[rstest]
	fn test_empty_response_queues_everyone(backend: BrevoBackend, message: EmailMessage) {
		// Arrange
		let payload = backend
			.build_message_payload(&message, &SendDefaults::default())
			.unwrap();

		// Act
		let status = backend
			.parse_recipient_status(&EspResponse::new(201, ""), &payload, &message)
			.unwrap();

		// Assert
		assert_eq!(status.len(), 4);
		for recipient in status.recipients().values() {
			assert_eq!(recipient, &RecipientStatus::queued());
		}
	}

	#[rstest]
	fn test_single_message_id_applies_to_all(backend: BrevoBackend, message: EmailMessage) {
		let payload = backend
			.build_message_payload(&message, &SendDefaults::default())
			.unwrap();

		let status = backend
			.parse_recipient_status(&EspResponse::new(201, r#"{"messageId": "abc"}"#), &payload, &message)
			.unwrap();

		assert_eq!(status.message_id(), Some("abc"));
		assert_eq!(status_of(&status, "bcc@example.com"), (Some("abc"), DeliveryStatus::Queued));
	}

	#[rstest]
	fn test_batch_message_ids_zip_with_to(backend: BrevoBackend) {
		// Arrange
		let message = EmailMessage::builder()
			.from("from@example.com")
			.to(vec!["to1@example.com".to_string(), "to2@example.com".to_string()])
			.cc(vec!["cc@example.com".to_string()])
			.batch()
			.build()
			.unwrap();
		let payload = backend
			.build_message_payload(&message, &SendDefaults::default())
			.unwrap();
		let response = EspResponse::new(201, r#"{"messageIds": ["a", "b"]}"#);

		// Act
		let status = backend
			.parse_recipient_status(&response, &payload, &message)
			.unwrap();

		// Assert
		assert_eq!(status_of(&status, "to1@example.com"), (Some("a"), DeliveryStatus::Queued));
		assert_eq!(status_of(&status, "to2@example.com"), (Some("b"), DeliveryStatus::Queued));
		assert_eq!(status_of(&status, "cc@example.com"), (None, DeliveryStatus::Queued));
		assert_eq!(status.message_id(), None);
	}

	#[rstest]
	fn test_null_message_ids_keep_everyone_queued(backend: BrevoBackend, message: EmailMessage) {
		// Arrange
		let payload = backend
			.build_message_payload(&message, &SendDefaults::default())
			.unwrap();

		// Act
		let status = backend
			.parse_recipient_status(&EspResponse::new(201, r#"{"messageIds": null}"#), &payload, &message)
			.unwrap();

		// Assert
		assert_eq!(status.len(), 4);
		for recipient in status.recipients().values() {
			assert_eq!(recipient, &RecipientStatus::queued());
		}
	}

	#[rstest]
	fn test_short_message_ids_leave_remaining_to_without_id(
		backend: BrevoBackend,
		message: EmailMessage,
	) {
		let payload = backend
			.build_message_payload(&message, &SendDefaults::default())
			.unwrap();

		let status = backend
			.parse_recipient_status(&EspResponse::new(201, r#"{"messageIds": ["only"]}"#), &payload, &message)
			.unwrap();

		assert_eq!(status_of(&status, "to1@example.com"), (Some("only"), DeliveryStatus::Queued));
		assert_eq!(status_of(&status, "to2@example.com"), (None, DeliveryStatus::Queued));
	}

	#[rstest]
	#[case(r#"{"foo": "bar"}"#, "Invalid Brevo API response format")]
	#[case(r#"["abc"]"#, "Invalid Brevo API response format")]
	#[case(r#"{"messageIds": "abc"}"#, "Invalid Brevo API response format")]
	#[case("<html>oops</html>", "Invalid JSON in Brevo API response")]
	fn test_unusable_response_is_api_error(
		backend: BrevoBackend,
		message: EmailMessage,
		#[case] body: &str,
		#[case] description: &str,
	) {
		// Arrange
		let payload = backend
			.build_message_payload(&message, &SendDefaults::default())
			.unwrap();

		// Act
		let err = backend
			.parse_recipient_status(&EspResponse::new(201, body), &payload, &message)
			.unwrap_err();

		// Assert
		let EmailError::Api(api) = err else {
			panic!("expected API error, got {:?}", err);
		};
		assert_eq!(api.description(), description);
		assert_eq!(api.response_body(), Some(body));
		assert_eq!(api.status_code(), Some(201));
		assert!(api.payload().is_some_and(|p| p.contains("to1@example.com")));
		assert_eq!(api.email_message().map(|m| m.subject()), Some("Subject"));
	}

	#[rstest]
	fn test_unsupported_features_fail_the_build(backend: BrevoBackend) {
		let message = EmailMessage::builder()
			.from("from@example.com")
			.reply_to(vec!["a@example.com".to_string(), "b@example.com".to_string()])
			.build()
			.unwrap();

		let err = backend
			.build_message_payload(&message, &SendDefaults::default())
			.unwrap_err();

		assert!(err.is_unsupported_feature());
		assert!(err.to_string().contains("multiple reply_to addresses"));
	}

	#[rstest]
	fn test_unsupported_features_can_be_ignored() {
		let settings = BrevoSettings::new("key").with_ignore_unsupported_features(true);
		let backend = BrevoBackend::with_client(settings, Client::new()).unwrap();
		let message = EmailMessage::builder()
			.from("from@example.com")
			.reply_to(vec!["a@example.com".to_string(), "b@example.com".to_string()])
			.build()
			.unwrap();

		let payload = backend
			.build_message_payload(&message, &SendDefaults::default())
			.unwrap();

		assert_eq!(payload.unsupported_features().len(), 1);
	}

	#[rstest]
	#[case(Value::Null, None)]
	#[case(Value::from("id"), Some("id"))]
	#[case(Value::from(42), Some("42"))]
	fn test_id_string(#[case] value: Value, #[case] expected: Option<&str>) {
		assert_eq!(id_string(&value).as_deref(), expected);
	}
}
