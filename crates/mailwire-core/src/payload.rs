//! ESP payload construction
//!
//! Every backend accumulates its vendor-specific request body through the
//! [`EspPayload`] setters. [`drive_payload`] calls those setters in a fixed
//! order, so backends only ever see one field at a time and never need to know
//! the layout of [`EmailMessage`].
//!
//! Features an ESP cannot express are not dropped silently: setters record them
//! on an [`UnsupportedFeatures`] accumulator, and the backend decides afterwards
//! whether that is an error or only worth a warning.

use crate::address::EmailAddress;
use crate::message::{Alternative, Attachment, EmailMessage, MergeData, MergeMetadata, Metadata, SendAt};
use crate::{EmailError, EmailResult};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Which recipient header a list of addresses belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipientKind {
	To,
	Cc,
	Bcc,
}

impl RecipientKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			RecipientKind::To => "to",
			RecipientKind::Cc => "cc",
			RecipientKind::Bcc => "bcc",
		}
	}
}

impl fmt::Display for RecipientKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Message features a payload could not express.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsupportedFeatures {
	features: Vec<String>,
}

impl UnsupportedFeatures {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, feature: impl Into<String>) {
		self.features.push(feature.into());
	}

	pub fn is_empty(&self) -> bool {
		self.features.is_empty()
	}

	pub fn len(&self) -> usize {
		self.features.len()
	}

	pub fn as_slice(&self) -> &[String] {
		&self.features
	}

	/// Turn the collected features into an error, or log and accept them.
	///
	/// With `ignore` set every feature is reported through `tracing::warn!`
	/// and the send goes ahead without it.
	pub fn check(&self, esp_name: &str, ignore: bool) -> EmailResult<()> {
		if self.features.is_empty() {
			return Ok(());
		}

		if ignore {
			for feature in &self.features {
				tracing::warn!(esp = esp_name, feature = %feature, "ignoring unsupported feature");
			}
			return Ok(());
		}

		Err(EmailError::UnsupportedFeature {
			esp_name: esp_name.to_string(),
			features: self.features.clone(),
		})
	}
}

/// Values applied to every message a backend sends.
///
/// Message values win over defaults: metadata, merge global data and ESP
/// extra are merged key by key, and default tags are sent before the
/// message's own tags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SendDefaults {
	pub tags: Vec<String>,
	pub metadata: Metadata,
	pub merge_global_data: Metadata,
	pub esp_extra: Metadata,
}

impl SendDefaults {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
		self.tags.push(tag.into());
		self
	}

	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	pub fn with_esp_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.esp_extra.insert(key.into(), value.into());
		self
	}

	fn tags_for(&self, message: &EmailMessage) -> Vec<String> {
		self.tags
			.iter()
			.chain(message.tags())
			.cloned()
			.collect()
	}

	fn merge_over(defaults: &Metadata, values: Option<&Metadata>) -> Metadata {
		let mut merged = defaults.clone();
		if let Some(values) = values {
			merged.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
		}
		merged
	}
}

/// A vendor request body under construction.
///
/// Setters for optional ESP features default to reporting the feature as
/// unsupported; backends override the ones their API can express.
pub trait EspPayload {
	fn esp_name(&self) -> &str;

	fn unsupported_features(&self) -> &UnsupportedFeatures;

	fn unsupported_features_mut(&mut self) -> &mut UnsupportedFeatures;

	fn unsupported_feature(&mut self, feature: &str) {
		self.unsupported_features_mut().push(feature);
	}

	fn set_from_email(&mut self, email: &EmailAddress);

	fn set_recipients(&mut self, kind: RecipientKind, emails: &[EmailAddress]);

	fn set_subject(&mut self, subject: &str);

	fn set_reply_to(&mut self, emails: &[EmailAddress]);

	fn set_extra_headers(&mut self, headers: &[(String, Value)]);

	fn set_text_body(&mut self, body: &str);

	fn set_html_body(&mut self, body: &str);

	/// HTML alternatives become (additional) HTML bodies; anything else is
	/// reported as unsupported.
	fn add_alternative(&mut self, alternative: &Alternative) {
		match alternative.content_as_str() {
			Some(html) if alternative.is_html() => self.set_html_body(html),
			_ => self.unsupported_feature(&format!(
				"alternative part with type '{}'",
				alternative.content_type()
			)),
		}
	}

	fn add_attachment(&mut self, attachment: &Attachment);

	fn set_metadata(&mut self, _metadata: &Metadata) {
		self.unsupported_feature("metadata");
	}

	fn set_send_at(&mut self, _send_at: &SendAt) {
		self.unsupported_feature("send_at");
	}

	fn set_tags(&mut self, _tags: &[String]) {
		self.unsupported_feature("tags");
	}

	fn set_track_clicks(&mut self, _track_clicks: bool) {
		self.unsupported_feature("track_clicks");
	}

	fn set_track_opens(&mut self, _track_opens: bool) {
		self.unsupported_feature("track_opens");
	}

	fn set_template_id(&mut self, _template_id: &str) {
		self.unsupported_feature("template_id");
	}

	fn set_merge_data(&mut self, _merge_data: &MergeData) {
		self.unsupported_feature("merge_data");
	}

	fn set_merge_global_data(&mut self, _merge_global_data: &Metadata) {
		self.unsupported_feature("merge_global_data");
	}

	fn set_merge_metadata(&mut self, _merge_metadata: &MergeMetadata) {
		self.unsupported_feature("merge_metadata");
	}

	fn set_esp_extra(&mut self, _extra: &Metadata) {
		self.unsupported_feature("esp_extra");
	}
}

/// Feed `message` (with `defaults` applied) into `payload`.
///
/// Setter order is fixed: sender, to/cc/bcc, subject, reply-to, headers,
/// bodies, attachments, then the ESP extensions with `esp_extra` last so raw
/// vendor fields can override anything set before.
pub fn drive_payload<P: EspPayload + ?Sized>(
	payload: &mut P,
	message: &EmailMessage,
	defaults: &SendDefaults,
) {
	payload.set_from_email(message.from_email());
	payload.set_recipients(RecipientKind::To, message.to());
	payload.set_recipients(RecipientKind::Cc, message.cc());
	payload.set_recipients(RecipientKind::Bcc, message.bcc());
	payload.set_subject(message.subject());

	if !message.reply_to().is_empty() {
		payload.set_reply_to(message.reply_to());
	}
	if !message.headers().is_empty() {
		payload.set_extra_headers(message.headers());
	}

	payload.set_text_body(message.body());
	if let Some(html) = message.html_body() {
		payload.set_html_body(html);
	}
	for alternative in message.alternatives() {
		payload.add_alternative(alternative);
	}
	for attachment in message.attachments() {
		payload.add_attachment(attachment);
	}

	let metadata = SendDefaults::merge_over(&defaults.metadata, Some(message.metadata()));
	if !metadata.is_empty() {
		payload.set_metadata(&metadata);
	}
	if let Some(send_at) = message.send_at() {
		payload.set_send_at(send_at);
	}
	let tags = defaults.tags_for(message);
	if !tags.is_empty() {
		payload.set_tags(&tags);
	}
	if let Some(track_clicks) = message.track_clicks() {
		payload.set_track_clicks(track_clicks);
	}
	if let Some(track_opens) = message.track_opens() {
		payload.set_track_opens(track_opens);
	}
	if let Some(template_id) = message.template_id() {
		payload.set_template_id(template_id);
	}
	if let Some(merge_data) = message.merge_data() {
		payload.set_merge_data(merge_data);
	}
	if message.merge_global_data().is_some() || !defaults.merge_global_data.is_empty() {
		let merge_global_data =
			SendDefaults::merge_over(&defaults.merge_global_data, message.merge_global_data());
		payload.set_merge_global_data(&merge_global_data);
	}
	if let Some(merge_metadata) = message.merge_metadata() {
		payload.set_merge_metadata(merge_metadata);
	}
	let esp_extra = SendDefaults::merge_over(&defaults.esp_extra, Some(message.esp_extra()));
	if !esp_extra.is_empty() {
		payload.set_esp_extra(&esp_extra);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	/// Records every setter call so ordering and defaults can be asserted.
	#[derive(Default)]
	struct RecordingPayload {
		calls: Vec<String>,
		unsupported: UnsupportedFeatures,
		tags: Vec<String>,
		metadata: Metadata,
		html: Vec<String>,
		esp_extra: Metadata,
	}

	impl EspPayload for RecordingPayload {
		fn esp_name(&self) -> &str {
			"Recording"
		}

		fn unsupported_features(&self) -> &UnsupportedFeatures {
			&self.unsupported
		}

		fn unsupported_features_mut(&mut self) -> &mut UnsupportedFeatures {
			&mut self.unsupported
		}

		fn set_from_email(&mut self, _email: &EmailAddress) {
			self.calls.push("from".into());
		}

		fn set_recipients(&mut self, kind: RecipientKind, _emails: &[EmailAddress]) {
			self.calls.push(kind.to_string());
		}

		fn set_subject(&mut self, _subject: &str) {
			self.calls.push("subject".into());
		}

		fn set_reply_to(&mut self, _emails: &[EmailAddress]) {
			self.calls.push("reply_to".into());
		}

		fn set_extra_headers(&mut self, _headers: &[(String, Value)]) {
			self.calls.push("headers".into());
		}

		fn set_text_body(&mut self, _body: &str) {
			self.calls.push("text".into());
		}

		fn set_html_body(&mut self, body: &str) {
			self.calls.push("html".into());
			self.html.push(body.to_string());
		}

		fn add_attachment(&mut self, _attachment: &Attachment) {
			self.calls.push("attachment".into());
		}

		fn set_metadata(&mut self, metadata: &Metadata) {
			self.calls.push("metadata".into());
			self.metadata = metadata.clone();
		}

		fn set_tags(&mut self, tags: &[String]) {
			self.calls.push("tags".into());
			self.tags = tags.to_vec();
		}

		fn set_template_id(&mut self, _template_id: &str) {
			self.calls.push("template_id".into());
		}

		fn set_esp_extra(&mut self, extra: &Metadata) {
			self.calls.push("esp_extra".into());
			self.esp_extra = extra.clone();
		}
	}

	#[rstest]
	fn test_setters_called_in_fixed_order() {
		// Arrange
		let message = EmailMessage::builder()
			.from("from@example.com")
			.to(vec!["to@example.com".to_string()])
			.reply_to(vec!["reply@example.com".to_string()])
			.header("X-Test", "1")
			.subject("Subject")
			.body("Text")
			.html("<p>HTML</p>")
			.attachment(Attachment::new("a.txt", b"a".to_vec()))
			.metadata("k", "v")
			.tag("t")
			.template_id("3")
			.esp_extra(json!({"x": 1}).as_object().unwrap().clone())
			.build()
			.unwrap();
		let mut payload = RecordingPayload::default();

		// Act
		drive_payload(&mut payload, &message, &SendDefaults::default());

		// Assert
		assert_eq!(
			payload.calls,
			vec![
				"from", "to", "cc", "bcc", "subject", "reply_to", "headers", "text", "html",
				"attachment", "metadata", "tags", "template_id", "esp_extra",
			]
		);
		assert!(payload.unsupported_features().is_empty());
	}

	#[rstest]
	fn test_defaults_are_merged_under_message_values() {
		// Arrange
		let defaults = SendDefaults::new()
			.with_tag("default-tag")
			.with_metadata("env", "prod")
			.with_metadata("user", "nobody")
			.with_esp_extra("batchId", "default");
		let message = EmailMessage::builder()
			.from("from@example.com")
			.tag("message-tag")
			.metadata("user", "alice")
			.build()
			.unwrap();
		let mut payload = RecordingPayload::default();

		// Act
		drive_payload(&mut payload, &message, &defaults);

		// Assert
		assert_eq!(payload.tags, vec!["default-tag", "message-tag"]);
		assert_eq!(
			Value::Object(payload.metadata.clone()),
			json!({"env": "prod", "user": "alice"})
		);
		assert_eq!(payload.esp_extra.get("batchId"), Some(&json!("default")));
	}

	#[rstest]
	fn test_unimplemented_features_are_reported() {
		let message = EmailMessage::builder()
			.from("from@example.com")
			.track_clicks(true)
			.track_opens(false)
			.send_at("2024-01-01T00:00:00Z")
			.alternative(Alternative::new("text/calendar", b"BEGIN:VCALENDAR".to_vec()))
			.build()
			.unwrap();
		let mut payload = RecordingPayload::default();

		drive_payload(&mut payload, &message, &SendDefaults::default());

		assert_eq!(
			payload.unsupported_features().as_slice(),
			[
				"alternative part with type 'text/calendar'",
				"send_at",
				"track_clicks",
				"track_opens",
			]
		);
	}

	#[rstest]
	fn test_html_alternatives_become_html_bodies() {
		let message = EmailMessage::builder()
			.from("from@example.com")
			.html("<p>one</p>")
			.alternative(Alternative::html("<p>two</p>"))
			.build()
			.unwrap();
		let mut payload = RecordingPayload::default();

		drive_payload(&mut payload, &message, &SendDefaults::default());

		assert_eq!(payload.html, vec!["<p>one</p>", "<p>two</p>"]);
	}

	#[rstest]
	fn test_check_errors_unless_ignored() {
		let mut features = UnsupportedFeatures::new();
		assert!(features.check("Recording", false).is_ok());

		features.push("inline attachments");

		let err = features.check("Recording", false).unwrap_err();
		assert!(err.is_unsupported_feature());
		assert!(features.check("Recording", true).is_ok());
	}
}
