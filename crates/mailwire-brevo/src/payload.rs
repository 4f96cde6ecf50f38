//! Brevo request body
//!
//! The payload is built in two phases. The [`EspPayload`] setters only assign
//! fields; [`BrevoPayload::finalize`] then derives the request body, which is
//! where batch sends get split into `messageVersions` and per-recipient
//! metadata is merged. Finalizing does not consume or change the payload, so
//! it can be repeated (e.g. for error diagnostics).

use crate::ESP_NAME;
use mailwire_core::{
	Attachment, CaseInsensitiveHeaders, EmailAddress, EmailResult, EspPayload, MergeData,
	MergeMetadata, Metadata, RecipientKind, SendAt, UnsupportedFeatures,
};
use serde_json::{Map, Value, json};

/// Brevo has no metadata field; metadata travels as JSON in this header.
pub const METADATA_HEADER: &str = "X-Mailin-custom";

#[derive(Debug, Clone, Default)]
pub struct BrevoPayload {
	data: Map<String, Value>,
	headers: CaseInsensitiveHeaders,
	is_batch: bool,
	merge_data: MergeData,
	metadata: Metadata,
	merge_metadata: MergeMetadata,
	all_recipients: Vec<EmailAddress>,
	to_recipients: Vec<EmailAddress>,
	unsupported: UnsupportedFeatures,
}

impl BrevoPayload {
	/// Endpoint, relative to the API base URL.
	pub const API_ENDPOINT: &'static str = "smtp/email";

	/// Start an empty payload. `is_batch` sends each "to" recipient an
	/// individual message version.
	pub fn new(is_batch: bool) -> Self {
		Self {
			is_batch,
			..Self::default()
		}
	}

	pub fn is_batch(&self) -> bool {
		self.is_batch
	}

	/// Every recipient in setter order: to, then cc, then bcc.
	pub fn all_recipients(&self) -> &[EmailAddress] {
		&self.all_recipients
	}

	/// The "to" recipients, in the order Brevo returns batch `messageIds`.
	pub fn to_recipients(&self) -> &[EmailAddress] {
		&self.to_recipients
	}

	/// Fields assigned so far, before finalization.
	pub fn data(&self) -> &Map<String, Value> {
		&self.data
	}

	/// Derive the request body from the accumulated fields.
	pub fn finalize(&self) -> EmailResult<Map<String, Value>> {
		let mut data = self.data.clone();

		if self.is_batch {
			let to_list = match data.remove("to") {
				Some(Value::Array(to_list)) => to_list,
				_ => Vec::new(),
			};
			let versions = to_list
				.into_iter()
				.map(|to| self.message_version(to))
				.collect::<EmailResult<Vec<_>>>()?;
			data.insert("messageVersions".to_string(), Value::Array(versions));
		}

		// don't send empty headers
		if !self.headers.is_empty() {
			data.insert("headers".to_string(), self.headers.to_json());
		}

		Ok(data)
	}

	/// The finalized request body as JSON text.
	pub fn serialize_data(&self) -> EmailResult<String> {
		Ok(serde_json::to_string(&self.finalize()?)?)
	}

	fn message_version(&self, to: Value) -> EmailResult<Value> {
		let email = to
			.get("email")
			.and_then(Value::as_str)
			.unwrap_or_default()
			.to_string();

		let params = self
			.merge_data
			.get(&email)
			.map(|params| Value::Object(params.clone()))
			.unwrap_or(Value::Null);

		let mut version = Map::new();
		version.insert("to".to_string(), Value::Array(vec![to]));
		version.insert("params".to_string(), params);

		// Recipients without an override fall back to the top-level header,
		// which already carries the global metadata.
		if let Some(recipient_metadata) = self.merge_metadata.get(&email) {
			let mut merged = self.metadata.clone();
			merged.extend(recipient_metadata.clone());
			let custom = serde_json::to_string(&merged)?;
			version.insert("headers".to_string(), json!({ METADATA_HEADER: custom }));
		}

		Ok(Value::Object(version))
	}

	fn email_object(email: &EmailAddress) -> Value {
		let mut object = Map::new();
		object.insert("email".to_string(), Value::from(email.addr_spec()));
		if let Some(name) = email.display_name() {
			object.insert("name".to_string(), Value::from(name));
		}
		Value::Object(object)
	}
}

impl EspPayload for BrevoPayload {
	fn esp_name(&self) -> &str {
		ESP_NAME
	}

	fn unsupported_features(&self) -> &UnsupportedFeatures {
		&self.unsupported
	}

	fn unsupported_features_mut(&mut self) -> &mut UnsupportedFeatures {
		&mut self.unsupported
	}

	fn set_from_email(&mut self, email: &EmailAddress) {
		self.data
			.insert("sender".to_string(), Self::email_object(email));
	}

	fn set_recipients(&mut self, kind: RecipientKind, emails: &[EmailAddress]) {
		if emails.is_empty() {
			return;
		}

		let objects = emails.iter().map(Self::email_object).collect();
		self.data
			.insert(kind.as_str().to_string(), Value::Array(objects));
		self.all_recipients.extend_from_slice(emails);
		if kind == RecipientKind::To {
			self.to_recipients = emails.to_vec();
		}
	}

	fn set_subject(&mut self, subject: &str) {
		// An empty subject may come from the template.
		if !subject.is_empty() {
			self.data
				.insert("subject".to_string(), Value::from(subject));
		}
	}

	fn set_reply_to(&mut self, emails: &[EmailAddress]) {
		if emails.len() > 1 {
			self.unsupported_feature("multiple reply_to addresses");
		}
		if let Some(first) = emails.first() {
			self.data
				.insert("replyTo".to_string(), Self::email_object(first));
		}
	}

	fn set_extra_headers(&mut self, headers: &[(String, Value)]) {
		// Brevo only accepts string header values.
		self.headers.extend(headers.iter().map(|(name, value)| {
			let value = match value {
				Value::Number(number) => Value::String(number.to_string()),
				Value::Bool(flag) => Value::String(flag.to_string()),
				other => other.clone(),
			};
			(name.clone(), value)
		}));
	}

	fn set_text_body(&mut self, body: &str) {
		if !body.is_empty() {
			self.data
				.insert("textContent".to_string(), Value::from(body));
		}
	}

	fn set_html_body(&mut self, body: &str) {
		if body.is_empty() {
			return;
		}
		if self.data.contains_key("htmlContent") {
			self.unsupported_feature("multiple html parts");
			return;
		}
		self.data
			.insert("htmlContent".to_string(), Value::from(body));
	}

	fn add_attachment(&mut self, attachment: &Attachment) {
		if attachment.is_inline() {
			self.unsupported_feature("inline attachments");
		}

		let entry = json!({
			"name": attachment.filename(),
			"content": attachment.b64content(),
		});
		match self.data.get_mut("attachment") {
			Some(Value::Array(attachments)) => attachments.push(entry),
			_ => {
				self.data
					.insert("attachment".to_string(), Value::Array(vec![entry]));
			}
		}
	}

	fn set_metadata(&mut self, metadata: &Metadata) {
		self.headers.insert(
			METADATA_HEADER,
			Value::Object(metadata.clone()).to_string(),
		);
		self.metadata = metadata.clone();
	}

	fn set_send_at(&mut self, send_at: &SendAt) {
		self.data
			.insert("scheduledAt".to_string(), Value::from(send_at.to_iso_string()));
	}

	fn set_tags(&mut self, tags: &[String]) {
		if !tags.is_empty() {
			self.data.insert("tags".to_string(), json!(tags));
		}
	}

	fn set_template_id(&mut self, template_id: &str) {
		// Brevo template ids are integers; anything else is passed through.
		let value = template_id
			.trim()
			.parse::<i64>()
			.map(Value::from)
			.unwrap_or_else(|_| Value::from(template_id));
		self.data.insert("templateId".to_string(), value);
	}

	fn set_merge_data(&mut self, merge_data: &MergeData) {
		self.merge_data = merge_data.clone();
	}

	fn set_merge_global_data(&mut self, merge_global_data: &Metadata) {
		self.data.insert(
			"params".to_string(),
			Value::Object(merge_global_data.clone()),
		);
	}

	fn set_merge_metadata(&mut self, merge_metadata: &MergeMetadata) {
		self.merge_metadata = merge_metadata.clone();
	}

	fn set_esp_extra(&mut self, extra: &Metadata) {
		for (key, value) in extra {
			match (key.as_str(), value) {
				("headers", Value::Object(headers)) => {
					self.headers = headers
						.iter()
						.map(|(name, value)| (name.clone(), value.clone()))
						.collect();
				}
				_ => {
					self.data.insert(key.clone(), value.clone());
				}
			}
		}
	}
}
