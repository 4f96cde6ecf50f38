use crate::address::EmailAddress;
use crate::{EmailError, EmailResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Opaque key-value data attached to a message (also used for merge data).
pub type Metadata = serde_json::Map<String, Value>;

/// Per-recipient template variables, keyed by recipient `addr-spec`.
pub type MergeData = BTreeMap<String, Metadata>;

/// Per-recipient metadata overrides, keyed by recipient `addr-spec`.
pub type MergeMetadata = BTreeMap<String, Metadata>;

/// Represents an alternative content type for an email message.
///
/// Alternatives allow providing different representations of the same content,
/// typically used for HTML vs. plain text versions.
///
/// # Examples
///
/// ```
/// use mailwire_core::Alternative;
///
/// let alternative = Alternative::new("text/html", "<h1>Hello!</h1>".as_bytes().to_vec());
/// assert_eq!(alternative.content_type(), "text/html");
/// ```
#[derive(Debug, Clone)]
pub struct Alternative {
	/// MIME content type (e.g., "text/html", "text/calendar")
	content_type: String,
	/// Content data as bytes
	content: Vec<u8>,
}

impl Alternative {
	pub fn new(content_type: impl Into<String>, content: Vec<u8>) -> Self {
		Self {
			content_type: content_type.into(),
			content,
		}
	}

	/// Create an HTML alternative
	///
	/// # Examples
	///
	/// ```
	/// use mailwire_core::Alternative;
	///
	/// let html = Alternative::html("<h1>Welcome!</h1>");
	/// assert!(html.is_html());
	/// ```
	pub fn html(content: impl Into<String>) -> Self {
		Self::new("text/html", content.into().into_bytes())
	}

	pub fn content_type(&self) -> &str {
		&self.content_type
	}

	pub fn content(&self) -> &[u8] {
		&self.content
	}

	/// Get the content as string (if valid UTF-8)
	pub fn content_as_str(&self) -> Option<&str> {
		std::str::from_utf8(&self.content).ok()
	}

	/// Whether this alternative is an HTML body part.
	pub fn is_html(&self) -> bool {
		self.content_type
			.split(';')
			.next()
			.is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/html"))
	}
}

/// Represents a file attachment for an email message.
///
/// Attachments can be created from file paths or raw bytes.
/// The MIME type is guessed from the file extension.
///
/// # Examples
///
/// ```
/// use mailwire_core::Attachment;
///
/// let attachment = Attachment::new("hello.txt", b"Hello, world!".to_vec());
/// assert_eq!(attachment.filename(), "hello.txt");
/// assert_eq!(attachment.b64content(), "SGVsbG8sIHdvcmxkIQ==");
/// ```
#[derive(Debug, Clone)]
pub struct Attachment {
	filename: String,
	content: Vec<u8>,
	mime_type: String,
	/// Content-ID for inline attachments (e.g., for embedded images)
	content_id: Option<String>,
	inline: bool,
}

impl Attachment {
	pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
		let filename = filename.into();
		let mime_type = Self::detect_mime_type(&filename);

		Self {
			filename,
			content,
			mime_type,
			content_id: None,
			inline: false,
		}
	}

	/// Create a new attachment from a file path
	///
	/// # Examples
	///
	/// ```no_run
	/// use mailwire_core::Attachment;
	/// use std::path::PathBuf;
	///
	/// # fn main() -> std::io::Result<()> {
	/// let attachment = Attachment::from_path(PathBuf::from("/tmp/report.pdf"), "report.pdf")?;
	/// assert_eq!(attachment.mime_type(), "application/pdf");
	/// # Ok(())
	/// # }
	/// ```
	pub fn from_path(path: PathBuf, filename: impl Into<String>) -> std::io::Result<Self> {
		let content = std::fs::read(&path)?;
		Ok(Self::new(filename, content))
	}

	/// Create an inline attachment (for embedded images, etc.)
	pub fn inline(
		filename: impl Into<String>,
		content: Vec<u8>,
		content_id: impl Into<String>,
	) -> Self {
		let mut attachment = Self::new(filename, content);
		attachment.as_inline(content_id);
		attachment
	}

	pub fn as_inline(&mut self, content_id: impl Into<String>) -> &mut Self {
		self.content_id = Some(content_id.into());
		self.inline = true;
		self
	}

	pub fn filename(&self) -> &str {
		&self.filename
	}

	pub fn content(&self) -> &[u8] {
		&self.content
	}

	/// Content encoded as standard base64, the form ESP APIs expect.
	pub fn b64content(&self) -> String {
		STANDARD.encode(&self.content)
	}

	pub fn mime_type(&self) -> &str {
		&self.mime_type
	}

	pub fn content_id(&self) -> Option<&str> {
		self.content_id.as_deref()
	}

	pub fn is_inline(&self) -> bool {
		self.inline
	}

	fn detect_mime_type(filename: &str) -> String {
		mime_guess::from_path(filename)
			.first()
			.map(|mime| mime.to_string())
			.unwrap_or_else(|| "application/octet-stream".to_string())
	}
}

/// When a message should be sent.
///
/// Timestamps are rendered as ISO-8601 with millisecond precision; strings the
/// caller already formatted are passed to the ESP unchanged.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use mailwire_core::SendAt;
///
/// let at = SendAt::from(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
/// assert_eq!(at.to_iso_string(), "2024-03-01T09:30:00.000+00:00");
///
/// let raw = SendAt::from("2024-03-01T09:30:00Z");
/// assert_eq!(raw.to_iso_string(), "2024-03-01T09:30:00Z");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SendAt {
	Timestamp(DateTime<FixedOffset>),
	Formatted(String),
}

impl SendAt {
	pub fn to_iso_string(&self) -> String {
		match self {
			SendAt::Timestamp(timestamp) => timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
			SendAt::Formatted(formatted) => formatted.clone(),
		}
	}
}

impl<Tz: TimeZone> From<DateTime<Tz>> for SendAt {
	fn from(timestamp: DateTime<Tz>) -> Self {
		SendAt::Timestamp(timestamp.fixed_offset())
	}
}

impl From<String> for SendAt {
	fn from(formatted: String) -> Self {
		SendAt::Formatted(formatted)
	}
}

impl From<&str> for SendAt {
	fn from(formatted: &str) -> Self {
		SendAt::Formatted(formatted.to_string())
	}
}

/// Represents an email message with validated addresses.
///
/// All fields are private to enforce validation through the builder.
/// Besides the standard email fields, a message carries the ESP extensions
/// backends translate into vendor features: tags, metadata, templates,
/// merge data and scheduled sending.
#[derive(Debug, Clone)]
pub struct EmailMessage {
	subject: String,
	body: String,
	from_email: EmailAddress,
	to: Vec<EmailAddress>,
	cc: Vec<EmailAddress>,
	bcc: Vec<EmailAddress>,
	reply_to: Vec<EmailAddress>,
	html_body: Option<String>,
	alternatives: Vec<Alternative>,
	attachments: Vec<Attachment>,
	headers: Vec<(String, Value)>,
	tags: Vec<String>,
	metadata: Metadata,
	merge_metadata: Option<MergeMetadata>,
	merge_data: Option<MergeData>,
	merge_global_data: Option<Metadata>,
	template_id: Option<String>,
	send_at: Option<SendAt>,
	track_clicks: Option<bool>,
	track_opens: Option<bool>,
	esp_extra: Metadata,
}

impl EmailMessage {
	pub fn builder() -> EmailMessageBuilder {
		EmailMessageBuilder::default()
	}

	pub fn subject(&self) -> &str {
		&self.subject
	}

	/// Get the plain text body.
	pub fn body(&self) -> &str {
		&self.body
	}

	pub fn from_email(&self) -> &EmailAddress {
		&self.from_email
	}

	pub fn to(&self) -> &[EmailAddress] {
		&self.to
	}

	pub fn cc(&self) -> &[EmailAddress] {
		&self.cc
	}

	pub fn bcc(&self) -> &[EmailAddress] {
		&self.bcc
	}

	/// All envelope recipients: to, then cc, then bcc.
	pub fn all_recipients(&self) -> impl Iterator<Item = &EmailAddress> {
		self.to.iter().chain(&self.cc).chain(&self.bcc)
	}

	pub fn reply_to(&self) -> &[EmailAddress] {
		&self.reply_to
	}

	pub fn html_body(&self) -> Option<&str> {
		self.html_body.as_deref()
	}

	pub fn alternatives(&self) -> &[Alternative] {
		&self.alternatives
	}

	pub fn attachments(&self) -> &[Attachment] {
		&self.attachments
	}

	/// Get the custom headers, in the order they were added.
	pub fn headers(&self) -> &[(String, Value)] {
		&self.headers
	}

	pub fn tags(&self) -> &[String] {
		&self.tags
	}

	pub fn metadata(&self) -> &Metadata {
		&self.metadata
	}

	pub fn merge_metadata(&self) -> Option<&MergeMetadata> {
		self.merge_metadata.as_ref()
	}

	pub fn merge_data(&self) -> Option<&MergeData> {
		self.merge_data.as_ref()
	}

	pub fn merge_global_data(&self) -> Option<&Metadata> {
		self.merge_global_data.as_ref()
	}

	pub fn template_id(&self) -> Option<&str> {
		self.template_id.as_deref()
	}

	pub fn send_at(&self) -> Option<&SendAt> {
		self.send_at.as_ref()
	}

	pub fn track_clicks(&self) -> Option<bool> {
		self.track_clicks
	}

	pub fn track_opens(&self) -> Option<bool> {
		self.track_opens
	}

	pub fn esp_extra(&self) -> &Metadata {
		&self.esp_extra
	}

	/// Whether each "to" recipient gets an individual copy of the message.
	///
	/// Any per-recipient data (merge data or merge metadata) turns a send
	/// into a batch send.
	pub fn is_batch(&self) -> bool {
		self.merge_data.is_some() || self.merge_metadata.is_some()
	}

	/// Send the email using the given backend.
	pub async fn send(&self, backend: &dyn crate::backend::EmailBackend) -> EmailResult<()> {
		backend.send_messages(std::slice::from_ref(self)).await?;
		Ok(())
	}
}

#[derive(Default)]
pub struct EmailMessageBuilder {
	subject: String,
	body: String,
	from_email: String,
	to: Vec<String>,
	cc: Vec<String>,
	bcc: Vec<String>,
	reply_to: Vec<String>,
	html_body: Option<String>,
	alternatives: Vec<Alternative>,
	attachments: Vec<Attachment>,
	headers: Vec<(String, Value)>,
	tags: Vec<String>,
	metadata: Metadata,
	merge_metadata: Option<MergeMetadata>,
	merge_data: Option<MergeData>,
	merge_global_data: Option<Metadata>,
	template_id: Option<String>,
	send_at: Option<SendAt>,
	track_clicks: Option<bool>,
	track_opens: Option<bool>,
	esp_extra: Metadata,
}

impl EmailMessageBuilder {
	pub fn subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = subject.into();
		self
	}

	pub fn body(mut self, body: impl Into<String>) -> Self {
		self.body = body.into();
		self
	}

	pub fn from(mut self, from: impl Into<String>) -> Self {
		self.from_email = from.into();
		self
	}

	pub fn to(mut self, to: Vec<String>) -> Self {
		self.to = to;
		self
	}

	pub fn cc(mut self, cc: Vec<String>) -> Self {
		self.cc = cc;
		self
	}

	pub fn bcc(mut self, bcc: Vec<String>) -> Self {
		self.bcc = bcc;
		self
	}

	pub fn reply_to(mut self, reply_to: Vec<String>) -> Self {
		self.reply_to = reply_to;
		self
	}

	pub fn html(mut self, html: impl Into<String>) -> Self {
		self.html_body = Some(html.into());
		self
	}

	pub fn alternative(mut self, alternative: Alternative) -> Self {
		self.alternatives.push(alternative);
		self
	}

	pub fn attachment(mut self, attachment: Attachment) -> Self {
		self.attachments.push(attachment);
		self
	}

	pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	pub fn tag(mut self, tag: impl Into<String>) -> Self {
		self.tags.push(tag.into());
		self
	}

	pub fn tags(mut self, tags: Vec<String>) -> Self {
		self.tags = tags;
		self
	}

	pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	/// Per-recipient metadata, merged over the global metadata for that recipient.
	pub fn merge_metadata(mut self, recipient: impl Into<String>, metadata: Metadata) -> Self {
		self.merge_metadata
			.get_or_insert_with(MergeMetadata::new)
			.insert(recipient.into(), metadata);
		self
	}

	/// Template variables for one recipient.
	pub fn merge_data(mut self, recipient: impl Into<String>, data: Metadata) -> Self {
		self.merge_data
			.get_or_insert_with(MergeData::new)
			.insert(recipient.into(), data);
		self
	}

	/// Mark the message as a batch send without giving any recipient data yet.
	pub fn batch(mut self) -> Self {
		self.merge_data.get_or_insert_with(MergeData::new);
		self
	}

	pub fn merge_global_data(mut self, data: Metadata) -> Self {
		self.merge_global_data = Some(data);
		self
	}

	pub fn template_id(mut self, template_id: impl Into<String>) -> Self {
		self.template_id = Some(template_id.into());
		self
	}

	pub fn send_at(mut self, send_at: impl Into<SendAt>) -> Self {
		self.send_at = Some(send_at.into());
		self
	}

	pub fn track_clicks(mut self, track: bool) -> Self {
		self.track_clicks = Some(track);
		self
	}

	pub fn track_opens(mut self, track: bool) -> Self {
		self.track_opens = Some(track);
		self
	}

	/// Raw ESP API fields, merged into the request as-is.
	pub fn esp_extra(mut self, extra: Metadata) -> Self {
		self.esp_extra.extend(extra);
		self
	}

	/// Build the email message with validation.
	///
	/// Parses every address, requires a sender, and checks the subject and
	/// custom headers for header injection.
	pub fn build(self) -> EmailResult<EmailMessage> {
		if self.from_email.trim().is_empty() {
			return Err(EmailError::MissingField("from_email".to_string()));
		}
		let from_email = EmailAddress::parse(&self.from_email)?;

		check_header_injection(&self.subject)?;
		for (name, value) in &self.headers {
			validate_header_name(name)?;
			if let Value::String(value) = value {
				check_header_injection(value)?;
			}
		}

		Ok(EmailMessage {
			subject: self.subject,
			body: self.body,
			from_email,
			to: EmailAddress::parse_list(&self.to)?,
			cc: EmailAddress::parse_list(&self.cc)?,
			bcc: EmailAddress::parse_list(&self.bcc)?,
			reply_to: EmailAddress::parse_list(&self.reply_to)?,
			html_body: self.html_body,
			alternatives: self.alternatives,
			attachments: self.attachments,
			headers: self.headers,
			tags: self.tags,
			metadata: self.metadata,
			merge_metadata: self.merge_metadata,
			merge_data: self.merge_data,
			merge_global_data: self.merge_global_data,
			template_id: self.template_id,
			send_at: self.send_at,
			track_clicks: self.track_clicks,
			track_opens: self.track_opens,
			esp_extra: self.esp_extra,
		})
	}
}

fn check_header_injection(value: &str) -> EmailResult<()> {
	if value.contains(&['\r', '\n'][..]) {
		return Err(EmailError::HeaderInjection(value.to_string()));
	}
	Ok(())
}

// RFC 5322 field names: printable ASCII except colon.
fn validate_header_name(name: &str) -> EmailResult<()> {
	let valid = !name.is_empty() && name.bytes().all(|b| (33..=126).contains(&b) && b != b':');
	if !valid {
		return Err(EmailError::InvalidHeader(name.to_string()));
	}
	Ok(())
}
