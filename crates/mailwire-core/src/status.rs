//! Per-recipient send status
//!
//! ESPs report acceptance per message or per recipient; backends normalize
//! whatever their API returns into a [`SendStatus`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Normalized delivery state for a single recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
	/// Accepted by the ESP and waiting to be sent
	Queued,
	/// Sent by the ESP
	Sent,
	/// Refused by the ESP (e.g. suppression list)
	Rejected,
	/// The ESP could not send the message
	Failed,
	Bounced,
	Deferred,
	Delivered,
	Autoresponded,
	Opened,
	Clicked,
	Complained,
	Unsubscribed,
	Subscribed,
	/// Accepted for sending at a later time
	Scheduled,
	/// The ESP rejected the address itself
	Invalid,
	Unknown,
}

impl DeliveryStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			DeliveryStatus::Queued => "queued",
			DeliveryStatus::Sent => "sent",
			DeliveryStatus::Rejected => "rejected",
			DeliveryStatus::Failed => "failed",
			DeliveryStatus::Bounced => "bounced",
			DeliveryStatus::Deferred => "deferred",
			DeliveryStatus::Delivered => "delivered",
			DeliveryStatus::Autoresponded => "autoresponded",
			DeliveryStatus::Opened => "opened",
			DeliveryStatus::Clicked => "clicked",
			DeliveryStatus::Complained => "complained",
			DeliveryStatus::Unsubscribed => "unsubscribed",
			DeliveryStatus::Subscribed => "subscribed",
			DeliveryStatus::Scheduled => "scheduled",
			DeliveryStatus::Invalid => "invalid",
			DeliveryStatus::Unknown => "unknown",
		}
	}
}

impl fmt::Display for DeliveryStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The ESP's answer for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientStatus {
	pub message_id: Option<String>,
	pub status: DeliveryStatus,
}

impl RecipientStatus {
	pub fn new(message_id: Option<String>, status: DeliveryStatus) -> Self {
		Self { message_id, status }
	}

	/// Queued with no ESP message id.
	pub fn queued() -> Self {
		Self::new(None, DeliveryStatus::Queued)
	}
}

/// Status of every recipient of one sent message, keyed by `addr-spec`.
///
/// # Examples
///
/// ```
/// use mailwire_core::{DeliveryStatus, RecipientStatus, SendStatus};
///
/// let mut status = SendStatus::new();
/// status.insert("a@example.com", RecipientStatus::new(Some("id-1".into()), DeliveryStatus::Queued));
/// status.insert("b@example.com", RecipientStatus::new(Some("id-1".into()), DeliveryStatus::Queued));
///
/// assert_eq!(status.message_id(), Some("id-1"));
/// assert_eq!(status.statuses().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendStatus {
	recipients: BTreeMap<String, RecipientStatus>,
}

impl SendStatus {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, addr_spec: impl Into<String>, status: RecipientStatus) {
		self.recipients.insert(addr_spec.into(), status);
	}

	pub fn get(&self, addr_spec: &str) -> Option<&RecipientStatus> {
		self.recipients.get(addr_spec)
	}

	pub fn recipients(&self) -> &BTreeMap<String, RecipientStatus> {
		&self.recipients
	}

	pub fn len(&self) -> usize {
		self.recipients.len()
	}

	pub fn is_empty(&self) -> bool {
		self.recipients.is_empty()
	}

	/// The message id shared by every recipient, if there is exactly one.
	///
	/// Batch sends usually produce one id per recipient; in that case look
	/// the ids up per recipient instead.
	pub fn message_id(&self) -> Option<&str> {
		let mut ids = self.recipients.values().map(|s| s.message_id.as_deref());
		let first = ids.next()??;
		ids.all(|id| id == Some(first)).then_some(first)
	}

	/// The distinct delivery states across all recipients.
	pub fn statuses(&self) -> BTreeSet<DeliveryStatus> {
		self.recipients.values().map(|s| s.status).collect()
	}
}

impl FromIterator<(String, RecipientStatus)> for SendStatus {
	fn from_iter<I: IntoIterator<Item = (String, RecipientStatus)>>(iter: I) -> Self {
		Self {
			recipients: iter.into_iter().collect(),
		}
	}
}
