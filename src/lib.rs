//! # mailwire
//!
//! Send transactional email through ESP (email service provider) HTTP APIs
//! with one vendor-neutral message model.
//!
//! A message is built once with [`EmailMessage::builder`] and handed to any
//! backend implementing [`EmailBackend`]. Each backend translates the message
//! into its vendor's JSON payload, reports message features the vendor cannot
//! express, and maps the vendor's response onto a per-recipient
//! [`SendStatus`].
//!
//! ## Feature Flags
//!
//! - `brevo` (default) - Brevo (formerly SendinBlue) backend
//! - `full` - All backends
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "brevo")]
//! # async fn run() -> mailwire::EmailResult<()> {
//! use mailwire::brevo::BrevoBackend;
//! use mailwire::EmailMessage;
//!
//! let backend = BrevoBackend::from_env()?;
//!
//! let message = EmailMessage::builder()
//!     .from("Shop <orders@example.com>")
//!     .to(vec!["customer@example.com".to_string()])
//!     .subject("Your order")
//!     .body("Thanks for your order!")
//!     .tag("orders")
//!     .build()?;
//!
//! let status = backend.send_message(&message).await?;
//! for (recipient, result) in status.recipients() {
//!     println!("{}: {}", recipient, result.status);
//! }
//! # Ok(())
//! # }
//! ```

pub use mailwire_core::{
	Alternative, ApiError, Attachment, CaseInsensitiveHeaders, DeliveryStatus, EmailAddress,
	EmailBackend, EmailError, EmailMessage, EmailMessageBuilder, EmailResult, EspPayload,
	EspResponse, HttpTransport, MergeData, MergeMetadata, Metadata, RecipientKind,
	RecipientStatus, SendAt, SendDefaults, SendStatus, UnsupportedFeatures, drive_payload,
};

pub use mailwire_core::{address, backend, headers, message, payload, settings, status};

#[cfg(feature = "brevo")]
pub use mailwire_brevo as brevo;

#[cfg(feature = "brevo")]
pub use mailwire_brevo::{BrevoBackend, BrevoSettings};

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_message_builds_through_facade() {
		let message = EmailMessage::builder()
			.from("from@example.com")
			.to(vec!["to@example.com".to_string()])
			.build()
			.unwrap();

		assert_eq!(message.to()[0].addr_spec(), "to@example.com");
	}

	#[cfg(feature = "brevo")]
	#[rstest]
	fn test_brevo_backend_from_facade() {
		let backend = BrevoBackend::new(BrevoSettings::new("key")).unwrap();

		assert_eq!(backend.api_url(), brevo::settings::DEFAULT_API_URL);
	}
}
