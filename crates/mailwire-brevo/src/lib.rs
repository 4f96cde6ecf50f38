//! Brevo email backend
//!
//! Sends email through the Brevo (formerly SendinBlue) v3 transactional
//! email API (`POST smtp/email`).
//!
//! ## Feature support
//!
//! | Message feature | Brevo field |
//! |---|---|
//! | tags | `tags` |
//! | metadata | `X-Mailin-custom` header (JSON string) |
//! | merge data / merge metadata | `messageVersions` (batch send) |
//! | merge global data | `params` |
//! | template id | `templateId` |
//! | send at | `scheduledAt` |
//! | ESP extra | merged into the request body |
//!
//! Multiple reply-to addresses, multiple HTML parts, inline attachments and
//! click/open tracking flags are reported as unsupported features.
//!
//! # Examples
//!
//! ```no_run
//! use mailwire_brevo::{BrevoBackend, BrevoSettings};
//! use mailwire_core::EmailMessage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = BrevoBackend::new(BrevoSettings::new("your-api-key"))?;
//!
//!     let email = EmailMessage::builder()
//!         .from("Sender <sender@example.com>")
//!         .to(vec!["recipient@example.com".to_string()])
//!         .subject("Test")
//!         .body("Hello!")
//!         .build()?;
//!
//!     let status = backend.send_message(&email).await?;
//!     println!("Brevo message id: {:?}", status.message_id());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod payload;
pub mod settings;

pub use backend::BrevoBackend;
pub use payload::BrevoPayload;
pub use settings::BrevoSettings;

/// Name used in error messages and log events.
pub const ESP_NAME: &str = "Brevo";
