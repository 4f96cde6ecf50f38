use crate::ESP_NAME;
use mailwire_core::settings::{SettingsLookup, normalize_api_url};
use mailwire_core::backend::DEFAULT_TIMEOUT;
use mailwire_core::{EmailResult, SendDefaults};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Brevo v3 API base URL.
pub const DEFAULT_API_URL: &str = "https://api.brevo.com/v3/";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = DEFAULT_TIMEOUT.as_secs();

/// Brevo backend configuration
///
/// # Examples
///
/// ```
/// use mailwire_brevo::BrevoSettings;
///
/// let settings = BrevoSettings::new("xkeysib-123")
///     .with_api_url("https://proxy.example.com/brevo")
///     .with_ignore_unsupported_features(true);
///
/// assert_eq!(settings.api_url(), "https://proxy.example.com/brevo/");
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct BrevoSettings {
	pub api_key: String,
	pub api_url: String,
	/// Log unsupported message features instead of failing the send
	pub ignore_unsupported_features: bool,
	pub timeout_secs: u64,
	pub send_defaults: SendDefaults,
}

impl Default for BrevoSettings {
	fn default() -> Self {
		Self {
			api_key: String::new(),
			api_url: DEFAULT_API_URL.to_string(),
			ignore_unsupported_features: false,
			timeout_secs: DEFAULT_TIMEOUT_SECS,
			send_defaults: SendDefaults::default(),
		}
	}
}

impl fmt::Debug for BrevoSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BrevoSettings")
			.field("api_key", &"<redacted>")
			.field("api_url", &self.api_url)
			.field("ignore_unsupported_features", &self.ignore_unsupported_features)
			.field("timeout_secs", &self.timeout_secs)
			.field("send_defaults", &self.send_defaults)
			.finish()
	}
}

impl BrevoSettings {
	pub fn new(api_key: impl Into<String>) -> Self {
		Self {
			api_key: api_key.into(),
			..Self::default()
		}
	}

	pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
		self.api_url = api_url.into();
		self
	}

	pub fn with_ignore_unsupported_features(mut self, ignore: bool) -> Self {
		self.ignore_unsupported_features = ignore;
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout_secs = timeout.as_secs();
		self
	}

	pub fn with_send_defaults(mut self, defaults: SendDefaults) -> Self {
		self.send_defaults = defaults;
		self
	}

	/// The API base URL, always ending with `/`.
	pub fn api_url(&self) -> String {
		normalize_api_url(&self.api_url)
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}

	/// Load settings from environment variables
	///
	/// - `MAILWIRE_BREVO_API_KEY` (or bare `BREVO_API_KEY`), required
	/// - `MAILWIRE_BREVO_API_URL`
	/// - `MAILWIRE_BREVO_TIMEOUT_SECS`
	/// - `MAILWIRE_IGNORE_UNSUPPORTED_FEATURES`
	pub fn from_env() -> EmailResult<Self> {
		Self::from_lookup(SettingsLookup::from_env(ESP_NAME))
	}

	pub fn from_lookup<F>(lookup: SettingsLookup<F>) -> EmailResult<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut settings = Self::new(lookup.require("api_key", true)?);

		if let Some(api_url) = lookup.get("api_url", false) {
			settings.api_url = api_url;
		}
		if let Some(timeout) = lookup.get("timeout_secs", false) {
			settings.timeout_secs = timeout.trim().parse().map_err(|_| {
				mailwire_core::EmailError::ImproperlyConfigured(format!(
					"{} setting 'timeout_secs' must be a whole number of seconds, got '{}'",
					ESP_NAME, timeout
				))
			})?;
		}
		if let Some(ignore) = lookup.get_global_bool("ignore_unsupported_features")? {
			settings.ignore_unsupported_features = ignore;
		}

		Ok(settings)
	}
}
