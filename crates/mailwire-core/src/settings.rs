//! Backend settings lookup
//!
//! Settings are read from a key lookup (the process environment in
//! production, a map in tests). Each ESP setting is looked up as
//! `MAILWIRE_<ESP>_<NAME>` first and, where allowed, as the bare
//! `<ESP>_<NAME>` vendor convention.

use crate::{EmailError, EmailResult};

/// Prefix shared by every mailwire environment variable.
pub const ENV_PREFIX: &str = "MAILWIRE";

/// Reads settings for one ESP from a key lookup.
pub struct SettingsLookup<F> {
	esp_name: String,
	lookup: F,
}

impl SettingsLookup<fn(&str) -> Option<String>> {
	/// Look settings up in the process environment.
	pub fn from_env(esp_name: &str) -> Self {
		fn env(key: &str) -> Option<String> {
			std::env::var(key).ok()
		}
		SettingsLookup::new(esp_name, env as fn(&str) -> Option<String>)
	}
}

impl<F> SettingsLookup<F>
where
	F: Fn(&str) -> Option<String>,
{
	pub fn new(esp_name: &str, lookup: F) -> Self {
		Self {
			esp_name: esp_name.to_string(),
			lookup,
		}
	}

	fn key(&self, name: &str, prefixed: bool) -> String {
		let esp = self.esp_name.to_uppercase();
		let name = name.to_uppercase();
		if prefixed {
			format!("{}_{}_{}", ENV_PREFIX, esp, name)
		} else {
			format!("{}_{}", esp, name)
		}
	}

	/// Look up an ESP setting, returning `None` when it is unset or empty.
	///
	/// # Examples
	///
	/// ```
	/// use mailwire_core::settings::SettingsLookup;
	///
	/// let lookup = SettingsLookup::new("brevo", |key: &str| {
	///     (key == "BREVO_API_KEY").then(|| "bare-key".to_string())
	/// });
	/// assert_eq!(lookup.get("api_key", true).as_deref(), Some("bare-key"));
	/// assert_eq!(lookup.get("api_key", false), None);
	/// ```
	pub fn get(&self, name: &str, allow_bare: bool) -> Option<String> {
		let prefixed = (self.lookup)(&self.key(name, true));
		let value = match prefixed {
			Some(value) => Some(value),
			None if allow_bare => (self.lookup)(&self.key(name, false)),
			None => None,
		};
		value.filter(|v| !v.trim().is_empty())
	}

	/// Like [`get`](Self::get), but a missing value is a configuration error.
	pub fn require(&self, name: &str, allow_bare: bool) -> EmailResult<String> {
		self.get(name, allow_bare).ok_or_else(|| {
			let mut message = format!("{} setting '{}' is required", self.esp_name, name);
			message.push_str(&format!(" (set {}", self.key(name, true)));
			if allow_bare {
				message.push_str(&format!(" or {}", self.key(name, false)));
			}
			message.push(')');
			EmailError::ImproperlyConfigured(message)
		})
	}

	/// Look up an unprefixed, ESP-independent mailwire setting such as
	/// `MAILWIRE_IGNORE_UNSUPPORTED_FEATURES`.
	pub fn get_global(&self, name: &str) -> Option<String> {
		(self.lookup)(&format!("{}_{}", ENV_PREFIX, name.to_uppercase()))
	}

	pub fn get_global_bool(&self, name: &str) -> EmailResult<Option<bool>> {
		self.get_global(name).map(|v| parse_bool(&v)).transpose()
	}
}

/// Parse the boolean spellings accepted in environment variables.
pub fn parse_bool(value: &str) -> EmailResult<bool> {
	match value.trim().to_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		other => Err(EmailError::ImproperlyConfigured(format!(
			"invalid boolean value '{}'",
			other
		))),
	}
}

/// Make sure an API base URL ends with `/` so endpoints can be appended.
pub fn normalize_api_url(url: &str) -> String {
	let url = url.trim();
	if url.ends_with('/') {
		url.to_string()
	} else {
		format!("{}/", url)
	}
}
