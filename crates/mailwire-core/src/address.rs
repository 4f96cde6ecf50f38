//! Email address parsing
//!
//! Addresses are accepted either bare (`user@example.com`) or with a display
//! name (`Jane Doe <user@example.com>`, optionally quoted).

use crate::{EmailError, EmailResult};
use std::fmt;
use std::str::FromStr;

/// A single mailbox: the `addr-spec` plus an optional display name.
///
/// # Examples
///
/// ```
/// use mailwire_core::EmailAddress;
///
/// let address: EmailAddress = "\"Doe, Jane\" <jane@example.com>".parse().unwrap();
/// assert_eq!(address.addr_spec(), "jane@example.com");
/// assert_eq!(address.display_name(), Some("Doe, Jane"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress {
	addr_spec: String,
	display_name: Option<String>,
}

impl EmailAddress {
	/// Create an address from its parts, validating the `addr-spec`.
	pub fn new(addr_spec: impl Into<String>, display_name: Option<String>) -> EmailResult<Self> {
		let addr_spec = addr_spec.into().trim().to_string();
		validate_addr_spec(&addr_spec)?;

		let display_name = display_name
			.map(|name| name.trim().to_string())
			.filter(|name| !name.is_empty());

		Ok(Self {
			addr_spec,
			display_name,
		})
	}

	/// Parse `Name <addr>` or a bare address.
	pub fn parse(input: &str) -> EmailResult<Self> {
		let input = input.trim();

		if let Some(inner) = input.strip_suffix('>') {
			let open = inner
				.rfind('<')
				.ok_or_else(|| EmailError::InvalidAddress(input.to_string()))?;
			let name = inner[..open].trim().trim_matches('"').trim();
			let addr = &inner[open + 1..];
			let display_name = (!name.is_empty()).then(|| name.to_string());
			return Self::new(addr, display_name);
		}

		Self::new(input, None)
	}

	pub fn addr_spec(&self) -> &str {
		&self.addr_spec
	}

	pub fn display_name(&self) -> Option<&str> {
		self.display_name.as_deref()
	}

	/// Parse every entry of a list, failing on the first invalid address.
	pub fn parse_list<S: AsRef<str>>(inputs: &[S]) -> EmailResult<Vec<Self>> {
		inputs.iter().map(|s| Self::parse(s.as_ref())).collect()
	}
}

impl FromStr for EmailAddress {
	type Err = EmailError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for EmailAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.display_name {
			Some(name) if name.contains(&[',', ';', '<', '>', '"', '@'][..]) => {
				write!(f, "\"{}\" <{}>", name.replace('"', "\\\""), self.addr_spec)
			}
			Some(name) => write!(f, "{} <{}>", name, self.addr_spec),
			None => f.write_str(&self.addr_spec),
		}
	}
}

fn validate_addr_spec(addr: &str) -> EmailResult<()> {
	let invalid = || EmailError::InvalidAddress(addr.to_string());

	if addr.chars().any(|c| c.is_whitespace() || c.is_control()) {
		return Err(invalid());
	}

	let (local, domain) = addr.rsplit_once('@').ok_or_else(invalid)?;
	if local.is_empty() || domain.is_empty() {
		return Err(invalid());
	}
	if domain.starts_with('.') || domain.ends_with('.') {
		return Err(invalid());
	}

	Ok(())
}
