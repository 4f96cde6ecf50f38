//! Case-insensitive header map
//!
//! Email header names compare case-insensitively (`X-Mailin-Custom` and
//! `x-mailin-custom` are the same header). The map keeps insertion order and
//! the spelling of the most recent insert, which is what gets serialized.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseInsensitiveHeaders {
	entries: Vec<(String, Value)>,
}

impl CaseInsensitiveHeaders {
	pub fn new() -> Self {
		Self::default()
	}

	fn position(&self, name: &str) -> Option<usize> {
		self.entries
			.iter()
			.position(|(key, _)| key.eq_ignore_ascii_case(name))
	}

	/// Insert a header, replacing any existing header with the same name.
	///
	/// # Examples
	///
	/// ```
	/// use mailwire_core::CaseInsensitiveHeaders;
	///
	/// let mut headers = CaseInsensitiveHeaders::new();
	/// headers.insert("X-Custom", "one");
	/// headers.insert("x-custom", "two");
	///
	/// assert_eq!(headers.len(), 1);
	/// assert_eq!(headers.get("X-CUSTOM").and_then(|v| v.as_str()), Some("two"));
	/// ```
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		let name = name.into();
		let value = value.into();
		match self.position(&name) {
			Some(index) => Some(std::mem::replace(&mut self.entries[index], (name, value)).1),
			None => {
				self.entries.push((name, value));
				None
			}
		}
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.position(name).map(|index| &self.entries[index].1)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.position(name).is_some()
	}

	pub fn remove(&mut self, name: &str) -> Option<Value> {
		self.position(name).map(|index| self.entries.remove(index).1)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value))
	}

	/// Convert into a JSON object, keeping the stored key spelling.
	pub fn to_json(&self) -> Value {
		Value::Object(
			self.entries
				.iter()
				.map(|(key, value)| (key.clone(), value.clone()))
				.collect(),
		)
	}
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for CaseInsensitiveHeaders {
	fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
		for (name, value) in iter {
			self.insert(name, value);
		}
	}
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for CaseInsensitiveHeaders {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut headers = Self::new();
		headers.extend(iter);
		headers
	}
}

impl Serialize for CaseInsensitiveHeaders {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.entries.len()))?;
		for (key, value) in &self.entries {
			map.serialize_entry(key, value)?;
		}
		map.end()
	}
}
