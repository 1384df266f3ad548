//! Token secrets, refreshed token pairs, and an in-memory token store.

pub mod secret;
pub mod store;

pub use secret::*;
pub use store::*;

// self
use crate::_prelude::*;

/// Access/refresh pair returned by a refresh exchange.
///
/// Either side may be absent; a missing access token makes replays go out without an
/// `Authorization` header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Newly issued access token.
	pub access_token: Option<TokenSecret>,
	/// Rotated refresh token.
	pub refresh_token: Option<TokenSecret>,
}
impl TokenPair {
	/// Builds a pair from optional raw strings, treating empty strings as absent.
	pub fn new(access_token: Option<String>, refresh_token: Option<String>) -> Self {
		Self {
			access_token: access_token.filter(|t| !t.is_empty()).map(TokenSecret::new),
			refresh_token: refresh_token.filter(|t| !t.is_empty()).map(TokenSecret::new),
		}
	}

	/// Borrowed access token value.
	pub fn access(&self) -> Option<&str> {
		self.access_token.as_ref().map(TokenSecret::expose)
	}

	/// Borrowed refresh token value.
	pub fn refresh(&self) -> Option<&str> {
		self.refresh_token.as_ref().map(TokenSecret::expose)
	}
}

/// Wire shape of the refresh endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshPayload {
	#[serde(default)]
	pub(crate) access_token: Option<String>,
	#[serde(default)]
	pub(crate) refresh_token: Option<String>,
}
impl From<RefreshPayload> for TokenPair {
	fn from(payload: RefreshPayload) -> Self {
		Self::new(payload.access_token, payload.refresh_token)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_strings_count_as_absent() {
		let pair = TokenPair::new(Some(String::new()), Some("r".into()));

		assert_eq!(pair.access(), None);
		assert_eq!(pair.refresh(), Some("r"));
	}

	#[test]
	fn debug_output_redacts_tokens() {
		let pair = TokenPair::new(Some("access-secret".into()), Some("refresh-secret".into()));
		let rendered = format!("{pair:?}");

		assert!(!rendered.contains("access-secret"));
		assert!(!rendered.contains("refresh-secret"));
	}
}
