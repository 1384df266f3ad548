//! Thread-safe in-memory token holder wired into client accessors and refresh hooks.

// self
use crate::{
	_prelude::*,
	config::{RefreshSuccessHook, TokenAccessor},
	token::{RefreshPayload, TokenPair, TokenSecret},
};

type TokenCell = Arc<RwLock<TokenPair>>;

/// Keeps the current access/refresh pair in-process.
///
/// Clones share the same cell, so the accessors and the persist hook handed to a client observe
/// every rotation.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore(TokenCell);
impl MemoryTokenStore {
	/// Creates a store seeded with the provided tokens.
	pub fn new(access_token: Option<&str>, refresh_token: Option<&str>) -> Self {
		Self(Arc::new(RwLock::new(TokenPair::new(
			access_token.map(str::to_owned),
			refresh_token.map(str::to_owned),
		))))
	}

	/// Current access token value.
	pub fn access_token(&self) -> Option<String> {
		self.0.read().access().map(str::to_owned)
	}

	/// Current refresh token value.
	pub fn refresh_token(&self) -> Option<String> {
		self.0.read().refresh().map(str::to_owned)
	}

	/// Snapshot of the stored pair.
	pub fn pair(&self) -> TokenPair {
		self.0.read().clone()
	}

	/// Stores a rotated pair. A missing refresh token keeps the previous one.
	pub fn store(&self, pair: TokenPair) {
		let mut guard = self.0.write();

		guard.access_token = pair.access_token;

		if let Some(refresh) = pair.refresh_token {
			guard.refresh_token = Some(refresh);
		}
	}

	/// Forgets both tokens.
	pub fn clear(&self) {
		*self.0.write() = TokenPair::default();
	}

	/// Accessor returning the current access token.
	pub fn access_accessor(&self) -> TokenAccessor {
		let store = self.clone();

		Arc::new(move || store.access_token())
	}

	/// Accessor returning the current refresh token.
	pub fn refresh_accessor(&self) -> TokenAccessor {
		let store = self.clone();

		Arc::new(move || store.refresh_token())
	}

	/// Refresh-success hook that persists the rotated pair from the raw refresh payload.
	pub fn persist_hook(&self) -> RefreshSuccessHook {
		let store = self.clone();

		Arc::new(move |payload: &serde_json::Value| {
			if let Ok(decoded) = RefreshPayload::deserialize(payload) {
				store.store(decoded.into());
			}
		})
	}

	/// Replaces only the access token.
	pub fn set_access_token(&self, token: impl Into<String>) {
		self.0.write().access_token = Some(TokenSecret::new(token));
	}
}
