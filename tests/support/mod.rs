#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::Notify;
// self
use bearer_client::{
	ClientConfig, TransportError,
	config::ClientConfigBuilder,
	http::{HttpResponse, HttpTransport, RequestDescriptor, TransportFuture},
};

pub const API: &str = "https://api.test";
pub const SSO: &str = "https://sso.test";

/// Calls observed by [`ScriptedTransport`], in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
	Rejected(String),
	Accepted(String),
	Refresh(Option<String>),
}

/// Fake backend: only `Bearer <fresh>` is accepted, the refresh endpoint answers a scripted
/// response, optionally after [`ScriptedTransport::release`].
pub struct ScriptedTransport {
	fresh: String,
	refresh: Mutex<(u16, String)>,
	gate: Option<Arc<Notify>>,
	calls: Mutex<Vec<Call>>,
	authorizations: Mutex<Vec<Option<String>>>,
	refreshes: AtomicUsize,
}
impl ScriptedTransport {
	pub fn new(fresh: &str) -> Self {
		Self {
			fresh: fresh.into(),
			refresh: Mutex::new((
				200,
				format!(r#"{{"access_token":"{fresh}","refresh_token":"{fresh}-refresh"}}"#),
			)),
			gate: None,
			calls: Mutex::new(Vec::new()),
			authorizations: Mutex::new(Vec::new()),
			refreshes: AtomicUsize::new(0),
		}
	}

	pub fn gated(mut self) -> Self {
		self.gate = Some(Arc::new(Notify::new()));

		self
	}

	pub fn refresh_response(self, status: u16, body: &str) -> Self {
		*self.refresh.lock() = (status, body.into());

		self
	}

	pub fn release(&self) {
		if let Some(gate) = &self.gate {
			gate.notify_one();
		}
	}

	pub fn refreshes(&self) -> usize {
		self.refreshes.load(Ordering::SeqCst)
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	/// `Authorization` values seen on non-refresh calls, in arrival order.
	pub fn authorizations(&self) -> Vec<Option<String>> {
		self.authorizations.lock().clone()
	}

	pub fn rejected(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				Call::Rejected(url) => Some(url),
				_ => None,
			})
			.collect()
	}

	pub fn accepted(&self) -> Vec<String> {
		self.calls()
			.into_iter()
			.filter_map(|call| match call {
				Call::Accepted(url) => Some(url),
				_ => None,
			})
			.collect()
	}

	async fn respond(&self, request: RequestDescriptor) -> Result<HttpResponse, TransportError> {
		if request.url.starts_with(SSO) {
			let token = request
				.params
				.iter()
				.find(|(key, _)| key == "refreshToken")
				.map(|(_, value)| value.clone());

			self.refreshes.fetch_add(1, Ordering::SeqCst);
			self.calls.lock().push(Call::Refresh(token));

			if let Some(gate) = &self.gate {
				gate.notified().await;
			}

			let (status, body) = self.refresh.lock().clone();
			let response = HttpResponse::new(status, body.into_bytes());

			return if response.is_success() {
				Ok(response)
			} else {
				Err(TransportError::status_failure(request, response))
			};
		}

		let expected = format!("Bearer {}", self.fresh);

		self.authorizations.lock().push(request.header("Authorization").map(str::to_owned));

		if request.header("Authorization") == Some(expected.as_str()) {
			self.calls.lock().push(Call::Accepted(request.url.clone()));

			Ok(HttpResponse::new(200, format!(r#"{{"url":"{}"}}"#, request.url).into_bytes()))
		} else {
			self.calls.lock().push(Call::Rejected(request.url.clone()));

			Err(TransportError::status_failure(request, HttpResponse::new(401, Vec::new())))
		}
	}
}
impl HttpTransport for ScriptedTransport {
	fn execute(&self, request: RequestDescriptor) -> TransportFuture<'_> {
		Box::pin(self.respond(request))
	}
}

/// Builder targeting the scripted `api` and `sso` services.
pub fn config_builder() -> ClientConfigBuilder {
	ClientConfig::builder("api").service("api", API).service("sso", SSO)
}
