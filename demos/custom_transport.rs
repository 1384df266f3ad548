//! Demonstrates plugging an in-process [`HttpTransport`] into the client.
//!
//! 1. Implement [`HttpTransport::execute`], reporting non-2xx statuses as
//!    [`TransportError::Status`] so the client can classify and replay them.
//! 2. Hand the transport to [`Client::with_transport`].
//! 3. Fire a burst of requests with a stale token and observe a single refresh exchange.

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use color_eyre::Result;
use futures::future::join_all;
// self
use bearer_client::{
	Client, ClientConfig, RequestOptions, TransportError,
	http::{HttpResponse, HttpTransport, RequestDescriptor, TransportFuture},
	token::MemoryTokenStore,
};

const VALID: &str = "Bearer rotated-access";

#[derive(Default)]
struct InMemoryBackend {
	refreshes: AtomicUsize,
}
impl InMemoryBackend {
	fn respond(&self, request: RequestDescriptor) -> Result<HttpResponse, TransportError> {
		if request.url.ends_with("/login/refresh") {
			self.refreshes.fetch_add(1, Ordering::SeqCst);

			return Ok(HttpResponse::new(
				200,
				b"{\"access_token\":\"rotated-access\",\"refresh_token\":\"rotated-refresh\"}".to_vec(),
			));
		}

		if request.header("Authorization") == Some(VALID) {
			Ok(HttpResponse::new(200, format!("{{\"served\":\"{}\"}}", request.url)))
		} else {
			Err(TransportError::status_failure(request, HttpResponse::new(401, Vec::new())))
		}
	}
}
impl HttpTransport for InMemoryBackend {
	fn execute(&self, request: RequestDescriptor) -> TransportFuture<'_> {
		Box::pin(async move { self.respond(request) })
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store = MemoryTokenStore::new(Some("stale-access"), Some("initial-refresh"));
	let config = ClientConfig::builder("api")
		.service("api", "https://api.internal")
		.service("sso", "https://sso.internal")
		.token_store(&store)
		.build()?;
	let client = Client::with_transport(config, InMemoryBackend::default());
	let routes = ["/orders", "/invoices", "/customers"];
	let results = join_all(routes.iter().map(|route| client.get(route, RequestOptions::new()))).await;

	for (route, result) in routes.iter().zip(results) {
		match result {
			Ok(response) => println!("{route} answered {} after replay.", response.status),
			Err(e) => println!("{route} failed: {e}."),
		}
	}

	println!(
		"Refresh exchanges performed for {} requests: {}.",
		routes.len(),
		client.transport().refreshes.load(Ordering::SeqCst)
	);
	println!("Current access token is rotated: {}.", store.access_token().as_deref() == Some("rotated-access"));

	Ok(())
}
