//! Demonstrates the reqwest-backed client against a local mock backend: settings loaded from
//! JSON, tokens kept in a [`MemoryTokenStore`], and a stale access token transparently refreshed
//! and replayed.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use bearer_client::{
	Client, RequestOptions, config::ClientSettings, http::ResponseData, token::MemoryTokenStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let settings = ClientSettings::from_json_str(&format!(
		r#"{{"services":{{"api":"{base}","sso":"{base}"}},"default_service":"api"}}"#,
		base = server.base_url(),
	))?;
	let store = MemoryTokenStore::new(Some("expired-access"), Some("demo-refresh"));
	let config = settings
		.into_builder()
		.token_store(&store)
		.on_error(|failure| println!("Request failed before classification: {failure}"))
		.build()?;
	let client = Client::new(config);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer expired-access");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/login/refresh").query_param("refreshToken", "demo-refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"refresh_token\":\"demo-refresh-2\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/me").header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body("{\"name\":\"demo\"}");
		})
		.await;

	let response = client.get("/me", RequestOptions::new()).await?;

	if let ResponseData::Json(body) = response.data()? {
		println!("Profile after refresh: {body}.");
	}

	println!(
		"Stored access token rotated: {}.",
		store.access_token().as_deref() == Some("demo-access")
	);
	println!("Refresh exchanges so far: {}.", client.refresh_metrics().attempts());

	Ok(())
}
