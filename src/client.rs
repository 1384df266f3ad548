//! Client facade: verb requests, uploads, forced refreshes, and runtime configuration.
//!
//! Every request resolves its service base URL and default headers from the latest
//! [`ClientConfig`], goes through the [`HttpTransport`], and on failure fires the `on_error` hook
//! once before classification. An [`Error::Authentication`] is never returned directly from the
//! first attempt: the client joins the [`RefreshCoordinator`] cycle and replays the original
//! request with the rotated token, or propagates the refresh failure. A 401 on the replay is
//! returned as-is; the next failing request starts a new cycle.

mod options;

pub use options::*;

// self
use crate::{
	_prelude::*,
	classify::classify,
	config::{ClientConfig, ConfigPatch},
	error::{ConfigError, TransportError},
	headers::{self, HeaderOptions},
	http::{
		FilePart, HttpResponse, HttpTransport, Method, ProgressHandler, RequestBody,
		RequestDescriptor, TransferProgress,
	},
	obs::{self, OpKind, OpOutcome, OpSpan},
	refresh::{RefreshCoordinator, RefreshMetrics, RefreshSnapshot},
	token::{RefreshPayload, TokenPair, TokenSecret},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestBearerClient = Client<ReqwestTransport>;

/// Joins a service base URL and a route.
pub fn build_url(base_url: &str, route: &str) -> String {
	format!("{base_url}{route}")
}

/// Wraps a percentage handler into a byte-progress handler.
pub fn percent_progress(handler: PercentHandler) -> ProgressHandler {
	Arc::new(move |progress: TransferProgress| handler(progress.percent()))
}

/// Bearer-authenticated HTTP client bound to a set of named services.
///
/// Clones share the transport, the configuration, and the refresh state. Separately constructed
/// clients never share a refresh queue.
pub struct Client<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	config: Arc<RwLock<Arc<ClientConfig>>>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client over a transport shared with other owners, e.g. `Arc<dyn HttpTransport>`.
	pub fn with_shared_transport(config: ClientConfig, transport: Arc<T>) -> Self {
		Self {
			transport,
			config: Arc::new(RwLock::new(Arc::new(config))),
			coordinator: Default::default(),
		}
	}

	/// Underlying transport.
	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// Current configuration snapshot.
	pub fn config(&self) -> Arc<ClientConfig> {
		self.config.read().clone()
	}

	/// Shallow-merges `patch` into the live configuration; later requests observe it.
	pub fn configure(&self, patch: ConfigPatch) {
		let mut guard = self.config.write();
		let mut next = ClientConfig::clone(&guard);

		next.apply(patch);

		*guard = Arc::new(next);
	}

	/// Current refresh state.
	pub fn refresh_snapshot(&self) -> RefreshSnapshot {
		self.coordinator.snapshot()
	}

	/// Refresh counters for this client.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.coordinator.metrics()
	}

	/// Issues a `GET`.
	pub async fn get(&self, route: &str, options: RequestOptions) -> Result<HttpResponse> {
		self.request(Method::Get, route, options).await
	}

	/// Issues a `POST`.
	pub async fn post(&self, route: &str, options: RequestOptions) -> Result<HttpResponse> {
		self.request(Method::Post, route, options).await
	}

	/// Issues a `PUT`.
	pub async fn put(&self, route: &str, options: RequestOptions) -> Result<HttpResponse> {
		self.request(Method::Put, route, options).await
	}

	/// Issues a `DELETE`.
	pub async fn delete(&self, route: &str, options: RequestOptions) -> Result<HttpResponse> {
		self.request(Method::Delete, route, options).await
	}

	/// Issues a request with an arbitrary verb.
	pub async fn request(
		&self,
		method: Method,
		route: &str,
		options: RequestOptions,
	) -> Result<HttpResponse> {
		let config = self.config();
		let request = build_request(&config, method, route, options)?;

		self.execute(OpKind::Request, request, config).await
	}

	/// Uploads `file` as multipart form data under the `file` field.
	///
	/// Byte progress is converted to a rounded percentage before reaching the handler.
	pub async fn upload(
		&self,
		route: &str,
		file: FilePart,
		options: UploadOptions,
	) -> Result<HttpResponse> {
		let UploadOptions { request, method, on_upload_progress } = options;
		let config = self.config();
		let mut request = build_request(&config, method.into(), route, request)?;

		request.body = Some(RequestBody::Multipart(file));
		request.upload_progress = on_upload_progress.map(percent_progress);

		self.execute(OpKind::Upload, request, config).await
	}

	/// Forces a token refresh.
	///
	/// Joins the in-flight exchange when one is running instead of starting a second one.
	pub async fn request_token_refresh(&self) -> Result<TokenPair> {
		self.coordinator.coalesce(|| self.exchange_refresh_token()).await
	}

	async fn execute(
		&self,
		kind: OpKind,
		request: RequestDescriptor,
		config: Arc<ClientConfig>,
	) -> Result<HttpResponse> {
		let span = OpSpan::new(kind, "execute");

		obs::record_op_outcome(kind, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let failure = match self.transport.execute(request).await {
					Ok(response) => return Ok(response),
					Err(failure) => failure,
				};

				if let Some(on_error) = &config.on_error {
					on_error(&failure);
				}

				match classify(failure) {
					Error::Authentication { failure } => self.recover(*failure).await,
					err => Err(err),
				}
			})
			.await;

		record(&span, kind, &result);

		result
	}

	async fn recover(&self, failure: TransportError) -> Result<HttpResponse> {
		let request = failure.into_request();
		let pair = self.coordinator.coalesce(|| self.exchange_refresh_token()).await?;

		self.replay(request, pair.access_token).await
	}

	async fn replay(
		&self,
		mut request: RequestDescriptor,
		access_token: Option<TokenSecret>,
	) -> Result<HttpResponse> {
		const KIND: OpKind = OpKind::Replay;

		if let Some(token) = access_token {
			request.set_header(headers::AUTHORIZATION, token.bearer()?);
		}

		let span = OpSpan::new(KIND, "replay");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.transport.execute(request)).await.map_err(classify);

		record(&span, KIND, &result);

		result
	}

	async fn exchange_refresh_token(&self) -> Result<TokenPair> {
		const KIND: OpKind = OpKind::Refresh;

		let config = self.config();
		let span = OpSpan::new(KIND, "exchange_refresh_token");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let get_refresh_token = config
					.get_refresh_token
					.as_ref()
					.ok_or(ConfigError::NotConfigured { accessor: "get_refresh_token" })?;
				let refresh_token = get_refresh_token()
					.filter(|token| !token.is_empty())
					.ok_or(Error::NoRefreshTokenProvided)?;
				let refresh = &config.refresh;
				let base_url = config.service_url(Some(&refresh.service))?;
				let request = RequestDescriptor::new(Method::Get, build_url(base_url, &refresh.path))
					.with_param(refresh.param.as_str(), refresh_token)
					.with_credentials(true);
				let response = self.transport.execute(request).await.map_err(classify)?;
				let payload = decode_refresh_body(&response.body)?;

				if let Some(on_success) = &config.on_token_refresh_success {
					on_success(&payload);
				}

				let decoded: RefreshPayload = serde_path_to_error::deserialize(&payload)
					.map_err(|e| Error::RefreshResponse { source: Arc::new(e) })?;

				Ok::<_, Error>(TokenPair::from(decoded))
			})
			.await;

		if let (Err(err), Some(on_failure)) = (&result, &config.on_token_refresh_failure) {
			on_failure(err);
		}

		record(&span, KIND, &result);

		result
	}
}
impl<T> Client<T>
where
	T: HttpTransport,
{
	/// Creates a client that issues every call through `transport`.
	pub fn with_transport(config: ClientConfig, transport: T) -> Self {
		Self::with_shared_transport(config, Arc::new(transport))
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(config: ClientConfig) -> Self {
		Self::with_transport(config, ReqwestTransport::default())
	}
}
impl<T> Clone for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			config: Arc::clone(&self.config),
			coordinator: Arc::clone(&self.coordinator),
		}
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("config", &self.config())
			.field("refresh", &self.coordinator.snapshot())
			.finish()
	}
}

fn build_request(
	config: &ClientConfig,
	method: Method,
	route: &str,
	options: RequestOptions,
) -> Result<RequestDescriptor> {
	let RequestOptions {
		service,
		auth,
		cors,
		with_credentials,
		params,
		data,
		headers: extra_headers,
		response_type,
	} = options;
	let base_url = config.service_url(service.as_deref())?;
	let access_token = if auth { config.access_token() } else { None };
	let mut headers = headers::build_headers(HeaderOptions {
		auth,
		cors,
		access_token: access_token.as_deref(),
	})?;

	headers::merge_overrides(&mut headers, extra_headers);

	Ok(RequestDescriptor {
		method,
		url: build_url(base_url, route),
		headers,
		params,
		body: data.map(RequestBody::Json),
		with_credentials,
		response_type,
		upload_progress: None,
	})
}

fn decode_refresh_body(body: &[u8]) -> Result<serde_json::Value> {
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|e| Error::RefreshResponse { source: Arc::new(e) })
}

fn record<V>(span: &OpSpan, kind: OpKind, result: &Result<V>) {
	let outcome = if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure };

	span.record_outcome(outcome);
	obs::record_op_outcome(kind, outcome);
}
