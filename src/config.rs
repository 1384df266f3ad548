//! Client configuration: service routing, token accessors, lifecycle hooks, and runtime patches.

// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	token::MemoryTokenStore,
};

/// Synchronous accessor returning the current token, if any.
pub type TokenAccessor = Arc<dyn Fn() -> Option<String> + Send + Sync>;
/// Invoked with the raw refresh payload after a successful exchange.
pub type RefreshSuccessHook = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;
/// Invoked with the error of a failed refresh.
pub type RefreshFailureHook = Arc<dyn Fn(&Error) + Send + Sync>;
/// Invoked once with the raw failure of every failed request, before classification.
pub type ErrorHook = Arc<dyn Fn(&TransportError) + Send + Sync>;

/// Location of the token refresh endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshEndpoint {
	/// Service whose base URL hosts the endpoint.
	pub service: String,
	/// Route appended to the service base URL.
	pub path: String,
	/// Query parameter carrying the refresh token.
	pub param: String,
}
impl Default for RefreshEndpoint {
	fn default() -> Self {
		Self { service: "sso".into(), path: "/login/refresh".into(), param: "refreshToken".into() }
	}
}

/// Serializable subset of [`ClientConfig`], suitable for settings files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
	/// Service name to base URL.
	pub services: BTreeMap<String, String>,
	/// Service used when a request does not name one.
	pub default_service: String,
	/// Refresh endpoint location.
	#[serde(default)]
	pub refresh: RefreshEndpoint,
}
impl ClientSettings {
	/// Decodes settings from JSON, reporting the failing field path.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(json);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|e| ConfigError::Settings { source: Arc::new(e) })
	}

	/// Seeds a builder with these settings.
	pub fn into_builder(self) -> ClientConfigBuilder {
		let mut builder = ClientConfig::builder(self.default_service).refresh_endpoint(self.refresh);

		builder.services = self.services;

		builder
	}
}

/// Live client configuration.
///
/// Every request reads the latest value, so [`Client::configure`](crate::Client::configure)
/// patches take effect for all later calls.
#[derive(Clone)]
pub struct ClientConfig {
	/// Service name to base URL.
	pub services: BTreeMap<String, String>,
	/// Service used when a request does not name one.
	pub default_service: String,
	/// Current access token accessor.
	pub get_access_token: Option<TokenAccessor>,
	/// Current refresh token accessor; required for refreshes.
	pub get_refresh_token: Option<TokenAccessor>,
	/// Hook fired after a successful refresh exchange.
	pub on_token_refresh_success: Option<RefreshSuccessHook>,
	/// Hook fired after a failed refresh.
	pub on_token_refresh_failure: Option<RefreshFailureHook>,
	/// Hook fired for every failed request.
	pub on_error: Option<ErrorHook>,
	/// Refresh endpoint location.
	pub refresh: RefreshEndpoint,
}
impl ClientConfig {
	/// Returns a builder using `default_service` as the fallback route target.
	pub fn builder(default_service: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(default_service)
	}

	/// Resolves the base URL for `service`, falling back to the default service.
	pub fn service_url(&self, service: Option<&str>) -> Result<&str, ConfigError> {
		let name = service.unwrap_or(&self.default_service);

		self.services
			.get(name)
			.map(String::as_str)
			.ok_or_else(|| ConfigError::UnknownService { name: name.into() })
	}

	/// Reads the access token accessor; an absent accessor means anonymous requests.
	pub fn access_token(&self) -> Option<String> {
		self.get_access_token.as_ref().and_then(|get| get()).filter(|token| !token.is_empty())
	}

	/// Shallow-merges `patch` into this configuration without validation.
	pub fn apply(&mut self, patch: ConfigPatch) {
		let ConfigPatch {
			services,
			default_service,
			get_access_token,
			get_refresh_token,
			on_token_refresh_success,
			on_token_refresh_failure,
			on_error,
			refresh,
		} = patch;

		if let Some(services) = services {
			self.services = services;
		}
		if let Some(default_service) = default_service {
			self.default_service = default_service;
		}
		if let Some(get) = get_access_token {
			self.get_access_token = Some(get);
		}
		if let Some(get) = get_refresh_token {
			self.get_refresh_token = Some(get);
		}
		if let Some(hook) = on_token_refresh_success {
			self.on_token_refresh_success = Some(hook);
		}
		if let Some(hook) = on_token_refresh_failure {
			self.on_token_refresh_failure = Some(hook);
		}
		if let Some(hook) = on_error {
			self.on_error = Some(hook);
		}
		if let Some(refresh) = refresh {
			self.refresh = refresh;
		}
	}
}
impl Debug for ClientConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientConfig")
			.field("services", &self.services)
			.field("default_service", &self.default_service)
			.field("get_access_token_set", &self.get_access_token.is_some())
			.field("get_refresh_token_set", &self.get_refresh_token.is_some())
			.field("on_token_refresh_success_set", &self.on_token_refresh_success.is_some())
			.field("on_token_refresh_failure_set", &self.on_token_refresh_failure.is_some())
			.field("on_error_set", &self.on_error.is_some())
			.field("refresh", &self.refresh)
			.finish()
	}
}

/// Builder for [`ClientConfig`] values.
pub struct ClientConfigBuilder {
	/// Service name to base URL.
	pub services: BTreeMap<String, String>,
	/// Service used when a request does not name one.
	pub default_service: String,
	get_access_token: Option<TokenAccessor>,
	get_refresh_token: Option<TokenAccessor>,
	on_token_refresh_success: Option<RefreshSuccessHook>,
	on_token_refresh_failure: Option<RefreshFailureHook>,
	on_error: Option<ErrorHook>,
	refresh: RefreshEndpoint,
}
impl ClientConfigBuilder {
	/// Creates an empty builder.
	pub fn new(default_service: impl Into<String>) -> Self {
		Self {
			services: BTreeMap::new(),
			default_service: default_service.into(),
			get_access_token: None,
			get_refresh_token: None,
			on_token_refresh_success: None,
			on_token_refresh_failure: None,
			on_error: None,
			refresh: RefreshEndpoint::default(),
		}
	}

	/// Registers a service base URL.
	pub fn service(mut self, name: impl Into<String>, base_url: impl Into<String>) -> Self {
		self.services.insert(name.into(), base_url.into());

		self
	}

	/// Registers several service base URLs.
	pub fn services<I, K, V>(mut self, services: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		for (name, url) in services {
			self.services.insert(name.into(), url.into());
		}

		self
	}

	/// Overrides the refresh endpoint location.
	pub fn refresh_endpoint(mut self, refresh: RefreshEndpoint) -> Self {
		self.refresh = refresh;

		self
	}

	/// Sets the access token accessor.
	pub fn access_token_accessor<F>(mut self, get: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> Option<String>,
	{
		self.get_access_token = Some(Arc::new(get));

		self
	}

	/// Sets the refresh token accessor.
	pub fn refresh_token_accessor<F>(mut self, get: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> Option<String>,
	{
		self.get_refresh_token = Some(Arc::new(get));

		self
	}

	/// Sets the refresh-success hook.
	pub fn on_token_refresh_success<F>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&serde_json::Value),
	{
		self.on_token_refresh_success = Some(Arc::new(hook));

		self
	}

	/// Sets the refresh-failure hook.
	pub fn on_token_refresh_failure<F>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&Error),
	{
		self.on_token_refresh_failure = Some(Arc::new(hook));

		self
	}

	/// Sets the request-failure hook.
	pub fn on_error<F>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&TransportError),
	{
		self.on_error = Some(Arc::new(hook));

		self
	}

	/// Wires both accessors and the refresh-success hook to `store`.
	pub fn token_store(mut self, store: &MemoryTokenStore) -> Self {
		self.get_access_token = Some(store.access_accessor());
		self.get_refresh_token = Some(store.refresh_accessor());
		self.on_token_refresh_success = Some(store.persist_hook());

		self
	}

	/// Validates service URLs and routing, then builds the configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		for (service, base_url) in &self.services {
			Url::parse(base_url).map_err(|source| ConfigError::InvalidServiceUrl {
				service: service.clone(),
				source,
			})?;
		}

		if !self.services.contains_key(&self.default_service) {
			return Err(ConfigError::UnknownService { name: self.default_service });
		}
		if self.get_refresh_token.is_some() && !self.services.contains_key(&self.refresh.service) {
			return Err(ConfigError::UnknownService { name: self.refresh.service });
		}

		Ok(ClientConfig {
			services: self.services,
			default_service: self.default_service,
			get_access_token: self.get_access_token,
			get_refresh_token: self.get_refresh_token,
			on_token_refresh_success: self.on_token_refresh_success,
			on_token_refresh_failure: self.on_token_refresh_failure,
			on_error: self.on_error,
			refresh: self.refresh,
		})
	}
}
impl Debug for ClientConfigBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientConfigBuilder")
			.field("services", &self.services)
			.field("default_service", &self.default_service)
			.field("refresh", &self.refresh)
			.finish_non_exhaustive()
	}
}

/// Partial configuration merged by [`Client::configure`](crate::Client::configure).
///
/// Unset fields leave the current value untouched; set fields replace it wholesale.
#[derive(Clone, Default)]
pub struct ConfigPatch {
	/// Replacement service map.
	pub services: Option<BTreeMap<String, String>>,
	/// Replacement default service.
	pub default_service: Option<String>,
	/// Replacement access token accessor.
	pub get_access_token: Option<TokenAccessor>,
	/// Replacement refresh token accessor.
	pub get_refresh_token: Option<TokenAccessor>,
	/// Replacement refresh-success hook.
	pub on_token_refresh_success: Option<RefreshSuccessHook>,
	/// Replacement refresh-failure hook.
	pub on_token_refresh_failure: Option<RefreshFailureHook>,
	/// Replacement request-failure hook.
	pub on_error: Option<ErrorHook>,
	/// Replacement refresh endpoint.
	pub refresh: Option<RefreshEndpoint>,
}
impl ConfigPatch {
	/// Creates an empty patch.
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the service map.
	pub fn services<I, K, V>(mut self, services: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.services =
			Some(services.into_iter().map(|(name, url)| (name.into(), url.into())).collect());

		self
	}

	/// Replaces the default service.
	pub fn default_service(mut self, name: impl Into<String>) -> Self {
		self.default_service = Some(name.into());

		self
	}

	/// Replaces the access token accessor.
	pub fn access_token_accessor<F>(mut self, get: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> Option<String>,
	{
		self.get_access_token = Some(Arc::new(get));

		self
	}

	/// Replaces the refresh token accessor.
	pub fn refresh_token_accessor<F>(mut self, get: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> Option<String>,
	{
		self.get_refresh_token = Some(Arc::new(get));

		self
	}

	/// Replaces the refresh-success hook.
	pub fn on_token_refresh_success<F>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&serde_json::Value),
	{
		self.on_token_refresh_success = Some(Arc::new(hook));

		self
	}

	/// Replaces the refresh-failure hook.
	pub fn on_token_refresh_failure<F>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&Error),
	{
		self.on_token_refresh_failure = Some(Arc::new(hook));

		self
	}

	/// Replaces the request-failure hook.
	pub fn on_error<F>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&TransportError),
	{
		self.on_error = Some(Arc::new(hook));

		self
	}

	/// Replaces the refresh endpoint.
	pub fn refresh_endpoint(mut self, refresh: RefreshEndpoint) -> Self {
		self.refresh = Some(refresh);

		self
	}
}
impl Debug for ConfigPatch {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConfigPatch")
			.field("services", &self.services)
			.field("default_service", &self.default_service)
			.field("refresh", &self.refresh)
			.finish_non_exhaustive()
	}
}
