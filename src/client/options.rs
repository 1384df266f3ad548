//! Per-request and upload options.

// crates.io
use ::http::{HeaderName, HeaderValue};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	headers::{self, Headers},
	http::{Method, ResponseType},
};

/// Receives upload completion as a rounded percentage in `0..=100`.
pub type PercentHandler = Arc<dyn Fn(u8) + Send + Sync>;

/// Options recognized by every verb request.
#[derive(Clone, Debug)]
pub struct RequestOptions {
	/// Target service; `None` selects the configured default.
	pub service: Option<String>,
	/// Attach the bearer token (default `true`).
	pub auth: bool,
	/// Mark the request as CORS (default `true`).
	pub cors: bool,
	/// Send credentials with the request (default `true`).
	pub with_credentials: bool,
	/// Query parameters.
	pub params: Vec<(String, String)>,
	/// JSON body.
	pub data: Option<serde_json::Value>,
	/// Extra headers; they override the built defaults.
	pub headers: Headers,
	/// Expected response representation.
	pub response_type: ResponseType,
}
impl RequestOptions {
	/// Creates options with the defaults (`auth`, `cors`, and `with_credentials` enabled).
	pub fn new() -> Self {
		Self::default()
	}

	/// Routes the request to `service`.
	pub fn with_service(mut self, service: impl Into<String>) -> Self {
		self.service = Some(service.into());

		self
	}

	/// Overrides the auth flag.
	pub fn with_auth(mut self, auth: bool) -> Self {
		self.auth = auth;

		self
	}

	/// Overrides the CORS flag.
	pub fn with_cors(mut self, cors: bool) -> Self {
		self.cors = cors;

		self
	}

	/// Overrides the credentials flag.
	pub fn with_credentials(mut self, with_credentials: bool) -> Self {
		self.with_credentials = with_credentials;

		self
	}

	/// Appends a query parameter.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((key.into(), value.into()));

		self
	}

	/// Sets the JSON body.
	pub fn with_data(mut self, data: serde_json::Value) -> Self {
		self.data = Some(data);

		self
	}

	/// Serializes `body` into the JSON body.
	pub fn with_json<B>(self, body: &B) -> Result<Self, serde_json::Error>
	where
		B: ?Sized + Serialize,
	{
		Ok(self.with_data(serde_json::to_value(body)?))
	}

	/// Adds or overrides a header; names match the built defaults case-insensitively.
	pub fn with_header(self, name: &str, value: &str) -> Result<Self, ConfigError> {
		let (name, value) = headers::parse_header(name, value)?;

		Ok(self.with_header_value(name, value))
	}

	/// Adds or overrides a header from typed parts.
	pub fn with_header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Overrides the response representation.
	pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
		self.response_type = response_type;

		self
	}
}
impl Default for RequestOptions {
	fn default() -> Self {
		Self {
			service: None,
			auth: true,
			cors: true,
			with_credentials: true,
			params: Vec::new(),
			data: None,
			headers: Headers::new(),
			response_type: ResponseType::default(),
		}
	}
}

/// Verbs accepted by uploads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UploadMethod {
	/// `POST` (default).
	#[default]
	Post,
	/// `PUT`
	Put,
}
impl From<UploadMethod> for Method {
	fn from(method: UploadMethod) -> Self {
		match method {
			UploadMethod::Post => Method::Post,
			UploadMethod::Put => Method::Put,
		}
	}
}

/// Options recognized by [`Client::upload`](crate::Client::upload).
#[derive(Clone, Default)]
pub struct UploadOptions {
	/// Shared request options; `data` is ignored because the file is the body.
	pub request: RequestOptions,
	/// Upload verb.
	pub method: UploadMethod,
	/// Percentage progress handler.
	pub on_upload_progress: Option<PercentHandler>,
}
impl UploadOptions {
	/// Creates POST upload options with default request options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Overrides the verb.
	pub fn with_method(mut self, method: UploadMethod) -> Self {
		self.method = method;

		self
	}

	/// Replaces the shared request options.
	pub fn with_request(mut self, request: RequestOptions) -> Self {
		self.request = request;

		self
	}

	/// Registers a percentage progress handler.
	pub fn with_progress<F>(mut self, handler: F) -> Self
	where
		F: 'static + Send + Sync + Fn(u8),
	{
		self.on_upload_progress = Some(Arc::new(handler));

		self
	}
}
impl Debug for UploadOptions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UploadOptions")
			.field("request", &self.request)
			.field("method", &self.method)
			.field("on_upload_progress", &self.on_upload_progress.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_enable_auth_cors_and_credentials() {
		let options = RequestOptions::new();

		assert!(options.auth && options.cors && options.with_credentials);
		assert!(options.service.is_none());
		assert_eq!(UploadOptions::new().method, UploadMethod::Post);
		assert_eq!(Method::from(UploadMethod::Put), Method::Put);
	}

	#[test]
	fn json_body_serializes() {
		#[derive(Serialize)]
		struct Payload {
			name: &'static str,
		}

		let options =
			RequestOptions::new().with_json(&Payload { name: "x" }).expect("Payload should serialize.");

		assert_eq!(options.data, Some(serde_json::json!({ "name": "x" })));
	}

	#[test]
	fn headers_replace_case_insensitively() {
		let options = RequestOptions::new()
			.with_header("X-Trace", "a")
			.and_then(|options| options.with_header("x-trace", "b"))
			.expect("Headers should parse.");

		assert_eq!(options.headers.len(), 1);
		assert_eq!(options.headers.get("X-TRACE").and_then(|v| v.to_str().ok()), Some("b"));
	}

	#[test]
	fn invalid_header_is_rejected() {
		let err = RequestOptions::new()
			.with_header("bad header", "x")
			.expect_err("Names with spaces should be rejected.");

		assert!(matches!(err, ConfigError::InvalidHeader { ref name } if name == "bad header"));
	}
}
