//! Transport primitives: request descriptors, responses, and the [`HttpTransport`] seam.
//!
//! The client never performs network I/O itself. Every call, including refresh exchanges and
//! replays, is handed to an [`HttpTransport`] as a self-contained [`RequestDescriptor`]; the
//! transport reports non-2xx statuses as [`TransportError::Status`] so the classifier can inspect
//! the status and body. [`ReqwestTransport`] is the bundled implementation.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use ::http::{HeaderName, HeaderValue};
#[cfg(feature = "reqwest")] use futures::stream;
// self
#[cfg(feature = "reqwest")] use crate::{error::SharedError, headers::CONTENT_TYPE};
use crate::{_prelude::*, error::TransportError, headers::Headers};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Receives raw byte progress while a request body is being sent.
pub type ProgressHandler = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Abstraction over HTTP stacks capable of executing client requests.
///
/// Implementations must resolve 2xx responses to `Ok` and every other status to
/// [`TransportError::Status`], attaching the request and the full response so failures can be
/// classified and replayed.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Issues the request described by `request`.
	fn execute(&self, request: RequestDescriptor) -> TransportFuture<'_>;
}

/// HTTP verbs issued by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical verb string.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How callers intend to read the response body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
	/// Decode the body as JSON.
	#[default]
	Json,
	/// Decode the body as UTF-8 text.
	Text,
	/// Keep the raw bytes.
	Bytes,
}

/// Request body variants.
#[derive(Clone, Debug)]
pub enum RequestBody {
	/// JSON document.
	Json(serde_json::Value),
	/// Multipart form carrying a single file part.
	Multipart(FilePart),
}

/// File payload wrapped into multipart form data.
#[derive(Clone)]
pub struct FilePart {
	/// Form field name.
	pub field: String,
	/// Optional file name sent with the part.
	pub file_name: Option<String>,
	/// Optional MIME type of the part.
	pub content_type: Option<String>,
	/// File contents.
	pub bytes: Arc<[u8]>,
}
impl FilePart {
	/// Field name used by [`Client::upload`](crate::Client::upload).
	pub const DEFAULT_FIELD: &'static str = "file";

	/// Wraps `bytes` under the default `file` field.
	pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
		Self {
			field: Self::DEFAULT_FIELD.into(),
			file_name: None,
			content_type: None,
			bytes: bytes.into(),
		}
	}

	/// Sets the file name sent with the part.
	pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
		self.file_name = Some(name.into());

		self
	}

	/// Sets the MIME type of the part.
	pub fn with_content_type(mut self, mime: impl Into<String>) -> Self {
		self.content_type = Some(mime.into());

		self
	}

	/// Size of the payload in bytes.
	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	/// Returns `true` when the payload is empty.
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}
}
impl Debug for FilePart {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FilePart")
			.field("field", &self.field)
			.field("file_name", &self.file_name)
			.field("content_type", &self.content_type)
			.field("len", &self.bytes.len())
			.finish()
	}
}

/// Raw byte progress reported while a body is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferProgress {
	/// Bytes sent so far.
	pub loaded: u64,
	/// Total bytes to send.
	pub total: u64,
}
impl TransferProgress {
	/// Rounded completion percentage in `0..=100`; an empty transfer counts as complete.
	pub fn percent(self) -> u8 {
		if self.total == 0 {
			return 100;
		}

		let percent = (self.loaded as f64 * 100.0 / self.total as f64).round();

		percent.clamp(0.0, 100.0) as u8
	}
}

/// Fully resolved request, retained by authentication failures so it can be replayed.
#[derive(Clone)]
pub struct RequestDescriptor {
	/// HTTP verb.
	pub method: Method,
	/// Absolute URL (service base URL + route).
	pub url: String,
	/// Headers sent with the request.
	pub headers: Headers,
	/// Query parameters appended to the URL.
	pub params: Vec<(String, String)>,
	/// Optional body.
	pub body: Option<RequestBody>,
	/// Whether cookies/credentials should accompany the request.
	pub with_credentials: bool,
	/// Expected response representation.
	pub response_type: ResponseType,
	/// Byte-level upload progress hook.
	pub upload_progress: Option<ProgressHandler>,
}
impl RequestDescriptor {
	/// Creates a bare descriptor with no headers, params, or body.
	pub fn new(method: Method, url: impl Into<String>) -> Self {
		Self {
			method,
			url: url.into(),
			headers: Headers::new(),
			params: Vec::new(),
			body: None,
			with_credentials: false,
			response_type: ResponseType::default(),
			upload_progress: None,
		}
	}

	/// Appends a query parameter.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((key.into(), value.into()));

		self
	}

	/// Overrides the credentials flag.
	pub fn with_credentials(mut self, with_credentials: bool) -> Self {
		self.with_credentials = with_credentials;

		self
	}

	/// Sets a header, replacing every existing value under the same name.
	pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
		self.headers.insert(name, value);
	}

	/// Returns the first value of a header as text, if present and printable.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}
}
impl Debug for RequestDescriptor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestDescriptor")
			.field("method", &self.method)
			.field("url", &self.url)
			.field("header_names", &self.headers.keys().collect::<Vec<_>>())
			.field("params", &self.params.len())
			.field("body", &self.body)
			.field("with_credentials", &self.with_credentials)
			.field("response_type", &self.response_type)
			.field("upload_progress", &self.upload_progress.is_some())
			.finish()
	}
}

/// Response returned by an [`HttpTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers, repeated values included.
	pub headers: Headers,
	/// Raw body.
	pub body: Vec<u8>,
	/// Representation requested by the caller.
	pub response_type: ResponseType,
}
impl HttpResponse {
	/// Creates a response with no headers.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self {
			status,
			headers: Headers::new(),
			body: body.into(),
			response_type: ResponseType::default(),
		}
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body as JSON.
	pub fn json<T>(&self) -> Result<T, serde_json::Error>
	where
		T: for<'de> Deserialize<'de>,
	{
		serde_json::from_slice(&self.body)
	}

	/// Returns the body as text, replacing invalid UTF-8 sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body according to [`HttpResponse::response_type`].
	pub fn data(&self) -> Result<ResponseData, serde_json::Error> {
		Ok(match self.response_type {
			ResponseType::Json if self.body.is_empty() =>
				ResponseData::Json(serde_json::Value::Null),
			ResponseType::Json => ResponseData::Json(self.json()?),
			ResponseType::Text => ResponseData::Text(self.text()),
			ResponseType::Bytes => ResponseData::Bytes(self.body.clone()),
		})
	}
}

/// Decoded response body.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseData {
	/// JSON document.
	Json(serde_json::Value),
	/// UTF-8 text.
	Text(String),
	/// Raw bytes.
	Bytes(Vec<u8>),
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// `with_credentials` is advisory here: cookie handling belongs to the wrapped client (enable
/// its cookie store when the backend relies on session cookies).
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	const UPLOAD_CHUNK: usize = 64 * 1024;

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a transport from a configured builder.
	pub fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self> {
		builder.build().map(Self).map_err(|e| crate::error::ConfigError::from(e).into())
	}

	fn prepare(
		client: &ReqwestClient,
		request: &RequestDescriptor,
	) -> Result<reqwest::RequestBuilder, SharedError> {
		let mut headers = request.headers.clone();

		// Multipart bodies carry their own boundary-bearing content type.
		if matches!(request.body, Some(RequestBody::Multipart(_))) {
			headers.remove(CONTENT_TYPE);
		}

		let mut builder =
			client.request(to_reqwest_method(request.method), &request.url).headers(headers);

		if !request.params.is_empty() {
			builder = builder.query(&request.params);
		}

		match &request.body {
			Some(RequestBody::Json(value)) => {
				let bytes = serde_json::to_vec(value).map_err(|e| Arc::new(e) as SharedError)?;

				builder = builder.body(bytes);
			},
			Some(RequestBody::Multipart(file)) => {
				let part = file_part(file, request.upload_progress.clone())
					.map_err(|e| Arc::new(e) as SharedError)?;

				builder =
					builder.multipart(reqwest::multipart::Form::new().part(file.field.clone(), part));
			},
			None => {},
		}

		Ok(builder)
	}

	async fn send(
		client: ReqwestClient,
		request: RequestDescriptor,
	) -> Result<HttpResponse, TransportError> {
		let builder = match Self::prepare(&client, &request) {
			Ok(builder) => builder,
			Err(source) => return Err(TransportError::Network { request: Box::new(request), source }),
		};
		let response = match builder.send().await {
			Ok(response) => response,
			Err(e) => return Err(TransportError::network(request, e)),
		};
		let status = response.status().as_u16();
		let headers = response.headers().clone();
		let body = match response.bytes().await {
			Ok(bytes) => bytes.to_vec(),
			Err(e) => return Err(TransportError::network(request, e)),
		};
		let response =
			HttpResponse { status, headers, body, response_type: request.response_type };

		if response.is_success() {
			Ok(response)
		} else {
			Err(TransportError::status_failure(request, response))
		}
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: RequestDescriptor) -> TransportFuture<'_> {
		Box::pin(Self::send(self.0.clone(), request))
	}
}

#[cfg(feature = "reqwest")]
fn to_reqwest_method(method: Method) -> reqwest::Method {
	match method {
		Method::Get => reqwest::Method::GET,
		Method::Post => reqwest::Method::POST,
		Method::Put => reqwest::Method::PUT,
		Method::Delete => reqwest::Method::DELETE,
	}
}

#[cfg(feature = "reqwest")]
fn file_part(
	file: &FilePart,
	progress: Option<ProgressHandler>,
) -> Result<reqwest::multipart::Part, ReqwestError> {
	let total = file.bytes.len() as u64;

	// No chunk will be pulled, so report completion up front.
	if let (0, Some(progress)) = (total, &progress) {
		progress(TransferProgress { loaded: 0, total: 0 });
	}

	let bytes = Arc::clone(&file.bytes);
	let chunks = (0..bytes.len()).step_by(ReqwestTransport::UPLOAD_CHUNK).map(move |start| {
		let end = (start + ReqwestTransport::UPLOAD_CHUNK).min(bytes.len());

		if let Some(progress) = &progress {
			progress(TransferProgress { loaded: end as u64, total });
		}

		Ok::<_, std::io::Error>(bytes[start..end].to_vec())
	});
	let body = reqwest::Body::wrap_stream(stream::iter(chunks));
	let mut part = reqwest::multipart::Part::stream_with_length(body, total);

	if let Some(name) = &file.file_name {
		part = part.file_name(name.clone());
	}
	if let Some(mime) = &file.content_type {
		part = part.mime_str(mime)?;
	}

	Ok(part)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn progress_rounds_to_percent() {
		assert_eq!(TransferProgress { loaded: 50, total: 200 }.percent(), 25);
		assert_eq!(TransferProgress { loaded: 1, total: 3 }.percent(), 33);
		assert_eq!(TransferProgress { loaded: 2, total: 3 }.percent(), 67);
		assert_eq!(TransferProgress { loaded: 0, total: 0 }.percent(), 100);
		assert_eq!(TransferProgress { loaded: 300, total: 200 }.percent(), 100);
	}

	#[test]
	fn response_data_follows_response_type() {
		let mut response = HttpResponse::new(200, br#"{"ok":true}"#.to_vec());

		assert_eq!(
			response.data().expect("JSON body should decode."),
			ResponseData::Json(serde_json::json!({ "ok": true })),
		);

		response.response_type = ResponseType::Text;

		assert_eq!(
			response.data().expect("Text body should decode."),
			ResponseData::Text("{\"ok\":true}".into()),
		);
	}

	#[test]
	fn descriptor_debug_hides_header_values() {
		let mut request = RequestDescriptor::new(Method::Post, "https://api.example.com/items");

		request.set_header(
			crate::headers::AUTHORIZATION,
			crate::headers::bearer("secret-value").expect("Token should fit a header."),
		);

		let rendered = format!("{request:?}");

		assert!(rendered.contains("authorization"));
		assert!(!rendered.contains("secret-value"));
		assert_eq!(request.header("Authorization"), Some("Bearer secret-value"));
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn empty_upload_reports_completion() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		let progress: ProgressHandler =
			Arc::new(move |progress: TransferProgress| sink.lock().push(progress.percent()));

		file_part(&FilePart::new(Vec::<u8>::new()), Some(progress)).expect("Empty part should build.");

		assert_eq!(*seen.lock(), vec![100]);
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn multipart_drops_json_content_type() {
		let mut request = RequestDescriptor::new(Method::Post, "https://api.example.com/upload");

		request.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		request.body = Some(RequestBody::Multipart(FilePart::new(b"abc".to_vec())));

		let built = ReqwestTransport::prepare(&ReqwestClient::new(), &request)
			.expect("Request should prepare.")
			.build()
			.expect("Request should build.");
		let content_type = built
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.expect("Multipart content type should be set.");

		assert!(content_type.starts_with("multipart/form-data; boundary="));
		assert_eq!(built.headers().get_all(CONTENT_TYPE).iter().count(), 1);
	}
}
