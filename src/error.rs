//! Client-level error types shared by the executor, the refresh coordinator, and the facade.

// self
use crate::{
	_prelude::*,
	http::{HttpResponse, RequestDescriptor},
};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Shared, cloneable error source.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// The enum is `Clone` because a single refresh outcome is delivered to every queued request.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Server rejected the request as malformed (HTTP 400).
	#[error("Bad request: {message}")]
	BadRequest {
		/// `message` field of the response body, or an empty string.
		message: String,
	},
	/// Server rejected the credentials (HTTP 401).
	#[error("Authentication failed: {failure}")]
	Authentication {
		/// Original failure, retained so the request can be replayed.
		failure: Box<TransportError>,
	},
	/// Server refused access to the resource (HTTP 403).
	#[error("Access to the requested resource is forbidden.")]
	Authorization,
	/// Resource does not exist (HTTP 404).
	#[error("Requested resource was not found.")]
	NotFound,
	/// Refresh-token accessor yielded no token.
	#[error("No refresh token provided.")]
	NoRefreshTokenProvided,
	/// Refresh endpoint answered with a payload that could not be decoded.
	#[error("Refresh response could not be decoded.")]
	RefreshResponse {
		/// Structured decoding failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// The refresh leader went away before settling the queue.
	#[error("Token refresh was abandoned before it settled.")]
	RefreshAbandoned,
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Unclassified transport failure, passed through unchanged.
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl Error {
	/// Returns `true` for [`Error::Authentication`].
	pub fn is_authentication(&self) -> bool {
		matches!(self, Self::Authentication { .. })
	}

	/// Returns `true` for [`Error::Authorization`].
	pub fn is_access(&self) -> bool {
		matches!(self, Self::Authorization)
	}

	/// Returns `true` for [`Error::NotFound`].
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound)
	}

	/// Returns `true` for [`Error::BadRequest`].
	pub fn is_bad_request(&self) -> bool {
		matches!(self, Self::BadRequest { .. })
	}

	/// Returns `true` for [`Error::NoRefreshTokenProvided`].
	pub fn is_no_refresh_token(&self) -> bool {
		matches!(self, Self::NoRefreshTokenProvided)
	}

	/// HTTP status associated with the error, when one is known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::BadRequest { .. } => Some(400),
			Self::Authentication { .. } => Some(401),
			Self::Authorization => Some(403),
			Self::NotFound => Some(404),
			Self::Transport(failure) => failure.status(),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// A required accessor is missing from the configuration.
	#[error("The `{accessor}` accessor is not configured.")]
	NotConfigured {
		/// Accessor name.
		accessor: &'static str,
	},
	/// Request or configuration names a service that has no base URL.
	#[error("Service `{name}` is not configured.")]
	UnknownService {
		/// Requested service name.
		name: String,
	},
	/// Service base URL cannot be parsed.
	#[error("Service `{service}` has an invalid base URL.")]
	InvalidServiceUrl {
		/// Service name.
		service: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header name or value cannot be sent over HTTP.
	#[error("Header `{name}` has an invalid name or value.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Settings document could not be decoded.
	#[error("Client settings could not be decoded.")]
	Settings {
		/// Structured decoding failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failure reported by an [`HttpTransport`](crate::http::HttpTransport).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Server answered with a non-2xx status.
	#[error("{} {} responded with HTTP {}.", .request.method, .request.url, .response.status)]
	Status {
		/// Request that produced the response.
		request: Box<RequestDescriptor>,
		/// Failed response, body included.
		response: Box<HttpResponse>,
	},
	/// No response was received (DNS, TCP, TLS, body streaming).
	#[error("Network error occurred while calling {} {}.", .request.method, .request.url)]
	Network {
		/// Request that could not be completed.
		request: Box<RequestDescriptor>,
		/// Transport-specific failure.
		#[source]
		source: SharedError,
	},
}
impl TransportError {
	/// Builds a status failure.
	pub fn status_failure(request: RequestDescriptor, response: HttpResponse) -> Self {
		Self::Status { request: Box::new(request), response: Box::new(response) }
	}

	/// Wraps a transport-specific network error.
	pub fn network(
		request: RequestDescriptor,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { request: Box::new(request), source: Arc::new(src) }
	}

	/// HTTP status, when a response was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { response, .. } => Some(response.status),
			Self::Network { .. } => None,
		}
	}

	/// Failed response, when one was received.
	pub fn response(&self) -> Option<&HttpResponse> {
		match self {
			Self::Status { response, .. } => Some(response),
			Self::Network { .. } => None,
		}
	}

	/// Request that failed.
	pub fn request(&self) -> &RequestDescriptor {
		match self {
			Self::Status { request, .. } | Self::Network { request, .. } => request,
		}
	}

	/// Consumes the failure and returns the request so it can be replayed.
	pub fn into_request(self) -> RequestDescriptor {
		match self {
			Self::Status { request, .. } | Self::Network { request, .. } => *request,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::Method;

	#[test]
	fn kind_helpers_match_variants() {
		assert!(Error::Authorization.is_access());
		assert!(Error::NotFound.is_not_found());
		assert!(Error::BadRequest { message: String::new() }.is_bad_request());
		assert!(Error::NoRefreshTokenProvided.is_no_refresh_token());
		assert!(!Error::NotFound.is_authentication());
	}

	#[test]
	fn transport_status_is_exposed() {
		let request = RequestDescriptor::new(Method::Get, "https://api.example.com/items");
		let failure = TransportError::status_failure(request, HttpResponse::new(502, Vec::new()));

		assert_eq!(failure.status(), Some(502));
		assert_eq!(Error::from(failure.clone()).status(), Some(502));
		assert_eq!(failure.to_string(), "GET https://api.example.com/items responded with HTTP 502.");
		assert_eq!(failure.into_request().url, "https://api.example.com/items");
	}
}
