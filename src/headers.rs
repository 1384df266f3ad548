//! Default request headers and bearer formatting.

// crates.io
pub use ::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use ::http::{HeaderName, HeaderValue};
// self
use crate::error::ConfigError;

/// Case-insensitive, multi-valued header map used by requests and responses.
pub type Headers = ::http::HeaderMap;

/// Header carrying the fetch mode marker.
pub const MODE: &str = "mode";

const JSON: &str = "application/json";

/// Inputs for [`build_headers`].
#[derive(Clone, Copy, Debug)]
pub struct HeaderOptions<'a> {
	/// Attach the bearer token when one is available.
	pub auth: bool,
	/// Mark the request as a CORS request.
	pub cors: bool,
	/// Current access token, if any.
	pub access_token: Option<&'a str>,
}

/// Formats a sensitive `Authorization` value for `token`.
pub fn bearer(token: &str) -> Result<HeaderValue, ConfigError> {
	let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
		.map_err(|_| ConfigError::InvalidHeader { name: AUTHORIZATION.to_string() })?;

	value.set_sensitive(true);

	Ok(value)
}

/// Parses a caller-supplied header pair.
pub fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
	let invalid = || ConfigError::InvalidHeader { name: name.into() };
	let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
	let value = HeaderValue::from_str(value).map_err(|_| invalid())?;

	Ok((header, value))
}

/// Builds the default header set for a request.
///
/// Fails only when the access token cannot be carried in a header value.
pub fn build_headers(options: HeaderOptions) -> Result<Headers, ConfigError> {
	let mut headers = Headers::new();

	headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
	headers.insert(ACCEPT, HeaderValue::from_static(JSON));

	if options.cors {
		headers.insert(MODE, HeaderValue::from_static("cors"));
	}
	if let Some(token) = options.access_token.filter(|_| options.auth) {
		headers.insert(AUTHORIZATION, bearer(token)?);
	}

	Ok(headers)
}

/// Replaces every header in `base` named by `overrides`, keeping all override values.
pub fn merge_overrides(base: &mut Headers, overrides: Headers) {
	for name in overrides.keys() {
		base.remove(name);
	}

	for (name, value) in overrides.iter() {
		base.append(name.clone(), value.clone());
	}
}
