//! Maps transport failures onto typed client errors.

// self
use crate::{_prelude::*, error::TransportError};

#[derive(Deserialize)]
struct ErrorBody {
	message: Option<String>,
}

/// Classifies a failed request.
///
/// | Status | Result |
/// |---|---|
/// | 400 | [`Error::BadRequest`] with the body's `message`, or `""` |
/// | 401 | [`Error::Authentication`] carrying the failure for replay |
/// | 403 | [`Error::Authorization`] |
/// | 404 | [`Error::NotFound`] |
/// | other / no response | [`Error::Transport`], unchanged |
pub fn classify(failure: TransportError) -> Error {
	match failure.status() {
		Some(400) => Error::BadRequest { message: bad_request_message(&failure) },
		Some(401) => Error::Authentication { failure: Box::new(failure) },
		Some(403) => Error::Authorization,
		Some(404) => Error::NotFound,
		_ => Error::Transport(failure),
	}
}

fn bad_request_message(failure: &TransportError) -> String {
	failure
		.response()
		.and_then(|response| response.json::<ErrorBody>().ok())
		.and_then(|body| body.message)
		.unwrap_or_default()
}
