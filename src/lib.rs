//! Bearer-authenticated HTTP client with coalesced token refresh: one refresh exchange per burst
//! of 401s, every queued request replayed with the rotated token.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod obs;
pub mod refresh;
pub mod token;

pub use client::*;
pub use config::{ClientConfig, ConfigPatch};
pub use error::{ConfigError, Error, Result, TransportError};

mod _prelude {
	pub use std::{
		collections::{BTreeMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
