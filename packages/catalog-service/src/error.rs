use std::fmt::Display;

use catalog_domain::TransformError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Transform error: {message}")]
	Transform { message: String },
	#[error("Index error: {message}")]
	Index { message: String },
	#[error("Query error: {message}")]
	Query { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
}
impl Error {
	/// A write against the index store failed.
	pub fn index(err: impl Display) -> Self {
		Self::Index { message: err.to_string() }
	}

	/// A read against the index store failed or timed out.
	pub fn query(err: impl Display) -> Self {
		Self::Query { message: err.to_string() }
	}

	pub fn invalid_request(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}
}

impl From<TransformError> for Error {
	fn from(err: TransformError) -> Self {
		Self::Transform { message: err.to_string() }
	}
}
