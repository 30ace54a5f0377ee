#[derive(Debug, thiserror::Error)]
pub enum TransformError {
	#[error("Course record is missing required field {field}.")]
	MissingField { field: &'static str },
	#[error("Course record field {field} is invalid: {message}")]
	InvalidField { field: &'static str, message: String },
	#[error("Course record is malformed: {0}")]
	Malformed(#[from] serde_json::Error),
}
