use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::TransformError;

/// Fields a course record must carry before it can be projected into the index.
const REQUIRED_FIELDS: [&str; 12] = [
	"id",
	"title",
	"description",
	"category",
	"level",
	"status",
	"tags",
	"price",
	"rating",
	"totalStudents",
	"instructorId",
	"createdAt",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseLevel {
	Beginner,
	Intermediate,
	Advanced,
	AllLevels,
}
impl CourseLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Beginner => "BEGINNER",
			Self::Intermediate => "INTERMEDIATE",
			Self::Advanced => "ADVANCED",
			Self::AllLevels => "ALL_LEVELS",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
	Draft,
	Review,
	Published,
	Archived,
}
impl CourseStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Draft => "DRAFT",
			Self::Review => "REVIEW",
			Self::Published => "PUBLISHED",
			Self::Archived => "ARCHIVED",
		}
	}
}

/// The slice of an origin course record the search layer reads. The course service owns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
	pub id: String,
	pub title: String,
	pub description: String,
	pub category: String,
	pub level: CourseLevel,
	pub status: CourseStatus,
	pub tags: Vec<String>,
	pub price: f64,
	pub rating: f64,
	pub total_students: u64,
	pub instructor_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(default, with = "crate::time_serde::option")]
	pub published_at: Option<OffsetDateTime>,
}
impl Course {
	/// Reads a course record received from a lifecycle event or an index request.
	///
	/// Only shape is checked here. Business invariants of the record belong to the course
	/// service that produced it.
	pub fn from_value(value: Value) -> Result<Self, TransformError> {
		let Some(object) = value.as_object() else {
			return Err(TransformError::InvalidField {
				field: "course",
				message: "expected a JSON object".to_string(),
			});
		};

		for field in REQUIRED_FIELDS {
			if object.get(field).map(Value::is_null).unwrap_or(true) {
				return Err(TransformError::MissingField { field });
			}
		}

		let course: Course = serde_json::from_value(value)?;

		if course.id.trim().is_empty() {
			return Err(TransformError::InvalidField {
				field: "id",
				message: "must be non-empty".to_string(),
			});
		}

		Ok(course)
	}

	pub fn is_published(&self) -> bool {
		self.status == CourseStatus::Published
	}
}
