use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Course, CourseLevel, CourseStatus, suggestion};

/// The indexed projection of a course.
///
/// The index is a derived cache: every field here is copied from, or computed from, the origin
/// course record, so the whole index can be rebuilt from origin records at any time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
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
	pub suggestion_input: Vec<String>,
	pub suggestion_weight: u32,
}

/// Projects a course into its index document. Pure and total.
pub fn to_search_document(course: &Course) -> SearchDocument {
	SearchDocument {
		id: course.id.clone(),
		title: course.title.clone(),
		description: course.description.clone(),
		category: course.category.clone(),
		level: course.level,
		status: course.status,
		tags: course.tags.clone(),
		price: course.price,
		rating: course.rating,
		total_students: course.total_students,
		instructor_id: course.instructor_id.clone(),
		thumbnail: course.thumbnail.clone(),
		created_at: course.created_at,
		published_at: course.published_at,
		suggestion_input: suggestion::suggestion_input(
			&course.title,
			&course.tags,
			&course.category,
		),
		suggestion_weight: suggestion::suggestion_weight(course.rating, course.total_students),
	}
}
