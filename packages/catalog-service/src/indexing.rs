use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result, SearchService};
use catalog_domain::{Course, SearchDocument, to_search_document};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexOp {
	/// The course is PUBLISHED and its document was written.
	Indexed,
	/// The course is not PUBLISHED, so any document for it was removed.
	Removed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexResponse {
	pub course_id: String,
	pub op: IndexOp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeleteResponse {
	pub course_id: String,
	/// `false` when the index held nothing for this id. Still a success.
	pub existed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
	pub indexed: u32,
	pub skipped: u32,
}

impl SearchService {
	/// Applies a created, updated, or published course. Last write wins for the same id.
	pub async fn index_course(&self, course: &Course) -> Result<IndexResponse> {
		if !course.is_published() {
			let existed = self.gateway.delete(&course.id).await?;

			tracing::info!(
				course_id = %course.id,
				status = course.status.as_str(),
				existed,
				"Removed unpublished course from the index."
			);

			return Ok(IndexResponse { course_id: course.id.clone(), op: IndexOp::Removed });
		}

		let doc = to_search_document(course);

		self.gateway.index(&doc).await.inspect_err(|err| {
			tracing::error!(course_id = %course.id, error = %err, "Failed to index course.");
		})?;

		tracing::info!(course_id = %course.id, "Indexed course.");

		Ok(IndexResponse { course_id: course.id.clone(), op: IndexOp::Indexed })
	}

	/// Same as [`Self::index_course`] for a raw course record.
	pub async fn index_course_json(&self, value: Value) -> Result<IndexResponse> {
		let course = Course::from_value(value)?;

		self.index_course(&course).await
	}

	pub async fn delete_course(&self, course_id: &str) -> Result<DeleteResponse> {
		let course_id = course_id.trim();

		if course_id.is_empty() {
			return Err(Error::invalid_request("course_id must be a non-empty string."));
		}

		let existed = self.gateway.delete(course_id).await.inspect_err(|err| {
			tracing::error!(course_id, error = %err, "Failed to delete course from the index.");
		})?;

		tracing::info!(course_id, existed, "Deleted course from the index.");

		Ok(DeleteResponse { course_id: course_id.to_string(), existed })
	}

	/// Recreates the index from origin records. Courses that are not PUBLISHED are skipped.
	pub async fn rebuild(&self, courses: &[Course]) -> Result<RebuildReport> {
		let docs = courses
			.iter()
			.filter(|course| course.is_published())
			.map(to_search_document)
			.collect::<Vec<SearchDocument>>();
		let report = RebuildReport {
			indexed: docs.len() as u32,
			skipped: (courses.len() - docs.len()) as u32,
		};

		self.gateway.rebuild(&docs).await?;

		tracing::info!(indexed = report.indexed, skipped = report.skipped, "Rebuilt course index.");

		Ok(report)
	}
}
