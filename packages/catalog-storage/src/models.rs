use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct IndexOutboxEntry {
	pub outbox_id: Uuid,
	pub course_id: String,
	pub op: String,
	/// Course record for `UPSERT`; absent for `DELETE`.
	pub payload: Option<Value>,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
