//! Course lifecycle events waiting to be applied to the search index.
//!
//! The course service writes one row per created/updated/published/deleted event. Workers claim
//! rows with a lease, so a crashed worker's job becomes claimable again once the lease expires.

use serde_json::Value;
use sqlx::{Postgres, Transaction};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, Result, db::Db, models::IndexOutboxEntry};

pub const OP_UPSERT: &str = "UPSERT";
pub const OP_DELETE: &str = "DELETE";

pub async fn enqueue_upsert(db: &Db, course_id: &str, payload: &Value) -> Result<Uuid> {
	enqueue(db, course_id, OP_UPSERT, Some(payload)).await
}

pub async fn enqueue_delete(db: &Db, course_id: &str) -> Result<Uuid> {
	enqueue(db, course_id, OP_DELETE, None).await
}

async fn enqueue(db: &Db, course_id: &str, op: &str, payload: Option<&Value>) -> Result<Uuid> {
	if course_id.trim().is_empty() {
		return Err(Error::InvalidArgument("course_id must be non-empty.".to_string()));
	}

	let outbox_id = Uuid::new_v4();
	let now = OffsetDateTime::now_utc();

	sqlx::query(
		"\
INSERT INTO course_index_outbox (
	outbox_id,
	course_id,
	op,
	payload,
	status,
	created_at,
	updated_at,
	available_at
)
VALUES ($1,$2,$3,$4,'PENDING',$5,$5,$5)",
	)
	.bind(outbox_id)
	.bind(course_id)
	.bind(op)
	.bind(payload)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(outbox_id)
}

/// Claims the oldest due job and leases it until `now + lease`.
///
/// A job is skipped while an older unfinished job for the same course is still retryable, so
/// events for one course are applied in the order they were written.
pub async fn claim_next(
	db: &Db,
	now: OffsetDateTime,
	lease: Duration,
	max_attempts: i32,
) -> Result<Option<IndexOutboxEntry>> {
	let mut tx: Transaction<'_, Postgres> = db.pool.begin().await?;
	let row: Option<IndexOutboxEntry> = sqlx::query_as(
		"\
SELECT
	job.outbox_id,
	job.course_id,
	job.op,
	job.payload,
	job.status,
	job.attempts,
	job.last_error,
	job.available_at,
	job.created_at,
	job.updated_at
FROM course_index_outbox job
WHERE job.status IN ('PENDING','FAILED')
	AND job.available_at <= $1
	AND job.attempts < $2
	AND NOT EXISTS (
		SELECT 1
		FROM course_index_outbox older
		WHERE older.course_id = job.course_id
			AND older.created_at < job.created_at
			AND older.status IN ('PENDING','FAILED')
			AND older.attempts < $2
	)
ORDER BY job.available_at ASC
LIMIT 1
FOR UPDATE OF job SKIP LOCKED",
	)
	.bind(now)
	.bind(max_attempts)
	.fetch_optional(&mut *tx)
	.await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + lease;

		sqlx::query(
			"UPDATE course_index_outbox SET available_at = $1, updated_at = $2 WHERE outbox_id = $3",
		)
		.bind(lease_until)
		.bind(now)
		.bind(job.outbox_id)
		.execute(&mut *tx)
		.await?;

		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn mark_done(db: &Db, outbox_id: Uuid) -> Result<()> {
	let now = OffsetDateTime::now_utc();

	sqlx::query("UPDATE course_index_outbox SET status = 'DONE', updated_at = $1 WHERE outbox_id = $2")
		.bind(now)
		.bind(outbox_id)
		.execute(&db.pool)
		.await?;

	Ok(())
}

pub async fn mark_failed(
	db: &Db,
	outbox_id: Uuid,
	attempts: i32,
	error_text: &str,
	available_at: OffsetDateTime,
) -> Result<()> {
	let now = OffsetDateTime::now_utc();

	sqlx::query(
		"\
UPDATE course_index_outbox
SET status = 'FAILED',
	attempts = $1,
	last_error = $2,
	available_at = $3,
	updated_at = $4
WHERE outbox_id = $5",
	)
	.bind(attempts)
	.bind(error_text)
	.bind(available_at)
	.bind(now)
	.bind(outbox_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn fetch(db: &Db, outbox_id: Uuid) -> Result<Option<IndexOutboxEntry>> {
	let row = sqlx::query_as("SELECT * FROM course_index_outbox WHERE outbox_id = $1")
		.bind(outbox_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(row)
}
