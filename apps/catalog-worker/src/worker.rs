//! Applies course lifecycle events from the outbox to the search index.
//!
//! The search core never retries. Retries, backoff, and poison-job handling all live here.

use std::time::Duration as StdDuration;

use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use crate::Result;
use catalog_domain::Course;
use catalog_service::{Error as ServiceError, SearchService};
use catalog_storage::{
	db::Db,
	models::IndexOutboxEntry,
	outbox::{self, OP_DELETE, OP_UPSERT},
};

const MAX_OUTBOX_ERROR_CHARS: usize = 1_024;

pub struct WorkerState {
	pub db: Db,
	pub service: SearchService,
	pub settings: catalog_config::Worker,
}

pub async fn run_worker(state: WorkerState) -> Result<()> {
	let idle = StdDuration::from_millis(state.settings.poll_interval_ms);

	tracing::info!(
		poll_interval_ms = state.settings.poll_interval_ms,
		max_attempts = state.settings.max_attempts,
		"Course index worker started."
	);

	loop {
		match process_outbox_once(&state).await {
			// Drain the backlog before sleeping again.
			Ok(true) => continue,
			Ok(false) => {},
			Err(err) => {
				tracing::error!(error = %err, "Course index outbox processing failed.");
			},
		}

		tokio_time::sleep(idle).await;
	}
}

/// Claims and applies one due job. Returns `false` when nothing was due.
pub async fn process_outbox_once(state: &WorkerState) -> Result<bool> {
	let now = OffsetDateTime::now_utc();
	let lease = Duration::seconds(state.settings.lease_seconds);
	let Some(job) = outbox::claim_next(&state.db, now, lease, state.settings.max_attempts).await?
	else {
		return Ok(false);
	};

	match apply(&state.service, &job).await {
		Ok(()) => {
			outbox::mark_done(&state.db, job.outbox_id).await?;

			tracing::debug!(
				outbox_id = %job.outbox_id,
				course_id = %job.course_id,
				"Outbox job applied."
			);
		},
		Err(err) => {
			let attempts = next_attempts(&err, job.attempts, state.settings.max_attempts);
			let backoff = backoff_for_attempt(
				attempts,
				state.settings.base_backoff_ms,
				state.settings.max_backoff_ms,
			);
			let error_text = sanitize_outbox_error(&err.to_string());

			outbox::mark_failed(
				&state.db,
				job.outbox_id,
				attempts,
				&error_text,
				OffsetDateTime::now_utc() + backoff,
			)
			.await?;

			tracing::error!(
				error = %err,
				outbox_id = %job.outbox_id,
				course_id = %job.course_id,
				attempts,
				"Outbox job failed."
			);
		},
	}

	Ok(true)
}

async fn apply(service: &SearchService, job: &IndexOutboxEntry) -> catalog_service::Result<()> {
	match job.op.as_str() {
		OP_UPSERT => {
			let payload = job.payload.clone().ok_or_else(|| {
				ServiceError::invalid_request("UPSERT outbox job has no course payload.")
			})?;
			let course = Course::from_value(payload)?;

			if course.id != job.course_id {
				return Err(ServiceError::invalid_request(format!(
					"Payload course id {} does not match outbox course id {}.",
					course.id, job.course_id
				)));
			}

			service.index_course(&course).await?;
		},
		OP_DELETE => {
			service.delete_course(&job.course_id).await?;
		},
		other => {
			return Err(ServiceError::invalid_request(format!("Unsupported outbox op: {other}.")));
		},
	}

	Ok(())
}

/// A record that cannot be transformed will not get better by retrying, so it goes straight to the
/// attempt ceiling.
fn next_attempts(err: &ServiceError, attempts: i32, max_attempts: i32) -> i32 {
	match err {
		ServiceError::Transform { .. } | ServiceError::InvalidRequest { .. } => max_attempts,
		ServiceError::Index { .. } | ServiceError::Query { .. } =>
			attempts.saturating_add(1).min(max_attempts),
	}
}

fn sanitize_outbox_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		let mut word = raw.to_string();

		if redact_next {
			word = "[REDACTED]".to_string();
			redact_next = false;
		}
		if raw.eq_ignore_ascii_case("bearer") || raw.eq_ignore_ascii_case("basic") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();

		for key in ["api_key", "apikey", "password", "secret", "token"] {
			if lowered.contains(key) && (lowered.contains('=') || lowered.contains(':')) {
				let sep = if raw.contains('=') { '=' } else { ':' };
				let prefix = raw.split(sep).next().unwrap_or(raw);

				word = format!("{prefix}{sep}[REDACTED]");

				break;
			}
		}

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_OUTBOX_ERROR_CHARS {
		out = out.chars().take(MAX_OUTBOX_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}

fn backoff_for_attempt(attempt: i32, base_ms: i64, max_ms: i64) -> Duration {
	let exp = (attempt.max(1) as u32).saturating_sub(1).min(16);
	let delay = base_ms.saturating_mul(1_i64 << exp).min(max_ms);

	Duration::milliseconds(delay)
}
