use serde_json::json;
use time::{Duration, OffsetDateTime};

use catalog_storage::{db::Db, outbox};
use catalog_testkit::ScratchDatabase;

async fn connect(dsn: &str) -> Db {
	let cfg = catalog_config::Postgres { dsn: dsn.to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set CATALOG_PG_DSN to run."]
async fn claims_and_completes_jobs() {
	let Some(base_dsn) = catalog_testkit::env_dsn() else {
		eprintln!("Skipping claims_and_completes_jobs; set CATALOG_PG_DSN to run this test.");

		return;
	};
	let scratch = ScratchDatabase::create(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(scratch.dsn()).await;
	let outbox_id = outbox::enqueue_upsert(&db, "course-1", &json!({ "id": "course-1" }))
		.await
		.expect("Failed to enqueue outbox.");
	let now = OffsetDateTime::now_utc() + Duration::seconds(1);
	let job = outbox::claim_next(&db, now, Duration::seconds(30), 5)
		.await
		.expect("Failed to claim job.")
		.expect("Expected a due job.");

	assert_eq!(job.outbox_id, outbox_id);
	assert_eq!(job.op, outbox::OP_UPSERT);

	let again = outbox::claim_next(&db, now, Duration::seconds(30), 5)
		.await
		.expect("Failed to claim job.");

	assert!(again.is_none(), "A leased job must not be claimed twice.");

	outbox::mark_done(&db, outbox_id).await.expect("Failed to mark job done.");

	let stored = outbox::fetch(&db, outbox_id).await.expect("Failed to fetch job.").expect("job");

	assert_eq!(stored.status, "DONE");

	db.pool.close().await;
	scratch.drop_database().await.expect("Failed to drop test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set CATALOG_PG_DSN to run."]
async fn later_events_wait_for_earlier_events_of_the_same_course() {
	let Some(base_dsn) = catalog_testkit::env_dsn() else {
		eprintln!("Skipping outbox ordering test; set CATALOG_PG_DSN to run this test.");

		return;
	};
	let scratch = ScratchDatabase::create(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(scratch.dsn()).await;
	let first = outbox::enqueue_upsert(&db, "course-1", &json!({ "id": "course-1" }))
		.await
		.expect("Failed to enqueue upsert.");
	let second = outbox::enqueue_delete(&db, "course-1").await.expect("Failed to enqueue delete.");
	let now = OffsetDateTime::now_utc() + Duration::seconds(1);

	outbox::mark_failed(&db, first, 1, "index unavailable", now + Duration::minutes(5))
		.await
		.expect("Failed to mark job failed.");

	let blocked =
		outbox::claim_next(&db, now, Duration::seconds(30), 5).await.expect("Failed to claim job.");

	assert!(blocked.is_none(), "The delete must wait for the failed upsert.");

	outbox::mark_failed(&db, first, 5, "index unavailable", now)
		.await
		.expect("Failed to exhaust job.");

	let unblocked = outbox::claim_next(&db, now, Duration::seconds(30), 5)
		.await
		.expect("Failed to claim job.")
		.expect("Expected the delete once the upsert is exhausted.");

	assert_eq!(unblocked.outbox_id, second);

	db.pool.close().await;
	scratch.drop_database().await.expect("Failed to drop test database.");
}
