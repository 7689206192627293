use time::{Duration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

use notecards_config::Postgres;
use notecards_domain::{due::AdvanceDays, filter::CardFilter, fingerprint};
use notecards_storage::{
	Error, cards,
	db::Db,
	models::{Card, User},
	tags, users,
};
use notecards_testkit::TestDatabase;

async fn bootstrapped(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

async fn seed_user(db: &Db, username: &str) -> Uuid {
	let user = User {
		user_id: Uuid::new_v4(),
		username: username.to_string(),
		password_hash: "unused".to_string(),
		created_at: OffsetDateTime::now_utc(),
	};

	users::insert_user(&db.pool, &user).await.expect("Failed to insert user.");

	user.user_id
}

fn card(user_id: Uuid, uuid: &str, title: &str, next: OffsetDateTime) -> Card {
	let now = OffsetDateTime::now_utc();

	Card {
		card_id: Uuid::new_v4(),
		user_id,
		uuid: uuid.to_string(),
		title: title.to_string(),
		query: "q".to_string(),
		answer: "a".to_string(),
		creation_date: now,
		last_modified_date: now,
		next_retrieval_date: next,
		spacing_bin: 1,
		active: true,
		content_fingerprint: fingerprint::content_fingerprint(title, "q", "a", []),
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set NOTECARDS_PG_DSN to run."]
async fn schema_bootstrap_is_idempotent() {
	let Some(base_dsn) = notecards_testkit::env_dsn() else {
		eprintln!("Skipping schema_bootstrap_is_idempotent; set NOTECARDS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped(&test_db).await;

	db.ensure_schema().await.expect("Second bootstrap must succeed.");

	let count: i64 = sqlx::query_scalar(
		"\
SELECT count(*)
FROM information_schema.tables
WHERE table_name IN (
	'users',
	'sessions',
	'cards',
	'tags',
	'card_tags',
	'retrieval_attempts',
	'file_attachments'
)",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 7);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set NOTECARDS_PG_DSN to run."]
async fn filters_and_bulk_advance_touch_only_matching_cards() {
	let Some(base_dsn) = notecards_testkit::env_dsn() else {
		eprintln!(
			"Skipping filters_and_bulk_advance_touch_only_matching_cards; set NOTECARDS_PG_DSN to run."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped(&test_db).await;
	let owner = seed_user(&db, "alice").await;
	let other = seed_user(&db, "bobby").await;
	// Postgres keeps microseconds.
	let now = OffsetDateTime::now_utc().replace_nanosecond(0).expect("Zero nanoseconds is valid.");
	let rust = card(owner, "aaaaaaaaaaaaaaaaaaaaaa", "Rust ownership", now);
	let sql = card(owner, "bbbbbbbbbbbbbbbbbbbbbb", "SQL joins", now);
	let foreign = card(other, "cccccccccccccccccccccc", "Rust traits", now);

	for card in [&rust, &sql, &foreign] {
		cards::insert_card(&db.pool, card).await.expect("Failed to insert card.");
	}

	let tag =
		tags::get_or_create_tag(&db.pool, owner, "lang").await.expect("Failed to create tag.");
	let again =
		tags::get_or_create_tag(&db.pool, owner, "lang").await.expect("Failed to fetch tag.");

	assert_eq!(tag, again);

	tags::attach_tag(&db.pool, rust.card_id, tag.tag_id).await.expect("Failed to attach tag.");

	let filter = CardFilter { tags_filter: "LAN".to_string(), ..CardFilter::default() };
	let cutoff = now + Duration::days(1);
	let matched = cards::list_filtered(&db.pool, owner, &filter, cutoff, None)
		.await
		.expect("Failed to list cards.");

	assert_eq!(matched.iter().map(|card| card.uuid.as_str()).collect::<Vec<_>>(), vec![
		rust.uuid.as_str()
	]);

	let title_filter = CardFilter { title_filter: "rust".to_string(), ..CardFilter::default() };

	assert_eq!(
		cards::count_filtered(&db.pool, owner, &title_filter, cutoff)
			.await
			.expect("Failed to count cards."),
		1
	);

	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");
	let advanced = cards::advance_filtered(
		&mut *tx,
		owner,
		&title_filter,
		cutoff,
		AdvanceDays::new(3).expect("Days must be valid."),
	)
	.await
	.expect("Failed to advance cards.");

	tx.commit().await.expect("Failed to commit.");

	assert_eq!(advanced, 1);

	let moved = cards::get_card_by_uuid(&db.pool, owner, &rust.uuid)
		.await
		.expect("Failed to load card.")
		.expect("Card must exist.");
	let untouched = cards::get_card_by_uuid(&db.pool, other, &foreign.uuid)
		.await
		.expect("Failed to load card.")
		.expect("Card must exist.");

	assert_eq!(moved.next_retrieval_date, rust.next_retrieval_date + Duration::days(3));
	assert_eq!(untouched.next_retrieval_date, foreign.next_retrieval_date);

	let duplicate = cards::insert_card(&db.pool, &card(owner, &rust.uuid, "dup", now)).await;

	assert!(matches!(duplicate, Err(Error::Conflict(_))));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set NOTECARDS_PG_DSN to run."]
async fn due_filter_includes_the_cutoff_instant() {
	let Some(base_dsn) = notecards_testkit::env_dsn() else {
		eprintln!("Skipping due_filter_includes_the_cutoff_instant; set NOTECARDS_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped(&test_db).await;
	let owner = seed_user(&db, "alice").await;
	let cutoff = datetime!(2024-05-02 0:00 UTC);
	let at_cutoff = card(owner, "aaaaaaaaaaaaaaaaaaaaaa", "at cutoff", cutoff);
	let after_cutoff =
		card(owner, "bbbbbbbbbbbbbbbbbbbbbb", "after cutoff", cutoff + Duration::seconds(1));

	for card in [&at_cutoff, &after_cutoff] {
		cards::insert_card(&db.pool, card).await.expect("Failed to insert card.");
	}

	let due = CardFilter { review_status: 0, ..CardFilter::all() };
	let matched =
		cards::list_filtered(&db.pool, owner, &due, cutoff, None).await.expect("Failed to list.");

	assert_eq!(matched.iter().map(|card| card.uuid.as_str()).collect::<Vec<_>>(), vec![
		at_cutoff.uuid.as_str()
	]);
	assert_eq!(
		cards::count_filtered(&db.pool, owner, &due, cutoff).await.expect("Failed to count."),
		1
	);
	assert_eq!(
		cards::count_filtered(&db.pool, owner, &CardFilter::all(), cutoff)
			.await
			.expect("Failed to count."),
		2
	);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set NOTECARDS_PG_DSN to run."]
async fn advance_past_the_calendar_writes_nothing() {
	let Some(base_dsn) = notecards_testkit::env_dsn() else {
		eprintln!(
			"Skipping advance_past_the_calendar_writes_nothing; set NOTECARDS_PG_DSN to run."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped(&test_db).await;
	let owner = seed_user(&db, "alice").await;
	let now = datetime!(2024-05-01 12:00 UTC);
	let near = card(owner, "aaaaaaaaaaaaaaaaaaaaaa", "near", now);
	let far = card(owner, "bbbbbbbbbbbbbbbbbbbbbb", "far", datetime!(9999-12-31 0:00 UTC));

	for card in [&near, &far] {
		cards::insert_card(&db.pool, card).await.expect("Failed to insert card.");
	}

	for days in [1, 3_000_000] {
		let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");
		let result = cards::advance_filtered(
			&mut *tx,
			owner,
			&CardFilter::all(),
			now,
			AdvanceDays::new(days).expect("Days must be valid."),
		)
		.await;

		assert!(matches!(result, Err(Error::InvalidArgument(_))), "{days} days: {result:?}");

		tx.rollback().await.expect("Failed to roll back.");
	}

	let listed = cards::list_filtered(&db.pool, owner, &CardFilter::all(), now, None)
		.await
		.expect("Rows must stay readable.");

	assert_eq!(listed.len(), 2);
	assert_eq!(listed[0].next_retrieval_date, near.next_retrieval_date);
	assert_eq!(listed[1].next_retrieval_date, far.next_retrieval_date);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
