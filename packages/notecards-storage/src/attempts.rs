use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::{Result, models::RetrievalAttempt};
use notecards_domain::spacing::AttemptRecord;

const ATTEMPT_COLUMNS: &str = "attempt_id, card_id, retrieval_date, retrieved, spacing_bin";

/// Appends one attempt to a card's history. Attempts are never updated afterwards.
pub async fn insert_attempt<'e, E>(
	executor: E,
	card_id: Uuid,
	record: &AttemptRecord,
) -> Result<RetrievalAttempt>
where
	E: PgExecutor<'e>,
{
	let attempt = sqlx::query_as::<_, RetrievalAttempt>(&format!(
		"\
INSERT INTO retrieval_attempts (card_id, retrieval_date, retrieved, spacing_bin)
VALUES ($1, $2, $3, $4)
RETURNING {ATTEMPT_COLUMNS}"
	))
	.bind(card_id)
	.bind(record.retrieval_date)
	.bind(record.retrieved)
	.bind(record.spacing_bin)
	.fetch_one(executor)
	.await?;

	Ok(attempt)
}

/// History of one card, oldest first.
pub async fn list_attempts<'e, E>(executor: E, card_id: Uuid) -> Result<Vec<RetrievalAttempt>>
where
	E: PgExecutor<'e>,
{
	let attempts = sqlx::query_as::<_, RetrievalAttempt>(&format!(
		"\
SELECT {ATTEMPT_COLUMNS}
FROM retrieval_attempts
WHERE card_id = $1
ORDER BY retrieval_date, attempt_id"
	))
	.bind(card_id)
	.fetch_all(executor)
	.await?;

	Ok(attempts)
}

pub async fn list_attempts_for_cards<'e, E>(
	executor: E,
	card_ids: &[Uuid],
) -> Result<Vec<RetrievalAttempt>>
where
	E: PgExecutor<'e>,
{
	if card_ids.is_empty() {
		return Ok(Vec::new());
	}

	let attempts = sqlx::query_as::<_, RetrievalAttempt>(&format!(
		"\
SELECT {ATTEMPT_COLUMNS}
FROM retrieval_attempts
WHERE card_id = ANY($1)
ORDER BY card_id, retrieval_date, attempt_id"
	))
	.bind(card_ids)
	.fetch_all(executor)
	.await?;

	Ok(attempts)
}

/// Looks an attempt up among all of the owner's cards.
pub async fn get_owned_attempt<'e, E>(
	executor: E,
	user_id: Uuid,
	attempt_id: i64,
) -> Result<Option<RetrievalAttempt>>
where
	E: PgExecutor<'e>,
{
	let attempt = sqlx::query_as::<_, RetrievalAttempt>(
		"\
SELECT a.attempt_id, a.card_id, a.retrieval_date, a.retrieved, a.spacing_bin
FROM retrieval_attempts a
JOIN cards c ON c.card_id = a.card_id
WHERE c.user_id = $1 AND a.attempt_id = $2",
	)
	.bind(user_id)
	.bind(attempt_id)
	.fetch_optional(executor)
	.await?;

	Ok(attempt)
}
