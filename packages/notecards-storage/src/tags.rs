use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::{
	Result,
	models::{CardTag, Tag},
};

/// Returns the owner's tag with `label`, creating it first when missing.
pub async fn get_or_create_tag<'e, E>(executor: E, user_id: Uuid, label: &str) -> Result<Tag>
where
	E: PgExecutor<'e>,
{
	// The no-op update makes RETURNING yield the existing row as well.
	let tag = sqlx::query_as::<_, Tag>(
		"\
INSERT INTO tags (user_id, label)
VALUES ($1, $2)
ON CONFLICT (user_id, label) DO UPDATE SET label = EXCLUDED.label
RETURNING tag_id, user_id, label",
	)
	.bind(user_id)
	.bind(label)
	.fetch_one(executor)
	.await?;

	Ok(tag)
}

pub async fn attach_tag<'e, E>(executor: E, card_id: Uuid, tag_id: i64) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query("INSERT INTO card_tags (card_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
		.bind(card_id)
		.bind(tag_id)
		.execute(executor)
		.await?;

	Ok(())
}

/// Returns false when the tag was not attached to the card.
pub async fn detach_tag<'e, E>(executor: E, card_id: Uuid, tag_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM card_tags WHERE card_id = $1 AND tag_id = $2")
		.bind(card_id)
		.bind(tag_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn list_card_tags<'e, E>(executor: E, card_id: Uuid) -> Result<Vec<Tag>>
where
	E: PgExecutor<'e>,
{
	let tags = sqlx::query_as::<_, Tag>(
		"\
SELECT t.tag_id, t.user_id, t.label
FROM tags t
JOIN card_tags ct ON ct.tag_id = t.tag_id
WHERE ct.card_id = $1
ORDER BY t.label",
	)
	.bind(card_id)
	.fetch_all(executor)
	.await?;

	Ok(tags)
}

/// Tags of several cards at once, ordered by card and then label.
pub async fn list_tags_for_cards<'e, E>(executor: E, card_ids: &[Uuid]) -> Result<Vec<CardTag>>
where
	E: PgExecutor<'e>,
{
	if card_ids.is_empty() {
		return Ok(Vec::new());
	}

	let tags = sqlx::query_as::<_, CardTag>(
		"\
SELECT ct.card_id, t.tag_id, t.user_id, t.label
FROM tags t
JOIN card_tags ct ON ct.tag_id = t.tag_id
WHERE ct.card_id = ANY($1)
ORDER BY ct.card_id, t.label",
	)
	.bind(card_ids)
	.fetch_all(executor)
	.await?;

	Ok(tags)
}

pub async fn list_user_tags<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Tag>>
where
	E: PgExecutor<'e>,
{
	let tags = sqlx::query_as::<_, Tag>(
		"SELECT tag_id, user_id, label FROM tags WHERE user_id = $1 ORDER BY label",
	)
	.bind(user_id)
	.fetch_all(executor)
	.await?;

	Ok(tags)
}
