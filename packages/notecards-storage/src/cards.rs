use sqlx::{PgConnection, Postgres, QueryBuilder, postgres::PgExecutor};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, error::conflict_on_unique, models::Card};
use notecards_domain::{
	due::AdvanceDays,
	filter::{ActiveFilter, CardFilter, CardOrder, like_pattern},
};

const CARD_COLUMNS: &str = "\
c.card_id, c.user_id, c.uuid, c.title, c.query, c.answer, c.creation_date, \
c.last_modified_date, c.next_retrieval_date, c.spacing_bin, c.active, c.content_fingerprint";

pub async fn insert_card<'e, E>(executor: E, card: &Card) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO cards (
	card_id,
	user_id,
	uuid,
	title,
	query,
	answer,
	creation_date,
	last_modified_date,
	next_retrieval_date,
	spacing_bin,
	active,
	content_fingerprint
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
	)
	.bind(card.card_id)
	.bind(card.user_id)
	.bind(card.uuid.as_str())
	.bind(card.title.as_str())
	.bind(card.query.as_str())
	.bind(card.answer.as_str())
	.bind(card.creation_date)
	.bind(card.last_modified_date)
	.bind(card.next_retrieval_date)
	.bind(card.spacing_bin)
	.bind(card.active)
	.bind(card.content_fingerprint.as_str())
	.execute(executor)
	.await
	.map_err(|err| conflict_on_unique(err, || format!("Card {} already exists.", card.uuid)))?;

	Ok(())
}

pub async fn get_card_by_uuid<'e, E>(executor: E, user_id: Uuid, uuid: &str) -> Result<Option<Card>>
where
	E: PgExecutor<'e>,
{
	let card = sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE user_id = $1 AND uuid = $2")
		.bind(user_id)
		.bind(uuid)
		.fetch_optional(executor)
		.await?;

	Ok(card)
}

/// Same as [`get_card_by_uuid`] but holds the row lock until the transaction ends.
pub async fn lock_card_by_uuid(
	conn: &mut PgConnection,
	user_id: Uuid,
	uuid: &str,
) -> Result<Option<Card>> {
	let card = sqlx::query_as::<_, Card>(
		"SELECT * FROM cards WHERE user_id = $1 AND uuid = $2 FOR UPDATE",
	)
	.bind(user_id)
	.bind(uuid)
	.fetch_optional(conn)
	.await?;

	Ok(card)
}

pub async fn card_exists<'e, E>(executor: E, user_id: Uuid, uuid: &str) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let exists: bool =
		sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM cards WHERE user_id = $1 AND uuid = $2)")
			.bind(user_id)
			.bind(uuid)
			.fetch_one(executor)
			.await?;

	Ok(exists)
}

/// Writes the scheduling columns only.
pub async fn update_schedule<'e, E>(executor: E, card: &Card) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE cards
SET spacing_bin = $1, active = $2, next_retrieval_date = $3
WHERE card_id = $4",
	)
	.bind(card.spacing_bin)
	.bind(card.active)
	.bind(card.next_retrieval_date)
	.bind(card.card_id)
	.execute(executor)
	.await?;

	Ok(())
}

/// Writes the editable text columns, `active`, the modification time and the fingerprint.
pub async fn update_content<'e, E>(executor: E, card: &Card) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE cards
SET
	title = $1,
	query = $2,
	answer = $3,
	active = $4,
	last_modified_date = $5,
	content_fingerprint = $6
WHERE card_id = $7",
	)
	.bind(card.title.as_str())
	.bind(card.query.as_str())
	.bind(card.answer.as_str())
	.bind(card.active)
	.bind(card.last_modified_date)
	.bind(card.content_fingerprint.as_str())
	.bind(card.card_id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn update_fingerprint<'e, E>(
	executor: E,
	card_id: Uuid,
	fingerprint: &str,
	last_modified_date: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"UPDATE cards SET content_fingerprint = $1, last_modified_date = $2 WHERE card_id = $3",
	)
	.bind(fingerprint)
	.bind(last_modified_date)
	.bind(card_id)
	.execute(executor)
	.await?;

	Ok(())
}

/// Deletes the card row. Attempts, tag links and file rows go with it.
pub async fn delete_card<'e, E>(executor: E, card_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM cards WHERE card_id = $1")
		.bind(card_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn count_filtered<'e, E>(
	executor: E,
	user_id: Uuid,
	filter: &CardFilter,
	due_cutoff: OffsetDateTime,
) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM cards c");

	push_filter(&mut builder, user_id, filter, due_cutoff);

	let count: i64 = builder.build_query_scalar().fetch_one(executor).await?;

	Ok(count)
}

/// Cards matching `filter` in the filter's order. `window` is `(limit, offset)`.
pub async fn list_filtered<'e, E>(
	executor: E,
	user_id: Uuid,
	filter: &CardFilter,
	due_cutoff: OffsetDateTime,
	window: Option<(i64, i64)>,
) -> Result<Vec<Card>>
where
	E: PgExecutor<'e>,
{
	let mut builder = QueryBuilder::<Postgres>::new("SELECT ");

	builder.push(CARD_COLUMNS).push(" FROM cards c");

	push_filter(&mut builder, user_id, filter, due_cutoff);

	match filter.order() {
		CardOrder::NextRetrievalDate => builder.push(" ORDER BY c.next_retrieval_date, c.card_id"),
		CardOrder::CreationDate => builder.push(" ORDER BY c.creation_date, c.card_id"),
	};

	if let Some((limit, offset)) = window {
		builder.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
	}

	let cards = builder.build_query_as::<Card>().fetch_all(executor).await?;

	Ok(cards)
}

/// Shifts the due date of every card matching `filter`, on every page, by `days`.
///
/// The matching rows are locked before the update so concurrent attempts serialize behind it.
/// If any shifted date falls outside the representable range nothing is written.
pub async fn advance_filtered(
	conn: &mut PgConnection,
	user_id: Uuid,
	filter: &CardFilter,
	due_cutoff: OffsetDateTime,
	days: AdvanceDays,
) -> Result<u64> {
	let mut builder =
		QueryBuilder::<Postgres>::new("SELECT c.card_id, c.next_retrieval_date FROM cards c");

	push_filter(&mut builder, user_id, filter, due_cutoff);

	builder.push(" FOR UPDATE");

	let rows: Vec<(Uuid, OffsetDateTime)> = builder.build_query_as().fetch_all(&mut *conn).await?;

	if rows.is_empty() {
		return Ok(0);
	}

	let mut card_ids = Vec::with_capacity(rows.len());
	let mut next_dates = Vec::with_capacity(rows.len());

	for (card_id, next_retrieval_date) in rows {
		let Some(next) = days.apply(next_retrieval_date) else {
			return Err(Error::InvalidArgument(format!(
				"num_days moves the due date {next_retrieval_date} out of range."
			)));
		};

		card_ids.push(card_id);
		next_dates.push(next);
	}

	let result = sqlx::query(
		"\
UPDATE cards AS c
SET next_retrieval_date = shifted.next_retrieval_date
FROM UNNEST($1::uuid[], $2::timestamptz[]) AS shifted(card_id, next_retrieval_date)
WHERE c.card_id = shifted.card_id",
	)
	.bind(card_ids.as_slice())
	.bind(next_dates.as_slice())
	.execute(&mut *conn)
	.await?;

	Ok(result.rows_affected())
}

fn push_filter(
	builder: &mut QueryBuilder<'_, Postgres>,
	user_id: Uuid,
	filter: &CardFilter,
	due_cutoff: OffsetDateTime,
) {
	builder.push(" WHERE c.user_id = ").push_bind(user_id);

	for word in filter.tag_words() {
		builder
			.push(
				" AND EXISTS (SELECT 1 FROM card_tags ct JOIN tags t ON t.tag_id = ct.tag_id \
				 WHERE ct.card_id = c.card_id AND t.label ILIKE ",
			)
			.push_bind(like_pattern(word))
			.push(")");
	}
	for word in filter.title_words() {
		builder.push(" AND c.title ILIKE ").push_bind(like_pattern(word));
	}

	if filter.due_only() {
		builder.push(" AND c.next_retrieval_date <= ").push_bind(due_cutoff);
	}

	match filter.active_filter() {
		ActiveFilter::Inactive => {
			builder.push(" AND NOT c.active");
		},
		ActiveFilter::Active => {
			builder.push(" AND c.active");
		},
		ActiveFilter::Any => {},
	}
}
