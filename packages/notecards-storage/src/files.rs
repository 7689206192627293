use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::{
	Result,
	error::conflict_on_unique,
	models::{FileAttachment, NewFileAttachment},
};

const FILE_COLUMNS: &str =
	"file_id, card_id, name, storage_path, media_type, size, content_hash, creation_date";

pub async fn insert_file<'e, E>(executor: E, file: &NewFileAttachment) -> Result<FileAttachment>
where
	E: PgExecutor<'e>,
{
	let file_row = sqlx::query_as::<_, FileAttachment>(&format!(
		"\
INSERT INTO file_attachments (
	card_id,
	name,
	storage_path,
	media_type,
	size,
	content_hash,
	creation_date
)
VALUES ($1, $2, $3, $4, $5, $6, $7)
RETURNING {FILE_COLUMNS}"
	))
	.bind(file.card_id)
	.bind(file.name.as_str())
	.bind(file.storage_path.as_str())
	.bind(file.media_type.as_str())
	.bind(file.size)
	.bind(file.content_hash.as_str())
	.bind(file.creation_date)
	.fetch_one(executor)
	.await
	.map_err(|err| {
		conflict_on_unique(err, || format!("Storage path {} is taken.", file.storage_path))
	})?;

	Ok(file_row)
}

/// Attachments of one card in upload order.
pub async fn list_files<'e, E>(executor: E, card_id: Uuid) -> Result<Vec<FileAttachment>>
where
	E: PgExecutor<'e>,
{
	let files = sqlx::query_as::<_, FileAttachment>(&format!(
		"SELECT {FILE_COLUMNS} FROM file_attachments WHERE card_id = $1 ORDER BY file_id"
	))
	.bind(card_id)
	.fetch_all(executor)
	.await?;

	Ok(files)
}

pub async fn list_files_for_cards<'e, E>(
	executor: E,
	card_ids: &[Uuid],
) -> Result<Vec<FileAttachment>>
where
	E: PgExecutor<'e>,
{
	if card_ids.is_empty() {
		return Ok(Vec::new());
	}

	let files = sqlx::query_as::<_, FileAttachment>(&format!(
		"\
SELECT {FILE_COLUMNS}
FROM file_attachments
WHERE card_id = ANY($1)
ORDER BY card_id, file_id"
	))
	.bind(card_ids)
	.fetch_all(executor)
	.await?;

	Ok(files)
}

/// Looks an attachment up among all of the owner's cards.
pub async fn get_owned_file<'e, E>(
	executor: E,
	user_id: Uuid,
	file_id: i64,
) -> Result<Option<FileAttachment>>
where
	E: PgExecutor<'e>,
{
	let file = sqlx::query_as::<_, FileAttachment>(
		"\
SELECT
	f.file_id,
	f.card_id,
	f.name,
	f.storage_path,
	f.media_type,
	f.size,
	f.content_hash,
	f.creation_date
FROM file_attachments f
JOIN cards c ON c.card_id = f.card_id
WHERE c.user_id = $1 AND f.file_id = $2",
	)
	.bind(user_id)
	.bind(file_id)
	.fetch_optional(executor)
	.await?;

	Ok(file)
}

pub async fn get_owned_file_by_path<'e, E>(
	executor: E,
	user_id: Uuid,
	storage_path: &str,
) -> Result<Option<FileAttachment>>
where
	E: PgExecutor<'e>,
{
	let file = sqlx::query_as::<_, FileAttachment>(
		"\
SELECT
	f.file_id,
	f.card_id,
	f.name,
	f.storage_path,
	f.media_type,
	f.size,
	f.content_hash,
	f.creation_date
FROM file_attachments f
JOIN cards c ON c.card_id = f.card_id
WHERE c.user_id = $1 AND f.storage_path = $2",
	)
	.bind(user_id)
	.bind(storage_path)
	.fetch_optional(executor)
	.await?;

	Ok(file)
}

pub async fn delete_file<'e, E>(executor: E, file_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM file_attachments WHERE file_id = $1")
		.bind(file_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}
