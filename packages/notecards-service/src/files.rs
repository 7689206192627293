use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, NotecardsService, Result, cards,
	projection::{self, FileEntry, FileFormat, FileView},
};
use notecards_domain::fingerprint;
use notecards_storage::{
	cards as card_rows, files as file_rows,
	models::{Card, FileAttachment, NewFileAttachment},
};

const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Clone, Debug, Serialize)]
pub struct FileList {
	pub files: Vec<FileEntry>,
}

/// One uploaded attachment as received from the client.
#[derive(Clone, Debug)]
pub struct FileUpload {
	pub file_name: String,
	pub media_type: Option<String>,
	pub bytes: Vec<u8>,
}

/// Attachment bytes ready to be streamed to their owner.
#[derive(Clone, Debug)]
pub struct MediaFile {
	pub name: String,
	pub media_type: String,
	pub bytes: Vec<u8>,
}

impl NotecardsService {
	pub async fn list_files(
		&self,
		user_id: Uuid,
		uuid: &str,
		format: FileFormat,
	) -> Result<FileList> {
		let card = self.owned_card(user_id, uuid).await?;
		let rows = file_rows::list_files(&self.db.pool, card.card_id).await?;
		let mut files = Vec::with_capacity(rows.len());

		for row in &rows {
			files.push(match format {
				FileFormat::Full => FileEntry::Full(projection::file_full(&card.uuid, row)),
				FileFormat::Index => FileEntry::Index(projection::file_index(row)),
				FileFormat::Archive => FileEntry::Archive(self.archive_file(row).await?),
			});
		}

		Ok(FileList { files })
	}

	/// Stores an attachment and refreshes the card fingerprint.
	///
	/// The blob is written first and removed again if the row cannot be inserted.
	pub async fn upload_file(
		&self,
		user_id: Uuid,
		uuid: &str,
		upload: FileUpload,
	) -> Result<FileView> {
		let max = self.cfg.storage.files.max_upload_bytes;

		if upload.bytes.is_empty() {
			return Err(Error::invalid("Uploaded file is empty."));
		}
		if upload.bytes.len() > max {
			return Err(Error::invalid(format!("Uploaded file exceeds {max} bytes.")));
		}

		let card = self.owned_card(user_id, uuid).await?;
		let storage_path =
			self.blobs.write(&card.uuid, user_id, &upload.file_name, &upload.bytes).await?;
		let new_file = NewFileAttachment {
			card_id: card.card_id,
			name: cards::file_name_of(&storage_path),
			storage_path: storage_path.clone(),
			media_type: upload
				.media_type
				.filter(|media_type| !media_type.trim().is_empty())
				.unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string()),
			size: i64::try_from(upload.bytes.len()).unwrap_or(i64::MAX),
			content_hash: fingerprint::blob_hash(&upload.bytes),
			creation_date: OffsetDateTime::now_utc(),
		};

		match self.insert_file_row(user_id, uuid, &new_file).await {
			Ok(file) => {
				tracing::info!(
					card_uuid = %card.uuid,
					%storage_path,
					size = file.size,
					"Attachment stored."
				);

				Ok(projection::file_full(&card.uuid, &file))
			},
			Err(err) => {
				if let Err(remove_err) = self.blobs.remove(&storage_path).await {
					tracing::warn!(
						error = %remove_err,
						%storage_path,
						"Failed to remove blob of rejected upload."
					);
				}

				Err(err)
			},
		}
	}

	pub async fn get_file(&self, user_id: Uuid, uuid: &str, file_id: i64) -> Result<FileView> {
		let (card, file) = self.card_file(user_id, uuid, file_id).await?;

		Ok(projection::file_full(&card.uuid, &file))
	}

	/// Deletes the attachment row and its blob, then refreshes the card fingerprint.
	pub async fn delete_file(&self, user_id: Uuid, uuid: &str, file_id: i64) -> Result<()> {
		let (_, file) = self.card_file(user_id, uuid, file_id).await?;
		let mut tx = self.db.pool.begin().await?;
		let card = card_rows::lock_card_by_uuid(&mut tx, user_id, uuid)
			.await?
			.ok_or_else(|| Error::not_found("Card"))?;

		if !file_rows::delete_file(&mut *tx, file.file_id).await? {
			return Err(Error::not_found("File"));
		}

		let content_fingerprint = cards::card_fingerprint(&mut tx, &card).await?;

		card_rows::update_fingerprint(
			&mut *tx,
			card.card_id,
			&content_fingerprint,
			OffsetDateTime::now_utc(),
		)
		.await?;

		tx.commit().await?;

		if let Err(err) = self.blobs.remove(&file.storage_path).await {
			tracing::warn!(
				error = %err,
				storage_path = %file.storage_path,
				"Failed to remove blob."
			);
		}

		tracing::info!(card_uuid = %card.uuid, file_id, "Attachment deleted.");

		Ok(())
	}

	/// Reads an attachment by its stored path. Only the owner of the card may read it.
	pub async fn media(&self, user_id: Uuid, storage_path: &str) -> Result<MediaFile> {
		let file = file_rows::get_owned_file_by_path(&self.db.pool, user_id, storage_path)
			.await?
			.ok_or_else(|| Error::not_found("File"))?;
		let bytes = self.blobs.read(&file.storage_path).await?;

		Ok(MediaFile { name: file.name, media_type: file.media_type, bytes })
	}

	async fn insert_file_row(
		&self,
		user_id: Uuid,
		uuid: &str,
		new_file: &NewFileAttachment,
	) -> Result<FileAttachment> {
		let mut tx = self.db.pool.begin().await?;
		let card = card_rows::lock_card_by_uuid(&mut tx, user_id, uuid)
			.await?
			.ok_or_else(|| Error::not_found("Card"))?;
		let file = file_rows::insert_file(&mut *tx, new_file).await?;
		let content_fingerprint = cards::card_fingerprint(&mut tx, &card).await?;

		card_rows::update_fingerprint(
			&mut *tx,
			card.card_id,
			&content_fingerprint,
			file.creation_date,
		)
		.await?;

		tx.commit().await?;

		Ok(file)
	}

	/// Resolves a card and one of its attachments. An attachment of another card is a bad
	/// request.
	async fn card_file(
		&self,
		user_id: Uuid,
		uuid: &str,
		file_id: i64,
	) -> Result<(Card, FileAttachment)> {
		let card = self.owned_card(user_id, uuid).await?;
		let file = file_rows::get_owned_file(&self.db.pool, user_id, file_id)
			.await?
			.ok_or_else(|| Error::not_found("File"))?;

		if file.card_id != card.card_id {
			return Err(Error::invalid("File does not belong to this card."));
		}

		Ok((card, file))
	}
}
