//! `.car` archives: a gzip-compressed tar with one JSON entry per card, named by card uuid.

use std::io::{Read, Write};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use serde::Serialize;
use time::{OffsetDateTime, macros::format_description};
use uuid::Uuid;

use crate::{
	Error, NotecardsService, Result,
	projection::{self, ArchiveCard, ArchiveFile, CardBundle},
};
use notecards_domain::filter::CardFilter;
use notecards_storage::{cards as card_rows, models::FileAttachment};

/// A finished archive, ready to be sent as a download.
#[derive(Clone, Debug)]
pub struct ArchiveDownload {
	pub file_name: String,
	pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ImportReport {
	pub num_cards_imported: usize,
}

impl NotecardsService {
	/// Archive projection of one card, with every attachment read back and base64 encoded.
	pub(crate) async fn archive_card(&self, bundle: &CardBundle) -> Result<ArchiveCard> {
		let mut files = Vec::with_capacity(bundle.files.len());

		for file in &bundle.files {
			files.push(self.archive_file(file).await?);
		}

		Ok(projection::archive(bundle, files))
	}

	pub(crate) async fn archive_file(&self, file: &FileAttachment) -> Result<ArchiveFile> {
		let bytes = self.blobs.read(&file.storage_path).await?;

		Ok(ArchiveFile {
			name: file.name.clone(),
			media_type: file.media_type.clone(),
			size: Some(file.size),
			content_hash: Some(file.content_hash.clone()),
			data: STANDARD.encode(bytes),
		})
	}

	/// Packs every card matching `filter`, across all pages, into a `.car` archive.
	pub async fn export_archive(
		&self,
		user_id: Uuid,
		filter: &CardFilter,
		now: OffsetDateTime,
	) -> Result<ArchiveDownload> {
		let cutoff = self.due_cutoff(now);
		let filter = filter.unpaged();
		let cards = card_rows::list_filtered(&self.db.pool, user_id, &filter, cutoff, None).await?;
		let mut entries = Vec::with_capacity(cards.len());

		for bundle in self.bundles(cards).await? {
			let card = self.archive_card(&bundle).await?;
			let json = serde_json::to_vec_pretty(&card)
				.map_err(|err| Error::Archive { message: err.to_string() })?;

			entries.push((bundle.card.uuid, json));
		}

		let bytes = pack(&entries, now)?;
		let file_name = archive_file_name(now)?;

		tracing::info!(
			num_cards = entries.len(),
			size = bytes.len(),
			%file_name,
			"Archive exported."
		);

		Ok(ArchiveDownload { file_name, bytes })
	}

	/// Imports every card of a `.car` archive. Cards that fail are skipped and not counted.
	pub async fn import_archive(
		&self,
		user_id: Uuid,
		bytes: &[u8],
		now: OffsetDateTime,
	) -> Result<ImportReport> {
		let entries = unpack(bytes)?;
		let mut num_cards_imported = 0;

		for (name, data) in entries {
			let object = match serde_json::from_slice::<ArchiveCard>(&data) {
				Ok(object) => object,
				Err(err) => {
					tracing::warn!(
						entry = %name,
						error = %err,
						"Skipping unreadable archive entry."
					);

					continue;
				},
			};

			match self.import_card(user_id, object, now).await {
				Ok(_) => num_cards_imported += 1,
				Err(err) => {
					tracing::warn!(entry = %name, error = %err, "Skipping archive card.");
				},
			}
		}

		tracing::info!(num_cards_imported, "Archive imported.");

		Ok(ImportReport { num_cards_imported })
	}
}

/// `YYYYmmdd.HHMMSS.car` in UTC.
pub fn archive_file_name(now: OffsetDateTime) -> Result<String> {
	let stamp = now
		.to_offset(time::UtcOffset::UTC)
		.format(format_description!("[year][month][day].[hour][minute][second]"))
		.map_err(|err| Error::Archive { message: err.to_string() })?;

	Ok(format!("{stamp}.car"))
}

fn pack(entries: &[(String, Vec<u8>)], now: OffsetDateTime) -> Result<Vec<u8>> {
	let archive_err = |err: std::io::Error| Error::Archive { message: err.to_string() };
	let mut buffer = Vec::new();

	{
		let encoder = GzEncoder::new(&mut buffer, Compression::default());
		let mut builder = tar::Builder::new(encoder);
		let mtime = u64::try_from(now.unix_timestamp()).unwrap_or_default();

		for (name, data) in entries {
			let mut header = tar::Header::new_gnu();

			header.set_size(data.len() as u64);
			header.set_mode(0o644);
			header.set_mtime(mtime);
			header.set_cksum();

			builder.append_data(&mut header, name, data.as_slice()).map_err(archive_err)?;
		}

		let mut encoder = builder.into_inner().map_err(archive_err)?;

		encoder.flush().map_err(archive_err)?;
		encoder.finish().map_err(archive_err)?;
	}

	Ok(buffer)
}

/// Reads every regular file entry. A stream that is not a gzipped tar is a bad request.
fn unpack(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
	let unreadable = |err: std::io::Error| Error::invalid(format!("Unreadable archive: {err}."));
	let mut archive = tar::Archive::new(GzDecoder::new(bytes));
	let mut out = Vec::new();

	for entry in archive.entries().map_err(unreadable)? {
		let mut entry = entry.map_err(unreadable)?;

		if !entry.header().entry_type().is_file() {
			continue;
		}

		let name = entry.path().map_err(unreadable)?.to_string_lossy().into_owned();
		let mut data = Vec::new();

		entry.read_to_end(&mut data).map_err(unreadable)?;
		out.push((name, data));
	}

	Ok(out)
}
