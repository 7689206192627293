use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	CardFormat, CardList, CardView, Error, NotecardsService, Result,
	projection::{self, ArchiveCard, CardBundle, FullCard, PageInfo},
};
use notecards_domain::{
	due::AdvanceDays,
	filter::CardFilter,
	fingerprint, ids,
	page::PageWindow,
	patch::{self, CardText},
	spacing, tag,
};
use notecards_storage::{
	attempts as attempt_rows, cards as card_rows, files as file_rows,
	models::{Card, NewFileAttachment},
	tags as tag_rows,
};

/// Parameters of a card list request.
#[derive(Clone, Debug)]
pub struct CardQuery {
	pub filter: CardFilter,
	pub format: CardFormat,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AdvanceRequest {
	pub num_days: Option<i64>,
	/// Any non-object value is treated as "no filter".
	#[serde(default)]
	pub filter: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdvanceResponse {
	pub num_cards_advanced: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeleteResponse {
	pub message: String,
}

/// Attachment decoded from an import object, not yet written anywhere.
struct DecodedFile {
	name: String,
	media_type: String,
	bytes: Vec<u8>,
	content_hash: String,
}

impl NotecardsService {
	/// Lists the caller's cards. Anonymous callers get an empty first page.
	pub async fn list_cards(&self, user_id: Option<Uuid>, query: &CardQuery) -> Result<CardList> {
		let Some(user_id) = user_id else {
			return Ok(CardList {
				version: projection::CARD_VERSION,
				cards: Vec::new(),
				page_info: PageInfo::empty(),
			});
		};
		let (window, cards) = self.filtered_page(user_id, &query.filter).await?;
		let mut views = Vec::with_capacity(cards.len());

		for bundle in self.bundles(cards).await? {
			views.push(self.render(&bundle, query.format).await?);
		}

		Ok(CardList {
			version: projection::CARD_VERSION,
			cards: views,
			page_info: PageInfo::new(&window, &query.filter),
		})
	}

	pub async fn get_card(
		&self,
		user_id: Uuid,
		uuid: &str,
		format: CardFormat,
	) -> Result<CardView> {
		let card = self.owned_card(user_id, uuid).await?;
		let bundle = self.bundle(card).await?;

		self.render(&bundle, format).await
	}

	/// Creates one card from an import object, together with its attempts, files and tags.
	pub async fn create_card(&self, user_id: Uuid, body: Value) -> Result<FullCard> {
		if !body.is_object() {
			return Err(Error::invalid("Invalid json format. Root must be an object."));
		}

		let object: ArchiveCard = serde_json::from_value(body)
			.map_err(|err| Error::invalid(format!("Invalid card object: {err}.")))?;
		let bundle = self.import_card(user_id, object, OffsetDateTime::now_utc()).await?;

		Ok(projection::full(&bundle))
	}

	/// Applies a JSON patch document. The document is validated as a whole before the card is
	/// touched.
	pub async fn patch_card(&self, user_id: Uuid, uuid: &str, doc: &Value) -> Result<FullCard> {
		let ops = patch::parse_patch(doc)?;
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let mut card = card_rows::lock_card_by_uuid(&mut tx, user_id, uuid)
			.await?
			.ok_or_else(|| Error::not_found("Card"))?;
		let mut text = CardText {
			title: card.title.clone(),
			query: card.query.clone(),
			answer: card.answer.clone(),
			active: card.active,
		};

		for op in ops {
			text.apply(op);
		}

		card.title = text.title;
		card.query = text.query;
		card.answer = text.answer;
		card.active = text.active;
		card.last_modified_date = now;
		card.content_fingerprint = card_fingerprint(&mut tx, &card).await?;

		card_rows::update_content(&mut *tx, &card).await?;

		tx.commit().await?;

		tracing::info!(card_uuid = %card.uuid, "Card patched.");

		let bundle = self.bundle(card).await?;

		Ok(projection::full(&bundle))
	}

	/// Deletes a card with its history, tag links and attachments.
	pub async fn delete_card(&self, user_id: Uuid, uuid: &str) -> Result<DeleteResponse> {
		let mut tx = self.db.pool.begin().await?;
		let card = card_rows::lock_card_by_uuid(&mut tx, user_id, uuid)
			.await?
			.ok_or_else(|| Error::not_found("Card"))?;
		let files = file_rows::list_files(&mut *tx, card.card_id).await?;

		card_rows::delete_card(&mut *tx, card.card_id).await?;

		tx.commit().await?;

		for file in files {
			if let Err(err) = self.blobs.remove(&file.storage_path).await {
				tracing::warn!(
					error = %err,
					storage_path = %file.storage_path,
					"Failed to remove attachment blob of deleted card."
				);
			}
		}

		tracing::info!(card_uuid = %card.uuid, "Card deleted.");

		Ok(DeleteResponse { message: "Card successfully deleted.".to_string() })
	}

	/// Shifts the due date of every card matching the filter, across all pages.
	pub async fn advance_review_dates(
		&self,
		user_id: Uuid,
		req: AdvanceRequest,
	) -> Result<AdvanceResponse> {
		let num_days = req.num_days.ok_or_else(|| Error::invalid("num_days not specified."))?;
		let days = AdvanceDays::new(num_days)?;
		let filter = match req.filter {
			Some(value @ Value::Object(_)) => serde_json::from_value::<CardFilter>(value)
				.map_err(|err| Error::invalid(format!("Invalid filter: {err}.")))?,
			_ => CardFilter::all(),
		};
		let cutoff = self.due_cutoff(OffsetDateTime::now_utc());
		let mut tx = self.db.pool.begin().await?;
		let num_cards_advanced =
			card_rows::advance_filtered(&mut tx, user_id, &filter.unpaged(), cutoff, days).await?;

		tx.commit().await?;

		tracing::info!(num_days, num_cards_advanced, "Review dates advanced.");

		Ok(AdvanceResponse { num_cards_advanced })
	}

	/// One page of the caller's filtered cards.
	pub(crate) async fn filtered_page(
		&self,
		user_id: Uuid,
		filter: &CardFilter,
	) -> Result<(PageWindow, Vec<Card>)> {
		let cutoff = self.due_cutoff(OffsetDateTime::now_utc());
		let total = card_rows::count_filtered(&self.db.pool, user_id, filter, cutoff).await?;
		let window = PageWindow::new(total, filter.page, filter.cards_per_page);
		let cards = card_rows::list_filtered(
			&self.db.pool,
			user_id,
			filter,
			cutoff,
			Some((window.limit(), window.offset())),
		)
		.await?;

		Ok((window, cards))
	}

	/// Inserts a card from an import object in one transaction.
	///
	/// Blobs are written before the rows; if anything fails they are removed again.
	pub async fn import_card(
		&self,
		user_id: Uuid,
		object: ArchiveCard,
		now: OffsetDateTime,
	) -> Result<CardBundle> {
		let uuid = match object.uuid.as_deref() {
			Some(uuid) => {
				ids::validate_card_uuid(uuid)?;

				uuid.to_string()
			},
			None => ids::new_card_uuid(),
		};

		patch::validate_title(&object.title)?;

		if let Some(bin) = object.spacing_bin
			&& bin < 1
		{
			return Err(Error::invalid(format!("spacing_bin must be at least 1, got {bin}.")));
		}

		let files = decode_files(&object)?;
		let labels = import_labels(&object)?;
		let initial = spacing::initial_schedule(now)?;
		let card = Card {
			card_id: Uuid::new_v4(),
			user_id,
			uuid,
			title: object.title.clone(),
			query: object.query.clone(),
			answer: object.answer.clone(),
			creation_date: object.creation_date.unwrap_or(now),
			last_modified_date: object.last_modified_date.unwrap_or(now),
			next_retrieval_date: object.next_retrieval_date.unwrap_or(initial.next_retrieval_date),
			spacing_bin: object.spacing_bin.unwrap_or(initial.spacing_bin),
			active: object.active.unwrap_or(initial.active),
			content_fingerprint: fingerprint::content_fingerprint(
				&object.title,
				&object.query,
				&object.answer,
				files.iter().map(|file| file.content_hash.as_str()),
			),
		};

		if card_rows::card_exists(&self.db.pool, user_id, &card.uuid).await? {
			return Err(Error::Conflict { message: "Card with uuid already exists.".to_string() });
		}

		let mut written = Vec::with_capacity(files.len());
		let result = self.insert_imported(card, &object, files, &labels, now, &mut written).await;

		if result.is_err() {
			for storage_path in written {
				if let Err(err) = self.blobs.remove(&storage_path).await {
					tracing::warn!(error = %err, %storage_path, "Failed to remove orphaned blob.");
				}
			}
		}

		let bundle = result?;

		tracing::info!(card_uuid = %bundle.card.uuid, "Card imported.");

		Ok(bundle)
	}

	async fn insert_imported(
		&self,
		card: Card,
		object: &ArchiveCard,
		files: Vec<DecodedFile>,
		labels: &[String],
		now: OffsetDateTime,
		written: &mut Vec<String>,
	) -> Result<CardBundle> {
		let mut tx = self.db.pool.begin().await?;

		card_rows::insert_card(&mut *tx, &card).await?;

		let mut attempts = Vec::with_capacity(object.retrieval_attempts.len());

		for attempt in &object.retrieval_attempts {
			let record = spacing::AttemptRecord {
				retrieval_date: attempt.retrieval_date.unwrap_or(now),
				retrieved: attempt.retrieved,
				spacing_bin: attempt.spacing_bin,
			};

			attempts.push(attempt_rows::insert_attempt(&mut *tx, card.card_id, &record).await?);
		}

		let mut file_rows_out = Vec::with_capacity(files.len());

		for file in files {
			let storage_path =
				self.blobs.write(&card.uuid, card.user_id, &file.name, &file.bytes).await?;

			written.push(storage_path.clone());

			let new_file = NewFileAttachment {
				card_id: card.card_id,
				name: file_name_of(&storage_path),
				storage_path,
				media_type: file.media_type,
				size: i64::try_from(file.bytes.len()).unwrap_or(i64::MAX),
				content_hash: file.content_hash,
				creation_date: now,
			};

			file_rows_out.push(file_rows::insert_file(&mut *tx, &new_file).await?);
		}

		let mut tags = Vec::with_capacity(labels.len());

		for label in labels {
			let tag = tag_rows::get_or_create_tag(&mut *tx, card.user_id, label).await?;

			tag_rows::attach_tag(&mut *tx, card.card_id, tag.tag_id).await?;

			tags.push(tag);
		}

		tx.commit().await?;

		tags.sort_by(|a, b| a.label.cmp(&b.label));
		tags.dedup_by_key(|tag| tag.tag_id);

		Ok(CardBundle { card, tags, files: file_rows_out, attempts })
	}
}

/// Recomputes a card's fingerprint from its current text and stored attachments.
pub(crate) async fn card_fingerprint(conn: &mut PgConnection, card: &Card) -> Result<String> {
	let files = file_rows::list_files(&mut *conn, card.card_id).await?;

	Ok(fingerprint::content_fingerprint(
		&card.title,
		&card.query,
		&card.answer,
		files.iter().map(|file| file.content_hash.as_str()),
	))
}

/// Last path segment of a stored blob path.
pub(crate) fn file_name_of(storage_path: &str) -> String {
	storage_path.rsplit('/').next().unwrap_or(storage_path).to_string()
}

fn decode_files(object: &ArchiveCard) -> Result<Vec<DecodedFile>> {
	object
		.files
		.iter()
		.map(|file| {
			if file.name.trim().is_empty() || file.data.is_empty() {
				return Err(Error::invalid("File attachments need a name and data."));
			}

			let bytes = STANDARD.decode(file.data.as_bytes()).map_err(|err| {
				Error::invalid(format!("File {:?} has undecodable data: {err}.", file.name))
			})?;
			let content_hash = fingerprint::blob_hash(&bytes);

			Ok(DecodedFile {
				name: file.name.clone(),
				media_type: file.media_type.clone(),
				bytes,
				content_hash,
			})
		})
		.collect()
}

/// Normalized, de-duplicated labels. Blank labels are skipped.
fn import_labels(object: &ArchiveCard) -> Result<Vec<String>> {
	let mut labels = Vec::with_capacity(object.tags.len());

	for raw in &object.tags {
		if raw.label.trim().is_empty() {
			continue;
		}

		let label = tag::normalize_label(&raw.label)?;

		if !labels.contains(&label) {
			labels.push(label);
		}
	}

	Ok(labels)
}
