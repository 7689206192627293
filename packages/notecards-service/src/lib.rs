pub mod archive;
pub mod attempts;
pub mod auth;
pub mod cards;
pub mod files;
pub mod projection;
pub mod tags;
pub mod time_serde;

mod error;

pub use archive::{ArchiveDownload, ImportReport};
pub use attempts::{AttemptList, RecordAttemptRequest};
pub use auth::{LoginRequest, NewSession};
pub use cards::{AdvanceRequest, AdvanceResponse, CardQuery, DeleteResponse};
pub use error::{Error, Result};
pub use files::{FileList, FileUpload, MediaFile};
pub use projection::{CardFormat, CardList, CardView, FileFormat};
pub use tags::{AddTagRequest, TagList};

use std::collections::HashMap;

use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

use notecards_config::Config;
use notecards_domain::{due, spacing::SpacingTable};
use notecards_storage::{
	attempts as attempt_rows, blob::BlobStore, cards as card_rows, db::Db, files as file_rows,
	models::Card, tags as tag_rows,
};

use crate::projection::CardBundle;

pub struct NotecardsService {
	pub cfg: Config,
	pub db: Db,
	pub blobs: BlobStore,
	pub spacing: SpacingTable,
	pub utc_offset: UtcOffset,
}
impl NotecardsService {
	pub fn new(cfg: Config, db: Db) -> Result<Self> {
		let spacing = SpacingTable::from_config(&cfg.scheduler)?;
		let utc_offset = cfg
			.scheduler
			.offset()
			.map_err(|err| Error::InvalidRequest { message: err.to_string() })?;
		let blobs = BlobStore::from_config(&cfg.storage.files);

		Ok(Self { cfg, db, blobs, spacing, utc_offset })
	}

	/// End of the server's local day; cards due at or before it are up for review.
	pub fn due_cutoff(&self, now: OffsetDateTime) -> OffsetDateTime {
		due::due_cutoff(now, self.utc_offset)
	}

	pub(crate) async fn owned_card(&self, user_id: Uuid, uuid: &str) -> Result<Card> {
		card_rows::get_card_by_uuid(&self.db.pool, user_id, uuid)
			.await?
			.ok_or_else(|| Error::not_found("Card"))
	}

	/// Loads tags, files and attempts for `cards` with one query each, keeping card order.
	pub(crate) async fn bundles(&self, cards: Vec<Card>) -> Result<Vec<CardBundle>> {
		let card_ids = cards.iter().map(|card| card.card_id).collect::<Vec<_>>();
		let mut tags = HashMap::<Uuid, Vec<_>>::new();
		let mut files = HashMap::<Uuid, Vec<_>>::new();
		let mut attempts = HashMap::<Uuid, Vec<_>>::new();

		for row in tag_rows::list_tags_for_cards(&self.db.pool, &card_ids).await? {
			tags.entry(row.card_id).or_default().push(row.into_tag());
		}
		for row in file_rows::list_files_for_cards(&self.db.pool, &card_ids).await? {
			files.entry(row.card_id).or_default().push(row);
		}
		for row in attempt_rows::list_attempts_for_cards(&self.db.pool, &card_ids).await? {
			attempts.entry(row.card_id).or_default().push(row);
		}

		Ok(cards
			.into_iter()
			.map(|card| CardBundle {
				tags: tags.remove(&card.card_id).unwrap_or_default(),
				files: files.remove(&card.card_id).unwrap_or_default(),
				attempts: attempts.remove(&card.card_id).unwrap_or_default(),
				card,
			})
			.collect())
	}

	pub(crate) async fn bundle(&self, card: Card) -> Result<CardBundle> {
		let tags = tag_rows::list_card_tags(&self.db.pool, card.card_id).await?;
		let files = file_rows::list_files(&self.db.pool, card.card_id).await?;
		let attempts = attempt_rows::list_attempts(&self.db.pool, card.card_id).await?;

		Ok(CardBundle { card, tags, files, attempts })
	}

	/// Renders one card in `format`. Archive output reads and encodes attachment blobs.
	pub(crate) async fn render(&self, bundle: &CardBundle, format: CardFormat) -> Result<CardView> {
		Ok(match format {
			CardFormat::Full => CardView::Full(Box::new(projection::full(bundle))),
			CardFormat::Index => CardView::Summary(Box::new(projection::summary(bundle))),
			CardFormat::Links => CardView::Links(projection::link_stub(&bundle.card)),
			CardFormat::Archive => CardView::Archive(Box::new(self.archive_card(bundle).await?)),
		})
	}
}
