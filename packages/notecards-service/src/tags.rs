use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
	Error, NotecardsService, Result,
	projection::{self, TagView},
};
use notecards_domain::tag;
use notecards_storage::tags as tag_rows;

#[derive(Clone, Debug, Deserialize)]
pub struct AddTagRequest {
	pub label: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TagList {
	pub tags: Vec<TagView>,
}

impl NotecardsService {
	pub async fn list_card_tags(&self, user_id: Uuid, uuid: &str) -> Result<TagList> {
		let card = self.owned_card(user_id, uuid).await?;
		let tags = tag_rows::list_card_tags(&self.db.pool, card.card_id).await?;

		Ok(TagList { tags: tags.iter().map(|tag| projection::card_tag(&card.uuid, tag)).collect() })
	}

	/// Attaches a label to a card, creating the owner's tag on first use. Adding a label that is
	/// already attached is a no-op.
	pub async fn add_tag(&self, user_id: Uuid, uuid: &str, req: AddTagRequest) -> Result<TagView> {
		let raw = req.label.ok_or_else(|| Error::invalid("label not specified."))?;
		let label = tag::normalize_label(&raw)?;
		let card = self.owned_card(user_id, uuid).await?;
		let mut tx = self.db.pool.begin().await?;
		let tag = tag_rows::get_or_create_tag(&mut *tx, user_id, &label).await?;

		tag_rows::attach_tag(&mut *tx, card.card_id, tag.tag_id).await?;

		tx.commit().await?;

		tracing::debug!(card_uuid = %card.uuid, %label, "Tag attached.");

		Ok(projection::card_tag(&card.uuid, &tag))
	}

	/// Detaches a tag from a card. The tag itself is kept for the owner's other cards.
	pub async fn remove_tag(&self, user_id: Uuid, uuid: &str, tag_id: i64) -> Result<()> {
		let card = self.owned_card(user_id, uuid).await?;

		if !tag_rows::detach_tag(&self.db.pool, card.card_id, tag_id).await? {
			return Err(Error::not_found("Tag"));
		}

		tracing::debug!(card_uuid = %card.uuid, tag_id, "Tag detached.");

		Ok(())
	}

	/// Every tag the owner has, whether or not it is still attached to a card.
	pub async fn list_user_tags(&self, user_id: Uuid) -> Result<TagList> {
		let tags = tag_rows::list_user_tags(&self.db.pool, user_id).await?;

		Ok(TagList { tags: tags.iter().map(projection::tag).collect() })
	}
}
