use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, NotecardsService, Result,
	projection::{self, AttemptView},
};
use notecards_domain::spacing;
use notecards_storage::{attempts as attempt_rows, cards as card_rows};

#[derive(Clone, Debug, Deserialize)]
pub struct RecordAttemptRequest {
	pub success: Option<bool>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AttemptList {
	pub retrieval_attempts: Vec<AttemptView>,
}

impl NotecardsService {
	/// Records one study attempt and moves the card through the spacing table. Returns the attempt
	/// with the bin the card was in before it moved.
	///
	/// The card row stays locked from read to write, so concurrent attempts on the same card
	/// apply one after another.
	pub async fn record_attempt(
		&self,
		user_id: Uuid,
		uuid: &str,
		req: RecordAttemptRequest,
		now: OffsetDateTime,
	) -> Result<AttemptView> {
		let succeeded = req.success.ok_or_else(|| Error::invalid("success not specified."))?;
		let mut tx = self.db.pool.begin().await?;
		let mut card = card_rows::lock_card_by_uuid(&mut tx, user_id, uuid)
			.await?
			.ok_or_else(|| Error::not_found("Card"))?;
		let (schedule, record) =
			spacing::record_attempt(&self.spacing, &card.schedule(), succeeded, now)?;

		card.set_schedule(schedule);

		card_rows::update_schedule(&mut *tx, &card).await?;

		let attempt = attempt_rows::insert_attempt(&mut *tx, card.card_id, &record).await?;

		tx.commit().await?;

		tracing::info!(
			card_uuid = %card.uuid,
			attempt_id = attempt.attempt_id,
			retrieved = succeeded,
			from_bin = record.spacing_bin,
			to_bin = card.spacing_bin,
			"Retrieval attempt recorded."
		);

		Ok(projection::attempt(&card.uuid, &attempt))
	}

	pub async fn list_attempts(&self, user_id: Uuid, uuid: &str) -> Result<AttemptList> {
		let card = self.owned_card(user_id, uuid).await?;
		let attempts = attempt_rows::list_attempts(&self.db.pool, card.card_id).await?;

		let retrieval_attempts =
			attempts.iter().map(|attempt| projection::attempt(&card.uuid, attempt)).collect();

		Ok(AttemptList { retrieval_attempts })
	}

	/// Fetches one attempt. An attempt that exists but belongs to another card is a bad request.
	pub async fn get_attempt(
		&self,
		user_id: Uuid,
		uuid: &str,
		attempt_id: i64,
	) -> Result<AttemptView> {
		let card = self.owned_card(user_id, uuid).await?;
		let attempt = attempt_rows::get_owned_attempt(&self.db.pool, user_id, attempt_id)
			.await?
			.ok_or_else(|| Error::not_found("Retrieval attempt"))?;

		if attempt.card_id != card.card_id {
			return Err(Error::invalid("Retrieval attempt does not belong to this card."));
		}

		Ok(projection::attempt(&card.uuid, &attempt))
	}
}
