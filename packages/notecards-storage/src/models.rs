use time::OffsetDateTime;
use uuid::Uuid;

use notecards_domain::spacing::CardSchedule;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct User {
	pub user_id: Uuid,
	pub username: String,
	pub password_hash: String,
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Session {
	pub session_id: String,
	pub user_id: Uuid,
	pub created_at: OffsetDateTime,
	pub expires_at: OffsetDateTime,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Card {
	pub card_id: Uuid,
	pub user_id: Uuid,
	pub uuid: String,
	pub title: String,
	pub query: String,
	pub answer: String,
	pub creation_date: OffsetDateTime,
	pub last_modified_date: OffsetDateTime,
	pub next_retrieval_date: OffsetDateTime,
	pub spacing_bin: i32,
	pub active: bool,
	pub content_fingerprint: String,
}
impl Card {
	pub fn schedule(&self) -> CardSchedule {
		CardSchedule {
			spacing_bin: self.spacing_bin,
			active: self.active,
			next_retrieval_date: self.next_retrieval_date,
		}
	}

	pub fn set_schedule(&mut self, schedule: CardSchedule) {
		self.spacing_bin = schedule.spacing_bin;
		self.active = schedule.active;
		self.next_retrieval_date = schedule.next_retrieval_date;
	}
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct Tag {
	pub tag_id: i64,
	pub user_id: Uuid,
	pub label: String,
}

/// A tag together with one card it is attached to.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CardTag {
	pub card_id: Uuid,
	pub tag_id: i64,
	pub user_id: Uuid,
	pub label: String,
}
impl CardTag {
	pub fn into_tag(self) -> Tag {
		Tag { tag_id: self.tag_id, user_id: self.user_id, label: self.label }
	}
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct RetrievalAttempt {
	pub attempt_id: i64,
	pub card_id: Uuid,
	pub retrieval_date: OffsetDateTime,
	pub retrieved: bool,
	pub spacing_bin: i32,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct FileAttachment {
	pub file_id: i64,
	pub card_id: Uuid,
	pub name: String,
	pub storage_path: String,
	pub media_type: String,
	pub size: i64,
	pub content_hash: String,
	pub creation_date: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewFileAttachment {
	pub card_id: Uuid,
	pub name: String,
	pub storage_path: String,
	pub media_type: String,
	pub size: i64,
	pub content_hash: String,
	pub creation_date: OffsetDateTime,
}
