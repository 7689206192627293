//! Named output shapes for cards and their children.
//!
//! Every endpoint picks one projection explicitly; there are no per-field option maps.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use notecards_domain::{filter::CardFilter, page::PageWindow};
use notecards_storage::models::{Card, FileAttachment, RetrievalAttempt, Tag};

pub const API_PREFIX: &str = "/cards/api/v1";
pub const MEDIA_PREFIX: &str = "/media";
pub const CARD_VERSION: u32 = 1;
pub const SUMMARY_QUERY_CHARS: usize = 160;

/// Output format selected by the `format` query parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardFormat {
	Full,
	Index,
	Links,
	Archive,
}
impl CardFormat {
	/// Unknown or missing values fall back to `default`.
	pub fn parse(raw: Option<&str>, default: Self) -> Self {
		match raw {
			Some("full") => Self::Full,
			Some("index") => Self::Index,
			Some("links") => Self::Links,
			Some("archive") => Self::Archive,
			_ => default,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
	Full,
	Index,
	Archive,
}
impl FileFormat {
	pub fn parse(raw: Option<&str>) -> Self {
		match raw {
			Some("index") => Self::Index,
			Some("archive") => Self::Archive,
			_ => Self::Full,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
	pub rel: String,
	pub href: Option<String>,
}
impl Link {
	fn to(rel: &str, href: String) -> Self {
		Self { rel: rel.to_string(), href: Some(href) }
	}

	fn empty(rel: &str) -> Self {
		Self { rel: rel.to_string(), href: None }
	}
}

/// A card with everything the projections may need.
#[derive(Clone, Debug)]
pub struct CardBundle {
	pub card: Card,
	pub tags: Vec<Tag>,
	pub files: Vec<FileAttachment>,
	pub attempts: Vec<RetrievalAttempt>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FullCard {
	pub version: u32,
	pub uuid: String,
	pub title: String,
	pub query: String,
	pub answer: String,
	#[serde(with = "crate::time_serde")]
	pub creation_date: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub last_modified_date: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub next_retrieval_date: OffsetDateTime,
	pub retrieval_attempts: Vec<AttemptView>,
	pub spacing_bin: i32,
	pub active: bool,
	pub content_fingerprint: String,
	pub tags: Vec<TagView>,
	pub files: Vec<FileView>,
	pub links: Vec<Link>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SummaryCard {
	pub version: u32,
	pub uuid: String,
	pub title: String,
	pub query: String,
	#[serde(with = "crate::time_serde")]
	pub creation_date: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub last_modified_date: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub next_retrieval_date: OffsetDateTime,
	pub spacing_bin: i32,
	pub active: bool,
	pub tags: Vec<TagView>,
	pub files: Vec<FileIndexView>,
	pub links: Vec<Link>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LinkStub {
	pub version: u32,
	pub uuid: String,
	pub links: Vec<Link>,
}

/// Self-contained card used by `.car` archives and by card import.
///
/// On import every field except `uuid` may be omitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveCard {
	#[serde(default = "card_version")]
	pub version: u32,
	#[serde(default)]
	pub uuid: Option<String>,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub query: String,
	#[serde(default)]
	pub answer: String,
	#[serde(default, with = "crate::time_serde::option")]
	pub creation_date: Option<OffsetDateTime>,
	#[serde(default, with = "crate::time_serde::option")]
	pub last_modified_date: Option<OffsetDateTime>,
	#[serde(default, with = "crate::time_serde::option")]
	pub next_retrieval_date: Option<OffsetDateTime>,
	#[serde(default)]
	pub retrieval_attempts: Vec<ArchiveAttempt>,
	#[serde(default)]
	pub spacing_bin: Option<i32>,
	#[serde(default)]
	pub active: Option<bool>,
	#[serde(default, skip_deserializing)]
	pub content_fingerprint: Option<String>,
	#[serde(default)]
	pub tags: Vec<ArchiveTag>,
	#[serde(default)]
	pub files: Vec<ArchiveFile>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveAttempt {
	#[serde(default, with = "crate::time_serde::option")]
	pub retrieval_date: Option<OffsetDateTime>,
	#[serde(default)]
	pub retrieved: bool,
	#[serde(default = "first_bin")]
	pub spacing_bin: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveTag {
	pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveFile {
	pub name: String,
	#[serde(default = "default_media_type")]
	pub media_type: String,
	#[serde(default)]
	pub size: Option<i64>,
	#[serde(default)]
	pub content_hash: Option<String>,
	/// Standard base64 of the file bytes.
	pub data: String,
}

/// One card in whichever projection the caller picked.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum CardView {
	Full(Box<FullCard>),
	Summary(Box<SummaryCard>),
	Archive(Box<ArchiveCard>),
	Links(LinkStub),
}

#[derive(Clone, Debug, Serialize)]
pub struct AttemptView {
	pub attempt_id: i64,
	#[serde(with = "crate::time_serde")]
	pub retrieval_date: OffsetDateTime,
	pub retrieved: bool,
	pub spacing_bin: i32,
	pub links: Vec<Link>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TagView {
	pub tag_id: i64,
	pub label: String,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub links: Vec<Link>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FileView {
	pub file_id: i64,
	pub name: String,
	pub media_type: String,
	pub url: String,
	pub links: Vec<Link>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FileIndexView {
	pub name: String,
	pub media_type: String,
	pub url: String,
}

/// Attachment in any of the file list formats.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum FileEntry {
	Full(FileView),
	Index(FileIndexView),
	Archive(ArchiveFile),
}

#[derive(Clone, Debug, Serialize)]
pub struct CardList {
	pub version: u32,
	pub cards: Vec<CardView>,
	pub page_info: PageInfo,
}

#[derive(Clone, Debug, Serialize)]
pub struct PageInfo {
	pub num_cards: i64,
	pub total_num_cards: i64,
	pub num_pages: i64,
	pub current_page: i64,
	pub start_index: i64,
	pub end_index: i64,
	pub has_previous: bool,
	pub has_next: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub previous_page_number: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub next_page_number: Option<i64>,
	pub links: Vec<Link>,
}
impl PageInfo {
	pub fn new(window: &PageWindow, filter: &CardFilter) -> Self {
		let link = |rel: &str, page: Option<i64>| match page {
			Some(page) =>
				Link::to(rel, format!("{API_PREFIX}/cards{}", filter.query_for_page(page))),
			None => Link::empty(rel),
		};

		Self {
			num_cards: window.num_cards(),
			total_num_cards: window.total,
			num_pages: window.num_pages,
			current_page: window.current,
			start_index: window.start_index(),
			end_index: window.end_index(),
			has_previous: window.has_previous(),
			has_next: window.has_next(),
			previous_page_number: window.previous_page(),
			next_page_number: window.next_page(),
			links: vec![link("next", window.next_page()), link("prev", window.previous_page())],
		}
	}

	/// Page info of a list that was never paginated.
	pub fn empty() -> Self {
		Self::new(&PageWindow::new(0, 1, 0), &CardFilter::default())
	}
}

pub fn card_url(uuid: &str) -> String {
	format!("{API_PREFIX}/cards/{uuid}")
}

pub fn card_links(uuid: &str) -> Vec<Link> {
	let base = card_url(uuid);

	vec![
		Link::to("self", base.clone()),
		Link::to("tags", format!("{base}/tags")),
		Link::to("files", format!("{base}/files")),
		Link::to("retrieval-attempts", format!("{base}/retrieval-attempts")),
	]
}

pub fn full(bundle: &CardBundle) -> FullCard {
	let card = &bundle.card;

	FullCard {
		version: CARD_VERSION,
		uuid: card.uuid.clone(),
		title: card.title.clone(),
		query: card.query.clone(),
		answer: card.answer.clone(),
		creation_date: card.creation_date,
		last_modified_date: card.last_modified_date,
		next_retrieval_date: card.next_retrieval_date,
		retrieval_attempts: bundle.attempts.iter().map(|a| attempt(&card.uuid, a)).collect(),
		spacing_bin: card.spacing_bin,
		active: card.active,
		content_fingerprint: card.content_fingerprint.clone(),
		tags: bundle.tags.iter().map(|tag| card_tag(&card.uuid, tag)).collect(),
		files: bundle.files.iter().map(|file| file_full(&card.uuid, file)).collect(),
		links: card_links(&card.uuid),
	}
}

pub fn summary(bundle: &CardBundle) -> SummaryCard {
	let card = &bundle.card;

	SummaryCard {
		version: CARD_VERSION,
		uuid: card.uuid.clone(),
		title: card.title.clone(),
		query: truncate_query(&card.query, SUMMARY_QUERY_CHARS),
		creation_date: card.creation_date,
		last_modified_date: card.last_modified_date,
		next_retrieval_date: card.next_retrieval_date,
		spacing_bin: card.spacing_bin,
		active: card.active,
		tags: bundle.tags.iter().map(|tag| card_tag(&card.uuid, tag)).collect(),
		files: bundle.files.iter().map(file_index).collect(),
		links: card_links(&card.uuid),
	}
}

pub fn link_stub(card: &Card) -> LinkStub {
	LinkStub { version: CARD_VERSION, uuid: card.uuid.clone(), links: card_links(&card.uuid) }
}

/// Archive projection. `files` carries the attachments with their encoded bytes.
pub fn archive(bundle: &CardBundle, files: Vec<ArchiveFile>) -> ArchiveCard {
	let card = &bundle.card;

	ArchiveCard {
		version: CARD_VERSION,
		uuid: Some(card.uuid.clone()),
		title: card.title.clone(),
		query: card.query.clone(),
		answer: card.answer.clone(),
		creation_date: Some(card.creation_date),
		last_modified_date: Some(card.last_modified_date),
		next_retrieval_date: Some(card.next_retrieval_date),
		retrieval_attempts: bundle
			.attempts
			.iter()
			.map(|a| ArchiveAttempt {
				retrieval_date: Some(a.retrieval_date),
				retrieved: a.retrieved,
				spacing_bin: a.spacing_bin,
			})
			.collect(),
		spacing_bin: Some(card.spacing_bin),
		active: Some(card.active),
		content_fingerprint: Some(card.content_fingerprint.clone()),
		tags: bundle.tags.iter().map(|tag| ArchiveTag { label: tag.label.clone() }).collect(),
		files,
	}
}

pub fn attempt(card_uuid: &str, attempt: &RetrievalAttempt) -> AttemptView {
	let card = card_url(card_uuid);

	AttemptView {
		attempt_id: attempt.attempt_id,
		retrieval_date: attempt.retrieval_date,
		retrieved: attempt.retrieved,
		spacing_bin: attempt.spacing_bin,
		links: vec![
			Link::to("self", format!("{card}/retrieval-attempts/{}", attempt.attempt_id)),
			Link::to("card", card),
		],
	}
}

/// A tag as seen from one of its cards.
pub fn card_tag(card_uuid: &str, tag: &Tag) -> TagView {
	TagView {
		tag_id: tag.tag_id,
		label: tag.label.clone(),
		links: vec![Link::to("card-self", format!("{}/tags/{}", card_url(card_uuid), tag.tag_id))],
	}
}

pub fn tag(tag: &Tag) -> TagView {
	TagView { tag_id: tag.tag_id, label: tag.label.clone(), links: Vec::new() }
}

pub fn media_url(storage_path: &str) -> String {
	format!("{MEDIA_PREFIX}/{storage_path}")
}

pub fn file_full(card_uuid: &str, file: &FileAttachment) -> FileView {
	let card = card_url(card_uuid);

	FileView {
		file_id: file.file_id,
		name: file.name.clone(),
		media_type: file.media_type.clone(),
		url: media_url(&file.storage_path),
		links: vec![
			Link::to("self", format!("{card}/files/{}", file.file_id)),
			Link::to("card", card),
		],
	}
}

pub fn file_index(file: &FileAttachment) -> FileIndexView {
	FileIndexView {
		name: file.name.clone(),
		media_type: file.media_type.clone(),
		url: media_url(&file.storage_path),
	}
}

/// Keeps at most `max_chars` characters, ending in `...` when shortened.
pub fn truncate_query(query: &str, max_chars: usize) -> String {
	if query.chars().count() <= max_chars {
		return query.to_string();
	}

	let mut out: String = query.chars().take(max_chars.saturating_sub(3)).collect();

	out.push_str("...");

	out
}

fn card_version() -> u32 {
	CARD_VERSION
}

fn first_bin() -> i32 {
	1
}

fn default_media_type() -> String {
	"application/octet-stream".to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn long_queries_are_cut_to_the_summary_length() {
		let long = "x".repeat(200);
		let cut = truncate_query(&long, SUMMARY_QUERY_CHARS);

		assert_eq!(cut.chars().count(), SUMMARY_QUERY_CHARS);
		assert!(cut.ends_with("..."));
		assert_eq!(truncate_query("short", SUMMARY_QUERY_CHARS), "short");
		assert_eq!(truncate_query(&"y".repeat(160), SUMMARY_QUERY_CHARS).len(), 160);
	}

	#[test]
	fn unknown_formats_fall_back() {
		assert_eq!(CardFormat::parse(Some("bogus"), CardFormat::Index), CardFormat::Index);
		assert_eq!(CardFormat::parse(None, CardFormat::Full), CardFormat::Full);
		assert_eq!(CardFormat::parse(Some("links"), CardFormat::Full), CardFormat::Links);
		assert_eq!(FileFormat::parse(Some("archive")), FileFormat::Archive);
	}

	#[test]
	fn page_links_carry_the_filter() {
		let filter = CardFilter { cards_per_page: 10, ..CardFilter::default() };
		let info = PageInfo::new(&PageWindow::new(25, 2, 10), &filter);

		assert_eq!(info.previous_page_number, Some(1));
		assert_eq!(info.next_page_number, Some(3));
		assert_eq!(info.links[0].rel, "next");
		assert!(
			info.links[0]
				.href
				.as_deref()
				.is_some_and(|href| {
					href.starts_with("/cards/api/v1/cards?") && href.contains("page=3")
				})
		);

		let empty = PageInfo::empty();

		assert_eq!(empty.links[0].href, None);
		assert_eq!((empty.num_cards, empty.start_index), (0, 0));
	}
}
