use serde::{Deserialize, Serialize};

/// Card list filter, shared by the list endpoint, archive export and bulk advance.
///
/// Integer fields keep their raw values so they can be echoed back into page links; the typed
/// accessors decide what they mean. Out-of-range values fall back to the permissive reading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardFilter {
	/// Whitespace separated words; each must be a substring of one of the card's tag labels.
	pub tags_filter: String,
	/// Whitespace separated words; each must be a substring of the title.
	pub title_filter: String,
	pub active: i64,
	pub order_by: i64,
	pub review_status: i64,
	pub page: i64,
	/// Values below 1 put every matching card on a single page.
	pub cards_per_page: i64,
}
impl CardFilter {
	/// Filter that matches every card on one page.
	pub fn all() -> Self {
		Self::default()
	}

	pub fn active_filter(&self) -> ActiveFilter {
		match self.active {
			0 => ActiveFilter::Inactive,
			1 => ActiveFilter::Active,
			_ => ActiveFilter::Any,
		}
	}

	pub fn order(&self) -> CardOrder {
		match self.order_by {
			1 => CardOrder::CreationDate,
			_ => CardOrder::NextRetrievalDate,
		}
	}

	pub fn due_only(&self) -> bool {
		self.review_status == 0
	}

	pub fn tag_words(&self) -> impl Iterator<Item = &str> {
		self.tags_filter.split_whitespace()
	}

	pub fn title_words(&self) -> impl Iterator<Item = &str> {
		self.title_filter.split_whitespace()
	}

	/// Same filter spanning every page, as used by bulk operations.
	pub fn unpaged(&self) -> Self {
		Self { page: 1, cards_per_page: 0, ..self.clone() }
	}

	/// Query string (with leading `?`) reproducing this filter at another page.
	pub fn query_for_page(&self, page: i64) -> String {
		let pairs = [
			("tags_filter", urlencoding::encode(&self.tags_filter).into_owned()),
			("title_filter", urlencoding::encode(&self.title_filter).into_owned()),
			("active", self.active.to_string()),
			("order_by", self.order_by.to_string()),
			("review_status", self.review_status.to_string()),
			("page", page.to_string()),
			("cards_per_page", self.cards_per_page.to_string()),
		];
		let joined =
			pairs.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join("&");

		format!("?{joined}")
	}
}
impl Default for CardFilter {
	fn default() -> Self {
		Self {
			tags_filter: String::new(),
			title_filter: String::new(),
			active: 2,
			order_by: 0,
			review_status: 1,
			page: 1,
			cards_per_page: 0,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveFilter {
	Inactive,
	Active,
	Any,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardOrder {
	NextRetrievalDate,
	CreationDate,
}

/// Escapes `%`, `_` and `\` so user words match literally inside an `ILIKE` pattern.
pub fn like_pattern(word: &str) -> String {
	let mut pattern = String::with_capacity(word.len() + 2);

	pattern.push('%');

	for ch in word.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			pattern.push('\\');
		}

		pattern.push(ch);
	}

	pattern.push('%');

	pattern
}
