/// One page of a filtered card list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
	pub total: i64,
	pub per_page: i64,
	pub num_pages: i64,
	pub current: i64,
}
impl PageWindow {
	/// Clamps `requested_page` into `1..=num_pages`. A `cards_per_page` below 1 fits every card
	/// on a single page. An empty list still has one (empty) page.
	pub fn new(total: i64, requested_page: i64, cards_per_page: i64) -> Self {
		let total = total.max(0);
		let per_page = if cards_per_page < 1 { total.max(1) } else { cards_per_page };
		let num_pages = if total == 0 { 1 } else { (total - 1) / per_page + 1 };
		let current = requested_page.clamp(1, num_pages);

		Self { total, per_page, num_pages, current }
	}

	pub fn offset(&self) -> i64 {
		self.per_page * (self.current - 1)
	}

	pub fn limit(&self) -> i64 {
		self.per_page
	}

	/// 1-based index of the first card on this page, 0 for an empty list.
	pub fn start_index(&self) -> i64 {
		if self.total == 0 { 0 } else { self.offset() + 1 }
	}

	pub fn end_index(&self) -> i64 {
		if self.current == self.num_pages { self.total } else { self.current * self.per_page }
	}

	pub fn num_cards(&self) -> i64 {
		if self.total == 0 { 0 } else { self.end_index() - self.start_index() + 1 }
	}

	pub fn has_previous(&self) -> bool {
		self.current > 1
	}

	pub fn has_next(&self) -> bool {
		self.current < self.num_pages
	}

	pub fn previous_page(&self) -> Option<i64> {
		self.has_previous().then(|| self.current - 1)
	}

	pub fn next_page(&self) -> Option<i64> {
		self.has_next().then(|| self.current + 1)
	}
}
