//! Leitner bin advancement.
//!
//! A card sits in a 1-indexed spacing bin. Each bin that has an entry in the [`SpacingTable`]
//! carries the number of days until the card is due again once it has advanced into that bin.
//! A card whose bin has no entry is graduated: it stays in that bin, is deactivated and is not
//! due again until the graduation horizon has passed. A failed card, like a new one, is due one
//! day later whatever the table says.

use time::{Duration, OffsetDateTime};

use crate::{Error, Result};
use notecards_config::MAX_DAYS;

pub const DEFAULT_BIN_INTERVALS_DAYS: [u32; 7] = [1, 3, 7, 13, 19, 29, 37];
pub const DEFAULT_GRADUATION_DAYS: u32 = 3_650;
/// Delay before a new or just failed card is due.
pub const RESET_INTERVAL: Duration = Duration::DAY;

/// Immutable bin-to-interval table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpacingTable {
	intervals: Vec<Duration>,
	graduation: Duration,
}
impl SpacingTable {
	pub fn new(intervals_days: &[u32], graduation_days: u32) -> Result<Self> {
		if intervals_days.is_empty() {
			return Err(Error::InvalidSpacingTable {
				message: "at least one bin interval is required.".to_string(),
			});
		}
		if intervals_days.contains(&0) {
			return Err(Error::InvalidSpacingTable {
				message: "bin intervals must be greater than zero.".to_string(),
			});
		}
		if intervals_days.iter().any(|days| *days > MAX_DAYS) {
			return Err(Error::InvalidSpacingTable {
				message: format!("bin intervals must be at most {MAX_DAYS} days."),
			});
		}
		if graduation_days == 0 {
			return Err(Error::InvalidSpacingTable {
				message: "graduation horizon must be greater than zero.".to_string(),
			});
		}
		if graduation_days > MAX_DAYS {
			return Err(Error::InvalidSpacingTable {
				message: format!("graduation horizon must be at most {MAX_DAYS} days."),
			});
		}

		let intervals =
			intervals_days.iter().map(|days| Duration::days(i64::from(*days))).collect();

		Ok(Self { intervals, graduation: Duration::days(i64::from(graduation_days)) })
	}

	pub fn from_config(cfg: &notecards_config::Scheduler) -> Result<Self> {
		Self::new(&cfg.bin_intervals_days, cfg.graduation_days)
	}

	/// Interval for a 1-indexed bin, `None` once the bin lies past the table.
	pub fn interval(&self, bin: i32) -> Option<Duration> {
		let index = usize::try_from(bin).ok()?.checked_sub(1)?;

		self.intervals.get(index).copied()
	}

	pub fn graduation(&self) -> Duration {
		self.graduation
	}
}
impl Default for SpacingTable {
	fn default() -> Self {
		Self {
			intervals: DEFAULT_BIN_INTERVALS_DAYS
				.iter()
				.map(|days| Duration::days(i64::from(*days)))
				.collect(),
			graduation: Duration::days(i64::from(DEFAULT_GRADUATION_DAYS)),
		}
	}
}

/// The scheduling fields of a card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardSchedule {
	pub spacing_bin: i32,
	pub active: bool,
	pub next_retrieval_date: OffsetDateTime,
}

/// One study event, captured before the card advances.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptRecord {
	pub retrieval_date: OffsetDateTime,
	pub retrieved: bool,
	pub spacing_bin: i32,
}

/// Applies one attempt to a card's schedule.
///
/// Failure sends the card back to bin 1, due [`RESET_INTERVAL`] from `now`; `active` is left
/// alone, so a graduated card that is failed stays inactive. Success moves the card one bin
/// forward while its current bin has an interval. Landing on a bin without an interval graduates
/// the card. A due date past the representable range is an error.
pub fn record_attempt(
	table: &SpacingTable,
	card: &CardSchedule,
	succeeded: bool,
	now: OffsetDateTime,
) -> Result<(CardSchedule, AttemptRecord)> {
	if card.spacing_bin < 1 {
		return Err(Error::InvalidSpacingBin { bin: card.spacing_bin });
	}

	let attempt =
		AttemptRecord { retrieval_date: now, retrieved: succeeded, spacing_bin: card.spacing_bin };

	if !succeeded {
		let schedule = CardSchedule {
			spacing_bin: 1,
			active: card.active,
			next_retrieval_date: shift(now, RESET_INTERVAL)?,
		};

		return Ok((schedule, attempt));
	}

	let spacing_bin = match table.interval(card.spacing_bin) {
		Some(_) => card.spacing_bin.saturating_add(1),
		None => card.spacing_bin,
	};
	let schedule = match table.interval(spacing_bin) {
		Some(interval) => CardSchedule {
			spacing_bin,
			active: card.active,
			next_retrieval_date: shift(now, interval)?,
		},
		None => CardSchedule {
			spacing_bin,
			active: false,
			next_retrieval_date: shift(now, table.graduation())?,
		},
	};

	Ok((schedule, attempt))
}

/// Schedule of a freshly created card.
pub fn initial_schedule(created_at: OffsetDateTime) -> Result<CardSchedule> {
	Ok(CardSchedule {
		spacing_bin: 1,
		active: true,
		next_retrieval_date: shift(created_at, RESET_INTERVAL)?,
	})
}

fn shift(date: OffsetDateTime, by: Duration) -> Result<OffsetDateTime> {
	date.checked_add(by).ok_or(Error::DateOutOfRange { date })
}
