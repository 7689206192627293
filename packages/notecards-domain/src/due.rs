use time::{Date, Duration, OffsetDateTime, Time, UtcOffset};

use crate::{Error, Result};

/// End of the current local day: the next local midnight, expressed at `offset`.
///
/// Everything scheduled on or before this instant is due today.
pub fn due_cutoff(now: OffsetDateTime, offset: UtcOffset) -> OffsetDateTime {
	let today = now.to_offset(offset).date();
	let tomorrow = today.next_day().unwrap_or(Date::MAX);

	tomorrow.with_time(Time::MIDNIGHT).assume_offset(offset)
}

/// Number of days a bulk advance shifts due dates by. Never negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvanceDays(i32);
impl AdvanceDays {
	pub fn new(days: i64) -> Result<Self> {
		if days < 0 {
			return Err(Error::NegativeAdvance { days });
		}

		let days = i32::try_from(days).map_err(|_| Error::InvalidInput {
			message: format!("num_days is too large, got {days}."),
		})?;

		Ok(Self(days))
	}

	/// `None` once the shifted date leaves the representable range.
	pub fn apply(self, date: OffsetDateTime) -> Option<OffsetDateTime> {
		date.checked_add(Duration::days(i64::from(self.0)))
	}
}
