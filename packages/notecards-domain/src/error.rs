pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
	#[error("Spacing bin must be at least 1, got {bin}.")]
	InvalidSpacingBin { bin: i32 },
	#[error("Spacing table is invalid: {message}")]
	InvalidSpacingTable { message: String },
	#[error("num_days must be a non-negative integer, got {days}.")]
	NegativeAdvance { days: i64 },
	#[error("Invalid patch: {message}")]
	InvalidPatch { message: String },
	#[error("Invalid tag label: {message}")]
	InvalidLabel { message: String },
	#[error("Invalid card uuid {value:?}.")]
	InvalidCardUuid { value: String },
	#[error("Due date moved from {date} is out of range.")]
	DateOutOfRange { date: time::OffsetDateTime },
	#[error("Invalid input: {message}")]
	InvalidInput { message: String },
}
