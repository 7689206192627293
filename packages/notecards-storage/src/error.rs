#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Conflict: {0}")]
	Conflict(String),
}

/// Maps a unique-constraint violation to [`Error::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> Error {
	match &err {
		sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Error::Conflict(message()),
		_ => Error::Sqlx(err),
	}
}
