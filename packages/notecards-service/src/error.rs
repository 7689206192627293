pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Unauthorized: {message}")]
	Unauthorized { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("File storage error: {message}")]
	Io { message: String },
	#[error("Archive error: {message}")]
	Archive { message: String },
}
impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}

	pub(crate) fn not_found(resource: &str) -> Self {
		Self::NotFound { message: format!("{resource} not found.") }
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io { message: err.to_string() }
	}
}

impl From<notecards_storage::Error> for Error {
	fn from(err: notecards_storage::Error) -> Self {
		match err {
			notecards_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			notecards_storage::Error::Io(inner) => Self::Io { message: inner.to_string() },
			notecards_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			notecards_storage::Error::NotFound(message) => Self::NotFound { message },
			notecards_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}

impl From<notecards_domain::Error> for Error {
	fn from(err: notecards_domain::Error) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}
