use sqlx::postgres::PgExecutor;
use time::OffsetDateTime;

use crate::{Result, models::Session};

pub async fn insert_session<'e, E>(executor: E, session: &Session) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO sessions (session_id, user_id, created_at, expires_at)
VALUES ($1, $2, $3, $4)",
	)
	.bind(session.session_id.as_str())
	.bind(session.user_id)
	.bind(session.created_at)
	.bind(session.expires_at)
	.execute(executor)
	.await?;

	Ok(())
}

/// Returns the session only while it has not expired.
pub async fn get_live_session<'e, E>(
	executor: E,
	session_id: &str,
	now: OffsetDateTime,
) -> Result<Option<Session>>
where
	E: PgExecutor<'e>,
{
	let session = sqlx::query_as::<_, Session>(
		"SELECT * FROM sessions WHERE session_id = $1 AND expires_at > $2",
	)
	.bind(session_id)
	.bind(now)
	.fetch_optional(executor)
	.await?;

	Ok(session)
}

pub async fn delete_session<'e, E>(executor: E, session_id: &str) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM sessions WHERE session_id = $1")
		.bind(session_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn purge_expired<'e, E>(executor: E, now: OffsetDateTime) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
		.bind(now)
		.execute(executor)
		.await?;

	Ok(result.rows_affected())
}
