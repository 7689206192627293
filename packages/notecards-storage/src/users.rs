use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::{Result, error::conflict_on_unique, models::User};

pub async fn insert_user<'e, E>(executor: E, user: &User) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"INSERT INTO users (user_id, username, password_hash, created_at) VALUES ($1, $2, $3, $4)",
	)
	.bind(user.user_id)
	.bind(user.username.as_str())
	.bind(user.password_hash.as_str())
	.bind(user.created_at)
	.execute(executor)
	.await
	.map_err(|err| conflict_on_unique(err, || format!("User {} already exists.", user.username)))?;

	Ok(())
}

pub async fn get_user_by_username<'e, E>(executor: E, username: &str) -> Result<Option<User>>
where
	E: PgExecutor<'e>,
{
	let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
		.bind(username)
		.fetch_optional(executor)
		.await?;

	Ok(user)
}

pub async fn get_user<'e, E>(executor: E, user_id: Uuid) -> Result<Option<User>>
where
	E: PgExecutor<'e>,
{
	let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
		.bind(user_id)
		.fetch_optional(executor)
		.await?;

	Ok(user)
}
