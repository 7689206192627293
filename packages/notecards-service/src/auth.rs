use argon2::{
	Argon2,
	password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, NotecardsService, Result};
use notecards_domain::account;
use notecards_storage::{
	models::{Session, User},
	sessions, users,
};

const SALT_BYTES: usize = 16;
const SESSION_ID_BYTES: usize = 32;
const BAD_CREDENTIALS: &str = "Invalid username or password.";

#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
	pub username: Option<String>,
	pub password: Option<String>,
}

/// A freshly opened session, to be handed to the client as a cookie.
#[derive(Clone, Debug)]
pub struct NewSession {
	pub session_id: String,
	pub expires_at: OffsetDateTime,
	pub max_age: Duration,
}

impl NotecardsService {
	pub async fn create_user(&self, username: &str, password: &str) -> Result<Uuid> {
		account::validate_username(username)?;
		account::validate_password(password)?;

		let user = User {
			user_id: Uuid::new_v4(),
			username: username.to_string(),
			password_hash: hash_password_blocking(password.to_string()).await?,
			created_at: OffsetDateTime::now_utc(),
		};

		users::insert_user(&self.db.pool, &user).await?;

		tracing::info!(user_id = %user.user_id, %username, "User created.");

		Ok(user.user_id)
	}

	/// Checks credentials and opens a session. Expired sessions are purged on the way.
	pub async fn login(&self, req: LoginRequest, now: OffsetDateTime) -> Result<NewSession> {
		let (Some(username), Some(password)) = (req.username, req.password) else {
			return Err(Error::invalid("username and password are required."));
		};
		let Some(user) = users::get_user_by_username(&self.db.pool, &username).await? else {
			tracing::info!(%username, "Login rejected.");

			return Err(Error::invalid(BAD_CREDENTIALS));
		};

		if !verify_password_blocking(password, user.password_hash.clone()).await? {
			tracing::info!(%username, "Login rejected.");

			return Err(Error::invalid(BAD_CREDENTIALS));
		}

		let purged = sessions::purge_expired(&self.db.pool, now).await?;
		let ttl_days =
			self.cfg.security.session_ttl_days.clamp(1, i64::from(notecards_config::MAX_DAYS));
		let max_age = Duration::days(ttl_days);
		let expires_at = now
			.checked_add(max_age)
			.ok_or_else(|| Error::invalid("Session expiry is out of range."))?;
		let session = Session {
			session_id: new_session_id(),
			user_id: user.user_id,
			created_at: now,
			expires_at,
		};

		sessions::insert_session(&self.db.pool, &session).await?;

		tracing::info!(user_id = %user.user_id, purged, "Session opened.");

		Ok(NewSession { session_id: session.session_id, expires_at: session.expires_at, max_age })
	}

	pub async fn logout(&self, session_id: &str) -> Result<()> {
		if sessions::delete_session(&self.db.pool, session_id).await? {
			tracing::info!("Session closed.");
		}

		Ok(())
	}

	/// Owner of a live session, if any.
	pub async fn authenticate(
		&self,
		session_id: &str,
		now: OffsetDateTime,
	) -> Result<Option<Uuid>> {
		let session = sessions::get_live_session(&self.db.pool, session_id, now).await?;

		Ok(session.map(|session| session.user_id))
	}

	pub async fn user_id_by_username(&self, username: &str) -> Result<Uuid> {
		users::get_user_by_username(&self.db.pool, username)
			.await?
			.map(|user| user.user_id)
			.ok_or_else(|| Error::not_found("User"))
	}
}

/// Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
	let mut salt = [0_u8; SALT_BYTES];

	rand::thread_rng().fill_bytes(&mut salt);

	let salt = SaltString::encode_b64(&salt)
		.map_err(|err| Error::Storage { message: format!("Failed to encode salt: {err}.") })?;
	let hash = Argon2::default()
		.hash_password(password.as_bytes(), &salt)
		.map_err(|err| Error::Storage { message: format!("Failed to hash password: {err}.") })?;

	Ok(hash.to_string())
}

/// False for a wrong password and for a hash that does not parse.
pub fn verify_password(password: &str, phc: &str) -> bool {
	match PasswordHash::new(phc) {
		Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
		Err(err) => {
			tracing::warn!(error = %err, "Stored password hash does not parse.");

			false
		},
	}
}

async fn hash_password_blocking(password: String) -> Result<String> {
	tokio::task::spawn_blocking(move || hash_password(&password)).await.map_err(|err| {
		Error::Storage { message: format!("Password hashing task failed: {err}.") }
	})?
}

async fn verify_password_blocking(password: String, phc: String) -> Result<bool> {
	tokio::task::spawn_blocking(move || verify_password(&password, &phc)).await.map_err(|err| {
		Error::Storage { message: format!("Password check task failed: {err}.") }
	})
}

fn new_session_id() -> String {
	let mut bytes = [0_u8; SESSION_ID_BYTES];

	rand::thread_rng().fill_bytes(&mut bytes);

	URL_SAFE_NO_PAD.encode(bytes)
}
