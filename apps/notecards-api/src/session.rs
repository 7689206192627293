//! Session cookie handling and the extractors that resolve the caller.

use axum::{
	extract::FromRequestParts,
	http::{HeaderMap, StatusCode, header, request::Parts},
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	routes::{ApiError, json_error},
	state::AppState,
};

/// A caller with a live session.
#[derive(Clone, Debug)]
pub struct CurrentUser {
	pub user_id: Uuid,
	pub session_id: String,
}
impl FromRequestParts<AppState> for CurrentUser {
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
		match MaybeUser::from_request_parts(parts, state).await? {
			MaybeUser(Some(user)) => Ok(user),
			MaybeUser(None) => Err(json_error(
				StatusCode::UNAUTHORIZED,
				"UNAUTHORIZED",
				"Authentication credentials were not provided or have expired.",
				None,
			)),
		}
	}
}

/// The caller if a live session is presented. Anonymous requests never touch the database.
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<CurrentUser>);
impl FromRequestParts<AppState> for MaybeUser {
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
		let cookie_name = &state.service.cfg.security.session_cookie_name;
		let Some(session_id) = cookie_value(&parts.headers, cookie_name) else {
			return Ok(Self(None));
		};
		let user_id = state.service.authenticate(&session_id, OffsetDateTime::now_utc()).await?;

		Ok(Self(user_id.map(|user_id| CurrentUser { user_id, session_id })))
	}
}

/// Value of the first cookie called `name` across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get_all(header::COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|value| value.split(';'))
		.filter_map(|pair| pair.trim().split_once('='))
		.find(|(key, value)| *key == name && !value.is_empty())
		.map(|(_, value)| value.trim_matches('"').to_string())
}

/// `Set-Cookie` value opening a session.
pub fn session_cookie(name: &str, session_id: &str, max_age_seconds: i64, secure: bool) -> String {
	let mut cookie =
		format!("{name}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}");

	if secure {
		cookie.push_str("; Secure");
	}

	cookie
}

/// `Set-Cookie` value that makes the browser forget the session.
pub fn expired_cookie(name: &str, secure: bool) -> String {
	session_cookie(name, "", 0, secure)
}
