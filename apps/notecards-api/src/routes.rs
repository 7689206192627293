use axum::{
	Json, Router,
	body::Bytes,
	extract::{
		DefaultBodyLimit, Multipart, Path, Query, State,
		rejection::{JsonRejection, QueryRejection},
	},
	http::{HeaderMap, StatusCode, header},
	response::{IntoResponse, Response},
	routing::{delete, get, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	session::{self, CurrentUser, MaybeUser},
	state::AppState,
};
use notecards_domain::filter::CardFilter;
use notecards_service::{
	AddTagRequest, AdvanceRequest, AdvanceResponse, AttemptList, CardFormat, CardList, CardQuery,
	CardView, DeleteResponse, Error as ServiceError, FileFormat, FileList, FileUpload,
	ImportReport, LoginRequest, RecordAttemptRequest, TagList,
	projection::{API_PREFIX, AttemptView, FileView, FullCard, TagView},
};

const JSON_PATCH: &str = "application/json-patch+json";
const UPLOAD_FIELD: &str = "file_attachment";
const ARCHIVE_FIELD: &str = "archive_file";
/// Room for multipart framing on top of the payload limit.
const MULTIPART_OVERHEAD: usize = 64 * 1_024;

pub fn router(state: AppState) -> Router {
	let max_upload_bytes = state.service.cfg.storage.files.max_upload_bytes;
	let upload_limit = DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD);
	let api = Router::new()
		.route("/logins", post(login))
		.route("/logouts", post(logout))
		.route("/cards", get(list_cards).post(create_card))
		.route("/cards/{uuid}", get(get_card).patch(patch_card).delete(delete_card))
		.route(
			"/cards/{uuid}/retrieval-attempts",
			get(list_attempts).post(record_attempt),
		)
		.route("/cards/{uuid}/retrieval-attempts/{attempt_id}", get(get_attempt))
		.route("/cards/{uuid}/tags", get(list_card_tags).post(add_tag))
		.route("/cards/{uuid}/tags/{tag_id}", delete(remove_tag))
		.route("/tags", get(list_user_tags))
		.route("/cards/{uuid}/files", get(list_files).post(upload_file).layer(upload_limit.clone()))
		.route("/cards/{uuid}/files/{file_id}", get(get_file).delete(delete_file))
		.route("/advance-review-date-tasks", post(advance_review_dates))
		.route("/card-archive-import-tasks", post(import_archive).layer(upload_limit));

	Router::new()
		.route("/health", get(health))
		.route("/media/{*storage_path}", get(media))
		.nest(API_PREFIX, api)
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Default, Deserialize)]
struct FormatParams {
	format: Option<String>,
}

async fn login(
	State(state): State<AppState>,
	MaybeUser(user): MaybeUser,
	payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
	let payload = json_body(payload)?;

	if user.is_some() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			"Already logged in.",
			None,
		));
	}

	let security = &state.service.cfg.security;
	let new_session = state.service.login(payload, OffsetDateTime::now_utc()).await?;
	let cookie = session::session_cookie(
		&security.session_cookie_name,
		&new_session.session_id,
		new_session.max_age.whole_seconds(),
		security.cookie_secure,
	);

	Ok(([(header::SET_COOKIE, cookie)], Json(json!({}))).into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
	let security = &state.service.cfg.security;

	if let Some(session_id) = session::cookie_value(&headers, &security.session_cookie_name) {
		state.service.logout(&session_id).await?;
	}

	let cookie = session::expired_cookie(&security.session_cookie_name, security.cookie_secure);

	Ok(([(header::SET_COOKIE, cookie)], Json(json!({}))).into_response())
}

async fn list_cards(
	State(state): State<AppState>,
	MaybeUser(user): MaybeUser,
	filter: Result<Query<CardFilter>, QueryRejection>,
	params: Result<Query<FormatParams>, QueryRejection>,
) -> Result<Response, ApiError> {
	let filter = query_params(filter)?;
	let params = query_params(params)?;
	let format = CardFormat::parse(params.format.as_deref(), CardFormat::Index);

	if let (CardFormat::Archive, Some(user)) = (format, user.as_ref()) {
		let download =
			state.service.export_archive(user.user_id, &filter, OffsetDateTime::now_utc()).await?;
		let disposition = format!("attachment; filename=\"{}\"", download.file_name);

		return Ok((
			[
				(header::CONTENT_TYPE, "application/gzip".to_string()),
				(header::CONTENT_DISPOSITION, disposition),
			],
			download.bytes,
		)
			.into_response());
	}

	let list: CardList = state
		.service
		.list_cards(user.map(|user| user.user_id), &CardQuery { filter, format })
		.await?;

	Ok(Json(list).into_response())
}

async fn create_card(
	State(state): State<AppState>,
	user: CurrentUser,
	payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<FullCard>), ApiError> {
	let payload = json_body(payload)?;
	let card = state.service.create_card(user.user_id, payload).await?;

	Ok((StatusCode::CREATED, Json(card)))
}

async fn get_card(
	State(state): State<AppState>,
	user: CurrentUser,
	Path(uuid): Path<String>,
	params: Result<Query<FormatParams>, QueryRejection>,
) -> Result<Json<CardView>, ApiError> {
	let params = query_params(params)?;
	let format = CardFormat::parse(params.format.as_deref(), CardFormat::Full);
	let card = state.service.get_card(user.user_id, &uuid, format).await?;

	Ok(Json(card))
}

async fn patch_card(
	State(state): State<AppState>,
	user: CurrentUser,
	Path(uuid): Path<String>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Json<FullCard>, ApiError> {
	let content_type = headers
		.get(header::CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.unwrap_or_default();

	if !content_type.starts_with(JSON_PATCH) {
		return Err(json_error(
			StatusCode::UNSUPPORTED_MEDIA_TYPE,
			"UNSUPPORTED_MEDIA_TYPE",
			format!("Expected request with `Content-Type: {JSON_PATCH}`."),
			None,
		));
	}

	let doc: Value = serde_json::from_slice(&body).map_err(|err| {
		let message = format!("Invalid json: {err}.");

		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None)
	})?;
	let card = state.service.patch_card(user.user_id, &uuid, &doc).await?;

	Ok(Json(card))
}

async fn delete_card(
	State(state): State<AppState>,
	user: CurrentUser,
	Path(uuid): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
	let response = state.service.delete_card(user.user_id, &uuid).await?;

	Ok(Json(response))
}

async fn list_attempts(
	State(state): State<AppState>,
	user: CurrentUser,
	Path(uuid): Path<String>,
) -> Result<Json<AttemptList>, ApiError> {
	let attempts = state.service.list_attempts(user.user_id, &uuid).await?;

	Ok(Json(attempts))
}

async fn record_attempt(
	State(state): State<AppState>,
	user: CurrentUser,
	Path(uuid): Path<String>,
	payload: Result<Json<RecordAttemptRequest>, JsonRejection>,
) -> Result<Json<AttemptView>, ApiError> {
	let payload = json_body(payload)?;
	let attempt = state
		.service
		.record_attempt(user.user_id, &uuid, payload, OffsetDateTime::now_utc())
		.await?;

	Ok(Json(attempt))
}

async fn get_attempt(
	State(state): State<AppState>,
	user: CurrentUser,
	Path((uuid, attempt_id)): Path<(String, i64)>,
) -> Result<Json<AttemptView>, ApiError> {
	let attempt = state.service.get_attempt(user.user_id, &uuid, attempt_id).await?;

	Ok(Json(attempt))
}

async fn list_card_tags(
	State(state): State<AppState>,
	user: CurrentUser,
	Path(uuid): Path<String>,
) -> Result<Json<TagList>, ApiError> {
	let tags = state.service.list_card_tags(user.user_id, &uuid).await?;

	Ok(Json(tags))
}

async fn add_tag(
	State(state): State<AppState>,
	user: CurrentUser,
	Path(uuid): Path<String>,
	payload: Result<Json<AddTagRequest>, JsonRejection>,
) -> Result<Json<TagView>, ApiError> {
	let payload = json_body(payload)?;
	let tag = state.service.add_tag(user.user_id, &uuid, payload).await?;

	Ok(Json(tag))
}

async fn remove_tag(
	State(state): State<AppState>,
	user: CurrentUser,
	Path((uuid, tag_id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
	state.service.remove_tag(user.user_id, &uuid, tag_id).await?;

	Ok(Json(json!({ "message": "Tag successfully removed." })))
}

async fn list_user_tags(
	State(state): State<AppState>,
	user: CurrentUser,
) -> Result<Json<TagList>, ApiError> {
	let tags = state.service.list_user_tags(user.user_id).await?;

	Ok(Json(tags))
}

async fn list_files(
	State(state): State<AppState>,
	user: CurrentUser,
	Path(uuid): Path<String>,
	params: Result<Query<FormatParams>, QueryRejection>,
) -> Result<Json<FileList>, ApiError> {
	let params = query_params(params)?;
	let files = state
		.service
		.list_files(user.user_id, &uuid, FileFormat::parse(params.format.as_deref()))
		.await?;

	Ok(Json(files))
}

async fn upload_file(
	State(state): State<AppState>,
	user: CurrentUser,
	Path(uuid): Path<String>,
	multipart: Multipart,
) -> Result<(StatusCode, Json<FileView>), ApiError> {
	let upload = multipart_file(multipart, UPLOAD_FIELD).await?;
	let file = state.service.upload_file(user.user_id, &uuid, upload).await?;

	Ok((StatusCode::CREATED, Json(file)))
}

async fn get_file(
	State(state): State<AppState>,
	user: CurrentUser,
	Path((uuid, file_id)): Path<(String, i64)>,
) -> Result<Json<FileView>, ApiError> {
	let file = state.service.get_file(user.user_id, &uuid, file_id).await?;

	Ok(Json(file))
}

async fn delete_file(
	State(state): State<AppState>,
	user: CurrentUser,
	Path((uuid, file_id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
	state.service.delete_file(user.user_id, &uuid, file_id).await?;

	Ok(Json(json!({ "message": "File successfully deleted." })))
}

async fn advance_review_dates(
	State(state): State<AppState>,
	user: CurrentUser,
	payload: Result<Json<AdvanceRequest>, JsonRejection>,
) -> Result<Json<AdvanceResponse>, ApiError> {
	let payload = json_body(payload)?;
	let response = state.service.advance_review_dates(user.user_id, payload).await?;

	Ok(Json(response))
}

async fn import_archive(
	State(state): State<AppState>,
	user: CurrentUser,
	multipart: Multipart,
) -> Result<Json<ImportReport>, ApiError> {
	let upload = multipart_file(multipart, ARCHIVE_FIELD).await?;
	let report = state
		.service
		.import_archive(user.user_id, &upload.bytes, OffsetDateTime::now_utc())
		.await?;

	Ok(Json(report))
}

/// Streams an attachment to the owner of the card it belongs to.
async fn media(
	State(state): State<AppState>,
	user: CurrentUser,
	Path(storage_path): Path<String>,
) -> Result<Response, ApiError> {
	// Stored paths look like `a/b/c/{card_uuid}/{user_id}/files/{name}`.
	let path_user = storage_path.split('/').nth(4).and_then(|raw| raw.parse::<Uuid>().ok());

	if path_user != Some(user.user_id) {
		return Err(json_error(
			StatusCode::UNAUTHORIZED,
			"UNAUTHORIZED",
			"Media belongs to another user.",
			None,
		));
	}

	let file = state.service.media(user.user_id, &storage_path).await?;
	let disposition = format!("inline; filename=\"{}\"", file.name);

	let headers =
		[(header::CONTENT_TYPE, file.media_type), (header::CONTENT_DISPOSITION, disposition)];

	Ok((headers, file.bytes).into_response())
}

/// Reads the named file field of a multipart body.
async fn multipart_file(
	mut multipart: Multipart,
	field_name: &str,
) -> Result<FileUpload, ApiError> {
	let bad_request =
		|message: String| json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None);

	while let Some(field) = multipart
		.next_field()
		.await
		.map_err(|err| bad_request(format!("Multipart error: {err}.")))?
	{
		if field.name() != Some(field_name) {
			continue;
		}

		let file_name = field.file_name().unwrap_or(field_name).to_string();
		let media_type = field.content_type().map(str::to_string);
		let bytes = field
			.bytes()
			.await
			.map_err(|err| bad_request(format!("Failed to read {field_name}: {err}.")))?;

		return Ok(FileUpload { file_name, media_type, bytes: bytes.to_vec() });
	}

	Err(bad_request(format!("No {field_name} in multipart form.")))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError>
where
	T: DeserializeOwned,
{
	match payload {
		Ok(Json(value)) => Ok(value),
		Err(JsonRejection::MissingJsonContentType(err)) => Err(json_error(
			StatusCode::UNSUPPORTED_MEDIA_TYPE,
			"UNSUPPORTED_MEDIA_TYPE",
			err.body_text(),
			None,
		)),
		Err(err) =>
			Err(json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.body_text(), None)),
	}
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
	params
		.map(|Query(value)| value)
		.map_err(|err| {
			json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.body_text(), None)
		})
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			ServiceError::Unauthorized { message } =>
				json_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message, None),
			ServiceError::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			ServiceError::Conflict { message } =>
				json_error(StatusCode::CONFLICT, "CONFLICT", message, None),
			ServiceError::Storage { .. }
			| ServiceError::Io { .. }
			| ServiceError::Archive { .. } => {
				tracing::error!(error = %err, "Request failed.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"INTERNAL_ERROR",
					"Internal server error.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}
