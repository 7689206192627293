use std::sync::Arc;

use notecards_service::NotecardsService;
use notecards_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<NotecardsService>,
}
impl AppState {
	pub async fn new(config: notecards_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let service = NotecardsService::new(config, db)?;

		service.blobs.ensure_root().await?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: NotecardsService) -> Self {
		Self { service: Arc::new(service) }
	}
}
