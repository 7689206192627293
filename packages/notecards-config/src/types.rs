use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub scheduler: Scheduler,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub files: Files,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Files {
	/// Directory holding attachment blobs. Created on startup when missing.
	pub root: std::path::PathBuf,
	#[serde(default = "default_max_upload_bytes")]
	pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Scheduler {
	/// Days until the next review once a card advances into bin `i + 1`.
	pub bin_intervals_days: Vec<u32>,
	/// Horizon applied to a card that advanced past the last bin.
	pub graduation_days: u32,
	/// Offset of the server's local day, e.g. "+02:00". Drives the due cutoff.
	pub utc_offset: String,
}
impl Default for Scheduler {
	fn default() -> Self {
		Self {
			bin_intervals_days: vec![1, 3, 7, 13, 19, 29, 37],
			graduation_days: 3_650,
			utc_offset: "+00:00".to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	#[serde(default = "default_session_cookie_name")]
	pub session_cookie_name: String,
	#[serde(default = "default_session_ttl_days")]
	pub session_ttl_days: i64,
	#[serde(default)]
	pub cookie_secure: bool,
}

fn default_max_upload_bytes() -> usize {
	16 * 1_024 * 1_024
}

fn default_session_cookie_name() -> String {
	"sessionid".to_string()
}

fn default_session_ttl_days() -> i64 {
	14
}
