mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Files, Postgres, Scheduler, Security, Service, Storage};

use std::{fs, path::Path};

use time::{UtcOffset, macros::format_description};

/// Upper bound for every configured day count: one hundred years.
pub const MAX_DAYS: u32 = 36_525;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.files.root.as_os_str().is_empty() {
		return Err(Error::Validation {
			message: "storage.files.root must be non-empty.".to_string(),
		});
	}
	if cfg.storage.files.max_upload_bytes == 0 {
		return Err(Error::Validation {
			message: "storage.files.max_upload_bytes must be greater than zero.".to_string(),
		});
	}
	if cfg.scheduler.bin_intervals_days.is_empty() {
		return Err(Error::Validation {
			message: "scheduler.bin_intervals_days must be non-empty.".to_string(),
		});
	}
	if cfg.scheduler.bin_intervals_days.contains(&0) {
		return Err(Error::Validation {
			message: "scheduler.bin_intervals_days entries must be greater than zero.".to_string(),
		});
	}
	if cfg.scheduler.bin_intervals_days.iter().any(|days| *days > MAX_DAYS) {
		return Err(Error::Validation {
			message: format!("scheduler.bin_intervals_days entries must be at most {MAX_DAYS}."),
		});
	}
	if cfg.scheduler.graduation_days == 0 {
		return Err(Error::Validation {
			message: "scheduler.graduation_days must be greater than zero.".to_string(),
		});
	}
	if cfg.scheduler.graduation_days > MAX_DAYS {
		return Err(Error::Validation {
			message: format!("scheduler.graduation_days must be at most {MAX_DAYS}."),
		});
	}

	parse_utc_offset(&cfg.scheduler.utc_offset)?;

	if cfg.security.session_cookie_name.trim().is_empty() {
		return Err(Error::Validation {
			message: "security.session_cookie_name must be non-empty.".to_string(),
		});
	}
	if !cfg
		.security
		.session_cookie_name
		.chars()
		.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
	{
		return Err(Error::Validation {
			message: "security.session_cookie_name may only contain ASCII letters, digits, '_' and '-'."
				.to_string(),
		});
	}
	if cfg.security.session_ttl_days <= 0 {
		return Err(Error::Validation {
			message: "security.session_ttl_days must be greater than zero.".to_string(),
		});
	}
	if cfg.security.session_ttl_days > i64::from(MAX_DAYS) {
		return Err(Error::Validation {
			message: format!("security.session_ttl_days must be at most {MAX_DAYS}."),
		});
	}

	Ok(())
}

/// Parses "Z", "UTC" or a signed "HH:MM" offset.
pub fn parse_utc_offset(raw: &str) -> Result<UtcOffset> {
	let trimmed = raw.trim();

	if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
		return Ok(UtcOffset::UTC);
	}

	UtcOffset::parse(trimmed, format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
		.map_err(|_| Error::Validation {
			message: format!(
				"scheduler.utc_offset must look like +HH:MM or -HH:MM, got {trimmed:?}."
			),
		})
}

impl Scheduler {
	pub fn offset(&self) -> Result<UtcOffset> {
		parse_utc_offset(&self.utc_offset)
	}
}

fn normalize(cfg: &mut Config) {
	cfg.scheduler.utc_offset = cfg.scheduler.utc_offset.trim().to_string();
	cfg.security.session_cookie_name = cfg.security.session_cookie_name.trim().to_string();
}
