use std::path::PathBuf;

use clap::{Parser, Subcommand};
use time::OffsetDateTime;
use tokio::fs;
use tracing_subscriber::EnvFilter;

use notecards_config::Config;
use notecards_domain::filter::CardFilter;
use notecards_service::NotecardsService;
use notecards_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = notecards_cli::VERSION,
	rename_all = "kebab",
	styles = notecards_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Create a login.
	CreateUser {
		#[arg(long, value_name = "NAME")]
		username: String,
		#[arg(long, env = "NOTECARDS_PASSWORD", hide_env_values = true)]
		password: String,
	},
	/// Write a user's cards to a `.car` archive.
	Export {
		#[arg(long, value_name = "NAME")]
		username: String,
		/// Target file. Defaults to the timestamped archive name in the current directory.
		#[arg(long, value_name = "FILE")]
		out: Option<PathBuf>,
		#[arg(long, value_name = "WORDS", default_value = "")]
		tags_filter: String,
		#[arg(long, value_name = "WORDS", default_value = "")]
		title_filter: String,
	},
	/// Import a `.car` archive into a user's cards.
	Import {
		#[arg(long, value_name = "NAME")]
		username: String,
		#[arg(long, value_name = "FILE")]
		archive: PathBuf,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = notecards_config::load(&args.config)?;

	init_tracing(&config)?;

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let service = NotecardsService::new(config, db)?;

	match args.command {
		Command::CreateUser { username, password } => {
			let user_id = service.create_user(&username, &password).await?;

			println!("Created user {username} ({user_id}).");
		},
		Command::Export { username, out, tags_filter, title_filter } => {
			let user_id = service.user_id_by_username(&username).await?;
			let filter = CardFilter { tags_filter, title_filter, ..CardFilter::all() };
			let download =
				service.export_archive(user_id, &filter, OffsetDateTime::now_utc()).await?;
			let path = out.unwrap_or_else(|| PathBuf::from(&download.file_name));

			fs::write(&path, &download.bytes).await?;

			println!("Wrote {} bytes to {}.", download.bytes.len(), path.display());
		},
		Command::Import { username, archive } => {
			let user_id = service.user_id_by_username(&username).await?;
			let bytes = fs::read(&archive).await?;

			service.blobs.ensure_root().await?;

			let report =
				service.import_archive(user_id, &bytes, OffsetDateTime::now_utc()).await?;

			println!("Imported {} cards from {}.", report.num_cards_imported, archive.display());
		},
	}

	Ok(())
}

fn init_tracing(config: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	Ok(())
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		Args::command().debug_assert();
	}

	#[test]
	fn export_defaults_to_no_filter() {
		let args = Args::try_parse_from([
			"notecards-admin",
			"-c",
			"cfg.toml",
			"export",
			"--username",
			"alice",
		])
		.expect("Arguments must parse.");

		match args.command {
			Command::Export { out, tags_filter, title_filter, .. } => {
				assert_eq!(out, None);
				assert!(tags_filter.is_empty() && title_filter.is_empty());
			},
			other => panic!("Unexpected command {other:?}."),
		}
	}
}
