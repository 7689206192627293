use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = notecards_admin::Args::parse();

	notecards_admin::run(args).await
}
