use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = notecards_api::Args::parse();

	notecards_api::run(args).await
}
