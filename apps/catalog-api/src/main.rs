use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = catalog_api::Args::parse();

	catalog_api::run(args).await
}
