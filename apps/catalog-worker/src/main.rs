use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = catalog_worker::Args::parse();

	catalog_worker::run(args).await
}
