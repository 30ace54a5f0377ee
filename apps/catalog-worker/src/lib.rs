pub mod worker;

mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use catalog_service::SearchService;
use catalog_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = catalog_cli::VERSION,
	rename_all = "kebab",
	styles = catalog_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = catalog_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let settings = config.worker.clone();
	let service = SearchService::connect(config).await?;
	let state = worker::WorkerState { db, service, settings };

	worker::run_worker(state).await?;

	Ok(())
}
