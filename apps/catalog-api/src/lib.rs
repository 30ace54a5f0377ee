pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use color_eyre::eyre;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;
use catalog_config::Config;

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

	init_tracing(&config);

	let (http_addr, admin_addr) = bind_addrs(&config)?;
	let state = AppState::new(config).await?;
	let app = routes::router(state.clone());
	let admin_app = routes::admin_router(state);
	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	let http_server = axum::serve(http_listener, app);
	let admin_listener = TcpListener::bind(admin_addr).await?;

	tracing::info!(%admin_addr, "Admin server listening.");

	let admin_server = axum::serve(admin_listener, admin_app);

	tokio::try_join!(http_server, admin_server)?;

	Ok(())
}

/// The admin listener is always loopback. The public one is too unless explicitly allowed.
pub fn bind_addrs(config: &Config) -> color_eyre::Result<(SocketAddr, SocketAddr)> {
	let http_addr: SocketAddr = config.service.http_bind.parse().map_err(|err| {
		eyre::eyre!("service.http_bind must be a valid socket address: {err}")
	})?;
	let admin_addr: SocketAddr = config.service.admin_bind.parse().map_err(|err| {
		eyre::eyre!("service.admin_bind must be a valid socket address: {err}")
	})?;

	if config.security.bind_localhost_only && !http_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"service.http_bind must be a loopback address when security.bind_localhost_only is true."
		));
	}
	if !admin_addr.ip().is_loopback() {
		return Err(eyre::eyre!("service.admin_bind must be a loopback address."));
	}

	Ok((http_addr, admin_addr))
}

fn init_tracing(config: &Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config(http_bind: &str, admin_bind: &str, localhost_only: bool) -> Config {
		let mut config = catalog_testkit::fixtures::test_config();

		config.service.http_bind = http_bind.to_string();
		config.service.admin_bind = admin_bind.to_string();
		config.security.bind_localhost_only = localhost_only;

		config
	}

	#[test]
	fn public_bind_requires_opt_out_of_localhost_only() {
		assert!(bind_addrs(&config("0.0.0.0:8080", "127.0.0.1:8081", true)).is_err());
		assert!(bind_addrs(&config("0.0.0.0:8080", "127.0.0.1:8081", false)).is_ok());
	}

	#[test]
	fn admin_bind_is_always_loopback() {
		let err = bind_addrs(&config("127.0.0.1:8080", "0.0.0.0:8081", false))
			.expect_err("admin bind is rejected");

		assert!(err.to_string().contains("service.admin_bind"));
	}

	#[test]
	fn malformed_binds_name_the_key() {
		let err =
			bind_addrs(&config("localhost", "127.0.0.1:8081", true)).expect_err("bind is rejected");

		assert!(err.to_string().contains("service.http_bind"));
	}
}
