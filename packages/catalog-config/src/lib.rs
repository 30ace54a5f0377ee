mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Index, IndexBackend, Postgres, Search, Security, Service, Storage, Worker};

use std::{fs, path::Path};

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
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.index.backend == IndexBackend::Elasticsearch
		&& cfg.storage.index.url.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "storage.index.url must be non-empty when backend is elasticsearch."
				.to_string(),
		});
	}

	let index = cfg.storage.index.index.as_str();

	if index.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.index.index must be non-empty.".to_string(),
		});
	}
	// Elasticsearch rejects index names with uppercase letters or path separators.
	if index.chars().any(|ch| ch.is_ascii_uppercase() || matches!(ch, '/' | '\\' | ' ' | '*'))
	{
		return Err(Error::Validation {
			message: "storage.index.index must be lowercase without spaces, slashes, or wildcards."
				.to_string(),
		});
	}
	if cfg.storage.index.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "storage.index.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("search.default_limit", cfg.search.default_limit),
		("search.max_limit", cfg.search.max_limit),
		("search.suggest_limit", cfg.search.suggest_limit),
		("search.category_facet_size", cfg.search.category_facet_size),
		("search.level_facet_size", cfg.search.level_facet_size),
		("search.max_result_window", cfg.search.max_result_window),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.search.max_limit < cfg.search.default_limit {
		return Err(Error::Validation {
			message: "search.max_limit must be greater than or equal to search.default_limit."
				.to_string(),
		});
	}
	if cfg.search.max_result_window < cfg.search.max_limit {
		return Err(Error::Validation {
			message: "search.max_result_window must be greater than or equal to search.max_limit."
				.to_string(),
		});
	}
	if cfg.worker.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "worker.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "worker.lease_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.base_backoff_ms <= 0 {
		return Err(Error::Validation {
			message: "worker.base_backoff_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.max_backoff_ms < cfg.worker.base_backoff_ms {
		return Err(Error::Validation {
			message: "worker.max_backoff_ms must be greater than or equal to worker.base_backoff_ms."
				.to_string(),
		});
	}
	if cfg.worker.max_attempts <= 0 {
		return Err(Error::Validation {
			message: "worker.max_attempts must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
	if cfg
		.security
		.admin_auth_token
		.as_deref()
		.map(|token| token.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.security.admin_auth_token = None;
	}

	cfg.storage.index.url = cfg.storage.index.url.trim().trim_end_matches('/').to_string();
}
