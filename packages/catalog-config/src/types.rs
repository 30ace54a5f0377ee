use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub search: Search,
	pub worker: Worker,
	pub security: Security,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub index: Index,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Index {
	pub backend: IndexBackend,
	/// Base URL of the Elasticsearch node. Ignored by the memory backend.
	#[serde(default)]
	pub url: String,
	#[serde(default = "default_index_name")]
	pub index: String,
	/// Per-request transport timeout. A timed out call is reported as failed.
	pub timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
	Elasticsearch,
	Memory,
}
impl IndexBackend {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Elasticsearch => "elasticsearch",
			Self::Memory => "memory",
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Search {
	pub default_limit: u32,
	pub max_limit: u32,
	pub suggest_limit: u32,
	#[serde(default = "default_category_facet_size")]
	pub category_facet_size: u32,
	#[serde(default = "default_level_facet_size")]
	pub level_facet_size: u32,
	/// Deepest `page * limit` a search may reach. Matches the index's `max_result_window`.
	#[serde(default = "default_max_result_window")]
	pub max_result_window: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Worker {
	pub poll_interval_ms: u64,
	pub lease_seconds: i64,
	pub base_backoff_ms: i64,
	pub max_backoff_ms: i64,
	/// Jobs that fail this many times stay FAILED and are no longer claimed.
	pub max_attempts: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
	pub admin_auth_token: Option<String>,
}

fn default_index_name() -> String {
	"courses".to_string()
}

fn default_category_facet_size() -> u32 {
	20
}

fn default_level_facet_size() -> u32 {
	10
}

fn default_max_result_window() -> u32 {
	10_000
}
