pub mod gateway;
pub mod indexing;
pub mod search;
pub mod suggest;

mod error;

pub use error::{Error, Result};
pub use gateway::{IndexGateway, memory::MemoryIndex};
pub use indexing::{DeleteResponse, IndexOp, IndexResponse, RebuildReport};
pub use search::{
	SearchHit, SearchRequest, SearchResponse, within_result_window,
	facets::{FacetBucket, Facets},
};
pub use suggest::{SuggestRequest, SuggestResponse};

use std::{future::Future, pin::Pin, sync::Arc};

use serde::Serialize;
use time::OffsetDateTime;

use catalog_config::{Config, IndexBackend};
use catalog_storage::elasticsearch::ElasticsearchStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub const SERVICE_NAME: &str = "catalog-search";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexHealth {
	Connected,
	Disconnected,
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthReport {
	pub status: &'static str,
	pub service: &'static str,
	pub index: IndexHealth,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(with = "catalog_domain::time_serde")]
	pub timestamp: OffsetDateTime,
}

#[derive(Clone)]
pub struct SearchService {
	pub cfg: Config,
	pub gateway: Arc<dyn IndexGateway>,
}
impl SearchService {
	/// Builds the configured backend and makes sure its index exists.
	pub async fn connect(cfg: Config) -> Result<Self> {
		let gateway: Arc<dyn IndexGateway> = match cfg.storage.index.backend {
			IndexBackend::Elasticsearch => {
				let store = ElasticsearchStore::new(&cfg.storage.index).map_err(Error::index)?;

				store.ensure_index().await.map_err(Error::index)?;

				Arc::new(store)
			},
			IndexBackend::Memory => Arc::new(MemoryIndex::new()),
		};

		tracing::info!(
			backend = cfg.storage.index.backend.as_str(),
			index = %cfg.storage.index.index,
			"Search service connected."
		);

		Ok(Self::with_gateway(cfg, gateway))
	}

	pub fn with_gateway(cfg: Config, gateway: Arc<dyn IndexGateway>) -> Self {
		Self { cfg, gateway }
	}

	/// Never fails. An unreachable backend is reported as `disconnected`.
	pub async fn health(&self) -> HealthReport {
		let (index, error) = match self.gateway.ping().await {
			Ok(()) => (IndexHealth::Connected, None),
			Err(err) => {
				tracing::warn!(error = %err, "Index backend health check failed.");

				(IndexHealth::Disconnected, Some(err.to_string()))
			},
		};

		HealthReport {
			status: match index {
				IndexHealth::Connected => "ok",
				IndexHealth::Disconnected => "degraded",
			},
			service: SERVICE_NAME,
			index,
			error,
			timestamp: OffsetDateTime::now_utc(),
		}
	}
}
