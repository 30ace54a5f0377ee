use std::sync::Arc;

use catalog_config::Config;
use catalog_service::SearchService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SearchService>,
}
impl AppState {
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let service = SearchService::connect(config).await?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: SearchService) -> Self {
		Self { service: Arc::new(service) }
	}
}
