pub mod facets;
pub mod planner;
pub mod ranking;

use std::{collections::BTreeMap, time::Instant};

use serde::{Deserialize, Serialize};

use crate::{
	Error, Result, SearchService,
	gateway::ScoredDocument,
	search::{
		facets::{AggregationRequest, Facets},
		planner::SearchQuerySpec,
		ranking::RankingPolicy,
	},
};
use catalog_domain::SearchDocument;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchRequest {
	pub q: Option<String>,
	pub category: Option<String>,
	pub level: Option<String>,
	pub page: Option<u32>,
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchHit {
	#[serde(flatten)]
	pub course: SearchDocument,
	pub score: Option<f32>,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub highlights: BTreeMap<String, Vec<String>>,
}
impl From<ScoredDocument> for SearchHit {
	fn from(hit: ScoredDocument) -> Self {
		Self { course: hit.document, score: hit.score, highlights: hit.highlights }
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
	pub courses: Vec<SearchHit>,
	pub total: u64,
	pub page: u32,
	pub limit: u32,
	pub pages: u64,
	pub facets: Facets,
}

impl SearchService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let page = req.page.unwrap_or(1);
		let limit = req.limit.unwrap_or(self.cfg.search.default_limit);

		if page == 0 {
			return Err(Error::invalid_request("page must be at least 1."));
		}
		if limit == 0 || limit > self.cfg.search.max_limit {
			return Err(Error::invalid_request(format!(
				"limit must be between 1 and {}.",
				self.cfg.search.max_limit
			)));
		}
		if !within_result_window(page, limit, self.cfg.search.max_result_window) {
			return Err(Error::invalid_request(format!(
				"page * limit must not exceed {}.",
				self.cfg.search.max_result_window
			)));
		}

		let spec = SearchQuerySpec::new(
			req.q.as_deref(),
			req.category.as_deref(),
			req.level.as_deref(),
			page,
			limit,
		);
		let aggregations = AggregationRequest::new(&self.cfg.search);
		let query = planner::plan(&spec, &RankingPolicy::standard(), aggregations);
		let started = Instant::now();
		let result = self.gateway.query(&query).await.inspect_err(|err| {
			tracing::error!(error = %err, "Course search failed.");
		})?;

		tracing::debug!(
			total = result.total,
			took_ms = started.elapsed().as_millis() as u64,
			"Course search completed."
		);

		Ok(SearchResponse {
			courses: result.hits.into_iter().map(SearchHit::from).collect(),
			total: result.total,
			page,
			limit,
			pages: result.total.div_ceil(u64::from(limit)),
			facets: facets::compose(result.buckets, &query.aggregations),
		})
	}
}

/// Whether the last hit of `page` falls inside the index's result window.
pub fn within_result_window(page: u32, limit: u32, window: u32) -> bool {
	u64::from(page) * u64::from(limit) <= u64::from(window)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn result_window_is_inclusive() {
		assert!(within_result_window(100, 100, 10_000));
		assert!(!within_result_window(101, 100, 10_000));
		assert!(!within_result_window(u32::MAX, u32::MAX, 10_000));
	}
}
