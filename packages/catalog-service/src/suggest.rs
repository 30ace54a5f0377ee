//! Prefix autocomplete over course titles, tags, and categories.
//!
//! Suggestions are bare strings. A caller cannot tell whether a title, a tag, or a category
//! produced a given entry.

use std::{cmp::Reverse, collections::HashSet};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, SearchService, gateway::Completion};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SuggestRequest {
	pub q: String,
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestResponse {
	pub suggestions: Vec<String>,
}

impl SearchService {
	/// An unmatched prefix yields an empty list, not an error.
	pub async fn suggest(&self, req: SuggestRequest) -> Result<SuggestResponse> {
		let prefix = req.q.trim();

		if prefix.is_empty() {
			return Err(Error::invalid_request("q must be a non-empty string."));
		}

		let limit = req.limit.unwrap_or(self.cfg.search.suggest_limit);

		if limit == 0 || limit > self.cfg.search.max_limit {
			return Err(Error::invalid_request(format!(
				"limit must be between 1 and {}.",
				self.cfg.search.max_limit
			)));
		}

		let completions = self.gateway.suggest(prefix, limit).await.inspect_err(|err| {
			tracing::error!(error = %err, "Course suggestion failed.");
		})?;

		Ok(SuggestResponse { suggestions: rank_completions(completions, limit) })
	}
}

/// Highest weight first, then alphabetical. Repeated texts are kept once.
pub fn rank_completions(mut completions: Vec<Completion>, limit: u32) -> Vec<String> {
	completions.sort_by(|a, b| (Reverse(a.weight), &a.text).cmp(&(Reverse(b.weight), &b.text)));

	let mut seen = HashSet::new();

	completions
		.into_iter()
		.filter(|completion| seen.insert(completion.text.clone()))
		.take(limit as usize)
		.map(|completion| completion.text)
		.collect()
}
