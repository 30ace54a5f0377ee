//! Renders planned queries as Elasticsearch request bodies and reads the responses back.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use catalog_domain::SearchDocument;
use catalog_storage::elasticsearch::ElasticsearchStore;

use crate::{
	BoxFuture, Error, Result,
	gateway::{Completion, IndexGateway, QueryResult, RawBucket, RawBuckets, ScoredDocument},
	search::{
		facets::{CATEGORIES, LEVELS, PRICE_RANGES},
		planner::{BuiltQuery, FilterField, TermFilter},
		ranking::SortKey,
	},
};

const SUGGEST_FIELD: &str = "suggest";
const SUGGESTION_NAME: &str = "course-suggest";
/// Sub-aggregation name under each facet's `filter` aggregation.
const BUCKETS_AGG: &str = "buckets";

impl IndexGateway for ElasticsearchStore {
	fn index<'a>(&'a self, doc: &'a SearchDocument) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let source = render_source(doc).map_err(Error::index)?;

			self.put_document(&doc.id, &source).await.map_err(Error::index)
		})
	}

	fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { self.delete_document(id).await.map_err(Error::index) })
	}

	fn query<'a>(&'a self, query: &'a BuiltQuery) -> BoxFuture<'a, Result<QueryResult>> {
		Box::pin(async move {
			let body = render_search(query);
			let response = self.search(&body).await.map_err(Error::query)?;

			parse_search(&response)
		})
	}

	fn suggest<'a>(
		&'a self,
		prefix: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Completion>>> {
		Box::pin(async move {
			let body = render_suggest(prefix, limit);
			let response = self.search(&body).await.map_err(Error::query)?;

			Ok(parse_completions(&response))
		})
	}

	fn rebuild<'a>(&'a self, docs: &'a [SearchDocument]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut batch = Vec::with_capacity(docs.len());

			for doc in docs {
				batch.push((doc.id.clone(), render_source(doc).map_err(Error::index)?));
			}

			self.rebuild_index(&batch).await.map_err(Error::index)?;

			Ok(())
		})
	}

	fn ping(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { ElasticsearchStore::ping(self).await.map_err(Error::query) })
	}
}

/// The stored `_source`: the document itself plus the completion input built from it.
pub fn render_source(doc: &SearchDocument) -> serde_json::Result<Value> {
	let mut source = serde_json::to_value(doc)?;

	if let Value::Object(map) = &mut source {
		map.insert(
			SUGGEST_FIELD.to_string(),
			json!({ "input": doc.suggestion_input, "weight": doc.suggestion_weight }),
		);
	}

	Ok(source)
}

pub fn render_search(query: &BuiltQuery) -> Value {
	let must = match &query.text {
		Some(text) => json!({
			"multi_match": {
				"query": text.term,
				"type": "best_fields",
				"fields": text
					.fields
					.iter()
					.map(|entry| format!("{}^{}", entry.field.as_str(), entry.boost))
					.collect::<Vec<_>>(),
				"fuzziness": text.fuzziness.as_str(),
			}
		}),
		None => json!({ "match_all": {} }),
	};
	let mut body = json!({
		"from": query.from,
		"size": query.size,
		"track_total_hits": true,
		"query": {
			"bool": {
				"must": [must],
				"filter": query.filters.iter().map(render_filter).collect::<Vec<_>>(),
			}
		},
		"sort": query
			.sort
			.iter()
			.map(|key| json!({ key.field(): { "order": "desc" } }))
			.collect::<Vec<_>>(),
		"aggs": render_aggregations(query),
	});

	if !query.facet_filters.is_empty() {
		body["post_filter"] = all_of(query.facet_filters.iter());
	}
	if query.text.is_some() && !query.highlight_fields.is_empty() {
		let fields = query
			.highlight_fields
			.iter()
			.map(|field| (field.as_str().to_string(), json!({})))
			.collect::<Map<_, _>>();

		body["highlight"] = json!({
			"pre_tags": ["<em>"],
			"post_tags": ["</em>"],
			"fields": fields,
		});
	}

	body
}

pub fn render_suggest(prefix: &str, limit: u32) -> Value {
	json!({
		"_source": false,
		"suggest": {
			SUGGESTION_NAME: {
				"prefix": prefix,
				"completion": {
					"field": SUGGEST_FIELD,
					"size": limit,
					"skip_duplicates": true,
				}
			}
		}
	})
}

pub fn parse_search(response: &Value) -> Result<QueryResult> {
	let total = response["hits"]["total"]["value"]
		.as_u64()
		.ok_or_else(|| Error::query("Index response has no hits.total."))?;
	let mut hits = Vec::new();

	for hit in response["hits"]["hits"].as_array().into_iter().flatten() {
		let mut source = hit["_source"].clone();

		if let Value::Object(map) = &mut source {
			map.remove(SUGGEST_FIELD);
		}

		let document: SearchDocument = serde_json::from_value(source).map_err(|err| {
			Error::query(format!("Index returned an unreadable document: {err}."))
		})?;
		let score = hit["_score"].as_f64().map(|score| score as f32);
		let highlights: BTreeMap<String, Vec<String>> = hit["highlight"]
			.as_object()
			.map(|fields| {
				fields
					.iter()
					.map(|(field, fragments)| {
						let fragments: Vec<String> = fragments
							.as_array()
							.into_iter()
							.flatten()
							.filter_map(Value::as_str)
							.map(str::to_string)
							.collect();

						(field.clone(), fragments)
					})
					.collect()
			})
			.unwrap_or_default();

		hits.push(ScoredDocument { document, score, highlights });
	}

	let aggs = &response["aggregations"];
	let buckets = RawBuckets {
		categories: parse_buckets(&aggs[CATEGORIES]),
		levels: parse_buckets(&aggs[LEVELS]),
		price_ranges: parse_buckets(&aggs[PRICE_RANGES]),
	};

	Ok(QueryResult { hits, total, buckets })
}

pub fn parse_completions(response: &Value) -> Vec<Completion> {
	response["suggest"][SUGGESTION_NAME]
		.as_array()
		.into_iter()
		.flatten()
		.flat_map(|entry| entry["options"].as_array().into_iter().flatten())
		.filter_map(|option| {
			let text = option["text"].as_str()?;
			let weight = option["_score"].as_f64().unwrap_or(0.0).max(0.0) as u32;

			Some(Completion { text: text.to_string(), weight })
		})
		.collect()
}

fn render_aggregations(query: &BuiltQuery) -> Value {
	let request = &query.aggregations;
	let ranges = request
		.price_bands
		.iter()
		.map(|band| {
			let mut range = json!({ "key": band.key });

			if let Some(from) = band.from {
				range["from"] = json!(from);
			}
			if let Some(to) = band.to {
				range["to"] = json!(to);
			}

			range
		})
		.collect::<Vec<_>>();

	json!({
		CATEGORIES: {
			"filter": all_of(query.facet_filters_except(FilterField::Category)),
			"aggs": {
				BUCKETS_AGG: {
					"terms": {
						"field": filter_field(FilterField::Category),
						"size": request.category_size,
						"min_doc_count": 0,
					}
				}
			}
		},
		LEVELS: {
			"filter": all_of(query.facet_filters_except(FilterField::Level)),
			"aggs": {
				BUCKETS_AGG: {
					"terms": {
						"field": filter_field(FilterField::Level),
						"size": request.level_size,
						"min_doc_count": 0,
					}
				}
			}
		},
		PRICE_RANGES: {
			"filter": all_of(query.facet_filters.iter()),
			"aggs": {
				BUCKETS_AGG: {
					"range": { "field": "price", "ranges": ranges }
				}
			}
		},
	})
}

fn render_filter(filter: &TermFilter) -> Value {
	json!({ "term": { filter_field(filter.field): filter.value } })
}

fn all_of<'a>(filters: impl Iterator<Item = &'a TermFilter>) -> Value {
	let clauses = filters.map(render_filter).collect::<Vec<_>>();

	if clauses.is_empty() {
		return json!({ "match_all": {} });
	}

	json!({ "bool": { "filter": clauses } })
}

/// `category` is analyzed text, so exact matches go through its keyword subfield. `level` and
/// `status` are mapped as keywords already.
fn filter_field(field: FilterField) -> &'static str {
	match field {
		FilterField::Status => "status",
		FilterField::Category => "category.keyword",
		FilterField::Level => "level",
	}
}

fn parse_buckets(agg: &Value) -> Vec<RawBucket> {
	agg[BUCKETS_AGG]["buckets"]
		.as_array()
		.into_iter()
		.flatten()
		.filter_map(|bucket| {
			let key = bucket["key"].as_str()?;
			let count = bucket["doc_count"].as_u64().unwrap_or(0);

			Some(RawBucket { key: key.to_string(), count })
		})
		.collect()
}
