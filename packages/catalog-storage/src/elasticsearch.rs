//! Thin HTTP client for the Elasticsearch index that backs course search.
//!
//! This module only speaks the wire protocol. What goes into a query body is decided by the
//! search service.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url, header::CONTENT_TYPE};
use serde_json::Value;

use crate::{Error, Result};

pub struct ElasticsearchStore {
	pub client: Client,
	pub base_url: Url,
	pub index: String,
}
impl ElasticsearchStore {
	pub fn new(cfg: &catalog_config::Index) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let base_url = Url::parse(&cfg.url).map_err(|err| {
			Error::InvalidArgument(format!("Invalid index url {:?}: {err}.", cfg.url))
		})?;

		if base_url.cannot_be_a_base() {
			return Err(Error::InvalidArgument(format!(
				"Index url {:?} cannot be used as a base url.",
				cfg.url
			)));
		}

		Ok(Self { client, base_url, index: cfg.index.clone() })
	}

	/// Creates the first versioned index behind the `index` alias when neither exists yet.
	///
	/// Returns `true` when this call created it. Losing a creation race to another process counts
	/// as already existing.
	pub async fn ensure_index(&self) -> Result<bool> {
		let res = self.request(Method::HEAD, &[self.index.as_str()]).send().await?;

		if res.status().is_success() {
			return Ok(false);
		}
		if res.status() != StatusCode::NOT_FOUND {
			return Err(backend_error(res).await);
		}

		let initial = versioned_index_name(&self.index, 0);

		match self.create_index(&initial, true).await {
			Ok(()) => {},
			Err(err) if is_already_exists(&err) => return Ok(false),
			Err(err) => return Err(err),
		}

		tracing::info!(alias = %self.index, index = %initial, "Created course index.");

		Ok(true)
	}

	/// Loads `docs` into a fresh versioned index, then points the alias at it in one `_aliases`
	/// call. The live index keeps serving until the swap, and is left untouched on failure.
	pub async fn rebuild_index(&self, docs: &[(String, Value)]) -> Result<String> {
		let millis = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
		let target = versioned_index_name(&self.index, millis);

		self.create_index(&target, false).await?;

		let swapped = async {
			self.bulk_index(&target, docs).await?;

			let previous = self.alias_targets().await?;

			self.update_aliases(&alias_swap_actions(&self.index, &target, &previous)).await?;

			Ok::<_, Error>(previous)
		}
		.await;
		let previous = match swapped {
			Ok(previous) => previous,
			Err(err) => {
				self.drop_index(&target).await;

				return Err(err);
			},
		};

		for old in &previous.indices {
			self.drop_index(old).await;
		}

		tracing::info!(
			alias = %self.index,
			index = %target,
			docs = docs.len(),
			"Swapped course index."
		);

		Ok(target)
	}

	/// Replaces the whole stored document for `id`.
	pub async fn put_document(&self, id: &str, source: &Value) -> Result<()> {
		let res = self
			.request(Method::PUT, &[self.index.as_str(), "_doc", id])
			.query(&[("refresh", "wait_for")])
			.json(source)
			.send()
			.await?;

		check(res).await?;

		Ok(())
	}

	/// Returns `false` when no document with `id` existed.
	pub async fn delete_document(&self, id: &str) -> Result<bool> {
		let res = self
			.request(Method::DELETE, &[self.index.as_str(), "_doc", id])
			.query(&[("refresh", "wait_for")])
			.send()
			.await?;

		if res.status() == StatusCode::NOT_FOUND {
			return Ok(false);
		}

		check(res).await?;

		Ok(true)
	}

	pub async fn search(&self, body: &Value) -> Result<Value> {
		let res = self
			.request(Method::POST, &[self.index.as_str(), "_search"])
			.json(body)
			.send()
			.await?;

		Ok(check(res).await?.json().await?)
	}

	/// Indexes `(id, source)` pairs into `index` in one `_bulk` round trip.
	pub async fn bulk_index(&self, index: &str, docs: &[(String, Value)]) -> Result<()> {
		if docs.is_empty() {
			return Ok(());
		}

		let mut body = String::new();

		for (id, source) in docs {
			let action = serde_json::json!({ "index": { "_index": index, "_id": id } });

			body.push_str(&serde_json::to_string(&action)?);
			body.push('\n');
			body.push_str(&serde_json::to_string(source)?);
			body.push('\n');
		}

		let res = self
			.request(Method::POST, &["_bulk"])
			.query(&[("refresh", "wait_for")])
			.header(CONTENT_TYPE, "application/x-ndjson")
			.body(body)
			.send()
			.await?;
		let json: Value = check(res).await?.json().await?;

		if json.get("errors").and_then(Value::as_bool).unwrap_or(false) {
			let failed = json
				.get("items")
				.and_then(Value::as_array)
				.map(|items| items.iter().filter(|item| item["index"].get("error").is_some()).count())
				.unwrap_or(0);

			return Err(Error::Backend {
				status: StatusCode::OK.as_u16(),
				body: format!("Bulk request rejected {failed} of {} documents.", docs.len()),
			});
		}

		Ok(())
	}

	pub async fn ping(&self) -> Result<()> {
		let res = self.request(Method::GET, &["_cluster", "health"]).send().await?;

		check(res).await?;

		Ok(())
	}

	async fn create_index(&self, name: &str, with_alias: bool) -> Result<()> {
		let mut body = index_definition();

		if with_alias {
			body["aliases"] = serde_json::json!({ self.index.as_str(): {} });
		}

		let res = self.request(Method::PUT, &[name]).json(&body).send().await?;

		check(res).await?;

		Ok(())
	}

	async fn alias_targets(&self) -> Result<AliasTargets> {
		let res = self.request(Method::GET, &["_alias", self.index.as_str()]).send().await?;

		if res.status().is_success() {
			let json: Value = res.json().await?;

			return Ok(AliasTargets { indices: alias_indices(&json), concrete: false });
		}
		if res.status() != StatusCode::NOT_FOUND {
			return Err(backend_error(res).await);
		}

		// No alias yet. A plain index under the alias name has to go in the same swap.
		let res = self.request(Method::HEAD, &[self.index.as_str()]).send().await?;

		Ok(AliasTargets { indices: Vec::new(), concrete: res.status().is_success() })
	}

	async fn update_aliases(&self, actions: &Value) -> Result<()> {
		let res = self.request(Method::POST, &["_aliases"]).json(actions).send().await?;

		check(res).await?;

		Ok(())
	}

	async fn drop_index(&self, name: &str) {
		let outcome = match self.request(Method::DELETE, &[name]).send().await {
			Ok(res) if res.status().is_success() || res.status() == StatusCode::NOT_FOUND => Ok(()),
			Ok(res) => Err(backend_error(res).await),
			Err(err) => Err(err.into()),
		};

		if let Err(err) = outcome {
			tracing::warn!(error = %err, index = %name, "Failed to drop course index.");
		}
	}

	fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
		let mut url = self.base_url.clone();

		// `new` rejects urls that cannot be a base, so this always yields segments.
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}

		self.client.request(method, url)
	}
}

/// Physical indices currently reachable under the alias name.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AliasTargets {
	pub indices: Vec<String>,
	/// A plain index, not an alias, holds the name.
	pub concrete: bool,
}

pub fn versioned_index_name(alias: &str, version: i128) -> String {
	format!("{alias}_{version}")
}

/// Moves `alias` from every previous target to `target` atomically.
pub fn alias_swap_actions(alias: &str, target: &str, previous: &AliasTargets) -> Value {
	let mut actions: Vec<Value> = previous
		.indices
		.iter()
		.map(|index| serde_json::json!({ "remove": { "index": index, "alias": alias } }))
		.collect();

	if previous.concrete {
		actions.push(serde_json::json!({ "remove_index": { "index": alias } }));
	}

	actions.push(serde_json::json!({ "add": { "index": target, "alias": alias } }));

	serde_json::json!({ "actions": actions })
}

fn alias_indices(response: &Value) -> Vec<String> {
	let mut indices: Vec<String> =
		response.as_object().map(|map| map.keys().cloned().collect()).unwrap_or_default();

	indices.sort();

	indices
}

fn is_already_exists(err: &Error) -> bool {
	matches!(
		err,
		Error::Backend { status: 400, body } if body.contains("resource_already_exists_exception")
	)
}

/// Mapping for the course index.
///
/// `category` and `title` keep a `keyword` subfield for exact filters and term buckets. The
/// completion field `suggest` is filled by the service from `suggestionInput`/`suggestionWeight`.
pub fn index_definition() -> Value {
	serde_json::json!({
		"mappings": {
			"properties": {
				"title": {
					"type": "text",
					"analyzer": "standard",
					"fields": { "keyword": { "type": "keyword" } }
				},
				"description": { "type": "text", "analyzer": "standard" },
				"category": {
					"type": "text",
					"fields": { "keyword": { "type": "keyword" } }
				},
				"level": { "type": "keyword" },
				"status": { "type": "keyword" },
				"tags": { "type": "text", "analyzer": "standard" },
				"price": { "type": "float" },
				"rating": { "type": "float" },
				"totalStudents": { "type": "integer" },
				"instructorId": { "type": "keyword" },
				"thumbnail": { "type": "keyword", "index": false },
				"createdAt": { "type": "date" },
				"publishedAt": { "type": "date" },
				"suggestionInput": { "type": "keyword", "index": false },
				"suggestionWeight": { "type": "integer", "index": false },
				"suggest": {
					"type": "completion",
					"analyzer": "simple",
					"preserve_separators": true,
					"preserve_position_increments": true,
					"max_input_length": 50
				}
			}
		}
	})
}

async fn check(res: Response) -> Result<Response> {
	if res.status().is_success() {
		return Ok(res);
	}

	Err(backend_error(res).await)
}

async fn backend_error(res: Response) -> Error {
	let status = res.status().as_u16();
	let body = res.text().await.unwrap_or_default();

	Error::Backend { status, body }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn store(url: &str) -> ElasticsearchStore {
		let cfg = catalog_config::Index {
			backend: catalog_config::IndexBackend::Elasticsearch,
			url: url.to_string(),
			index: "courses".to_string(),
			timeout_ms: 1_000,
		};

		ElasticsearchStore::new(&cfg).expect("valid store")
	}

	#[test]
	fn document_ids_are_path_escaped() {
		let store = store("http://localhost:9200");
		let req = store
			.request(Method::PUT, &[store.index.as_str(), "_doc", "a/b c"])
			.build()
			.expect("request builds");

		assert_eq!(req.url().as_str(), "http://localhost:9200/courses/_doc/a%2Fb%20c");
	}

	#[test]
	fn base_path_is_preserved() {
		let store = store("http://localhost:9200/es/");
		let req = store.request(Method::GET, &["_cluster", "health"]).build().expect("builds");

		assert_eq!(req.url().as_str(), "http://localhost:9200/es/_cluster/health");
	}

	#[test]
	fn rejects_non_base_urls() {
		let cfg = catalog_config::Index {
			backend: catalog_config::IndexBackend::Elasticsearch,
			url: "mailto:search@example.com".to_string(),
			index: "courses".to_string(),
			timeout_ms: 1_000,
		};

		assert!(ElasticsearchStore::new(&cfg).is_err());
	}

	#[test]
	fn alias_swap_is_one_request() {
		let previous = AliasTargets { indices: vec!["courses_0".to_string()], concrete: false };
		let body = alias_swap_actions("courses", "courses_17", &previous);

		assert_eq!(
			body,
			serde_json::json!({ "actions": [
				{ "remove": { "index": "courses_0", "alias": "courses" } },
				{ "add": { "index": "courses_17", "alias": "courses" } }
			] })
		);
	}

	#[test]
	fn plain_index_under_the_alias_name_is_replaced_in_the_swap() {
		let previous = AliasTargets { indices: Vec::new(), concrete: true };
		let body = alias_swap_actions("courses", "courses_17", &previous);

		assert_eq!(body["actions"][0], serde_json::json!({ "remove_index": { "index": "courses" } }));
		assert_eq!(body["actions"][1]["add"]["index"], "courses_17");
	}

	#[test]
	fn alias_lookup_lists_every_target() {
		let response = serde_json::json!({
			"courses_9": { "aliases": { "courses": {} } },
			"courses_3": { "aliases": { "courses": {} } }
		});

		assert_eq!(alias_indices(&response), vec!["courses_3", "courses_9"]);
	}

	#[test]
	fn creation_race_is_recognized() {
		let lost = Error::Backend {
			status: 400,
			body: r#"{"error":{"type":"resource_already_exists_exception"}}"#.to_string(),
		};
		let other = Error::Backend { status: 400, body: "mapper_parsing_exception".to_string() };

		assert!(is_already_exists(&lost));
		assert!(!is_already_exists(&other));
		assert_eq!(versioned_index_name("courses", 0), "courses_0");
	}

	#[test]
	fn mapping_declares_completion_field() {
		let mapping = index_definition();

		assert_eq!(mapping["mappings"]["properties"]["suggest"]["type"], "completion");
		assert_eq!(mapping["mappings"]["properties"]["level"]["type"], "keyword");
	}
}
