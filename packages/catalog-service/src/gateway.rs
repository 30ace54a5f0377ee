//! The contract between the search core and the full-text store that executes it.

pub mod elasticsearch;
pub mod memory;

use std::collections::BTreeMap;

use catalog_domain::SearchDocument;

use crate::{BoxFuture, Result, search::planner::BuiltQuery};

/// Operations the core needs from a full-text store.
///
/// Implementations report write failures as [`crate::Error::Index`] and read failures as
/// [`crate::Error::Query`]. None of them retry.
pub trait IndexGateway
where
	Self: Send + Sync,
{
	/// Upserts by id, replacing the whole stored document.
	fn index<'a>(&'a self, doc: &'a SearchDocument) -> BoxFuture<'a, Result<()>>;

	/// Returns `false` when the id was already absent. That is still a success.
	fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool>>;

	fn query<'a>(&'a self, query: &'a BuiltQuery) -> BoxFuture<'a, Result<QueryResult>>;

	/// Completions whose input starts with `prefix`, at most one per document.
	fn suggest<'a>(
		&'a self,
		prefix: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Completion>>>;

	/// Drops every stored document and indexes `docs` in their place.
	fn rebuild<'a>(&'a self, docs: &'a [SearchDocument]) -> BoxFuture<'a, Result<()>>;

	fn ping(&self) -> BoxFuture<'_, Result<()>>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredDocument {
	pub document: SearchDocument,
	/// `None` when the query had no text clause.
	pub score: Option<f32>,
	pub highlights: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawBucket {
	pub key: String,
	pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawBuckets {
	pub categories: Vec<RawBucket>,
	pub levels: Vec<RawBucket>,
	pub price_ranges: Vec<RawBucket>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
	pub hits: Vec<ScoredDocument>,
	pub total: u64,
	pub buckets: RawBuckets,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
	pub text: String,
	pub weight: u32,
}
