//! In-process index for tests and single-node development deployments.
//!
//! Tokens are unicode words, lowercased. A query term scores 1.0 in a field when a token matches
//! exactly and 0.5 when one is within the term's fuzzy edit budget, multiplied by the field boost.
//! A document scores as its best field. This is a stand-in for BM25, not a copy of it.

use std::{
	cmp::Ordering,
	collections::{BTreeMap, BTreeSet, HashSet},
	sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use unicode_segmentation::UnicodeSegmentation;

use catalog_domain::SearchDocument;

use crate::{
	BoxFuture, Result,
	gateway::{Completion, IndexGateway, QueryResult, RawBucket, RawBuckets, ScoredDocument},
	search::{
		planner::{BuiltQuery, FilterField, TermFilter, TextQuery},
		ranking::{Field, Fuzziness, SortKey},
	},
};

#[derive(Debug, Default)]
pub struct MemoryIndex {
	docs: RwLock<BTreeMap<String, SearchDocument>>,
}
impl MemoryIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.read().is_empty()
	}

	pub fn get(&self, id: &str) -> Option<SearchDocument> {
		self.read().get(id).cloned()
	}

	fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, SearchDocument>> {
		self.docs.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, SearchDocument>> {
		self.docs.write().unwrap_or_else(PoisonError::into_inner)
	}
}

impl IndexGateway for MemoryIndex {
	fn index<'a>(&'a self, doc: &'a SearchDocument) -> BoxFuture<'a, Result<()>> {
		self.write().insert(doc.id.clone(), doc.clone());

		Box::pin(async { Ok(()) })
	}

	fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<bool>> {
		let existed = self.write().remove(id).is_some();

		Box::pin(async move { Ok(existed) })
	}

	fn query<'a>(&'a self, query: &'a BuiltQuery) -> BoxFuture<'a, Result<QueryResult>> {
		let result = run_query(&self.read(), query);

		Box::pin(async move { Ok(result) })
	}

	fn suggest<'a>(
		&'a self,
		prefix: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Completion>>> {
		let completions = complete(&self.read(), prefix, limit);

		Box::pin(async move { Ok(completions) })
	}

	fn rebuild<'a>(&'a self, docs: &'a [SearchDocument]) -> BoxFuture<'a, Result<()>> {
		let fresh: BTreeMap<_, _> = docs.iter().map(|doc| (doc.id.clone(), doc.clone())).collect();

		*self.write() = fresh;

		Box::pin(async { Ok(()) })
	}

	fn ping(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(async { Ok(()) })
	}
}

struct Candidate<'a> {
	doc: &'a SearchDocument,
	score: Option<f32>,
}

fn run_query(docs: &BTreeMap<String, SearchDocument>, query: &BuiltQuery) -> QueryResult {
	let terms = query.text.as_ref().map(|text| tokenize(&text.term)).unwrap_or_default();
	let mut matched = Vec::new();

	for doc in docs.values() {
		if !query.filters.iter().all(|filter| matches_filter(doc, filter)) {
			continue;
		}

		let score = match &query.text {
			Some(text) => match score_document(doc, text, &terms) {
				score if score > 0.0 => Some(score),
				_ => continue,
			},
			None => None,
		};

		matched.push(Candidate { doc, score });
	}

	let buckets = RawBuckets {
		categories: term_buckets(docs, &matched, query, FilterField::Category),
		levels: term_buckets(docs, &matched, query, FilterField::Level),
		price_ranges: price_buckets(&matched, query),
	};
	let mut hits = matched
		.iter()
		.filter(|candidate| {
			query.facet_filters.iter().all(|filter| matches_filter(candidate.doc, filter))
		})
		.collect::<Vec<_>>();

	hits.sort_by(|a, b| compare(a, b, &query.sort));

	let total = hits.len() as u64;
	let hits = hits
		.into_iter()
		.skip(usize::try_from(query.from).unwrap_or(usize::MAX))
		.take(query.size as usize)
		.map(|candidate| ScoredDocument {
			document: candidate.doc.clone(),
			score: candidate.score,
			highlights: match &query.text {
				Some(text) => highlight(candidate.doc, &query.highlight_fields, &terms, text.fuzziness),
				None => BTreeMap::new(),
			},
		})
		.collect();

	QueryResult { hits, total, buckets }
}

fn complete(docs: &BTreeMap<String, SearchDocument>, prefix: &str, limit: u32) -> Vec<Completion> {
	let prefix = prefix.to_lowercase();
	let mut completions = docs
		.values()
		.filter_map(|doc| {
			doc.suggestion_input.iter().find(|input| input.to_lowercase().starts_with(&prefix)).map(
				|input| Completion { text: input.clone(), weight: doc.suggestion_weight },
			)
		})
		.collect::<Vec<_>>();

	completions.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.text.cmp(&b.text)));

	let mut seen = HashSet::new();

	completions.retain(|completion| seen.insert(completion.text.clone()));
	completions.truncate(limit as usize);

	completions
}

fn matches_filter(doc: &SearchDocument, filter: &TermFilter) -> bool {
	match filter.field {
		FilterField::Status => doc.status.as_str() == filter.value,
		FilterField::Category => doc.category == filter.value,
		FilterField::Level => doc.level.as_str() == filter.value,
	}
}

fn facet_key(doc: &SearchDocument, field: FilterField) -> &str {
	match field {
		FilterField::Status => doc.status.as_str(),
		FilterField::Category => &doc.category,
		FilterField::Level => doc.level.as_str(),
	}
}

/// Every key present in the index gets a bucket, so unmatched keys report zero.
fn term_buckets(
	docs: &BTreeMap<String, SearchDocument>,
	matched: &[Candidate<'_>],
	query: &BuiltQuery,
	field: FilterField,
) -> Vec<RawBucket> {
	let mut counts = docs
		.values()
		.map(|doc| (facet_key(doc, field), 0_u64))
		.collect::<BTreeMap<_, _>>();

	for candidate in matched {
		if query.facet_filters_except(field).all(|filter| matches_filter(candidate.doc, filter)) {
			*counts.entry(facet_key(candidate.doc, field)).or_default() += 1;
		}
	}

	counts.into_iter().map(|(key, count)| RawBucket { key: key.to_string(), count }).collect()
}

fn price_buckets(matched: &[Candidate<'_>], query: &BuiltQuery) -> Vec<RawBucket> {
	query
		.aggregations
		.price_bands
		.iter()
		.map(|band| RawBucket {
			key: band.key.to_string(),
			count: matched
				.iter()
				.filter(|candidate| {
					query.facet_filters.iter().all(|filter| matches_filter(candidate.doc, filter))
						&& band.contains(candidate.doc.price)
				})
				.count() as u64,
		})
		.collect()
}

fn compare(a: &Candidate<'_>, b: &Candidate<'_>, sort: &[SortKey]) -> Ordering {
	sort.iter()
		.map(|key| match key {
			SortKey::Score => b.score.unwrap_or(0.0).total_cmp(&a.score.unwrap_or(0.0)),
			SortKey::Rating => b.doc.rating.total_cmp(&a.doc.rating),
			SortKey::TotalStudents => b.doc.total_students.cmp(&a.doc.total_students),
		})
		.find(|ordering| ordering.is_ne())
		.unwrap_or_else(|| a.doc.id.cmp(&b.doc.id))
}

fn score_document(doc: &SearchDocument, text: &TextQuery, terms: &[String]) -> f32 {
	text.fields
		.iter()
		.map(|entry| {
			let tokens = field_tokens(doc, entry.field);

			field_score(&tokens, terms, text.fuzziness) * entry.boost
		})
		.fold(0.0, f32::max)
}

fn field_tokens(doc: &SearchDocument, field: Field) -> BTreeSet<String> {
	match field {
		Field::Title => tokenize(&doc.title).into_iter().collect(),
		Field::Description => tokenize(&doc.description).into_iter().collect(),
		Field::Tags => doc.tags.iter().flat_map(|tag| tokenize(tag)).collect(),
		Field::Category => tokenize(&doc.category).into_iter().collect(),
	}
}

fn field_score(tokens: &BTreeSet<String>, terms: &[String], fuzziness: Fuzziness) -> f32 {
	terms
		.iter()
		.map(|term| {
			if tokens.contains(term) {
				return 1.0;
			}

			let max_edits = fuzziness.max_edits(term);

			if max_edits > 0 && tokens.iter().any(|token| within_edits(term, token, max_edits)) {
				0.5
			} else {
				0.0
			}
		})
		.sum()
}

fn term_matches(token: &str, terms: &[String], fuzziness: Fuzziness) -> bool {
	terms.iter().any(|term| {
		term == token || {
			let max_edits = fuzziness.max_edits(term);

			max_edits > 0 && within_edits(term, token, max_edits)
		}
	})
}

fn highlight(
	doc: &SearchDocument,
	fields: &[Field],
	terms: &[String],
	fuzziness: Fuzziness,
) -> BTreeMap<String, Vec<String>> {
	let mut out = BTreeMap::new();

	for field in fields {
		let source = match field {
			Field::Title => &doc.title,
			Field::Description => &doc.description,
			Field::Category => &doc.category,
			Field::Tags => continue,
		};
		let mut fragment = String::with_capacity(source.len());
		let mut hit = false;

		for segment in source.split_word_bounds() {
			let is_word = segment.chars().any(char::is_alphanumeric);

			if is_word && term_matches(&segment.to_lowercase(), terms, fuzziness) {
				fragment.push_str("<em>");
				fragment.push_str(segment);
				fragment.push_str("</em>");

				hit = true;
			} else {
				fragment.push_str(segment);
			}
		}

		if hit {
			out.insert(field.as_str().to_string(), vec![fragment]);
		}
	}

	out
}

fn tokenize(text: &str) -> Vec<String> {
	text.unicode_words().map(str::to_lowercase).collect()
}

fn within_edits(a: &str, b: &str, max: usize) -> bool {
	let a = a.chars().collect::<Vec<_>>();
	let b = b.chars().collect::<Vec<_>>();

	a.len().abs_diff(b.len()) <= max && osa_distance(&a, &b) <= max
}

/// Optimal string alignment distance: Levenshtein plus adjacent transpositions.
fn osa_distance(a: &[char], b: &[char]) -> usize {
	let mut rows = vec![vec![0_usize; b.len() + 1]; a.len() + 1];

	for (i, row) in rows.iter_mut().enumerate() {
		row[0] = i;
	}
	for (j, cell) in rows[0].iter_mut().enumerate() {
		*cell = j;
	}

	for i in 1..=a.len() {
		for j in 1..=b.len() {
			let cost = usize::from(a[i - 1] != b[j - 1]);
			let mut best =
				(rows[i - 1][j] + 1).min(rows[i][j - 1] + 1).min(rows[i - 1][j - 1] + cost);

			if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
				best = best.min(rows[i - 2][j - 2] + 1);
			}

			rows[i][j] = best;
		}
	}

	rows[a.len()][b.len()]
}
