//! Turns per-request search parameters into a backend-neutral query.

use catalog_domain::CourseStatus;

use crate::search::{
	facets::AggregationRequest,
	ranking::{Field, FieldBoost, Fuzziness, RankingPolicy, SortKey},
};

/// One search request, after trimming. Pagination is expected to be bounded already.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuerySpec {
	pub term: Option<String>,
	pub category: Option<String>,
	pub level: Option<String>,
	pub page: u32,
	pub limit: u32,
	pub status: CourseStatus,
}
impl SearchQuerySpec {
	/// Blank values count as absent. Category and level keep their casing.
	pub fn new(
		term: Option<&str>,
		category: Option<&str>,
		level: Option<&str>,
		page: u32,
		limit: u32,
	) -> Self {
		Self {
			term: non_blank(term),
			category: non_blank(category),
			level: non_blank(level),
			page,
			limit,
			status: CourseStatus::Published,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterField {
	Status,
	Category,
	Level,
}

/// Exact-match, non-scoring filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermFilter {
	pub field: FilterField,
	pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextQuery {
	pub term: String,
	pub fields: Vec<FieldBoost>,
	pub fuzziness: Fuzziness,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuiltQuery {
	/// `None` matches every document with a uniform score.
	pub text: Option<TextQuery>,
	/// Applied to hits and to every facet group.
	pub filters: Vec<TermFilter>,
	/// Applied to hits. Each facet group skips the filter on its own dimension.
	pub facet_filters: Vec<TermFilter>,
	pub sort: Vec<SortKey>,
	pub from: u64,
	pub size: u32,
	pub aggregations: AggregationRequest,
	pub highlight_fields: Vec<Field>,
}
impl BuiltQuery {
	pub fn facet_filters_except(&self, field: FilterField) -> impl Iterator<Item = &TermFilter> {
		self.facet_filters.iter().filter(move |filter| filter.field != field)
	}
}

pub fn plan(
	spec: &SearchQuerySpec,
	policy: &RankingPolicy,
	aggregations: AggregationRequest,
) -> BuiltQuery {
	let text = spec.term.as_ref().map(|term| TextQuery {
		term: term.clone(),
		fields: policy.fields.clone(),
		fuzziness: policy.fuzziness,
	});
	let filters =
		vec![TermFilter { field: FilterField::Status, value: spec.status.as_str().to_string() }];
	let facet_filters = [
		(FilterField::Category, spec.category.as_ref()),
		(FilterField::Level, spec.level.as_ref()),
	]
	.into_iter()
	.filter_map(|(field, value)| value.map(|value| TermFilter { field, value: value.clone() }))
	.collect();
	let from = u64::from(spec.page.saturating_sub(1)) * u64::from(spec.limit);

	BuiltQuery {
		sort: policy.sort_order(text.is_some()),
		text,
		filters,
		facet_filters,
		from,
		size: spec.limit,
		aggregations,
		highlight_fields: vec![Field::Title, Field::Description],
	}
}

fn non_blank(value: Option<&str>) -> Option<String> {
	value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}
