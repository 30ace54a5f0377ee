//! Facet groups requested alongside every search, and the shaping of raw bucket counts.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::gateway::{RawBucket, RawBuckets};

pub const CATEGORIES: &str = "categories";
pub const LEVELS: &str = "levels";
pub const PRICE_RANGES: &str = "priceRanges";

/// A price band, inclusive of `from` and exclusive of `to`. `None` leaves that side open.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceBand {
	pub key: &'static str,
	pub from: Option<f64>,
	pub to: Option<f64>,
}
impl PriceBand {
	pub fn contains(&self, price: f64) -> bool {
		self.from.is_none_or(|from| price >= from) && self.to.is_none_or(|to| price < to)
	}
}

pub const PRICE_BANDS: [PriceBand; 4] = [
	PriceBand { key: "Free", from: None, to: Some(1.0) },
	PriceBand { key: "$1-$50", from: Some(1.0), to: Some(50.0) },
	PriceBand { key: "$50-$100", from: Some(50.0), to: Some(100.0) },
	PriceBand { key: "$100+", from: Some(100.0), to: None },
];

#[derive(Clone, Debug, PartialEq)]
pub struct AggregationRequest {
	pub category_size: u32,
	pub level_size: u32,
	pub price_bands: &'static [PriceBand],
}
impl AggregationRequest {
	pub fn new(cfg: &catalog_config::Search) -> Self {
		Self {
			category_size: cfg.category_facet_size,
			level_size: cfg.level_facet_size,
			price_bands: &PRICE_BANDS,
		}
	}
}
impl Default for AggregationRequest {
	fn default() -> Self {
		Self { category_size: 20, level_size: 10, price_bands: &PRICE_BANDS }
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetBucket {
	pub name: String,
	pub count: u64,
}

/// All three groups are always present, even when every count is zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
	pub categories: Vec<FacetBucket>,
	pub levels: Vec<FacetBucket>,
	pub price_ranges: Vec<FacetBucket>,
}

pub fn compose(raw: RawBuckets, request: &AggregationRequest) -> Facets {
	Facets {
		categories: terms(raw.categories, request.category_size),
		levels: terms(raw.levels, request.level_size),
		price_ranges: ranges(&raw.price_ranges, request.price_bands),
	}
}

fn terms(mut buckets: Vec<RawBucket>, size: u32) -> Vec<FacetBucket> {
	buckets.sort_by(|a, b| (Reverse(a.count), &a.key).cmp(&(Reverse(b.count), &b.key)));
	buckets.truncate(size as usize);

	buckets.into_iter().map(|bucket| FacetBucket { name: bucket.key, count: bucket.count }).collect()
}

fn ranges(buckets: &[RawBucket], bands: &[PriceBand]) -> Vec<FacetBucket> {
	bands
		.iter()
		.map(|band| FacetBucket {
			name: band.key.to_string(),
			count: buckets
				.iter()
				.find(|bucket| bucket.key == band.key)
				.map(|bucket| bucket.count)
				.unwrap_or(0),
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn raw(key: &str, count: u64) -> RawBucket {
		RawBucket { key: key.to_string(), count }
	}

	#[test]
	fn bands_are_inclusive_lower_exclusive_upper() {
		let band_of = |price: f64| {
			PRICE_BANDS.iter().filter(|band| band.contains(price)).map(|band| band.key).collect::<Vec<_>>()
		};

		assert_eq!(band_of(0.0), vec!["Free"]);
		assert_eq!(band_of(0.99), vec!["Free"]);
		assert_eq!(band_of(1.0), vec!["$1-$50"]);
		assert_eq!(band_of(50.0), vec!["$50-$100"]);
		assert_eq!(band_of(99.99), vec!["$50-$100"]);
		assert_eq!(band_of(100.0), vec!["$100+"]);
		assert_eq!(band_of(10_000.0), vec!["$100+"]);
	}

	#[test]
	fn terms_are_ordered_by_count_then_name_and_truncated() {
		let raw = RawBuckets {
			categories: vec![raw("Music", 2), raw("Design", 5), raw("Business", 2), raw("Art", 1)],
			levels: Vec::new(),
			price_ranges: Vec::new(),
		};
		let request = AggregationRequest { category_size: 3, ..AggregationRequest::default() };
		let facets = compose(raw, &request);
		let names = facets.categories.iter().map(|bucket| bucket.name.as_str()).collect::<Vec<_>>();

		assert_eq!(names, vec!["Design", "Business", "Music"]);
	}

	#[test]
	fn price_ranges_are_zero_filled_in_band_order() {
		let raw = RawBuckets {
			categories: Vec::new(),
			levels: Vec::new(),
			price_ranges: vec![raw("$100+", 3), raw("Free", 1)],
		};
		let facets = compose(raw, &AggregationRequest::default());

		assert_eq!(
			facets.price_ranges,
			vec![
				FacetBucket { name: "Free".to_string(), count: 1 },
				FacetBucket { name: "$1-$50".to_string(), count: 0 },
				FacetBucket { name: "$50-$100".to_string(), count: 0 },
				FacetBucket { name: "$100+".to_string(), count: 3 },
			]
		);
	}

	#[test]
	fn empty_groups_still_serialize() {
		let facets = compose(RawBuckets::default(), &AggregationRequest::default());
		let json = serde_json::to_value(&facets).expect("facets serialize");

		assert_eq!(json["categories"], serde_json::json!([]));
		assert_eq!(json["levels"], serde_json::json!([]));
		assert_eq!(json["priceRanges"].as_array().map(Vec::len), Some(4));
	}
}
