//! Autocomplete inputs and weights attached to every indexed course.
//!
//! The weight blends quality (rating, 0-5) with reach (enrollment). Rating is scaled by ten so it
//! dominates between courses of similar size, and enrollment is damped by a hundred so a single
//! enrollment spike does not bury better rated courses. It is computed once per indexing event.

use std::collections::HashSet;

pub const RATING_MULTIPLIER: f64 = 10.0;
pub const STUDENT_DIVISOR: f64 = 100.0;
/// Completion weights are stored as signed 32-bit integers by the index store.
pub const MAX_WEIGHT: u32 = i32::MAX as u32;

/// `round(rating * 10 + total_students / 100)`, clamped to the storable range.
pub fn suggestion_weight(rating: f64, total_students: u64) -> u32 {
	let raw = rating * RATING_MULTIPLIER + total_students as f64 / STUDENT_DIVISOR;

	if raw.is_nan() || raw <= 0.0 {
		return 0;
	}

	raw.round().min(MAX_WEIGHT as f64) as u32
}

/// Title, then each tag, then the category, keeping the first occurrence of each string.
pub fn suggestion_input(title: &str, tags: &[String], category: &str) -> Vec<String> {
	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(tags.len() + 2);

	for candidate in std::iter::once(title).chain(tags.iter().map(String::as_str)).chain([category])
	{
		if candidate.trim().is_empty() {
			continue;
		}
		if seen.insert(candidate) {
			out.push(candidate.to_string());
		}
	}

	out
}
