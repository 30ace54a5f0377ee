//! Field boosts, typo tolerance, and the fixed tie-break order for course search.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
	Title,
	Description,
	Tags,
	Category,
}
impl Field {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Title => "title",
			Self::Description => "description",
			Self::Tags => "tags",
			Self::Category => "category",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldBoost {
	pub field: Field,
	pub boost: f32,
}

/// Edit-distance tolerance between a query term and an indexed token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fuzziness {
	/// Scales with term length: exact for 1-2 characters, one edit for 3-5, two beyond.
	Auto,
}
impl Fuzziness {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Auto => "AUTO",
		}
	}

	pub fn max_edits(self, term: &str) -> usize {
		match self {
			Self::Auto => match term.chars().count() {
				0..=2 => 0,
				3..=5 => 1,
				_ => 2,
			},
		}
	}
}

/// Sort keys, all descending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
	Score,
	Rating,
	TotalStudents,
}
impl SortKey {
	pub fn field(self) -> &'static str {
		match self {
			Self::Score => "_score",
			Self::Rating => "rating",
			Self::TotalStudents => "totalStudents",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct RankingPolicy {
	pub fields: Vec<FieldBoost>,
	pub fuzziness: Fuzziness,
	pub tie_breaks: Vec<SortKey>,
}
impl RankingPolicy {
	/// Title x3, description x2, tags and category x1, automatic fuzziness, then rating and
	/// enrollment as tie-breaks. Not configurable per request.
	pub fn standard() -> Self {
		Self {
			fields: vec![
				FieldBoost { field: Field::Title, boost: 3.0 },
				FieldBoost { field: Field::Description, boost: 2.0 },
				FieldBoost { field: Field::Tags, boost: 1.0 },
				FieldBoost { field: Field::Category, boost: 1.0 },
			],
			fuzziness: Fuzziness::Auto,
			tie_breaks: vec![SortKey::Rating, SortKey::TotalStudents],
		}
	}

	/// Relevance leads only when there is something to be relevant to.
	pub fn sort_order(&self, has_term: bool) -> Vec<SortKey> {
		let mut order = Vec::with_capacity(self.tie_breaks.len() + 1);

		if has_term {
			order.push(SortKey::Score);
		}

		order.extend(self.tie_breaks.iter().copied());

		order
	}

	pub fn boost(&self, field: Field) -> f32 {
		self.fields.iter().find(|entry| entry.field == field).map(|entry| entry.boost).unwrap_or(0.0)
	}
}
