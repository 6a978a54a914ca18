use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::ngram::extractor::ngrams;

/// Largest accepted distance between a row sum and 1.0.
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

type Rows<T> = BTreeMap<char, BTreeMap<char, T>>;

/// Character frequency distribution, built from the length-1 n-grams.
///
/// Ordered maps keep iteration (and therefore seeded sampling) stable.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct CharFrequencies {
	counts: BTreeMap<char, u64>,
}

impl CharFrequencies {
	/// Adds `count` occurrences of `ch`.
	pub fn add(&mut self, ch: char, count: u64) {
		*self.counts.entry(ch).or_insert(0) += count;
	}

	/// Occurrences of `ch` (0 if unknown).
	pub fn get(&self, ch: char) -> u64 {
		self.counts.get(&ch).copied().unwrap_or(0)
	}

	/// Sum of all counts.
	pub fn total(&self) -> u64 {
		self.counts.values().sum()
	}

	pub fn iter(&self) -> impl Iterator<Item = (char, u64)> + '_ {
		self.counts.iter().map(|(ch, count)| (*ch, *count))
	}

	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}
}

impl<const N: usize> From<[(char, u64); N]> for CharFrequencies {
	fn from(pairs: [(char, u64); N]) -> Self {
		let mut frequencies = Self::default();
		for (ch, count) in pairs {
			frequencies.add(ch, count);
		}
		frequencies
	}
}

/// Character-to-character transition counts (the raw Markov matrix).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransitionCounts {
	rows: Rows<u64>,
}

impl TransitionCounts {
	/// Adds `count` observations of the transition `from -> to`.
	pub fn add(&mut self, from: char, to: char, count: u64) {
		*self.rows.entry(from).or_default().entry(to).or_insert(0) += count;
	}

	/// Count of `from -> to` (0 if never observed).
	pub fn get(&self, from: char, to: char) -> u64 {
		self.rows.get(&from).and_then(|row| row.get(&to)).copied().unwrap_or(0)
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Divides every row by its total.
	///
	/// Rows without any mass are left out of the result.
	pub fn normalize(&self) -> ProbabilityMatrix {
		let mut rows = Rows::new();
		for (from, row) in &self.rows {
			let total: u64 = row.values().sum();
			if total == 0 {
				continue;
			}
			let probabilities = row
				.iter()
				.filter(|(_, count)| **count > 0)
				.map(|(to, count)| (*to, *count as f64 / total as f64))
				.collect();
			rows.insert(*from, probabilities);
		}
		ProbabilityMatrix { rows }
	}
}

/// Row-normalised Markov matrix: `from -> (to -> probability)`.
///
/// # Invariants
/// - No empty rows
/// - Every probability lies in `[0, 1]`
/// - Every row sums to 1.0 within [`ROW_SUM_TOLERANCE`]
///
/// The invariants are checked again when a matrix is deserialised.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(try_from = "Rows<f64>", into = "Rows<f64>")]
pub struct ProbabilityMatrix {
	rows: Rows<f64>,
}

impl ProbabilityMatrix {
	/// Outgoing distribution of `from`, `None` when it has no transitions.
	pub fn row(&self, from: char) -> Option<&BTreeMap<char, f64>> {
		self.rows.get(&from)
	}

	/// Probability of `from -> to` (0.0 if absent).
	pub fn probability(&self, from: char, to: char) -> f64 {
		self.row(from).and_then(|row| row.get(&to)).copied().unwrap_or(0.0)
	}

	pub fn rows(&self) -> impl Iterator<Item = (char, &BTreeMap<char, f64>)> {
		self.rows.iter().map(|(from, row)| (*from, row))
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}
}

impl TryFrom<Rows<f64>> for ProbabilityMatrix {
	type Error = Error;

	fn try_from(rows: Rows<f64>) -> Result<Self, Self::Error> {
		for (from, row) in &rows {
			if row.is_empty() {
				return Err(Error::Matrix(format!("row '{from}' is empty")));
			}
			if let Some((to, p)) = row.iter().find(|(_, p)| !(0.0..=1.0).contains(*p)) {
				return Err(Error::Matrix(format!("probability {from}->{to} = {p} is out of range")));
			}
			let sum: f64 = row.values().sum();
			if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
				return Err(Error::Matrix(format!("row '{from}' sums to {sum}")));
			}
		}
		Ok(Self { rows })
	}
}

impl From<ProbabilityMatrix> for Rows<f64> {
	fn from(matrix: ProbabilityMatrix) -> Self {
		matrix.rows
	}
}

/// Accumulates `(ngram, count)` pairs into character frequencies and
/// transition counts.
///
/// - A length-1 n-gram adds its count to the character frequencies and
///   nothing else.
/// - A longer n-gram is cut into its length-2 sub-n-grams; each adjacent pair
///   `(a, b)` adds the n-gram's count to `a -> b`.
#[derive(Clone, Debug, Default)]
pub struct MatrixBuilder {
	char_frequencies: CharFrequencies,
	transitions: TransitionCounts,
}

impl MatrixBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one counted n-gram.
	pub fn add(&mut self, ngram: &str, count: u64) {
		if count == 0 {
			return;
		}

		let mut chars = ngram.chars();
		match (chars.next(), chars.next()) {
			(None, _) => return,
			(Some(ch), None) => {
				self.char_frequencies.add(ch, count);
				return;
			}
			_ => (),
		}

		for pair in ngrams(ngram, 2, Some(2)) {
			let mut pair = pair.chars();
			if let (Some(from), Some(to)) = (pair.next(), pair.next()) {
				self.transitions.add(from, to, count);
			}
		}
	}

	pub fn char_frequencies(&self) -> &CharFrequencies {
		&self.char_frequencies
	}

	pub fn transitions(&self) -> &TransitionCounts {
		&self.transitions
	}

	/// Normalises the transitions and hands back both halves of the model.
	pub fn finish(self) -> (CharFrequencies, ProbabilityMatrix) {
		let matrix = self.transitions.normalize();
		(self.char_frequencies, matrix)
	}
}

impl<S: AsRef<str>> Extend<(S, u64)> for MatrixBuilder {
	fn extend<I: IntoIterator<Item = (S, u64)>>(&mut self, pairs: I) {
		for (ngram, count) in pairs {
			self.add(ngram.as_ref(), count);
		}
	}
}

/// Builds the character frequencies and the probability matrix of a
/// frequency table.
pub fn build<I, S>(pairs: I) -> (CharFrequencies, ProbabilityMatrix)
where
	I: IntoIterator<Item = (S, u64)>,
	S: AsRef<str>,
{
	let mut builder = MatrixBuilder::new();
	builder.extend(pairs);
	builder.finish()
}
