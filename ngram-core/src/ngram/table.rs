use std::collections::HashMap;
use std::collections::hash_map;

use super::Exhaustion;

/// In-memory partial frequency table.
///
/// Holds at most `budget` distinct n-grams. The counts it holds are the part of
/// the run not yet committed to the persistent store; the true count of a key
/// is this count plus the stored one.
///
/// # Invariants
/// - Every stored count is >= 1
/// - `len() <= budget`
#[derive(Debug, Clone)]
pub struct FrequencyTable {
	counts: HashMap<String, u64>,
	budget: usize,
}

impl FrequencyTable {
	/// Creates an empty table allowed to hold `budget` distinct keys.
	pub fn new(budget: usize) -> Self {
		Self { counts: HashMap::new(), budget }
	}

	/// Records one occurrence of `ngram`.
	///
	/// Incrementing a known key always succeeds. A new key fails with
	/// `Exhaustion::Budget` once the table is full, or with
	/// `Exhaustion::Allocation` if the map cannot grow.
	pub fn try_increment(&mut self, ngram: &str) -> Result<(), Exhaustion> {
		if let Some(count) = self.counts.get_mut(ngram) {
			*count += 1;
			return Ok(());
		}

		if self.counts.len() >= self.budget {
			return Err(Exhaustion::Budget { requested: self.counts.len() + 1, budget: self.budget });
		}
		if self.counts.try_reserve(1).is_err() {
			return Err(Exhaustion::Allocation { requested: 1 });
		}

		self.counts.insert(ngram.to_owned(), 1);
		Ok(())
	}

	/// Returns the in-memory count of `ngram` (0 if absent).
	pub fn get(&self, ngram: &str) -> u64 {
		self.counts.get(ngram).copied().unwrap_or(0)
	}

	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	/// Iterates over the keys currently held.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.counts.keys().map(String::as_str)
	}

	/// Empties the table, yielding every `(ngram, count)` pair.
	pub fn drain(&mut self) -> hash_map::Drain<'_, String, u64> {
		self.counts.drain()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn increments_existing_keys_past_budget() {
		let mut table = FrequencyTable::new(1);
		assert!(table.try_increment("ab").is_ok());
		assert!(table.try_increment("ab").is_ok());
		assert_eq!(table.get("ab"), 2);
		assert_eq!(
			table.try_increment("cd"),
			Err(Exhaustion::Budget { requested: 2, budget: 1 })
		);
		assert_eq!(table.get("cd"), 0);
	}

	#[test]
	fn drain_empties_the_table() {
		let mut table = FrequencyTable::new(10);
		for ngram in ["a", "b", "a"] {
			table.try_increment(ngram).unwrap();
		}
		let mut drained: Vec<(String, u64)> = table.drain().collect();
		drained.sort();
		assert_eq!(drained, vec![("a".to_owned(), 2), ("b".to_owned(), 1)]);
		assert!(table.is_empty());
		assert!(table.try_increment("c").is_ok());
	}
}
