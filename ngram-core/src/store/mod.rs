//! Persistent n-gram count storage.
//!
//! The counter only talks to storage through [`CountStore`], so mutations are
//! serialised through a single `&mut` writer.

use std::collections::HashMap;

use crate::error::Result;

/// SQLite-backed implementation.
pub mod sqlite;

/// `ngram<SEP>count` export files.
pub mod export;

pub use sqlite::SqliteStore;

/// Durable n-gram -> count table.
///
/// # Invariants
/// After a counting run, the count stored for a key equals the number of
/// occurrences of that n-gram in the corpus, however many overflow flushes
/// happened.
pub trait CountStore {
	/// Returns the stored count of every key in `keys`, 0 for absent ones.
	///
	/// Does not modify the store.
	fn fetch_counts(&self, keys: &[&str]) -> Result<HashMap<String, u64>>;

	/// Writes each `(ngram, count)`: replaces the count of existing keys and
	/// inserts missing ones. The caller has already merged the totals.
	fn upsert(&mut self, rows: &[(String, u64)]) -> Result<()>;

	/// Stored count of a single n-gram (0 if absent).
	fn count_of(&self, ngram: &str) -> Result<u64>;

	/// Number of distinct n-grams stored.
	fn len(&self) -> Result<u64>;

	/// The `n` n-grams with the largest counts, in descending order.
	fn top_k(&self, n: usize) -> Result<Vec<(String, u64)>>;

	/// Walks the whole table in descending count order, `page_size` rows at a
	/// time, without loading it all into memory.
	///
	/// Stops at the first error returned by `visit`.
	fn for_each_page_descending(
		&self,
		page_size: usize,
		visit: &mut dyn FnMut(Vec<(String, u64)>) -> Result<()>,
	) -> Result<()>;

	fn is_empty(&self) -> Result<bool> {
		Ok(self.len()? == 0)
	}
}
