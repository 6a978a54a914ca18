//! Run parameters consumed by the engine.
//!
//! Every knob the extractor, counter and store need is passed in through
//! these structs. Nothing in the crate reads configuration from global state.

use crate::error::{Error, Result};

/// Bounds applied when cutting a word into n-grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractConfig {
	/// Smallest n-gram length (in characters), at least 1.
	pub min_size: usize,
	/// Largest n-gram length, unbounded when `None`.
	pub max_size: Option<usize>,
	/// Words longer than this (in characters) are skipped.
	pub max_word_length: usize,
}

impl Default for ExtractConfig {
	fn default() -> Self {
		Self { min_size: 2, max_size: None, max_word_length: 128 }
	}
}

impl ExtractConfig {
	/// Checks the size bounds.
	///
	/// # Errors
	/// Returns `Error::Config` if `min_size` is zero or `max_size < min_size`.
	pub fn validate(&self) -> Result<()> {
		if self.min_size == 0 {
			return Err(Error::Config("min_size must be >= 1".to_owned()));
		}
		if let Some(max_size) = self.max_size {
			if max_size < self.min_size {
				return Err(Error::Config(format!(
					"max_size ({max_size}) must be >= min_size ({})",
					self.min_size
				)));
			}
		}
		Ok(())
	}
}

/// Parameters of the streaming counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountConfig {
	/// Number of corpus lines read per chunk.
	pub chunk_size: usize,
	/// N-gram bounds used while counting.
	pub extract: ExtractConfig,
	/// Maximum number of distinct keys held in memory before an overflow flush.
	pub table_budget: usize,
	/// Maximum number of n-grams materialised for a single chunk.
	pub chunk_ngram_budget: usize,
}

impl Default for CountConfig {
	fn default() -> Self {
		Self {
			chunk_size: 500_000,
			extract: ExtractConfig { min_size: 1, ..ExtractConfig::default() },
			table_budget: 5_000_000,
			chunk_ngram_budget: 20_000_000,
		}
	}
}

impl CountConfig {
	/// # Errors
	/// Returns `Error::Config` on a zero chunk size or budget, or invalid bounds.
	pub fn validate(&self) -> Result<()> {
		if self.chunk_size == 0 {
			return Err(Error::Config("chunk_size must be >= 1".to_owned()));
		}
		if self.table_budget == 0 {
			return Err(Error::Config("table_budget must be >= 1".to_owned()));
		}
		if self.chunk_ngram_budget == 0 {
			return Err(Error::Config("chunk_ngram_budget must be >= 1".to_owned()));
		}
		self.extract.validate()
	}
}

/// Parameters of the persistent count store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
	/// Rows written per committed transaction.
	pub commit_interval: usize,
	/// Rows per page when streaming the table in descending order.
	pub page_size: usize,
}

impl Default for StoreConfig {
	fn default() -> Self {
		Self { commit_interval: 100_000, page_size: 10_000 }
	}
}

impl StoreConfig {
	/// # Errors
	/// Returns `Error::Config` if either value is zero.
	pub fn validate(&self) -> Result<()> {
		if self.commit_interval == 0 {
			return Err(Error::Config("commit_interval must be >= 1".to_owned()));
		}
		if self.page_size == 0 {
			return Err(Error::Config("page_size must be >= 1".to_owned()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		assert!(ExtractConfig::default().validate().is_ok());
		assert!(CountConfig::default().validate().is_ok());
		assert!(StoreConfig::default().validate().is_ok());
		assert_eq!(CountConfig::default().extract.min_size, 1);
	}

	#[test]
	fn rejects_inverted_bounds() {
		let config = ExtractConfig { min_size: 3, max_size: Some(2), max_word_length: 10 };
		assert!(matches!(config.validate(), Err(Error::Config(_))));
	}

	#[test]
	fn rejects_zero_sizes() {
		let config = ExtractConfig { min_size: 0, ..ExtractConfig::default() };
		assert!(config.validate().is_err());

		let config = CountConfig { table_budget: 0, ..CountConfig::default() };
		assert!(config.validate().is_err());

		let config = StoreConfig { commit_interval: 0, page_size: 1 };
		assert!(config.validate().is_err());
	}
}
