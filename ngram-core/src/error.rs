//! Error types for the n-gram engine.
//!
//! Memory pressure is deliberately absent from this enum: running out of
//! budget while extracting or counting is reported as
//! [`Outcome::ResourceExhausted`](crate::ngram::Outcome) and recovered by the
//! counter itself. Everything here aborts the current operation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all operations in the crate.
#[derive(Debug, Error)]
pub enum Error {
	/// Malformed or empty input (word list, path, argument)
	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// Invalid parameter combination
	#[error("configuration error: {0}")]
	Config(String),

	/// The corpus could not be read
	#[error("failed to read corpus '{}': {source}", path.display())]
	Corpus {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	/// Counting a corpus file failed part way through
	#[error("failed to count '{}': {source}", path.display())]
	Counting {
		path: PathBuf,
		#[source]
		source: Box<Error>,
	},

	/// The persistent count store failed (unreachable, write failure mid-batch)
	#[error("storage failure: {0}")]
	Storage(#[from] rusqlite::Error),

	/// A count does not fit the store's signed 64-bit integers
	#[error("count {0} exceeds the store's integer range")]
	CountRange(u64),

	/// Malformed `ngram<SEP>count` line in an export file
	#[error("invalid export line {line}: {reason}")]
	ExportFormat { line: usize, reason: String },

	/// Model (de)serialization failure
	#[error("model encoding error: {0}")]
	Model(#[from] postcard::Error),

	/// The probability matrix failed validation
	#[error("invalid probability matrix: {0}")]
	Matrix(String),

	/// File I/O error
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	/// Memory ran out even with an empty in-memory table
	#[error("memory exhausted: {0}")]
	Exhausted(String),
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
