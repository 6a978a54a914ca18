//! N-gram extraction and streaming frequency counting.
//!
//! - `extractor`: cuts a word into all substrings within size bounds
//! - `table`: the in-memory, budgeted frequency table
//! - `counter`: chunked corpus counting with overflow to a `CountStore`

use std::fmt;

/// Lazy n-gram extraction from a single word.
pub mod extractor;

/// Memory-budgeted in-memory frequency table.
pub mod table;

/// Streaming counter with overflow to persistent storage.
pub mod counter;

/// Result of an extraction step.
///
/// Skipping and running out of memory are expected events during a run and
/// are handled by the caller, so they are kept apart from [`crate::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
	Ok(T),
	Skipped(SkipReason),
	ResourceExhausted(Exhaustion),
}

/// Why a word (or a chunk) produced no n-grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	/// Nothing left after trimming
	Empty,
	/// Longer than the configured maximum word length (in characters)
	TooLong { length: usize, max: usize },
}

/// Which limit was hit when memory ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
	/// The configured budget would be exceeded
	Budget { requested: usize, budget: usize },
	/// The allocator refused to reserve the space
	Allocation { requested: usize },
}

impl fmt::Display for SkipReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SkipReason::Empty => write!(f, "empty word"),
			SkipReason::TooLong { length, max } => {
				write!(f, "word of {length} characters exceeds maximum of {max}")
			}
		}
	}
}

impl fmt::Display for Exhaustion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Exhaustion::Budget { requested, budget } => {
				write!(f, "{requested} entries requested, budget is {budget}")
			}
			Exhaustion::Allocation { requested } => {
				write!(f, "allocation of {requested} entries failed")
			}
		}
	}
}
