//! Streaming character n-gram counting and Markov string generation.
//!
//! This crate provides the full pipeline:
//! - N-gram extraction and memory-budgeted counting with overflow to a
//!   persistent store
//! - Export of the counts as `ngram<SEP>count` files
//! - Markov matrix construction from the counts
//! - Constrained generation (length, pruning, mutation, ascii filter)
//! - Post-generation classification and corpus similarity

/// Error type and `Result` alias.
pub mod error;

/// Run parameters (extraction bounds, chunking, budgets, store batching).
pub mod config;

/// Corpus reading and path helpers.
pub mod io;

/// N-gram extraction and streaming counting.
pub mod ngram;

/// Persistent count storage and the export codec.
pub mod store;

/// Markov model construction and generation.
pub mod model;

/// Accept/reject filtering of generated strings.
pub mod classifier;

/// Word similarity against counted n-grams.
pub mod analysis;

pub use error::{Error, Result};
