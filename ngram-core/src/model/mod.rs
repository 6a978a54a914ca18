//! Markov model construction and constrained generation.
//!
//! - `matrix`: character frequencies, transition counts and the
//!   row-normalised probability matrix
//! - `markov_model`: the persisted model and its sources (store, export file)
//! - `generation_input`: per-run generation parameters
//! - `generator`: weighted walks over the matrix

/// Frequency table to Markov matrix conversion.
pub mod matrix;

/// Serialisable model bundling start frequencies and the probability matrix.
///
/// Supports building from a count store or an export file, saving and loading.
pub mod markov_model;

/// Validated generation parameters (length, pruning, mutation, ascii filter).
pub mod generation_input;

/// String generation from a loaded model.
pub mod generator;
