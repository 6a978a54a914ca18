use crate::error::{Error, Result};

/// Parameters of a single generation.
///
/// # Responsibilities
/// - Track the requested length and the ascii-only filter
/// - Hold the validated prune threshold and mutation rate
///
/// # Invariants
/// - `prune_threshold`, when set, lies in `[0.0, 1.0]`
/// - `mutation_rate` lies in `[0.0, 1.0]`
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationInput {
	/// Number of characters to generate. Dead ends may produce fewer.
	pub length: usize,

	/// Drop candidates above code point 127.
	pub ascii_only: bool,

	/// Transitions below this probability are dropped before sampling.
	prune_threshold: Option<f64>,

	/// Probability of picking uniformly among the candidates instead of by weight.
	mutation_rate: f64,
}

impl GenerationInput {
	/// Creates an input for `length` characters: ascii only, no pruning, no mutation.
	pub fn new(length: usize) -> Self {
		Self { length, ascii_only: true, prune_threshold: None, mutation_rate: 0.0 }
	}

	pub fn prune_threshold(&self) -> Option<f64> {
		self.prune_threshold
	}

	pub fn mutation_rate(&self) -> f64 {
		self.mutation_rate
	}

	/// Whether candidate rows have to be filtered and renormalised.
	pub fn filters(&self) -> bool {
		self.ascii_only || self.prune_threshold.is_some()
	}

	/// Sets (or clears) the prune threshold.
	///
	/// # Errors
	/// Returns an error if the value is outside `[0.0, 1.0]`.
	pub fn set_prune_threshold(&mut self, threshold: Option<f64>) -> Result<()> {
		if let Some(threshold) = threshold {
			if !(0.0..=1.0).contains(&threshold) {
				return Err(Error::Config(format!("prune threshold must be between 0.0 and 1.0, got {threshold}")));
			}
		}
		self.prune_threshold = threshold;
		Ok(())
	}

	/// Sets the mutation rate.
	///
	/// # Errors
	/// Returns an error if the value is outside `[0.0, 1.0]`.
	pub fn set_mutation_rate(&mut self, mutation_rate: f64) -> Result<()> {
		if !(0.0..=1.0).contains(&mutation_rate) {
			return Err(Error::Config(format!("mutation rate must be between 0.0 and 1.0, got {mutation_rate}")));
		}
		self.mutation_rate = mutation_rate;
		Ok(())
	}
}
