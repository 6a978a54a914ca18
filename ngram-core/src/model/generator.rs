use rand::Rng;

use super::generation_input::GenerationInput;
use super::markov_model::MarkovModel;

/// Samples strings from a [`MarkovModel`].
///
/// # Behavior
/// - The first character is drawn from the character frequencies.
/// - Each following character is drawn from the current character's row,
///   after the optional ascii/prune filters.
/// - With probability `mutation_rate` the pick ignores the weights and is
///   uniform over the remaining candidates.
/// - A character with no remaining candidates ends the walk early: the
///   result is then shorter than requested.
///
/// All randomness comes from the caller's `rng`; with a seeded generator the
/// output is reproducible.
#[derive(Debug, Clone, Copy)]
pub struct Generator<'m> {
	model: &'m MarkovModel,
}

impl<'m> Generator<'m> {
	pub fn new(model: &'m MarkovModel) -> Self {
		Self { model }
	}

	/// Generates one string of at most `input.length` characters.
	pub fn generate<R: Rng + ?Sized>(&self, input: &GenerationInput, rng: &mut R) -> String {
		let mut word = String::new();
		if input.length == 0 {
			return word;
		}

		let Some(mut current) = self.start_char(rng) else {
			return word;
		};
		word.push(current);

		for _ in 1..input.length {
			match self.next_char(current, input, rng) {
				Some(next) => {
					word.push(next);
					current = next;
				}
				// Dead end: the row of `current` stays empty for the rest of the walk
				None => break,
			}
		}
		word
	}

	/// Generates `count` strings.
	pub fn generate_many<R: Rng + ?Sized>(&self, input: &GenerationInput, count: usize, rng: &mut R) -> Vec<String> {
		(0..count).map(|_| self.generate(input, rng)).collect()
	}

	/// Draws a start character, weighted by its frequency.
	///
	/// Returns `None` if the model has no character frequencies.
	fn start_char<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<char> {
		let frequencies = self.model.char_frequencies();
		let total = frequencies.total();
		if total == 0 {
			return None;
		}

		let mut r = rng.random_range(0..total);
		let mut fallback = None;
		for (ch, count) in frequencies.iter() {
			if r < count {
				return Some(ch);
			}
			r -= count;
			fallback = Some(ch);
		}
		fallback
	}

	/// Candidate next characters after `current` with their probabilities.
	///
	/// When filtering, entries above code point 127 (ascii only) and entries
	/// whose row probability is below the threshold are dropped first, then
	/// the survivors are renormalised once to sum to 1.
	pub fn candidates(&self, current: char, input: &GenerationInput) -> Vec<(char, f64)> {
		let Some(row) = self.model.matrix().row(current) else {
			return Vec::new();
		};

		let row = row.iter().map(|(ch, p)| (*ch, *p));
		if !input.filters() {
			return row.collect();
		}

		let kept: Vec<(char, f64)> = row
			.filter(|(ch, _)| !input.ascii_only || ch.is_ascii())
			.filter(|(_, p)| input.prune_threshold().is_none_or(|threshold| *p >= threshold))
			.collect();

		let total: f64 = kept.iter().map(|(_, p)| p).sum();
		if total <= 0.0 {
			return Vec::new();
		}
		kept.into_iter().map(|(ch, p)| (ch, p / total)).collect()
	}

	fn next_char<R: Rng + ?Sized>(&self, current: char, input: &GenerationInput, rng: &mut R) -> Option<char> {
		let candidates = self.candidates(current, input);
		if candidates.is_empty() {
			return None;
		}

		if input.mutation_rate() > 0.0 && rng.random_bool(input.mutation_rate()) {
			return Some(candidates[rng.random_range(0..candidates.len())].0);
		}

		let mut r: f64 = rng.random();
		for (ch, p) in &candidates {
			if r < *p {
				return Some(*ch);
			}
			r -= p;
		}
		// Rounding left a sliver of mass past the last candidate.
		candidates.last().map(|(ch, _)| *ch)
	}
}
