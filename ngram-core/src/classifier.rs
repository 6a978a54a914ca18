//! Post-generation filtering of candidate strings.
//!
//! A [`Classifier`] decides, for a batch of generated candidates, which ones
//! are kept. [`generate_filtered`] regenerates until enough candidates pass.

use std::collections::HashSet;
use std::path::Path;

use log::{debug, info};
use rand::Rng;

use crate::error::Result;
use crate::io;
use crate::model::generation_input::GenerationInput;
use crate::model::generator::Generator;

/// Accept/reject decision over a batch of candidates.
pub trait Classifier {
	/// Returns one flag per candidate, `true` when the candidate is accepted.
	fn classify(&self, candidates: &[String]) -> Vec<bool>;
}

impl<F> Classifier for F
where
	F: Fn(&str) -> bool,
{
	fn classify(&self, candidates: &[String]) -> Vec<bool> {
		candidates.iter().map(|candidate| self(candidate)).collect()
	}
}

/// Rejects candidates that already appear in a reference word list.
///
/// Comparison is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct KnownWords {
	words: HashSet<String>,
}

impl KnownWords {
	pub fn from_words<I, T>(words: I) -> Self
	where
		I: IntoIterator<Item = T>,
		T: AsRef<str>,
	{
		let words = words
			.into_iter()
			.map(|word| word.as_ref().trim().to_lowercase())
			.filter(|word| !word.is_empty())
			.collect();
		Self { words }
	}

	/// Loads a word list, one word per line.
	///
	/// # Errors
	/// Returns `Error::Corpus` if the file cannot be read.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let known = Self::from_words(io::read_words(path)?);
		info!("Loaded {} known words from '{}'", known.len(), path.display());
		Ok(known)
	}

	pub fn contains(&self, word: &str) -> bool {
		self.words.contains(&word.to_lowercase())
	}

	pub fn len(&self) -> usize {
		self.words.len()
	}

	pub fn is_empty(&self) -> bool {
		self.words.is_empty()
	}
}

impl Classifier for KnownWords {
	fn classify(&self, candidates: &[String]) -> Vec<bool> {
		candidates.iter().map(|candidate| !self.contains(candidate)).collect()
	}
}

/// Generates until `wanted` candidates are accepted by `classifier`, or
/// `max_rounds` batches have been tried.
///
/// Each round generates only as many candidates as are still missing, so the
/// result never holds more than `wanted` strings. It may hold fewer when the
/// rounds run out.
pub fn generate_filtered<C, R>(
	generator: &Generator<'_>,
	input: &GenerationInput,
	classifier: &C,
	wanted: usize,
	max_rounds: usize,
	rng: &mut R,
) -> Vec<String>
where
	C: Classifier + ?Sized,
	R: Rng + ?Sized,
{
	let mut accepted = Vec::with_capacity(wanted);
	let mut round = 0;
	while accepted.len() < wanted && round < max_rounds {
		let batch = generator.generate_many(input, wanted - accepted.len(), rng);
		let verdicts = classifier.classify(&batch);
		let before = accepted.len();
		accepted.extend(
			batch.into_iter().zip(verdicts).filter_map(|(candidate, keep)| keep.then_some(candidate)),
		);
		round += 1;
		debug!("round {round}: accepted {} new candidates", accepted.len() - before);
	}

	if accepted.len() < wanted {
		info!("Stopped after {round} rounds with {}/{wanted} accepted candidates", accepted.len());
	}
	accepted
}
