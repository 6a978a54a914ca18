//! How familiar a word looks to a counted corpus, and how close two word
//! lists are to each other.

use std::collections::BTreeSet;

use log::debug;

use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::model::matrix::CharFrequencies;
use crate::ngram::Outcome;
use crate::ngram::extractor::extract;
use crate::store::CountStore;

/// Share of a word's n-grams that the store has already seen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
	/// N-grams extracted from the word, repeats included.
	pub ngrams: usize,
	/// Of those, the ones with a non-zero stored count.
	pub matched: usize,
	/// `matched / ngrams`, 0.0 when the word has no n-grams.
	pub ratio: f64,
}

/// Compares `word` against the counts held in `store`.
///
/// # Errors
/// - `Error::InvalidInput` for an empty or over-long word
/// - `Error::Exhausted` if the extraction runs out of memory
/// - any store error
pub fn similarity<S: CountStore + ?Sized>(word: &str, store: &S, config: &ExtractConfig) -> Result<Similarity> {
	let ngrams: Vec<&str> = match extract(word, config) {
		Outcome::Ok(ngrams) => ngrams.collect(),
		Outcome::Skipped(reason) => return Err(Error::InvalidInput(format!("cannot compare '{word}': {reason}"))),
		Outcome::ResourceExhausted(reason) => return Err(Error::Exhausted(reason.to_string())),
	};
	if ngrams.is_empty() {
		return Ok(Similarity { ngrams: 0, matched: 0, ratio: 0.0 });
	}

	let distinct: Vec<&str> = ngrams.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
	let stored = store.fetch_counts(&distinct)?;
	let matched = ngrams.iter().filter(|ngram| stored.get(**ngram).is_some_and(|count| *count > 0)).count();

	debug!("'{word}': {matched}/{} n-grams known", ngrams.len());
	Ok(Similarity { ngrams: ngrams.len(), matched, ratio: matched as f64 / ngrams.len() as f64 })
}

/// Side-by-side view of a generated word list and a reference list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListComparison {
	pub generated_chars: CharFrequencies,
	pub reference_chars: CharFrequencies,
	/// Word-level edit distance: whole words are inserted, deleted or substituted.
	pub distance: usize,
	/// `1 - distance / longest list`, 1.0 for two empty lists.
	pub ratio: f64,
}

/// Occurrences of every character across `words`.
pub fn char_counts<I, T>(words: I) -> CharFrequencies
where
	I: IntoIterator<Item = T>,
	T: AsRef<str>,
{
	let mut counts = CharFrequencies::default();
	for word in words {
		for ch in word.as_ref().chars() {
			counts.add(ch, 1);
		}
	}
	counts
}

/// Edit distance between two word lists, treating each word as one symbol,
/// with its similarity ratio in `[0, 1]`.
pub fn sequence_similarity<T: AsRef<str>>(generated: &[T], reference: &[T]) -> (usize, f64) {
	let generated: Vec<&str> = generated.iter().map(AsRef::as_ref).collect();
	let reference: Vec<&str> = reference.iter().map(AsRef::as_ref).collect();

	let distance = strsim::generic_levenshtein(&generated, &reference);
	let longest = generated.len().max(reference.len());
	let ratio = if longest == 0 { 1.0 } else { 1.0 - distance as f64 / longest as f64 };
	(distance, ratio)
}

/// Compares a generated word list with a reference one.
pub fn compare_lists<T: AsRef<str>>(generated: &[T], reference: &[T]) -> ListComparison {
	let (distance, ratio) = sequence_similarity(generated, reference);
	debug!("word lists of {} and {} entries: distance {distance}", generated.len(), reference.len());
	ListComparison {
		generated_chars: char_counts(generated),
		reference_chars: char_counts(reference),
		distance,
		ratio,
	}
}
