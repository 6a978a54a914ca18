use super::{Outcome, SkipReason};
use crate::config::ExtractConfig;

/// Lazy sequence of the n-grams of a word.
///
/// For each start position `s` (in characters), yields `word[s..e]` for every
/// end position `e` from `s + min_size` up to the end of the word, moving to
/// the next start as soon as `e - s` would exceed `max_size`.
///
/// # Notes
/// - Positions are character positions, not bytes (UTF-8 safe).
/// - No deduplication: a repeated substring is yielded once per position.
/// - Cloning the iterator restarts nothing; call [`ngrams`] again to
///   re-extract, which always yields the same sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NGrams<'a> {
	word: &'a str,
	/// Byte offset of every character boundary, `chars + 1` entries.
	bounds: Vec<usize>,
	min_size: usize,
	max_size: Option<usize>,
	start: usize,
	end: usize,
}

/// Returns every n-gram of `word` within `[min_size, max_size]`, regardless of
/// the word length.
pub fn ngrams(word: &str, min_size: usize, max_size: Option<usize>) -> NGrams<'_> {
	let bounds: Vec<usize> = word
		.char_indices()
		.map(|(offset, _)| offset)
		.chain(std::iter::once(word.len()))
		.collect();

	NGrams { word, bounds, min_size, max_size, start: 0, end: min_size }
}

/// Extracts the n-grams of a single word under `config`.
///
/// Returns `Outcome::Skipped` for an empty word or a word longer than
/// `config.max_word_length`: the number of n-grams grows quadratically with
/// the word length, so such words are left out instead of failing the run.
pub fn extract<'a>(word: &'a str, config: &ExtractConfig) -> Outcome<NGrams<'a>> {
	let length = word.chars().count();
	if length == 0 {
		return Outcome::Skipped(SkipReason::Empty);
	}
	if length > config.max_word_length {
		return Outcome::Skipped(SkipReason::TooLong { length, max: config.max_word_length });
	}
	Outcome::Ok(ngrams(word, config.min_size, config.max_size))
}

/// Number of n-grams a word of `length` characters produces.
///
/// Used to size a chunk before materialising it.
pub fn ngram_count(length: usize, min_size: usize, max_size: Option<usize>) -> usize {
	(0..length)
		.map(|start| {
			let first = start.saturating_add(min_size);
			let last = match max_size {
				Some(max_size) => length.min(start.saturating_add(max_size)),
				None => length,
			};
			if first > last { 0 } else { last - first + 1 }
		})
		.sum()
}

impl<'a> Iterator for NGrams<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		let length = self.bounds.len() - 1;
		while self.start < length {
			let within_max = self.max_size.is_none_or(|max| self.end - self.start <= max);
			if self.end <= length && within_max {
				let ngram = &self.word[self.bounds[self.start]..self.bounds[self.end]];
				self.end += 1;
				return Some(ngram);
			}
			self.start += 1;
			self.end = self.start.saturating_add(self.min_size);
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Straight transcription of the position rule, for comparison.
	fn reference(word: &str, min: usize, max: Option<usize>) -> Vec<String> {
		let chars: Vec<char> = word.chars().collect();
		let mut out = Vec::new();
		for s in 0..chars.len() {
			for e in (s + min)..=chars.len() {
				if max.is_some_and(|max| e - s > max) {
					break;
				}
				out.push(chars[s..e].iter().collect());
			}
		}
		out
	}

	#[test]
	fn extracts_test_with_min_two() {
		let got: Vec<&str> = ngrams("test", 2, None).collect();
		assert_eq!(got, vec!["te", "tes", "test", "es", "est", "st"]);
	}

	#[test]
	fn keeps_repeated_ngrams() {
		let got: Vec<&str> = ngrams("aaa", 1, Some(1)).collect();
		assert_eq!(got, vec!["a", "a", "a"]);
	}

	#[test]
	fn matches_reference_for_several_bounds() {
		for word in ["password", "abc", "été1", "a", "x y"] {
			for (min, max) in [(1, None), (2, None), (2, Some(2)), (1, Some(3)), (3, Some(5))] {
				let got: Vec<String> = ngrams(word, min, max).map(str::to_owned).collect();
				assert_eq!(got, reference(word, min, max), "word={word} min={min} max={max:?}");
				assert_eq!(got.len(), ngram_count(word.chars().count(), min, max));
			}
		}
	}

	#[test]
	fn min_larger_than_word_is_empty() {
		assert_eq!(ngrams("ab", 3, None).count(), 0);
		assert_eq!(ngram_count(2, 3, None), 0);
	}

	#[test]
	fn extreme_bounds_do_not_overflow() {
		assert_eq!(ngrams("ab", usize::MAX, None).count(), 0);
		assert_eq!(ngrams("abc", usize::MAX, Some(usize::MAX)).count(), 0);
		assert_eq!(ngram_count(2, usize::MAX, None), 0);
		assert_eq!(ngram_count(3, 1, Some(usize::MAX)), 6);
		assert_eq!(ngrams("abc", 1, Some(usize::MAX)).count(), 6);
	}

	#[test]
	fn handles_multibyte_characters() {
		let got: Vec<&str> = ngrams("日本語", 2, Some(2)).collect();
		assert_eq!(got, vec!["日本", "本語"]);
	}

	#[test]
	fn extraction_is_restartable() {
		let first: Vec<&str> = ngrams("hello", 2, None).collect();
		let second: Vec<&str> = ngrams("hello", 2, None).collect();
		assert_eq!(first, second);
	}

	#[test]
	fn skips_long_and_empty_words() {
		let config = ExtractConfig { min_size: 1, max_size: None, max_word_length: 4 };
		assert_eq!(
			extract("abcde", &config),
			Outcome::Skipped(SkipReason::TooLong { length: 5, max: 4 })
		);
		assert_eq!(extract("", &config), Outcome::Skipped(SkipReason::Empty));
		match extract("abcd", &config) {
			Outcome::Ok(ngrams) => assert_eq!(ngrams.count(), 10),
			other => panic!("unexpected outcome: {other:?}"),
		}
	}
}
