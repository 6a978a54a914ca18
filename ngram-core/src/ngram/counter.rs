use std::path::Path;

use log::{debug, info, warn};

use super::extractor::{extract, ngram_count};
use super::table::FrequencyTable;
use super::{Exhaustion, Outcome, SkipReason};
use crate::config::CountConfig;
use crate::error::{Error, Result};
use crate::io;
use crate::store::CountStore;

/// Number of sublists an exhausted chunk is split into.
const SUBDIVISIONS: usize = 10;

/// Summary of a counting run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountReport {
	/// Chunks read from the corpus.
	pub chunks: usize,
	/// Non-empty lines read.
	pub words: usize,
	/// Blank or over-long lines left out.
	pub skipped_words: usize,
	/// N-gram occurrences counted.
	pub ngrams: u64,
	/// Flushes forced by memory exhaustion before the end of the corpus.
	pub overflow_flushes: usize,
	/// Whether any overflow flush happened.
	pub used_overflow: bool,
}

/// Streaming n-gram counter.
///
/// Reads the corpus `chunk_size` lines at a time and counts n-grams in a
/// budgeted in-memory table. When the table is full it merges its counts with
/// the store's, writes the totals back and starts again empty, so at most one
/// table's worth of counts is ever uncommitted. Whatever is left at the end of
/// the corpus is flushed too: after [`Counter::count`] the store holds the
/// complete frequency table.
///
/// The counter owns the whole run state; nothing is shared between runs.
pub struct Counter<'s, S: CountStore + ?Sized> {
	config: CountConfig,
	store: &'s mut S,
	table: FrequencyTable,
	report: CountReport,
}

impl<'s, S: CountStore + ?Sized> Counter<'s, S> {
	/// # Errors
	/// Returns `Error::Config` if `config` is invalid.
	pub fn new(store: &'s mut S, config: CountConfig) -> Result<Self> {
		config.validate()?;
		Ok(Self {
			config,
			store,
			table: FrequencyTable::new(config.table_budget),
			report: CountReport::default(),
		})
	}

	/// Counts the words of a corpus file, one word per line.
	///
	/// # Errors
	/// - Read failures are reported as `Error::Corpus` naming the file
	/// - An empty corpus is `Error::InvalidInput` naming the file
	/// - Store failures are `Error::Storage`, wrapped in `Error::Counting`
	///   together with the file name
	pub fn count_file<P: AsRef<Path>>(self, path: P) -> Result<CountReport> {
		let path = path.as_ref().to_path_buf();
		let lines = io::open_corpus(&path)?;
		let source_path = path.clone();
		let result = self.count(lines.map(move |line| {
			line.map_err(|source| Error::Corpus { path: source_path.clone(), source })
		}));

		result.map_err(|error| match error {
			Error::Corpus { .. } => error,
			Error::InvalidInput(reason) => Error::InvalidInput(format!("{}: {reason}", path.display())),
			other => Error::Counting { path, source: Box::new(other) },
		})
	}

	/// Counts an in-memory word list.
	pub fn count_words<I, T>(self, words: I) -> Result<CountReport>
	where
		I: IntoIterator<Item = T>,
		T: AsRef<str>,
	{
		self.count(words.into_iter().map(|word| Ok::<_, Error>(word.as_ref().to_owned())))
	}

	/// Counts a lazy sequence of corpus lines.
	///
	/// # Errors
	/// - `Error::InvalidInput` if the corpus holds no word at all
	/// - any error of the line source or of the store; counts committed by
	///   earlier flushes stay in the store
	pub fn count<I, E>(mut self, lines: I) -> Result<CountReport>
	where
		I: IntoIterator<Item = std::result::Result<String, E>>,
		E: Into<Error>,
	{
		let mut lines = lines.into_iter();
		loop {
			let chunk = io::read_chunk(&mut lines, self.config.chunk_size).map_err(Into::<Error>::into)?;
			if chunk.is_empty() {
				break;
			}

			let words = self.accept_words(chunk);
			debug!("iteration: {}\tchunk size: {}", self.report.chunks, words.len());
			self.report.chunks += 1;
			self.process_chunk(&words)?;
		}

		if self.report.words == 0 {
			return Err(Error::InvalidInput("corpus contains no words".to_owned()));
		}

		if !self.table.is_empty() {
			debug!("Draining {} remaining n-grams", self.table.len());
			self.flush()?;
		}

		info!(
			"Counted {} n-grams from {} words ({} skipped, {} overflow flushes)",
			self.report.ngrams, self.report.words, self.report.skipped_words, self.report.overflow_flushes
		);
		Ok(self.report)
	}

	/// Trims surrounding whitespace and drops the lines that cannot be extracted.
	fn accept_words(&mut self, chunk: Vec<String>) -> Vec<String> {
		let mut words = Vec::with_capacity(chunk.len());
		for line in chunk {
			let word = line.trim();
			if word.is_empty() {
				self.report.skipped_words += 1;
				continue;
			}
			self.report.words += 1;

			if let Outcome::Skipped(reason) = extract(word, &self.config.extract) {
				warn!("Skipping word: {reason}");
				self.report.skipped_words += 1;
			} else {
				words.push(word.to_owned());
			}
		}
		words
	}

	/// Extracts and counts one chunk, subdividing it if its n-grams do not fit.
	fn process_chunk(&mut self, words: &[String]) -> Result<()> {
		match extract_chunk(words, &self.config) {
			Outcome::Ok(ngrams) => self.count_ngrams(ngrams),
			Outcome::Skipped(_) => Ok(()),
			Outcome::ResourceExhausted(reason) if words.len() > 1 => {
				warn!("Chunk of {} words ran out of memory ({reason}), dialing back chunk size", words.len());
				let sublist_len = words.len().div_ceil(SUBDIVISIONS);
				for sublist in words.chunks(sublist_len) {
					debug!("sublist length: {}", sublist.len());
					self.process_chunk(sublist)?;
				}
				info!("Recovered from memory exhaustion, reverting to normal chunk size");
				Ok(())
			}
			Outcome::ResourceExhausted(_) => {
				// A single word: stream its n-grams straight into the table.
				let word = &words[0];
				match extract(word, &self.config.extract) {
					Outcome::Ok(ngrams) => self.count_ngrams(ngrams),
					_ => Ok(()),
				}
			}
		}
	}

	fn count_ngrams<'w, I>(&mut self, ngrams: I) -> Result<()>
	where
		I: IntoIterator<Item = &'w str>,
	{
		for ngram in ngrams {
			while let Err(reason) = self.table.try_increment(ngram) {
				if self.table.is_empty() {
					return Err(Error::Exhausted(reason.to_string()));
				}
				info!("In-memory table exhausted ({reason}), flushing {} n-grams to the store", self.table.len());
				self.flush()?;
				self.report.overflow_flushes += 1;
				self.report.used_overflow = true;
			}
			self.report.ngrams += 1;
		}
		Ok(())
	}

	/// Merges the in-memory counts into the store and empties the table.
	fn flush(&mut self) -> Result<()> {
		let stored = {
			let keys: Vec<&str> = self.table.keys().collect();
			self.store.fetch_counts(&keys)?
		};

		let merged: Vec<(String, u64)> = self
			.table
			.drain()
			.map(|(ngram, count)| {
				let total = count + stored.get(&ngram).copied().unwrap_or(0);
				(ngram, total)
			})
			.collect();

		self.store.upsert(&merged)?;
		debug!("Flushed {} n-grams", merged.len());
		Ok(())
	}
}

/// Materialises the n-grams of a chunk, if they fit the chunk budget.
fn extract_chunk<'w>(words: &'w [String], config: &CountConfig) -> Outcome<Vec<&'w str>> {
	if words.is_empty() {
		return Outcome::Skipped(SkipReason::Empty);
	}

	let extract_config = &config.extract;
	let requested: usize = words
		.iter()
		.map(|word| ngram_count(word.chars().count(), extract_config.min_size, extract_config.max_size))
		.sum();
	if requested > config.chunk_ngram_budget {
		return Outcome::ResourceExhausted(Exhaustion::Budget { requested, budget: config.chunk_ngram_budget });
	}

	let mut ngrams = Vec::new();
	if ngrams.try_reserve_exact(requested).is_err() {
		return Outcome::ResourceExhausted(Exhaustion::Allocation { requested });
	}
	for word in words {
		if let Outcome::Ok(word_ngrams) = extract(word, extract_config) {
			ngrams.extend(word_ngrams);
		}
	}
	Outcome::Ok(ngrams)
}
