use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::matrix::{CharFrequencies, MatrixBuilder, ProbabilityMatrix};
use crate::error::Result;
use crate::store::CountStore;
use crate::store::export::ExportReader;

/// A trained character model: start-character frequencies plus the
/// row-normalised transition matrix.
///
/// Counting and generation are separate runs: the model is written once with
/// [`MarkovModel::save`] and read back by the generator with
/// [`MarkovModel::load`]. The binary layout is `postcard` and only has to be
/// readable by this crate.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MarkovModel {
	char_frequencies: CharFrequencies,
	matrix: ProbabilityMatrix,
}

impl MarkovModel {
	pub fn new(char_frequencies: CharFrequencies, matrix: ProbabilityMatrix) -> Self {
		Self { char_frequencies, matrix }
	}

	/// Builds a model from `(ngram, count)` pairs.
	pub fn build<I, S>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (S, u64)>,
		S: AsRef<str>,
	{
		let mut builder = MatrixBuilder::new();
		builder.extend(pairs);
		Self::from_builder(builder)
	}

	/// Builds a model from the counts held in `store`, one page at a time.
	pub fn from_store<S: CountStore + ?Sized>(store: &S, page_size: usize) -> Result<Self> {
		info!("Generating Markov matrix from the count store...");
		let mut builder = MatrixBuilder::new();
		let mut pages = 0usize;
		store.for_each_page_descending(page_size, &mut |page: Vec<(String, u64)>| {
			builder.extend(page);
			debug!("Completed page {pages} (page size={page_size})");
			pages += 1;
			Ok(())
		})?;
		Ok(Self::from_builder(builder))
	}

	/// Builds a model from an `ngram<SEP>count` export file.
	pub fn from_export<P: AsRef<Path>>(path: P, separator: char) -> Result<Self> {
		info!("Generating Markov matrix from '{}'...", path.as_ref().display());
		let mut builder = MatrixBuilder::new();
		for pair in ExportReader::open(path, separator)? {
			let (ngram, count) = pair?;
			builder.add(&ngram, count);
		}
		Ok(Self::from_builder(builder))
	}

	fn from_builder(builder: MatrixBuilder) -> Self {
		let (char_frequencies, matrix) = builder.finish();
		info!(
			"Markov matrix ready: {} start characters, {} rows",
			char_frequencies.len(),
			matrix.len()
		);
		Self { char_frequencies, matrix }
	}

	pub fn char_frequencies(&self) -> &CharFrequencies {
		&self.char_frequencies
	}

	pub fn matrix(&self) -> &ProbabilityMatrix {
		&self.matrix
	}

	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		Ok(postcard::to_stdvec(self)?)
	}

	/// Decodes a model, re-validating the probability matrix.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		Ok(postcard::from_bytes(bytes)?)
	}

	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		std::fs::write(path, self.to_bytes()?)?;
		Ok(())
	}

	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = std::fs::read(path)?;
		Self::from_bytes(&bytes)
	}

	/// Human-readable dump: `(c=count)` pairs, a blank line, then one line per
	/// matrix row with `(to:probability)` entries.
	pub fn describe(&self) -> String {
		let mut out = String::new();
		let frequencies: Vec<String> =
			self.char_frequencies.iter().map(|(ch, count)| format!("({ch}={count})")).collect();
		out.push_str(&frequencies.join(" "));
		out.push_str("\n\n");

		for (from, row) in self.matrix.rows() {
			out.push(from);
			for (to, p) in row {
				out.push_str(&format!(" ({to}:{p:.4})"));
			}
			out.push('\n');
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::StoreConfig;
	use crate::store::SqliteStore;

	fn scenario() -> MarkovModel {
		MarkovModel::build([("a", 5), ("ab", 3), ("ba", 2), ("b", 1)])
	}

	#[test]
	fn survives_a_file_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("mm.model");
		let model = scenario();
		model.save(&path).unwrap();
		assert_eq!(MarkovModel::load(&path).unwrap(), model);
	}

	#[test]
	fn rejects_garbage() {
		assert!(MarkovModel::from_bytes(&[0xff, 0xff, 0xff]).is_err());
	}

	#[test]
	fn store_and_export_sources_agree() {
		let mut store = SqliteStore::in_memory(StoreConfig::default()).unwrap();
		let rows: Vec<(String, u64)> =
			[("a", 5), ("ab", 3), ("ba", 2), ("b", 1)].iter().map(|(k, v)| (k.to_string(), *v)).collect();
		store.upsert(&rows).unwrap();

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("counts.ngram");
		std::fs::write(&path, "a,5\nab,3\nba,2\nb,1\n").unwrap();

		let from_store = MarkovModel::from_store(&store, 1).unwrap();
		let from_export = MarkovModel::from_export(&path, ',').unwrap();
		assert_eq!(from_store, scenario());
		assert_eq!(from_export, scenario());
	}

	#[test]
	fn describes_frequencies_and_rows() {
		let text = scenario().describe();
		assert_eq!(text, "(a=5) (b=1)\n\na (b:1.0000)\nb (a:1.0000)\n");
	}

	#[test]
	fn describes_branching_rows_in_order() {
		let model = MarkovModel::build([("a", 4), ("ab", 1), ("ac", 3)]);
		assert_eq!(model.describe(), "(a=4)\n\na (b:0.2500) (c:0.7500)\n");
	}
}
