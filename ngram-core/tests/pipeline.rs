//! End-to-end runs: corpus file -> count store -> export -> model file ->
//! generation.

use std::fs;

use ngram_core::classifier::{KnownWords, generate_filtered};
use ngram_core::config::{CountConfig, StoreConfig};
use ngram_core::model::generation_input::GenerationInput;
use ngram_core::model::generator::Generator;
use ngram_core::model::markov_model::MarkovModel;
use ngram_core::ngram::counter::Counter;
use ngram_core::store::export::{ExportReader, write_export};
use ngram_core::store::{CountStore, SqliteStore};
use rand::SeedableRng;
use rand::rngs::StdRng;

const CORPUS: &str = "ab\r\nba\n\nab\n";

/// Count a small corpus with a table that overflows on almost every key.
#[test]
fn test_counts_survive_overflow_and_reopen() {
	let dir = tempfile::tempdir().unwrap();
	let corpus = dir.path().join("corpus.txt");
	let db = dir.path().join("counts.db");
	fs::write(&corpus, CORPUS).unwrap();

	let config = CountConfig { table_budget: 2, chunk_size: 2, ..CountConfig::default() };
	{
		let mut store = SqliteStore::open(&db, StoreConfig::default()).unwrap();
		let report = Counter::new(&mut store, config).unwrap().count_file(&corpus).unwrap();
		assert_eq!(report.words, 3);
		assert_eq!(report.skipped_words, 1);
		assert_eq!(report.ngrams, 9);
		assert!(report.used_overflow);
	}

	let store = SqliteStore::open(&db, StoreConfig::default()).unwrap();
	assert_eq!(store.len().unwrap(), 4);
	assert_eq!(store.top_k(2).unwrap(), vec![("a".to_owned(), 3), ("b".to_owned(), 3)]);
	assert_eq!(store.count_of("ab").unwrap(), 2);
	assert_eq!(store.count_of("ba").unwrap(), 1);
}

/// Full pipeline down to seeded, filtered generation.
#[test]
fn test_full_pipeline() {
	let dir = tempfile::tempdir().unwrap();
	let corpus = dir.path().join("corpus.txt");
	let export = dir.path().join("corpus.ngram");
	let model_path = dir.path().join("corpus.model");
	fs::write(&corpus, CORPUS).unwrap();

	// Step 1: count
	let mut store = SqliteStore::in_memory(StoreConfig::default()).unwrap();
	Counter::new(&mut store, CountConfig::default()).unwrap().count_file(&corpus).unwrap();

	// Step 2: export and read back
	let written = write_export(&store, fs::File::create(&export).unwrap(), ',', 3).unwrap();
	assert_eq!(written, 4);
	let pairs: Vec<(String, u64)> = ExportReader::open(&export, ',').unwrap().map(Result::unwrap).collect();
	assert_eq!(pairs[0], ("a".to_owned(), 3));
	assert_eq!(pairs[3], ("ba".to_owned(), 1));

	// Step 3: both model sources agree, and the model file round-trips
	let model = MarkovModel::from_store(&store, 2).unwrap();
	assert_eq!(MarkovModel::from_export(&export, ',').unwrap(), model);
	model.save(&model_path).unwrap();
	let model = MarkovModel::load(&model_path).unwrap();
	assert_eq!(model.char_frequencies().get('a'), 3);
	assert_eq!(model.matrix().probability('a', 'b'), 1.0);
	assert_eq!(model.matrix().probability('b', 'a'), 1.0);

	// Step 4: generate
	let generator = Generator::new(&model);
	let mut input = GenerationInput::new(4);
	input.set_prune_threshold(Some(0.07)).unwrap();
	let words = generator.generate_many(&input, 20, &mut StdRng::seed_from_u64(9));
	assert!(words.iter().all(|word| word == "abab" || word == "baba"));
	assert_eq!(words, generator.generate_many(&input, 20, &mut StdRng::seed_from_u64(9)));

	// Step 5: reject what the corpus already contains
	let known = KnownWords::from_words(["ABAB"]);
	let accepted = generate_filtered(&generator, &input, &known, 3, 50, &mut StdRng::seed_from_u64(9));
	assert_eq!(accepted, vec!["baba"; 3]);
}
