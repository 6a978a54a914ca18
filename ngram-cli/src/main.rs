use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use env_logger::Env;
use log::{debug, info};
use ngram_core::analysis::{compare_lists, similarity};
use ngram_core::classifier::{KnownWords, generate_filtered};
use ngram_core::config::{CountConfig, ExtractConfig, StoreConfig};
use ngram_core::io::{build_output_path, read_words};
use ngram_core::model::generation_input::GenerationInput;
use ngram_core::model::generator::Generator;
use ngram_core::model::markov_model::MarkovModel;
use ngram_core::ngram::counter::Counter;
use ngram_core::store::export::{DEFAULT_SEPARATOR, write_export};
use ngram_core::store::{CountStore, SqliteStore};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Parser, Debug)]
#[command(author, version, about = "Character n-gram counter and Markov string generator", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count the n-grams of a corpus (one word per line) and export them
    Count(CountArgs),
    /// Build a Markov model from counted n-grams
    Markov(MarkovArgs),
    /// Generate strings from a Markov model
    Generate(GenerateArgs),
    /// Show how many n-grams of a word are already counted
    Compare(CompareArgs),
    /// Compare a generated word list with a reference list
    CompareLists(CompareListsArgs),
}

#[derive(Args, Debug)]
struct CountArgs {
    /// Corpus file, one word per line
    #[arg(short = 'f', long, value_name = "PATH")]
    file: PathBuf,

    /// Count database (default: <corpus>.db)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Export file (default: <corpus>.ngram)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Add to the counts already in the database instead of refusing it
    #[arg(long)]
    append: bool,

    /// Print the N most frequent n-grams once done
    #[arg(short = 'p', long, value_name = "N")]
    top: Option<usize>,

    /// Corpus lines read per chunk
    #[arg(long, value_name = "LINES", default_value_t = CountConfig::default().chunk_size)]
    chunk_size: usize,

    /// Smallest n-gram length
    #[arg(long, value_name = "LEN", default_value_t = 1)]
    min_size: usize,

    /// Largest n-gram length (unbounded if unset)
    #[arg(long, value_name = "LEN")]
    max_size: Option<usize>,

    /// Longer words are skipped
    #[arg(long, value_name = "LEN", default_value_t = ExtractConfig::default().max_word_length)]
    max_word_length: usize,

    /// Distinct n-grams held in memory before flushing to the database
    #[arg(long, value_name = "KEYS", default_value_t = CountConfig::default().table_budget)]
    table_budget: usize,

    /// N-grams materialised per chunk before it is split
    #[arg(long, value_name = "NGRAMS", default_value_t = CountConfig::default().chunk_ngram_budget)]
    chunk_budget: usize,

    #[command(flatten)]
    store: StoreArgs,

    /// Separator between n-gram and count in the export
    #[arg(long, value_name = "CHAR", default_value_t = DEFAULT_SEPARATOR)]
    separator: char,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Rows written per database transaction
    #[arg(long, value_name = "ROWS", default_value_t = StoreConfig::default().commit_interval)]
    commit_interval: usize,

    /// Rows fetched per page when reading the database back
    #[arg(long, value_name = "ROWS", default_value_t = StoreConfig::default().page_size)]
    page_size: usize,
}

impl StoreArgs {
    fn config(&self) -> StoreConfig {
        StoreConfig { commit_interval: self.commit_interval, page_size: self.page_size }
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["db", "ngrams"])))]
struct MarkovArgs {
    /// Count database written by `count`
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Export file written by `count`
    #[arg(long, value_name = "PATH")]
    ngrams: Option<PathBuf>,

    /// Model file (default: <source>.model)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Separator used in the export file
    #[arg(long, value_name = "CHAR", default_value_t = DEFAULT_SEPARATOR)]
    separator: char,

    /// Print the character frequencies and the matrix
    #[arg(long)]
    describe: bool,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Model file written by `markov`
    #[arg(short, long, value_name = "PATH")]
    model: PathBuf,

    /// Length of each string
    #[arg(short, long, value_name = "LEN", default_value_t = 8)]
    length: usize,

    /// Number of strings
    #[arg(short = 'n', long, value_name = "COUNT", default_value_t = 100)]
    count: usize,

    /// Drop transitions below this probability (0 keeps everything)
    #[arg(long, value_name = "P", default_value_t = 0.07)]
    prune: f64,

    /// Probability of a uniform pick instead of a weighted one
    #[arg(long, value_name = "RATE", default_value_t = 0.0)]
    mutation: f64,

    /// Keep non-ascii characters
    #[arg(long)]
    allow_unicode: bool,

    /// Seed for reproducible output
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Reject strings found in this word list
    #[arg(long, value_name = "PATH")]
    reject_known: Option<PathBuf>,

    /// Generation rounds before giving up on rejected strings
    #[arg(long, value_name = "N", default_value_t = 100)]
    max_rounds: usize,
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Count database written by `count`
    #[arg(long, value_name = "PATH")]
    db: PathBuf,

    /// Word to compare
    #[arg(short, long)]
    word: String,

    /// Smallest n-gram length
    #[arg(long, value_name = "LEN", default_value_t = ExtractConfig::default().min_size)]
    min_size: usize,

    /// Largest n-gram length (unbounded if unset)
    #[arg(long, value_name = "LEN")]
    max_size: Option<usize>,
}

#[derive(Args, Debug)]
struct CompareListsArgs {
    /// Generated word list, one word per line
    #[arg(short, long, value_name = "PATH")]
    generated: PathBuf,

    /// Reference word list, one word per line
    #[arg(short, long, value_name = "PATH")]
    reference: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let start = Instant::now();
    run(cli.command)?;
    info!("Runtime: {:.2?}", start.elapsed());
    Ok(())
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Count(args) => run_count(args),
        Commands::Markov(args) => run_markov(args),
        Commands::Generate(args) => run_generate(args),
        Commands::Compare(args) => run_compare(args),
        Commands::CompareLists(args) => run_compare_lists(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn run_count(args: CountArgs) -> Result<()> {
    let config = CountConfig {
        chunk_size: args.chunk_size,
        extract: ExtractConfig {
            min_size: args.min_size,
            max_size: args.max_size,
            max_word_length: args.max_word_length,
        },
        table_budget: args.table_budget,
        chunk_ngram_budget: args.chunk_budget,
    };
    let store_config = args.store.config();
    store_config.validate()?;

    let db = match args.db {
        Some(db) => db,
        None => build_output_path(&args.file, "db")?,
    };
    let output = match args.output {
        Some(output) => output,
        None => build_output_path(&args.file, "ngram")?,
    };

    let mut store = SqliteStore::open(&db, store_config)
        .with_context(|| format!("failed to open count database {}", db.display()))?;
    if !args.append && !store.is_empty()? {
        bail!("count database {} already holds counts, pass --append or pick another --db", db.display());
    }

    info!("Counting n-grams of {}", args.file.display());
    let report = Counter::new(&mut store, config)?
        .count_file(&args.file)
        .with_context(|| format!("failed to count {}", args.file.display()))?;
    info!(
        "{} chunks, {} words, {} distinct n-grams",
        report.chunks,
        report.words,
        store.len()?
    );
    if report.used_overflow {
        info!("Counts overflowed to {} {} times", db.display(), report.overflow_flushes);
    }

    let file = File::create(&output).with_context(|| format!("failed to create {}", output.display()))?;
    let written = write_export(&store, file, args.separator, store_config.page_size)?;
    info!("Wrote {written} n-grams to {}", output.display());

    if let Some(n) = args.top {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        for (ngram, count) in store.top_k(n)? {
            writeln!(out, "{ngram}{}{count}", args.separator)?;
        }
        out.flush()?;
    }
    Ok(())
}

fn run_markov(args: MarkovArgs) -> Result<()> {
    let (model, source) = match (&args.db, &args.ngrams) {
        (Some(db), _) => {
            let store_config = args.store.config();
            store_config.validate()?;
            let store = SqliteStore::open(db, store_config)
                .with_context(|| format!("failed to open count database {}", db.display()))?;
            (MarkovModel::from_store(&store, store_config.page_size)?, db)
        }
        (None, Some(ngrams)) => (MarkovModel::from_export(ngrams, args.separator)?, ngrams),
        (None, None) => bail!("either --db or --ngrams is required"),
    };

    let output = match args.output {
        Some(output) => output,
        None => build_output_path(source, "model")?,
    };
    model.save(&output).with_context(|| format!("failed to write model {}", output.display()))?;
    info!("Saved model to {}", output.display());

    if args.describe {
        print!("{}", model.describe());
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let model = load_model(&args.model)?;

    let mut input = GenerationInput::new(args.length);
    input.ascii_only = !args.allow_unicode;
    input.set_prune_threshold((args.prune > 0.0).then_some(args.prune))?;
    input.set_mutation_rate(args.mutation)?;

    let seed = args.seed.unwrap_or_else(rand::random);
    debug!("seed: {seed}");
    let mut rng = StdRng::seed_from_u64(seed);

    let generator = Generator::new(&model);
    let words = match &args.reject_known {
        Some(path) => {
            let known = KnownWords::from_file(path)?;
            generate_filtered(&generator, &input, &known, args.count, args.max_rounds, &mut rng)
        }
        None => generator.generate_many(&input, args.count, &mut rng),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for word in &words {
        writeln!(out, "{word}")?;
    }
    out.flush()?;
    Ok(())
}

fn run_compare(args: CompareArgs) -> Result<()> {
    let config = ExtractConfig { min_size: args.min_size, max_size: args.max_size, ..ExtractConfig::default() };
    config.validate()?;

    let store = SqliteStore::open(&args.db, StoreConfig::default())
        .with_context(|| format!("failed to open count database {}", args.db.display()))?;
    let result = similarity(&args.word, &store, &config)?;
    println!(
        "{}: {}/{} n-grams known ({:.2}%)",
        args.word,
        result.matched,
        result.ngrams,
        result.ratio * 100.0
    );
    Ok(())
}

fn run_compare_lists(args: CompareListsArgs) -> Result<()> {
    let generated = read_words(&args.generated)
        .with_context(|| format!("failed to read generated list {}", args.generated.display()))?;
    let reference = read_words(&args.reference)
        .with_context(|| format!("failed to read reference list {}", args.reference.display()))?;
    let comparison = compare_lists(&generated, &reference);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let lists = [
        ("generated", generated.len(), &comparison.generated_chars),
        ("reference", reference.len(), &comparison.reference_chars),
    ];
    for (label, words, chars) in lists {
        let counts: Vec<String> = chars.iter().map(|(ch, count)| format!("({ch}={count})")).collect();
        writeln!(out, "{label}: {words} words, {} chars: {}", chars.total(), counts.join(" "))?;
    }
    writeln!(out, "distance: {} words, similarity: {:.4}", comparison.distance, comparison.ratio)?;
    out.flush()?;
    Ok(())
}

fn load_model(path: &Path) -> Result<MarkovModel> {
    MarkovModel::load(path).with_context(|| format!("failed to load model {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("ngram").chain(args.iter().copied())).unwrap().command
    }

    #[test]
    fn count_errors_name_the_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("blank_corpus.txt");
        fs::write(&corpus, "\n\n").unwrap();

        let err = run(parse(&["count", "-f", corpus.to_str().unwrap()])).unwrap_err();
        assert!(format!("{err:#}").contains("blank_corpus.txt"), "{err:#}");
    }

    #[test]
    fn second_count_needs_append() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("words.txt");
        let db = dir.path().join("words.db");
        fs::write(&corpus, "ab\n").unwrap();
        let count = ["count", "-f", corpus.to_str().unwrap(), "--db", db.to_str().unwrap()];

        run(parse(&count)).unwrap();
        let err = run(parse(&count)).unwrap_err();
        assert!(err.to_string().contains("--append"), "{err}");

        let appended: Vec<&str> = count.iter().copied().chain(["--append"]).collect();
        run(parse(&appended)).unwrap();

        let store = SqliteStore::open(&db, StoreConfig::default()).unwrap();
        let counts = store.fetch_counts(&["a", "ab"]).unwrap();
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("ab"), Some(&2));
        assert_eq!(fs::read_to_string(dir.path().join("words.ngram")).unwrap().lines().count(), 3);
    }

    #[test]
    fn compare_lists_reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let generated = dir.path().join("generated.txt");
        let reference = dir.path().join("reference.txt");
        fs::write(&generated, "abc\nabd\n").unwrap();
        fs::write(&reference, " abc\n\nxyz\n").unwrap();

        let command = parse(&[
            "compare-lists",
            "--generated",
            generated.to_str().unwrap(),
            "--reference",
            reference.to_str().unwrap(),
        ]);
        assert!(matches!(command, Commands::CompareLists(_)));
        run(command).unwrap();

        let missing = dir.path().join("missing.txt");
        let command = parse(&["compare-lists", "-g", missing.to_str().unwrap(), "-r", reference.to_str().unwrap()]);
        let err = run(command).unwrap_err();
        assert!(format!("{err:#}").contains("missing.txt"), "{err:#}");
    }
}
