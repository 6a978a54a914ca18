use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use crate::error::{Error, Result};

/// Opens a corpus file as a lazy sequence of lines.
///
/// - Nothing is read until the lines are consumed
/// - Splits on `\n` / `\r\n`
///
/// # Errors
/// Returns `Error::Corpus` naming the file if it cannot be opened.
pub fn open_corpus<P: AsRef<Path>>(filename: P) -> Result<Lines<BufReader<File>>> {
	let path = filename.as_ref();
	let file = File::open(path).map_err(|source| Error::Corpus { path: path.to_path_buf(), source })?;
	Ok(BufReader::new(file).lines())
}

/// Reads a whole word list, one word per line.
///
/// Surrounding whitespace is trimmed and blank lines are dropped.
///
/// # Errors
/// Returns `Error::Corpus` naming the file if it cannot be read.
pub fn read_words<P: AsRef<Path>>(filename: P) -> Result<Vec<String>> {
	let path = filename.as_ref();
	let mut words = Vec::new();
	for line in open_corpus(path)? {
		let line = line.map_err(|source| Error::Corpus { path: path.to_path_buf(), source })?;
		let word = line.trim();
		if !word.is_empty() {
			words.push(word.to_owned());
		}
	}
	Ok(words)
}

/// Pulls up to `size` lines out of `lines`.
///
/// Returns an empty chunk once the source is exhausted.
pub fn read_chunk<I, E>(lines: &mut I, size: usize) -> std::result::Result<Vec<String>, E>
where
	I: Iterator<Item = std::result::Result<String, E>>,
{
	lines.by_ref().take(size).collect()
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/passwords.txt` + `"ngram"` → `data/passwords.ngram`
pub fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./models/rockyou.model"` → `"rockyou"`
/// - `"rockyou.model"` → `"rockyou"`
pub fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let path = entry.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn replaces_extension() {
		let out = build_output_path("data/passwords.txt", "ngram").unwrap();
		assert_eq!(out, PathBuf::from("data/passwords.ngram"));
		assert_eq!(get_filename("models/rockyou.model").unwrap(), "rockyou");
	}

	#[test]
	fn reads_in_chunks() {
		let mut lines = ["a", "b", "c"].into_iter().map(|s| Ok::<_, ()>(s.to_owned()));
		assert_eq!(read_chunk(&mut lines, 2), Ok(vec!["a".to_owned(), "b".to_owned()]));
		assert_eq!(read_chunk(&mut lines, 2), Ok(vec!["c".to_owned()]));
		assert_eq!(read_chunk(&mut lines, 2), Ok(Vec::new()));
	}

	#[test]
	fn lists_only_matching_files() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.model"), b"").unwrap();
		fs::write(dir.path().join("a.model"), b"").unwrap();
		fs::write(dir.path().join("notes.txt"), b"").unwrap();
		assert_eq!(list_files(dir.path(), "model").unwrap(), vec!["a.model", "b.model"]);
	}

	#[test]
	fn reads_trimmed_word_lists() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("words.txt");
		fs::write(&path, " alpha\r\n\n\tbeta gamma \n   \n").unwrap();
		assert_eq!(read_words(&path).unwrap(), vec!["alpha", "beta gamma"]);
		assert!(matches!(read_words(dir.path().join("nope")), Err(Error::Corpus { .. })));
	}

	#[test]
	fn missing_corpus_names_the_file() {
		match open_corpus("does/not/exist.txt") {
			Err(Error::Corpus { path, .. }) => assert_eq!(path, PathBuf::from("does/not/exist.txt")),
			Err(other) => panic!("unexpected error: {other}"),
			Ok(_) => panic!("expected an error"),
		}
	}
}
