use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines, Write};
use std::path::Path;

use log::debug;

use super::CountStore;
use crate::error::{Error, Result};

/// Separator used by the n-gram export files unless told otherwise.
pub const DEFAULT_SEPARATOR: char = ',';

/// Writes the store as `ngram<SEP>count` lines, highest counts first.
///
/// The table is paged through `page_size` rows at a time, so the export never
/// holds more than one page in memory. Returns the number of lines written.
pub fn write_export<S, W>(store: &S, writer: W, separator: char, page_size: usize) -> Result<u64>
where
	S: CountStore + ?Sized,
	W: Write,
{
	let mut writer = io::BufWriter::new(writer);
	let mut written = 0u64;
	store.for_each_page_descending(page_size, &mut |page: Vec<(String, u64)>| {
		for (ngram, count) in &page {
			writeln!(writer, "{ngram}{separator}{count}")?;
		}
		written += page.len() as u64;
		debug!("Exported {written} n-grams");
		Ok(())
	})?;
	writer.flush()?;
	Ok(written)
}

/// Lazy reader over an `ngram<SEP>count` file.
///
/// Yields one `(ngram, count)` pair per non-empty line. The count is read after
/// the last separator, so n-grams containing the separator survive a round
/// trip.
pub struct ExportReader<R> {
	lines: Lines<R>,
	separator: char,
	line: usize,
}

impl ExportReader<BufReader<File>> {
	/// Opens an export file.
	pub fn open<P: AsRef<Path>>(path: P, separator: char) -> Result<Self> {
		let file = File::open(path)?;
		Ok(Self::new(BufReader::new(file), separator))
	}
}

impl<R: BufRead> ExportReader<R> {
	pub fn new(reader: R, separator: char) -> Self {
		Self { lines: reader.lines(), separator, line: 0 }
	}
}

impl<R: BufRead> Iterator for ExportReader<R> {
	type Item = Result<(String, u64)>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			let line = match self.lines.next()? {
				Ok(line) => line,
				Err(e) => return Some(Err(e.into())),
			};
			self.line += 1;
			if line.is_empty() {
				continue;
			}
			return Some(
				parse_line(&line, self.separator)
					.map_err(|reason| Error::ExportFormat { line: self.line, reason }),
			);
		}
	}
}

/// Parses a single `ngram<SEP>count` line.
pub fn parse_line(line: &str, separator: char) -> std::result::Result<(String, u64), String> {
	let (ngram, count) = line
		.rsplit_once(separator)
		.ok_or_else(|| format!("missing '{separator}' separator"))?;
	if ngram.is_empty() {
		return Err("empty n-gram".to_owned());
	}
	let count = count
		.trim()
		.parse::<u64>()
		.map_err(|e| format!("invalid count '{count}': {e}"))?;
	Ok((ngram.to_owned(), count))
}
