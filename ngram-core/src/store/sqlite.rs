use std::collections::HashMap;
use std::path::Path;

use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::CountStore;
use crate::config::StoreConfig;
use crate::error::{Error, Result};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS ngram_counts (
	ngram TEXT PRIMARY KEY NOT NULL,
	count INTEGER NOT NULL
);";

const SELECT_COUNT: &str = "SELECT count FROM ngram_counts WHERE ngram = ?1";

const UPSERT: &str = "INSERT INTO ngram_counts (ngram, count) VALUES (?1, ?2)
	ON CONFLICT(ngram) DO UPDATE SET count = excluded.count";

const SELECT_DESCENDING: &str = "SELECT ngram, SUM(count) AS total FROM ngram_counts
	GROUP BY ngram ORDER BY total DESC, ngram ASC";

/// Count store kept in a SQLite database.
///
/// Writes are split into transactions of `commit_interval` rows: a crash
/// loses at most the batch in flight, and no transaction grows unbounded.
pub struct SqliteStore {
	conn: Connection,
	config: StoreConfig,
}

impl SqliteStore {
	/// Opens (or creates) the database at `path`.
	///
	/// # Errors
	/// Returns `Error::Config` for an invalid `config`, `Error::Storage` if the
	/// database cannot be opened or initialised.
	pub fn open<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
		config.validate()?;
		let conn = Connection::open(path)?;
		Self::init(conn, config)
	}

	/// Opens a private database living in memory only.
	pub fn in_memory(config: StoreConfig) -> Result<Self> {
		config.validate()?;
		let conn = Connection::open_in_memory()?;
		Self::init(conn, config)
	}

	fn init(conn: Connection, config: StoreConfig) -> Result<Self> {
		conn.execute_batch(SCHEMA)?;
		Ok(Self { conn, config })
	}

	/// Sum of every stored count.
	pub fn total_count(&self) -> Result<u64> {
		let total: i64 = self
			.conn
			.query_row("SELECT COALESCE(SUM(count), 0) FROM ngram_counts", [], |row| row.get(0))?;
		from_sql_count(total)
	}
}

impl CountStore for SqliteStore {
	fn fetch_counts(&self, keys: &[&str]) -> Result<HashMap<String, u64>> {
		let mut stmt = self.conn.prepare_cached(SELECT_COUNT)?;
		let mut counts = HashMap::with_capacity(keys.len());
		for key in keys {
			let stored: Option<i64> = stmt.query_row([*key], |row| row.get(0)).optional()?;
			let count = match stored {
				Some(count) => from_sql_count(count)?,
				None => 0,
			};
			counts.insert((*key).to_owned(), count);
		}
		Ok(counts)
	}

	fn upsert(&mut self, rows: &[(String, u64)]) -> Result<()> {
		for batch in rows.chunks(self.config.commit_interval) {
			let tx = self.conn.transaction()?;
			{
				let mut stmt = tx.prepare_cached(UPSERT)?;
				for (ngram, count) in batch {
					stmt.execute(params![ngram, to_sql_count(*count)?])?;
				}
			}
			tx.commit()?;
			debug!("Committed batch of {} rows", batch.len());
		}
		Ok(())
	}

	fn count_of(&self, ngram: &str) -> Result<u64> {
		let stored: Option<i64> = self
			.conn
			.prepare_cached(SELECT_COUNT)?
			.query_row([ngram], |row| row.get(0))
			.optional()?;
		stored.map_or(Ok(0), from_sql_count)
	}

	fn len(&self) -> Result<u64> {
		let len: i64 = self.conn.query_row("SELECT COUNT(*) FROM ngram_counts", [], |row| row.get(0))?;
		from_sql_count(len)
	}

	fn top_k(&self, n: usize) -> Result<Vec<(String, u64)>> {
		let limit = i64::try_from(n).unwrap_or(i64::MAX);
		let mut stmt = self.conn.prepare(&format!("{SELECT_DESCENDING} LIMIT ?1"))?;
		let mut rows = stmt.query([limit])?;

		let mut top = Vec::new();
		while let Some(row) = rows.next()? {
			top.push(decode_row(row)?);
		}
		Ok(top)
	}

	fn for_each_page_descending(
		&self,
		page_size: usize,
		visit: &mut dyn FnMut(Vec<(String, u64)>) -> Result<()>,
	) -> Result<()> {
		if page_size == 0 {
			return Err(Error::Config("page_size must be >= 1".to_owned()));
		}

		// One query, one cursor: pages are cut from the row stream.
		let mut stmt = self.conn.prepare(SELECT_DESCENDING)?;
		let mut rows = stmt.query([])?;

		let mut page = Vec::with_capacity(page_size);
		while let Some(row) = rows.next()? {
			page.push(decode_row(row)?);
			if page.len() == page_size {
				visit(std::mem::replace(&mut page, Vec::with_capacity(page_size)))?;
			}
		}
		if !page.is_empty() {
			visit(page)?;
		}
		Ok(())
	}
}

fn decode_row(row: &Row<'_>) -> Result<(String, u64)> {
	let ngram: String = row.get(0)?;
	let total: i64 = row.get(1)?;
	Ok((ngram, from_sql_count(total)?))
}

fn to_sql_count(count: u64) -> Result<i64> {
	i64::try_from(count).map_err(|_| Error::CountRange(count))
}

fn from_sql_count(value: i64) -> Result<u64> {
	u64::try_from(value).map_err(|_| Error::Storage(rusqlite::Error::IntegralValueOutOfRange(0, value)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn store() -> SqliteStore {
		SqliteStore::in_memory(StoreConfig { commit_interval: 2, page_size: 2 }).unwrap()
	}

	fn rows(pairs: &[(&str, u64)]) -> Vec<(String, u64)> {
		pairs.iter().map(|(ngram, count)| (ngram.to_string(), *count)).collect()
	}

	#[test]
	fn fetch_defaults_absent_keys_to_zero() {
		let mut store = store();
		store.upsert(&rows(&[("ab", 3)])).unwrap();

		let counts = store.fetch_counts(&["ab", "zz"]).unwrap();
		assert_eq!(counts["ab"], 3);
		assert_eq!(counts["zz"], 0);
		// Fetching never inserts.
		assert_eq!(store.len().unwrap(), 1);
	}

	#[test]
	fn upsert_replaces_existing_values() {
		let mut store = store();
		store.upsert(&rows(&[("ab", 3), ("b", 1), ("c", 4)])).unwrap();
		store.upsert(&rows(&[("ab", 7)])).unwrap();

		assert_eq!(store.count_of("ab").unwrap(), 7);
		assert_eq!(store.count_of("c").unwrap(), 4);
		assert_eq!(store.count_of("missing").unwrap(), 0);
		assert_eq!(store.total_count().unwrap(), 12);
	}

	#[test]
	fn merge_then_upsert_adds_delta_exactly_once() {
		let mut store = store();
		store.upsert(&rows(&[("ab", 5)])).unwrap();

		let delta = [("ab", 2u64), ("cd", 1)];
		let keys: Vec<&str> = delta.iter().map(|(k, _)| *k).collect();
		let stored = store.fetch_counts(&keys).unwrap();
		let merged: Vec<(String, u64)> =
			delta.iter().map(|(k, v)| (k.to_string(), v + stored[*k])).collect();
		store.upsert(&merged).unwrap();

		assert_eq!(store.count_of("ab").unwrap(), 7);
		assert_eq!(store.count_of("cd").unwrap(), 1);
	}

	#[test]
	fn top_k_orders_by_count_then_ngram() {
		let mut store = store();
		store.upsert(&rows(&[("a", 2), ("b", 9), ("c", 2), ("d", 5)])).unwrap();

		let top = store.top_k(3).unwrap();
		assert_eq!(top, rows(&[("b", 9), ("d", 5), ("a", 2)]));
	}

	#[test]
	fn pages_cover_the_whole_table_in_order() {
		let mut store = store();
		store.upsert(&rows(&[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)])).unwrap();

		let mut pages = Vec::new();
		store
			.for_each_page_descending(2, &mut |page: Vec<(String, u64)>| {
				pages.push(page);
				Ok(())
			})
			.unwrap();

		assert_eq!(pages.len(), 3);
		assert_eq!(pages[2], rows(&[("a", 1)]));
		let flat: Vec<(String, u64)> = pages.into_iter().flatten().collect();
		assert_eq!(flat, rows(&[("e", 5), ("d", 4), ("c", 3), ("b", 2), ("a", 1)]));
	}

	#[test]
	fn rejects_counts_outside_sql_range() {
		let mut store = store();
		let result = store.upsert(&rows(&[("x", u64::MAX)]));
		assert!(matches!(result, Err(Error::CountRange(u64::MAX))));
	}

	#[test]
	fn survives_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("counts.db");
		{
			let mut store = SqliteStore::open(&path, StoreConfig::default()).unwrap();
			store.upsert(&rows(&[("ab", 3)])).unwrap();
		}
		let store = SqliteStore::open(&path, StoreConfig::default()).unwrap();
		assert_eq!(store.count_of("ab").unwrap(), 3);
	}
}
