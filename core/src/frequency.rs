//! SQLite-backed frequency lexicon.
//!
//! Frequency packs come from many providers and never agree on column
//! names, so lookups go through fuzzy column resolution with fixed fallback
//! chains. Row access builds an explicit column-name → index map once per
//! query. Per-(lemma, column) values and per-column maxima are memoized.

use crate::error::{CoreError, Result};
use ahash::AHashMap;
use lru::LruCache;
use rusqlite::Connection;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::debug;

/// Fallback chain for the frequency (per-million-words) column.
const FREQUENCY_COLUMNS: &[&str] = &[
    "pmw",
    "core_pmw",
    "frequency",
    "freq",
    "freq_per_million",
    "count",
    "ipm",
];

/// Fallback chain for the rank column.
const RANK_COLUMNS: &[&str] = &["core_rank", "rank", "id", "index"];

/// Fallback chain for the lemma column.
const LEMMA_COLUMNS: &[&str] = &["lemma", "word", "surface", "headword", "term"];

const VALUE_CACHE_CAPACITY: usize = 4096;

/// One logical row from a frequency pack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyRow {
    pub lemma: String,
    pub core_rank: Option<i64>,
    pub pmw: Option<f64>,
    pub pos: Option<String>,
    pub lform: Option<String>,
    pub wtype: Option<String>,
    pub sublemma: Option<String>,
}

/// Physical column names resolved for one store.
#[derive(Debug, Clone)]
pub struct ResolvedColumns {
    pub lemma: String,
    pub rank: Option<String>,
    pub pmw: Option<String>,
    pub pos: Option<String>,
    pub lform: Option<String>,
    pub wtype: Option<String>,
    pub sublemma: Option<String>,
}

/// Read-only frequency store over one SQLite table.
#[derive(Debug)]
pub struct FrequencyStore {
    conn: Connection,
    table: String,
    columns: Vec<String>,
    max_cache: RefCell<AHashMap<String, Option<f64>>>,
    value_cache: RefCell<LruCache<(String, String), Option<f64>>>,
}

impl FrequencyStore {
    /// Open a frequency database. When `table` is None the first user table
    /// from `sqlite_master` is used.
    pub fn open<P: AsRef<Path>>(path: P, table: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::missing(path));
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let table = match table {
            Some(t) => t.to_string(),
            None => {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' \
                     AND name NOT LIKE 'sqlite_%' ORDER BY rowid LIMIT 1",
                )?;
                let name: Option<String> = stmt.query_row([], |row| row.get(0)).ok();
                drop(stmt);
                name.ok_or_else(|| CoreError::malformed(path, "no user tables in database"))?
            }
        };

        let mut columns = Vec::new();
        {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let name: String = row.get(1)?;
                columns.push(name);
            }
        }
        if columns.is_empty() {
            return Err(CoreError::malformed(
                path,
                format!("table {} has no columns", table),
            ));
        }
        debug!(table = %table, columns = columns.len(), "opened frequency store");

        Ok(Self {
            conn,
            table,
            columns,
            max_cache: RefCell::new(AHashMap::new()),
            value_cache: RefCell::new(LruCache::new(
                NonZeroUsize::new(VALUE_CACHE_CAPACITY).unwrap(),
            )),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Physical column list, in table order.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Case-insensitive direct column match.
    pub fn resolve_column(&self, name: &str) -> Option<String> {
        self.columns
            .iter()
            .find(|c| c.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn resolve_first(&self, candidates: &[&str]) -> Option<String> {
        candidates.iter().find_map(|c| self.resolve_column(c))
    }

    pub fn resolve_frequency_column(&self) -> Option<String> {
        self.resolve_first(FREQUENCY_COLUMNS)
    }

    pub fn resolve_rank_column(&self) -> Option<String> {
        self.resolve_first(RANK_COLUMNS)
    }

    pub fn resolve_lemma_column(&self) -> Option<String> {
        self.resolve_first(LEMMA_COLUMNS)
    }

    /// Resolve the standard column set in one pass.
    pub fn resolve_standard_columns(&self) -> Result<ResolvedColumns> {
        let lemma = self.resolve_lemma_column().ok_or_else(|| {
            CoreError::malformed(
                self.table.clone(),
                "no lemma-like column (lemma/word/surface/headword/term)",
            )
        })?;
        Ok(ResolvedColumns {
            lemma,
            rank: self.resolve_rank_column(),
            pmw: self.resolve_frequency_column(),
            pos: self.resolve_column("pos"),
            lform: self.resolve_column("lform"),
            wtype: self.resolve_column("wtype"),
            sublemma: self.resolve_column("sublemma"),
        })
    }

    fn assert_known_column(&self, col: &str) -> Result<()> {
        if self.columns.iter().any(|c| c == col) {
            Ok(())
        } else {
            Err(CoreError::malformed(
                self.table.clone(),
                format!("unknown column {}", col),
            ))
        }
    }

    /// Maximum value of a numeric column, memoized.
    pub fn max_value(&self, col: &str) -> Result<Option<f64>> {
        if let Some(v) = self.max_cache.borrow().get(col) {
            return Ok(*v);
        }
        self.assert_known_column(col)?;
        let sql = format!("SELECT MAX(\"{}\") FROM \"{}\"", col, self.table);
        let value: Option<f64> = self.conn.query_row(&sql, [], |row| row.get(0))?;
        self.max_cache.borrow_mut().insert(col.to_string(), value);
        Ok(value)
    }

    /// Numeric value for one lemma in one column, memoized per pair.
    pub fn get_value(&self, lemma: &str, col: &str) -> Result<Option<f64>> {
        let key = (lemma.to_string(), col.to_string());
        if let Some(v) = self.value_cache.borrow_mut().get(&key) {
            return Ok(*v);
        }
        self.assert_known_column(col)?;
        let lemma_col = self.resolve_lemma_column().ok_or_else(|| {
            CoreError::malformed(self.table.clone(), "no lemma-like column for lookup")
        })?;
        let sql = format!(
            "SELECT \"{}\" FROM \"{}\" WHERE \"{}\" = ?1 LIMIT 1",
            col, self.table, lemma_col
        );
        let value: Option<f64> = self
            .conn
            .query_row(&sql, [lemma], |row| row.get(0))
            .unwrap_or(None);
        self.value_cache.borrow_mut().put(key, value);
        Ok(value)
    }

    /// Rows ordered by `(rank IS NULL) ASC, rank ASC, pmw DESC`, null ranks
    /// pushed to the end, truncated to `limit`.
    pub fn iter_top_by_rank(&self, limit: usize, cols: &ResolvedColumns) -> Result<Vec<FrequencyRow>> {
        // Build the select list and a name → index map once.
        let mut select: Vec<&str> = vec![cols.lemma.as_str()];
        for opt in [&cols.rank, &cols.pmw, &cols.pos, &cols.lform, &cols.wtype, &cols.sublemma] {
            if let Some(c) = opt {
                select.push(c.as_str());
            }
        }
        for c in &select {
            self.assert_known_column(c)?;
        }
        let index_of: AHashMap<&str, usize> =
            select.iter().enumerate().map(|(i, c)| (*c, i)).collect();

        let quoted: Vec<String> = select.iter().map(|c| format!("\"{}\"", c)).collect();
        let order = match (&cols.rank, &cols.pmw) {
            (Some(r), Some(p)) => format!("(\"{r}\" IS NULL) ASC, \"{r}\" ASC, \"{p}\" DESC"),
            (Some(r), None) => format!("(\"{r}\" IS NULL) ASC, \"{r}\" ASC"),
            (None, Some(p)) => format!("\"{p}\" DESC"),
            (None, None) => format!("\"{}\" ASC", cols.lemma),
        };
        let sql = format!(
            "SELECT {} FROM \"{}\" ORDER BY {} LIMIT ?1",
            quoted.join(", "),
            self.table,
            order
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([limit as i64])?;
        let mut out = Vec::with_capacity(limit.min(4096));
        while let Some(row) = rows.next()? {
            let get_text = |name: &Option<String>| -> Option<String> {
                name.as_ref()
                    .and_then(|c| index_of.get(c.as_str()))
                    .and_then(|&i| row.get::<_, Option<String>>(i).ok().flatten())
            };
            let lemma: String = row
                .get::<_, Option<String>>(index_of[cols.lemma.as_str()])?
                .unwrap_or_default();
            out.push(FrequencyRow {
                lemma,
                core_rank: cols
                    .rank
                    .as_ref()
                    .and_then(|c| index_of.get(c.as_str()))
                    .and_then(|&i| row.get::<_, Option<i64>>(i).ok().flatten()),
                pmw: cols
                    .pmw
                    .as_ref()
                    .and_then(|c| index_of.get(c.as_str()))
                    .and_then(|&i| row.get::<_, Option<f64>>(i).ok().flatten()),
                pos: get_text(&cols.pos),
                lform: get_text(&cols.lform),
                wtype: get_text(&cols.wtype),
                sublemma: get_text(&cols.sublemma),
            });
        }
        Ok(out)
    }
}

/// PMW → weight normalization: `log1p(v) / log1p(max_v)` when `max_v > 0`.
pub fn pmw_weight(value: f64, max_value: f64) -> f64 {
    if max_value > 0.0 && value > 0.0 {
        value.ln_1p() / max_value.ln_1p()
    } else {
        0.0
    }
}

/// Rank-only fallback: linear decay from 1.0 at rank 1 to 0.0 at max rank.
pub fn rank_weight(rank: i64, max_rank: i64) -> f64 {
    if max_rank <= 1 || rank < 1 {
        return if rank >= 1 { 1.0 } else { 0.0 };
    }
    1.0 - ((rank - 1) as f64) / ((max_rank - 1) as f64)
}
