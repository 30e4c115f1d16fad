//! Dataset loading: fetch bytes, read them as an all-text CSV table, then
//! coerce the declared columns into typed polars columns.
//!
//! Tables are memoized per source identifier and load kind in a
//! [`DatasetCache`] that lives as long as the session owning the
//! [`DatasetLoader`].

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::DashboardError;
use crate::model::{Citizenship, Gender, Region};
use crate::schema::{casualty, casualty_raw, population, population_raw};

const WHITESPACE: &str = " \t\r\n";

/// Tried in order; the first that parses wins.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];

// ── Fetching ────────────────────────────────────────────────────────────────

/// Turns a source identifier into raw bytes.
pub trait Fetch {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, DashboardError>;
}

/// Fetches `http(s)://` identifiers over the network and reads anything else
/// from disk relative to `base_path`.
pub struct SourceFetcher {
    client: reqwest::blocking::Client,
    base_path: PathBuf,
}

impl SourceFetcher {
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, DashboardError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| DashboardError::unavailable("http client", e))?;
        Ok(Self {
            client,
            base_path: base_path.into(),
        })
    }

    fn is_remote(source_id: &str) -> bool {
        source_id.starts_with("http://") || source_id.starts_with("https://")
    }
}

impl Fetch for SourceFetcher {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, DashboardError> {
        if Self::is_remote(source_id) {
            debug!(source_id = %source_id, "fetching remote dataset");
            let response = self
                .client
                .get(source_id)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| DashboardError::unavailable(source_id, e))?;
            let bytes = response
                .bytes()
                .map_err(|e| DashboardError::unavailable(source_id, e))?;
            Ok(bytes.to_vec())
        } else {
            let path = self.base_path.join(source_id);
            debug!(path = %path.display(), "reading local dataset");
            std::fs::read(&path).map_err(|e| DashboardError::unavailable(source_id, e))
        }
    }
}

// ── Cache ───────────────────────────────────────────────────────────────────

/// A source identifier plus how it was loaded. Reading one source two ways
/// gives two entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Raw(String),
    Population { source_id: String, region: Region },
    Casualties(String),
}

impl CacheKey {
    pub fn source_id(&self) -> &str {
        match self {
            CacheKey::Raw(id) | CacheKey::Casualties(id) => id,
            CacheKey::Population { source_id, .. } => source_id,
        }
    }
}

/// Session-scoped memo of loaded tables.
#[derive(Default)]
pub struct DatasetCache {
    tables: HashMap<CacheKey, Arc<DataFrame>>,
}

impl DatasetCache {
    pub fn get(&self, key: &CacheKey) -> Option<Arc<DataFrame>> {
        self.tables.get(key).cloned()
    }

    /// Return the cached table, or run `load` and remember its result.
    /// A failed load leaves the cache untouched.
    pub fn get_or_try_insert_with(
        &mut self,
        key: CacheKey,
        load: impl FnOnce() -> Result<DataFrame, DashboardError>,
    ) -> Result<Arc<DataFrame>, DashboardError> {
        if let Some(table) = self.tables.get(&key) {
            debug!(source_id = %key.source_id(), ?key, "dataset cache hit");
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(load()?);
        info!(source_id = %key.source_id(), ?key, rows = table.height(), "dataset loaded");
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ── Loader ──────────────────────────────────────────────────────────────────

/// A fetcher plus the cache of everything it has loaded this session.
pub struct DatasetLoader<F: Fetch> {
    fetcher: F,
    cache: DatasetCache,
}

impl<F: Fetch> DatasetLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cache: DatasetCache::default(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Load a population table and tag every row with `region`.
    pub fn population(
        &mut self,
        source_id: &str,
        region: Region,
    ) -> Result<Arc<DataFrame>, DashboardError> {
        let fetcher = &self.fetcher;
        let key = CacheKey::Population {
            source_id: source_id.to_string(),
            region,
        };
        self.cache.get_or_try_insert_with(key, || {
            let raw = read_csv_as_strings(&fetcher.fetch(source_id)?)?;
            coerce_population(&raw, region)
        })
    }

    /// Load the detailed casualty table.
    pub fn casualties(&mut self, source_id: &str) -> Result<Arc<DataFrame>, DashboardError> {
        let fetcher = &self.fetcher;
        self.cache
            .get_or_try_insert_with(CacheKey::Casualties(source_id.to_string()), || {
                let raw = read_csv_as_strings(&fetcher.fetch(source_id)?)?;
                coerce_casualties(&raw)
            })
    }

    /// Load a table with every column left as text.
    pub fn load_raw(&mut self, source_id: &str) -> Result<Arc<DataFrame>, DashboardError> {
        let fetcher = &self.fetcher;
        self.cache
            .get_or_try_insert_with(CacheKey::Raw(source_id.to_string()), || {
                read_csv_as_strings(&fetcher.fetch(source_id)?)
            })
    }
}

// ── Reading & coercion ──────────────────────────────────────────────────────

/// Read CSV bytes into a DataFrame with all columns as String dtype.
/// Byte sequences that are not valid UTF-8 are replaced with U+FFFD rather
/// than decoded, so windows-1252 files still load. Header names are trimmed.
pub fn read_csv_as_strings(bytes: &[u8]) -> Result<DataFrame, DashboardError> {
    let text = String::from_utf8_lossy(bytes).into_owned();
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    df.set_column_names(trimmed)?;

    Ok(df)
}

pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), DashboardError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(DashboardError::SchemaError(format!(
                "expected column '{col_name}' is missing"
            )));
        }
    }
    Ok(())
}

/// Text column to Float64 after dropping thousands separators and percent
/// signs. Blank or unparsable text becomes null.
pub fn numeric_text(column: &str) -> Expr {
    col(column)
        .str()
        .replace_all(lit("[,%]"), lit(""), false)
        .str()
        .strip_chars(lit(WHITESPACE))
        .cast(DataType::Float64)
}

/// Text column to Date using the first of [`DATE_FORMATS`] that matches.
/// A trailing time of day is ignored. Anything else becomes null.
pub fn date_text(column: &str) -> Expr {
    let day = col(column)
        .str()
        .strip_chars(lit(WHITESPACE))
        .str()
        .replace(lit(r"[T ].*$"), lit(""), false);
    let attempts: Vec<Expr> = DATE_FORMATS
        .iter()
        .map(|format| {
            day.clone().str().to_date(StrptimeOptions {
                format: Some((*format).into()),
                strict: false,
                exact: true,
                ..Default::default()
            })
        })
        .collect();
    coalesce(&attempts)
}

/// Map trimmed text through `(raw, label)` pairs; anything unmatched,
/// null included, gets `fallback`.
fn relabel(column: &str, mapping: &[(&str, &str)], fallback: &str) -> Expr {
    let text = col(column).str().strip_chars(lit(WHITESPACE));
    mapping
        .iter()
        .rev()
        .fold(lit(fallback), |otherwise, (raw, label)| {
            when(text.clone().eq(lit(*raw)))
                .then(lit(*label))
                .otherwise(otherwise)
        })
}

/// Build the typed population table. Rows without a parsable year are
/// dropped; other unparsable values become null. Output is sorted by year.
pub fn coerce_population(raw: &DataFrame, region: Region) -> Result<DataFrame, DashboardError> {
    require_columns(raw, &[population_raw::YEAR])?;
    require_columns(raw, &population_raw::NUMERIC)?;

    let mut columns = vec![
        lit(region.as_str()).alias(population::REGION),
        numeric_text(population_raw::YEAR)
            .cast(DataType::Int32)
            .alias(population::YEAR),
    ];
    columns.extend(
        population_raw::NUMERIC
            .iter()
            .zip(population::NUMERIC)
            .map(|(raw_name, name)| numeric_text(raw_name).alias(name)),
    );

    let df = raw
        .clone()
        .lazy()
        .select(columns)
        .filter(col(population::YEAR).is_not_null())
        .sort_by_exprs([col(population::YEAR)], SortMultipleOptions::default())
        .collect()?;

    let dropped = raw.height() - df.height();
    if dropped > 0 {
        warn!(region = region.as_str(), dropped, "population rows without a year dropped");
    }
    Ok(df)
}

/// Build the typed casualty table. Rows whose date of death does not parse
/// are dropped. Unparsable ages become 0 and negative ages are clamped to 0.
pub fn coerce_casualties(raw: &DataFrame) -> Result<DataFrame, DashboardError> {
    require_columns(
        raw,
        &[
            casualty_raw::DATE_OF_DEATH,
            casualty_raw::CITIZENSHIP,
            casualty_raw::AGE,
            casualty_raw::GENDER,
        ],
    )?;

    let citizenships: Vec<(&str, &str)> = Citizenship::KNOWN
        .iter()
        .map(|c| (c.as_str(), c.as_str()))
        .collect();
    let genders: Vec<(&str, &str)> = Gender::CODED
        .iter()
        .filter_map(|g| g.code().map(|code| (code, g.as_str())))
        .collect();

    let df = raw
        .clone()
        .lazy()
        .select([
            date_text(casualty_raw::DATE_OF_DEATH).alias(casualty::DATE_OF_DEATH),
            relabel(casualty_raw::CITIZENSHIP, &citizenships, Citizenship::Other.as_str())
                .alias(casualty::CITIZENSHIP),
            numeric_text(casualty_raw::AGE)
                .cast(DataType::Int32)
                .fill_null(lit(0))
                .alias(casualty::AGE),
            relabel(casualty_raw::GENDER, &genders, Gender::Unknown.as_str()).alias(casualty::GENDER),
        ])
        .filter(col(casualty::DATE_OF_DEATH).is_not_null())
        .select([
            col(casualty::DATE_OF_DEATH),
            col(casualty::DATE_OF_DEATH)
                .dt()
                .year()
                .cast(DataType::Int32)
                .alias(casualty::YEAR),
            col(casualty::DATE_OF_DEATH)
                .dt()
                .month()
                .cast(DataType::Int32)
                .alias(casualty::MONTH),
            col(casualty::CITIZENSHIP),
            when(col(casualty::AGE).lt(lit(0)))
                .then(lit(0))
                .otherwise(col(casualty::AGE))
                .alias(casualty::AGE),
            col(casualty::GENDER),
        ])
        .collect()?;

    let dropped = raw.height() - df.height();
    if dropped > 0 {
        warn!(dropped, "casualty rows with unparsable date of death dropped");
    }
    Ok(df)
}
