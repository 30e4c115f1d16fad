use std::collections::BTreeSet;

use polars::prelude::*;
use serde::Serialize;

use crate::error::DashboardError;
use crate::loader::require_columns;
use crate::model::MONTH_LABELS;
use crate::schema::{aggregate, casualty, population};

/// Dense two-key count table. `values[r][c]` counts rows with key
/// `(rows[r], columns[c])`; combinations without rows hold 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountMatrix {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<i64>>,
}

impl CountMatrix {
    pub fn get(&self, row: &str, column: &str) -> Option<i64> {
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.columns.iter().position(|x| x == column)?;
        Some(self.values[r][c])
    }

    pub fn column_values(&self, column: usize) -> Vec<i64> {
        self.values.iter().map(|row| row[column]).collect()
    }

    pub fn total(&self) -> i64 {
        self.values.iter().flatten().sum()
    }
}

// ── Filters ─────────────────────────────────────────────────────────────────

/// Keep rows whose `year` lies in `lo..=hi`.
pub fn filter_by_year_range(table: &DataFrame, lo: i32, hi: i32) -> Result<DataFrame, DashboardError> {
    require_columns(table, &[casualty::YEAR])?;
    filter_where(
        table,
        col(casualty::YEAR)
            .gt_eq(lit(lo))
            .and(col(casualty::YEAR).lt_eq(lit(hi))),
    )
}

/// Keep rows whose text `column` equals one of `values`.
pub fn filter_in(table: &DataFrame, column: &str, values: &[&str]) -> Result<DataFrame, DashboardError> {
    require_columns(table, &[column])?;
    let predicate = values
        .iter()
        .map(|v| col(column).eq(lit(*v)))
        .reduce(|a, b| a.or(b))
        .unwrap_or_else(|| lit(false));
    filter_where(table, predicate)
}

pub fn filter_where(table: &DataFrame, predicate: Expr) -> Result<DataFrame, DashboardError> {
    Ok(table.clone().lazy().filter(predicate).collect()?)
}

// ── Grouping ────────────────────────────────────────────────────────────────

/// Count rows per distinct combination of `keys`, sorted by the keys.
/// Only combinations that occur are emitted.
pub fn count_by_key(table: &DataFrame, keys: &[&str]) -> Result<DataFrame, DashboardError> {
    if keys.is_empty() {
        return Err(DashboardError::Validation("count_by_key needs at least one key".into()));
    }
    require_columns(table, keys)?;
    let key_exprs: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();

    let df = table
        .clone()
        .lazy()
        .group_by(key_exprs.clone())
        .agg([len().cast(DataType::Int64).alias(aggregate::COUNT)])
        .sort_by_exprs(key_exprs, SortMultipleOptions::default())
        .collect()?;
    Ok(df)
}

/// Read a single-key count table as `(label, count)` pairs in table order.
/// Null keys are skipped.
pub fn tally(counts: &DataFrame, key: &str) -> Result<Vec<(String, i64)>, DashboardError> {
    require_columns(counts, &[key, aggregate::COUNT])?;
    let key_col = counts.column(key)?.cast(&DataType::String)?;
    let labels = key_col.str()?;
    let values = counts.column(aggregate::COUNT)?.i64()?;

    Ok(labels
        .into_iter()
        .zip(values.into_iter())
        .filter_map(|(label, count)| Some((label?.to_string(), count.unwrap_or(0))))
        .collect())
}

/// Spread a two-key count table over the given row and column labels.
/// Missing combinations are 0; keys outside the labels are ignored.
pub fn pivot_counts(
    counts: &DataFrame,
    row_key: &str,
    column_key: &str,
    rows: Vec<String>,
    columns: Vec<String>,
) -> Result<CountMatrix, DashboardError> {
    require_columns(counts, &[row_key, column_key, aggregate::COUNT])?;
    let row_col = counts.column(row_key)?.cast(&DataType::String)?;
    let row_keys = row_col.str()?;
    let column_col = counts.column(column_key)?.cast(&DataType::String)?;
    let column_keys = column_col.str()?;
    let values = counts.column(aggregate::COUNT)?.i64()?;

    let mut matrix = vec![vec![0i64; columns.len()]; rows.len()];
    for i in 0..counts.height() {
        let (Some(row), Some(column)) = (row_keys.get(i), column_keys.get(i)) else {
            continue;
        };
        let r = rows.iter().position(|x| x == row);
        let c = columns.iter().position(|x| x == column);
        if let (Some(r), Some(c)) = (r, c) {
            matrix[r][c] += values.get(i).unwrap_or(0);
        }
    }

    Ok(CountMatrix {
        rows,
        columns,
        values: matrix,
    })
}

/// Month × year event counts: 12 rows labelled Jan..Dec, one column per
/// distinct year in `table` (ascending).
pub fn pivot_month_year(table: &DataFrame) -> Result<CountMatrix, DashboardError> {
    require_columns(table, &[casualty::YEAR, casualty::MONTH])?;
    let counts = count_by_key(table, &[casualty::MONTH, casualty::YEAR])?;

    let years: BTreeSet<i32> = table
        .column(casualty::YEAR)?
        .i32()?
        .into_iter()
        .flatten()
        .collect();
    let month_keys = (1..=12).map(|m: i32| m.to_string()).collect();
    let year_keys = years.iter().map(|y| y.to_string()).collect();

    let mut matrix = pivot_counts(&counts, casualty::MONTH, casualty::YEAR, month_keys, year_keys)?;
    matrix.rows = MONTH_LABELS.iter().map(|m| m.to_string()).collect();
    Ok(matrix)
}

// ── Binning ─────────────────────────────────────────────────────────────────

/// Predicate for bucket `i` of ascending `edges`: `[e0, e1]` for the first,
/// `(e_i, e_i+1]` after that.
fn in_bucket(value: Expr, edges: &[f64], i: usize) -> Expr {
    let lower = if i == 0 {
        value.clone().gt_eq(lit(edges[i]))
    } else {
        value.clone().gt(lit(edges[i]))
    };
    lower.and(value.lt_eq(lit(edges[i + 1])))
}

/// Copy of `table` with a `bucket` text column labelling `column`'s bucket.
/// Values outside the edges, and nulls, get a null bucket.
pub fn bin_numeric(
    table: &DataFrame,
    column: &str,
    edges: &[f64],
    labels: &[&str],
) -> Result<DataFrame, DashboardError> {
    if edges.len() < 2 || labels.len() + 1 != edges.len() {
        return Err(DashboardError::Validation(format!(
            "{} edges cannot label {} buckets",
            edges.len(),
            labels.len()
        )));
    }
    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(DashboardError::Validation("bucket edges must be strictly ascending".into()));
    }
    require_columns(table, &[column])?;

    let value = col(column).cast(DataType::Float64);
    let bucket = labels
        .iter()
        .enumerate()
        .rev()
        .fold(lit(NULL).cast(DataType::String), |otherwise, (i, label)| {
            when(in_bucket(value.clone(), edges, i))
                .then(lit(*label))
                .otherwise(otherwise)
        });

    Ok(table
        .clone()
        .lazy()
        .with_column(bucket.alias(aggregate::BUCKET))
        .collect()?)
}

// ── Change over time ────────────────────────────────────────────────────────

/// `(value at year_b - value at year_a) / value at year_a * 100`.
pub fn percent_change(
    table: &DataFrame,
    year_a: i32,
    year_b: i32,
    value_column: &str,
) -> Result<f64, DashboardError> {
    require_columns(table, &[population::YEAR, value_column])?;
    let years = table.column(population::YEAR)?.i32()?;
    let value_col = table.column(value_column)?.cast(&DataType::Float64)?;
    let values = value_col.f64()?;

    let value_at = |year: i32| -> Result<Option<f64>, DashboardError> {
        years
            .into_iter()
            .zip(values.into_iter())
            .find(|(y, _)| *y == Some(year))
            .map(|(_, v)| v)
            .ok_or(DashboardError::MissingYear(year))
    };

    match (value_at(year_a)?, value_at(year_b)?) {
        (Some(a), Some(b)) if a != 0.0 => Ok((b - a) / a * 100.0),
        _ => Err(DashboardError::InsufficientData(format!(
            "{value_column} has no usable base value for {year_a}-{year_b}"
        ))),
    }
}
