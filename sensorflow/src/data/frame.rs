//! Polars helpers for sensor reading tables.
//!
//! Frames are plain [`DataFrame`]s. Files use the document store's `"na"`
//! sentinel for missing readings in both directions.

use crate::errors::{IoResultExt, Result, SensorflowError};
use crate::utils::fs::ensure_parent;
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;

pub use polars::prelude::DataFrame;

/// Sentinel used by the document store for missing readings.
pub const NA_SENTINEL: &str = "na";

fn csv_options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| {
            opts.with_null_values(Some(NullValues::AllColumnsSingle(NA_SENTINEL.into())))
        })
}

/// Reads a CSV file with a header row. `"na"` fields become nulls.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(SensorflowError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        ));
    }
    let frame = csv_options()
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(frame)
}

/// Reads CSV text held in memory.
pub fn read_csv_bytes(raw: impl Into<Vec<u8>>) -> Result<DataFrame> {
    let frame = csv_options()
        .into_reader_with_file_handle(Cursor::new(raw.into()))
        .finish()?;
    Ok(frame)
}

/// Writes CSV with a header row to any writer. Nulls are written as `"na"`.
pub fn write_csv_to<W: Write>(frame: &mut DataFrame, writer: W) -> Result<()> {
    CsvWriter::new(writer)
        .include_header(true)
        .with_null_value(NA_SENTINEL.to_string())
        .finish(frame)?;
    Ok(())
}

/// Writes a CSV file, creating parent directories.
pub fn write_csv(frame: &mut DataFrame, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).at_path(path)?;
    write_csv_to(frame, file)
}

/// Column names in order.
#[must_use]
pub fn column_names(frame: &DataFrame) -> Vec<String> {
    frame
        .get_column_names()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

/// Returns true if the frame has a column named `name`.
#[must_use]
pub fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.column(name).is_ok()
}

/// Returns the names in `names` that are absent from `frame`.
#[must_use]
pub fn missing_columns(frame: &DataFrame, names: &[String]) -> Vec<String> {
    names
        .iter()
        .filter(|name| !has_column(frame, name))
        .cloned()
        .collect()
}

/// Percentage (0–100) of missing cells in a column. NaN counts as missing.
/// Empty frames report 0.
#[must_use]
pub fn missing_percentage(frame: &DataFrame, name: &str) -> Option<f64> {
    let series = frame.column(name).ok()?;
    if series.is_empty() {
        return Some(0.0);
    }
    let mut missing = series.null_count();
    if series.dtype().is_float() {
        missing += series
            .cast(&DataType::Float64)
            .ok()?
            .f64()
            .ok()?
            .into_iter()
            .filter(|v| v.is_some_and(f64::is_nan))
            .count();
    }
    Some(missing as f64 * 100.0 / series.len() as f64)
}

/// Finite numeric readings of a column, nulls skipped.
///
/// Non-numeric and absent columns yield nothing.
#[must_use]
pub fn numeric_values(frame: &DataFrame, name: &str) -> Vec<f64> {
    numeric_column(frame, name)
        .map(|values| values.into_iter().flatten().collect())
        .unwrap_or_default()
}

/// A numeric column as optional readings. Non-finite readings are missing.
///
/// A text column is accepted only when every cell is null, which is how
/// CSV inference types a column holding nothing but `"na"`.
pub fn numeric_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = frame
        .column(name)
        .map_err(|_| SensorflowError::model(format!("column '{name}' is missing")))?;
    if !series.dtype().is_numeric() {
        if series.null_count() == series.len() {
            return Ok(vec![None; series.len()]);
        }
        return Err(SensorflowError::model(format!(
            "column '{name}' holds non-numeric values ({})",
            series.dtype()
        )));
    }
    let cast = series.cast(&DataType::Float64)?;
    let values = cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(values)
}

/// A column rendered as optional text labels.
pub fn label_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = frame
        .column(name)
        .map_err(|_| SensorflowError::model(format!("column '{name}' is missing")))?;
    let cast = series.cast(&DataType::String)?;
    let labels = cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(labels)
}

/// Drops the named columns, ignoring names that are not present.
/// Returns the remaining frame and the names actually dropped, in frame order.
#[must_use]
pub fn drop_columns(frame: &DataFrame, names: &[String]) -> (DataFrame, Vec<String>) {
    let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
    let present: Vec<String> = column_names(frame)
        .into_iter()
        .filter(|name| wanted.contains(name.as_str()))
        .collect();
    if present.is_empty() {
        return (frame.clone(), present);
    }
    (frame.drop_many(&present), present)
}

/// Projects the named columns in the requested order.
pub fn select_columns(frame: &DataFrame, names: &[String]) -> Result<DataFrame> {
    let selected = frame.select(names.iter().map(String::as_str))?;
    Ok(selected)
}

/// Returns a frame holding the given rows, in the given order.
pub fn take_rows(frame: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = indices
        .iter()
        .map(|&i| {
            IdxSize::try_from(i).map_err(|_| SensorflowError::pipeline(format!("row index {i} is out of range")))
        })
        .collect::<Result<Vec<IdxSize>>>()?;
    let taken = frame.take(&IdxCa::from_vec("idx", idx))?;
    Ok(taken)
}

/// Appends the rows of `other`, matching columns by name. Columns whose
/// types differ are widened to `Float64` when both are numeric and to text
/// otherwise.
pub fn append(frame: &mut DataFrame, other: &DataFrame) -> Result<()> {
    if frame.width() == 0 {
        *frame = other.clone();
        return Ok(());
    }
    let names = column_names(frame);
    if other.width() != names.len() {
        return Err(SensorflowError::serialization(format!(
            "cannot append {} columns to a frame with {}",
            other.width(),
            names.len()
        )));
    }
    let missing = missing_columns(other, &names);
    if !missing.is_empty() {
        return Err(SensorflowError::serialization(format!(
            "appended rows lack columns: {}",
            missing.join(", ")
        )));
    }

    let mut aligned = Vec::with_capacity(names.len());
    for name in &names {
        let ours = frame.column(name)?.clone();
        let theirs = other.column(name)?.clone();
        if ours.dtype() == theirs.dtype() {
            aligned.push(theirs);
            continue;
        }
        let common = if ours.dtype().is_numeric() && theirs.dtype().is_numeric() {
            DataType::Float64
        } else {
            DataType::String
        };
        frame.with_column(ours.cast(&common)?)?;
        aligned.push(theirs.cast(&common)?);
    }
    frame.vstack_mut(&DataFrame::new(aligned)?)?;
    Ok(())
}
