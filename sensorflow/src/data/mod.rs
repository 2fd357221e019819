//! Tabular data handling on top of polars.
//!
//! This module provides:
//! - CSV I/O that maps the `"na"` sentinel to nulls and back
//! - Column helpers for missing values, numeric readings and labels
//! - Seeded train/test splitting

mod frame;
mod split;

pub use frame::{
    append, column_names, drop_columns, has_column, label_column, missing_columns, missing_percentage,
    numeric_column, numeric_values, read_csv, read_csv_bytes, select_columns, take_rows, write_csv,
    write_csv_to, DataFrame, NA_SENTINEL,
};
pub use split::train_test_split;
