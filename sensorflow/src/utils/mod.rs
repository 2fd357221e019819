//! Utility functions for timestamps and file-system helpers.

pub mod fs;
pub mod timestamps;

pub use timestamps::{file_stamp, iso_timestamp, now_utc, run_dir_stamp, Timestamp};
