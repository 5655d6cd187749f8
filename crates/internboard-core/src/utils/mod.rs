//! Utility functions for display formatting.

pub mod format;

pub use format::{format_date, format_elapsed, format_optional_date, truncate_string};
