//! Shared utility functions.
//!
//! - `format`: Human-readable formatting for durations and amounts

mod format;

pub use format::{format_currency, format_duration};
