//! # Date Filter
//!
//! Dashboard date-range filters: parsing, validation and conversion into
//! query variables.
//!
//! This crate provides:
//! - A fail-open parser for structured filter objects and legacy
//!   `<from>→<to>~UTC` strings
//! - Seven validated filter variants, from "in the last N days" to
//!   "before or on a date"
//! - Conversion into absolute `dateFrom`/`dateTo` timestamps computed in
//!   local time or UTC
//!
//! ```
//! use date_filter::parse_str;
//!
//! let filter = parse_str("2024-01-01→2024-01-31~UTC").unwrap();
//! let bounds = filter.to_query_bounds();
//! assert_eq!(bounds.date_from.unwrap().to_string(), "2024-01-01T00:00:00.000Z");
//! assert_eq!(bounds.date_to.unwrap().to_string(), "2024-01-31T23:59:59.999Z");
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod bounds;
pub mod config;
pub mod error;
pub mod filter;
pub mod types;

pub use bounds::QueryBounds;
pub use config::Config;
pub use error::{Error, Result};
pub use filter::{
    parse, parse_json, parse_query_param, parse_str, parse_value, DateFilterValue, FilterInput,
};
pub use types::{CalendarDate, DateFilterType, Period, Timestamp, Timezone};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "date-filter";
