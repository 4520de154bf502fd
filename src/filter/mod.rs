//! Date filter values and the fail-open parser that produces them.
//!
//! Filter state reaches us in two shapes: a structured object built by the
//! dashboard controls, or a single legacy string persisted in old URLs. Both
//! are first turned into a candidate and then validated against the closed
//! set of [`DateFilterValue`] variants. Anything that does not validate is
//! logged and dropped, so a bad URL parameter means "no filter" rather than
//! a broken page.

mod legacy;
mod schema;

use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::types::{CalendarDate, DateFilterType, Period, Timezone};

/// A validated date-range filter.
///
/// Serializes to the structured object shape with a `type` tag, except for a
/// `BETWEEN` range with an unbounded end: the object form cannot express that,
/// so it is written as its legacy string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFilterValue {
    /// Within the last `number` periods, counted back from the start of today
    InLastPeriod {
        number: u32,
        period: Period,
        tz: Timezone,
    },
    /// Exactly one calendar day; `gte` and `lte` are always equal
    EqualTo {
        gte: CalendarDate,
        lte: CalendarDate,
        tz: Timezone,
    },
    /// Inclusive range. Either end may be unbounded when the value came from
    /// a legacy string.
    Between {
        gte: Option<CalendarDate>,
        lte: Option<CalendarDate>,
        tz: Timezone,
    },
    After {
        gt: CalendarDate,
        tz: Timezone,
    },
    OnOrAfter {
        gte: CalendarDate,
        tz: Timezone,
    },
    Before {
        lt: CalendarDate,
        tz: Timezone,
    },
    BeforeOrOn {
        lte: CalendarDate,
        tz: Timezone,
    },
}

impl DateFilterValue {
    /// The `type` tag of this value.
    #[must_use]
    pub const fn filter_type(&self) -> DateFilterType {
        match self {
            Self::InLastPeriod { .. } => DateFilterType::InLastPeriod,
            Self::EqualTo { .. } => DateFilterType::EqualTo,
            Self::Between { .. } => DateFilterType::Between,
            Self::After { .. } => DateFilterType::After,
            Self::OnOrAfter { .. } => DateFilterType::OnOrAfter,
            Self::Before { .. } => DateFilterType::Before,
            Self::BeforeOrOn { .. } => DateFilterType::BeforeOrOn,
        }
    }

    /// The timezone day boundaries are computed in.
    #[must_use]
    pub const fn tz(&self) -> Timezone {
        match self {
            Self::InLastPeriod { tz, .. }
            | Self::EqualTo { tz, .. }
            | Self::Between { tz, .. }
            | Self::After { tz, .. }
            | Self::OnOrAfter { tz, .. }
            | Self::Before { tz, .. }
            | Self::BeforeOrOn { tz, .. } => *tz,
        }
    }

    /// Encode a `BETWEEN` value in the legacy single-string form.
    ///
    /// Returns `None` for every other variant, since the legacy form can only
    /// express ranges.
    #[must_use]
    pub fn to_legacy_string(&self) -> Option<String> {
        match self {
            Self::Between { gte, lte, tz } => Some(legacy::encode(*gte, *lte, *tz)),
            _ => None,
        }
    }
}

impl Serialize for DateFilterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = match self {
            Self::Between {
                gte: Some(_),
                lte: Some(_),
                ..
            }
            | Self::InLastPeriod { .. }
            | Self::EqualTo { .. } => 4,
            Self::Between { gte, lte, tz } => {
                return serializer.serialize_str(&legacy::encode(*gte, *lte, *tz));
            }
            _ => 3,
        };

        let mut state = serializer.serialize_struct("DateFilterValue", len)?;
        state.serialize_field("type", &self.filter_type())?;
        match self {
            Self::InLastPeriod { number, period, .. } => {
                state.serialize_field("number", number)?;
                state.serialize_field("period", period)?;
            }
            Self::EqualTo { gte, lte, .. }
            | Self::Between {
                gte: Some(gte),
                lte: Some(lte),
                ..
            } => {
                state.serialize_field("gte", gte)?;
                state.serialize_field("lte", lte)?;
            }
            Self::Between { .. } => {}
            Self::After { gt, .. } => state.serialize_field("gt", gt)?,
            Self::OnOrAfter { gte, .. } => state.serialize_field("gte", gte)?,
            Self::Before { lt, .. } => state.serialize_field("lt", lt)?,
            Self::BeforeOrOn { lte, .. } => state.serialize_field("lte", lte)?,
        }
        state.serialize_field("tz", &self.tz())?;
        state.end()
    }
}

impl fmt::Display for DateFilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InLastPeriod { number, period, .. } => {
                let unit = if *number == 1 {
                    period.singular()
                } else {
                    period.as_str()
                };
                write!(f, "in the last {number} {unit}")?;
            }
            Self::EqualTo { gte, .. } => write!(f, "on {gte}")?,
            Self::Between { gte, lte, .. } => match (gte, lte) {
                (Some(from), Some(to)) => write!(f, "between {from} and {to}")?,
                (Some(from), None) => write!(f, "on or after {from}")?,
                (None, Some(to)) => write!(f, "on or before {to}")?,
                (None, None) => f.write_str("any date")?,
            },
            Self::After { gt, .. } => write!(f, "after {gt}")?,
            Self::OnOrAfter { gte, .. } => write!(f, "on or after {gte}")?,
            Self::Before { lt, .. } => write!(f, "before {lt}")?,
            Self::BeforeOrOn { lte, .. } => write!(f, "on or before {lte}")?,
        }
        if self.tz() == Timezone::Utc {
            f.write_str(" (UTC)")?;
        }
        Ok(())
    }
}

/// Raw filter state before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterInput {
    /// Legacy `<from>[→<to>][~UTC]` string
    Legacy(String),
    /// Structured object from the filter controls
    Structured(Value),
}

impl From<&str> for FilterInput {
    fn from(raw: &str) -> Self {
        Self::Legacy(raw.to_string())
    }
}

impl From<String> for FilterInput {
    fn from(raw: String) -> Self {
        Self::Legacy(raw)
    }
}

impl From<Value> for FilterInput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(raw) => Self::Legacy(raw),
            other => Self::Structured(other),
        }
    }
}

/// Parse filter state into a validated value.
///
/// Never fails: malformed input of any kind yields `None`. The rejection
/// reason is logged at debug level.
pub fn parse(input: impl Into<FilterInput>) -> Option<DateFilterValue> {
    let input = input.into();
    match validate(&input) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(?input, error = %e, "Discarding date filter");
            None
        }
    }
}

fn validate(input: &FilterInput) -> Result<DateFilterValue> {
    match input {
        FilterInput::Legacy(raw) => legacy::parse(raw),
        FilterInput::Structured(Value::String(raw)) => legacy::parse(raw),
        FilterInput::Structured(value) => schema::validate(value),
    }
}

/// Parse a legacy filter string.
#[must_use]
pub fn parse_str(raw: &str) -> Option<DateFilterValue> {
    parse(raw)
}

/// Parse any JSON value: strings take the legacy path, objects the
/// structured one.
#[must_use]
pub fn parse_value(value: Value) -> Option<DateFilterValue> {
    parse(value)
}

/// Parse a JSON document holding either a filter object or a legacy string.
#[must_use]
pub fn parse_json(text: &str) -> Option<DateFilterValue> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => parse(value),
        Err(e) => {
            debug!(error = %e, "Date filter is not valid JSON");
            None
        }
    }
}

/// Parse a percent-encoded URL query parameter holding a legacy string.
#[must_use]
pub fn parse_query_param(raw: &str) -> Option<DateFilterValue> {
    match urlencoding::decode(raw) {
        Ok(decoded) => parse(decoded.into_owned()),
        Err(e) => {
            debug!(error = %e, "Date filter parameter is not valid UTF-8");
            None
        }
    }
}
