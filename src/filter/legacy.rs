//! Legacy `<from>[→<to>][~UTC]` filter strings.
//!
//! Older dashboard URLs persisted a date range as one string. Either end may
//! be `all` (unbounded) and the whole thing may carry a `~UTC` suffix. These
//! always describe a `BETWEEN` filter.

use std::sync::LazyLock;

use regex::Regex;

use super::DateFilterValue;
use crate::error::{Error, Result};
use crate::types::{CalendarDate, Timezone};

/// Literal used for an unbounded end.
const UNBOUNDED: &str = "all";
const ARROW: char = '→';
const UTC_SUFFIX: &str = "~UTC";

// Both groups are lazy so that a trailing `~UTC` is taken by the suffix group
// rather than swallowed into the last date.
static LEGACY_RE: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"^(?P<from>[^→]+?)(?:→(?P<to>.+?))?(?:~(?P<tz>UTC))?$") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern"),
    }
});

/// Pieces of a legacy string before the endpoints are validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct LegacyRange<'a> {
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
    pub tz: Timezone,
}

/// Split a legacy string into its endpoints and timezone.
pub(super) fn split(raw: &str) -> Result<LegacyRange<'_>> {
    let caps = LEGACY_RE
        .captures(raw)
        .ok_or_else(|| Error::invalid(format!("'{raw}' is not a legacy date range")))?;

    let endpoint = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty() && *s != UNBOUNDED)
    };

    Ok(LegacyRange {
        from: endpoint("from"),
        to: endpoint("to"),
        tz: if caps.name("tz").is_some() {
            Timezone::Utc
        } else {
            Timezone::Local
        },
    })
}

/// Parse and validate a legacy string into a `BETWEEN` value.
pub(super) fn parse(raw: &str) -> Result<DateFilterValue> {
    let range = split(raw)?;
    let gte = range.from.map(str::parse::<CalendarDate>).transpose()?;
    let lte = range.to.map(str::parse::<CalendarDate>).transpose()?;
    Ok(DateFilterValue::Between {
        gte,
        lte,
        tz: range.tz,
    })
}

/// Inverse of [`parse`].
pub(super) fn encode(gte: Option<CalendarDate>, lte: Option<CalendarDate>, tz: Timezone) -> String {
    let mut out = gte.map_or_else(|| UNBOUNDED.to_string(), |d| d.to_string());
    if let Some(to) = lte {
        out.push(ARROW);
        out.push_str(&to.to_string());
    }
    if tz == Timezone::Utc {
        out.push_str(UTC_SUFFIX);
    }
    out
}
