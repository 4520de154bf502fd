//! Domain types shared by the filter codec.
//!
//! Each type here owns its wire spelling: the strings accepted from filter
//! state and URL parameters, and the strings written back when a value is
//! serialized. Keeping that in one place means the parser and the serializer
//! can never disagree about what `"UTC"` or `"BEFORE_OR_ON"` looks like.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, SecondsFormat, Utc};
use derive_more::{From, Into};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

// ============================================================================
// CalendarDate
// ============================================================================

/// A civil date in `YYYY-MM-DD` form.
///
/// Only the shape is checked: month must be `01`-`12` and day `01`-`31`, so
/// `2024-02-30` is accepted. Resolving such a date to a real day happens in
/// [`CalendarDate::to_naive_date`], which rolls the overflow into the next
/// month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDate {
    year: i32,
    month: u32,
    day: u32,
}

impl CalendarDate {
    /// Create a calendar date, returning `None` when a component is out of
    /// the accepted syntactic range.
    #[must_use]
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        let valid = (0..=9999).contains(&year)
            && (1..=12).contains(&month)
            && (1..=31).contains(&day);
        valid.then_some(Self { year, month, day })
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    #[must_use]
    pub const fn day(self) -> u32 {
        self.day
    }

    /// Resolve to a real date. Days past the end of the month roll over, so
    /// `2024-02-30` becomes March 1st.
    #[must_use]
    pub fn to_naive_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)?
            .checked_add_days(Days::new(u64::from(self.day - 1)))
    }
}

impl FromStr for CalendarDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let shaped = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !shaped {
            return Err(Error::invalid(format!("'{s}' is not a YYYY-MM-DD date")));
        }

        // All remaining bytes are ASCII digits, so slicing and parsing cannot fail.
        let year = s[0..4].parse().unwrap_or_default();
        let month = s[5..7].parse().unwrap_or_default();
        let day = s[8..10].parse().unwrap_or_default();

        Self::new(year, month, day)
            .ok_or_else(|| Error::invalid(format!("'{s}' has an out-of-range month or day")))
    }
}

impl TryFrom<String> for CalendarDate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CalendarDate> for String {
    fn from(date: CalendarDate) -> Self {
        date.to_string()
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

// ============================================================================
// Timezone
// ============================================================================

/// Timezone in which start/end of day and "today" are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timezone {
    /// The process-local timezone
    #[default]
    #[serde(rename = "local")]
    Local,
    /// Coordinated Universal Time
    #[serde(rename = "UTC")]
    Utc,
}

impl Timezone {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Utc => "UTC",
        }
    }
}

impl FromStr for Timezone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(Self::Local),
            "UTC" => Ok(Self::Utc),
            other => Err(Error::invalid(format!("unknown timezone '{other}'"))),
        }
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Period
// ============================================================================

/// Unit for "in the last N periods" filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Days,
    Weeks,
    Months,
    Years,
}

impl Period {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
            Self::Years => "years",
        }
    }

    /// Singular form, for labels like "last 1 day".
    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Days => "day",
            Self::Weeks => "week",
            Self::Months => "month",
            Self::Years => "year",
        }
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "days" => Ok(Self::Days),
            "weeks" => Ok(Self::Weeks),
            "months" => Ok(Self::Months),
            "years" => Ok(Self::Years),
            other => Err(Error::invalid(format!("unknown period '{other}'"))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DateFilterType
// ============================================================================

/// The `type` tag of a date filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateFilterType {
    InLastPeriod,
    EqualTo,
    Between,
    After,
    OnOrAfter,
    Before,
    BeforeOrOn,
}

impl DateFilterType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InLastPeriod => "IN_LAST_PERIOD",
            Self::EqualTo => "EQUAL_TO",
            Self::Between => "BETWEEN",
            Self::After => "AFTER",
            Self::OnOrAfter => "ON_OR_AFTER",
            Self::Before => "BEFORE",
            Self::BeforeOrOn => "BEFORE_OR_ON",
        }
    }

    /// All tags, in the order structured input is matched against them.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::InLastPeriod,
            Self::EqualTo,
            Self::Between,
            Self::After,
            Self::OnOrAfter,
            Self::Before,
            Self::BeforeOrOn,
        ]
    }
}

impl FromStr for DateFilterType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| Error::invalid(format!("unknown filter type '{s}'")))
    }
}

impl fmt::Display for DateFilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Timestamp
// ============================================================================

/// An absolute instant, written as UTC ISO-8601 with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    #[must_use]
    pub const fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    #[must_use]
    pub const fn get(self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| Error::InvalidTimestamp(format!("'{s}': {e}")))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod calendar_date {
        use super::*;

        #[test]
        fn parses_well_formed_dates() {
            let date: CalendarDate = "2024-03-05".parse().unwrap();
            assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 5));
            assert_eq!(date.to_string(), "2024-03-05");
        }

        #[test]
        fn accepts_syntactically_valid_impossible_dates() {
            let date: CalendarDate = "2024-02-30".parse().unwrap();
            assert_eq!(
                date.to_naive_date(),
                NaiveDate::from_ymd_opt(2024, 3, 1)
            );
        }

        #[test]
        fn rejects_malformed_dates() {
            for bad in [
                "2024-1-05",
                "2024-13-01",
                "2024-00-10",
                "2024-01-32",
                "2024-01-00",
                "24-01-01",
                "2024/01/01",
                "2024-01-01T00:00",
                "all",
                "",
                "２０２４-01-01",
            ] {
                assert!(bad.parse::<CalendarDate>().is_err(), "{bad} should be rejected");
            }
        }

        #[test]
        fn serde_uses_string_form() {
            let date: CalendarDate = serde_json::from_str("\"2024-12-31\"").unwrap();
            assert_eq!(serde_json::to_string(&date).unwrap(), "\"2024-12-31\"");
            assert!(serde_json::from_str::<CalendarDate>("\"2024-12-32\"").is_err());
        }
    }

    mod enums {
        use super::*;

        #[test]
        fn timezone_spellings() {
            assert_eq!("UTC".parse::<Timezone>().unwrap(), Timezone::Utc);
            assert_eq!("local".parse::<Timezone>().unwrap(), Timezone::Local);
            assert!("utc".parse::<Timezone>().is_err());
            assert_eq!(Timezone::default(), Timezone::Local);
            assert_eq!(serde_json::to_string(&Timezone::Utc).unwrap(), "\"UTC\"");
        }

        #[test]
        fn period_spellings() {
            assert_eq!("weeks".parse::<Period>().unwrap(), Period::Weeks);
            assert!("Weeks".parse::<Period>().is_err());
            assert_eq!(Period::Years.to_string(), "years");
            assert_eq!(Period::Months.singular(), "month");
        }

        #[test]
        fn filter_type_round_trips_through_wire_name() {
            for tag in DateFilterType::all() {
                assert_eq!(tag.as_str().parse::<DateFilterType>().unwrap(), *tag);
                let json = serde_json::to_string(tag).unwrap();
                assert_eq!(json, format!("\"{}\"", tag.as_str()));
            }
            assert!("BETWEENISH".parse::<DateFilterType>().is_err());
        }
    }

    mod timestamp {
        use super::*;
        use chrono::TimeZone;

        #[test]
        fn displays_with_millis_and_z() {
            let ts = Timestamp::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
            assert_eq!(ts.to_string(), "2024-01-01T00:00:00.000Z");
        }

        #[test]
        fn parses_offsets_into_utc() {
            let ts: Timestamp = "2024-01-01T02:00:00+02:00".parse().unwrap();
            assert_eq!(ts.to_string(), "2024-01-01T00:00:00.000Z");
            assert!("yesterday".parse::<Timestamp>().is_err());
        }

        #[test]
        fn serializes_as_string() {
            let ts: Timestamp = "2024-01-31T23:59:59.999Z".parse().unwrap();
            assert_eq!(
                serde_json::to_string(&ts).unwrap(),
                "\"2024-01-31T23:59:59.999Z\""
            );
        }
    }
}
