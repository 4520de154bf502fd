//! Validation of structured filter objects.
//!
//! Each variant is checked in [`DateFilterType::all`] order and the first one
//! whose fields are present, well-formed and consistent wins. A missing
//! `type` matches any variant; a present one must equal the variant's tag.
//! Keys that no variant uses are ignored.

use serde_json::{Map, Value};
use tracing::trace;

use super::DateFilterValue;
use crate::error::{Error, Result};
use crate::types::{CalendarDate, DateFilterType, Period, Timezone};

type Fields = Map<String, Value>;

/// Validate a structured candidate against every variant in precedence order.
pub(super) fn validate(candidate: &Value) -> Result<DateFilterValue> {
    let fields = candidate
        .as_object()
        .ok_or_else(|| Error::invalid(format!("expected an object, got {candidate}")))?;

    let mut rejections = Vec::new();
    for &tag in DateFilterType::all() {
        match match_variant(tag, fields) {
            Ok(value) => {
                trace!(filter_type = %tag, "Matched date filter");
                return Ok(value);
            }
            Err(e) => rejections.push(format!("{tag}: {e}")),
        }
    }
    Err(Error::invalid(rejections.join("; ")))
}

fn match_variant(tag: DateFilterType, fields: &Fields) -> Result<DateFilterValue> {
    check_type(tag, fields)?;
    let tz = timezone(fields)?;

    let value = match tag {
        DateFilterType::InLastPeriod => DateFilterValue::InLastPeriod {
            number: number(fields)?,
            period: period(fields)?,
            tz,
        },
        DateFilterType::EqualTo => {
            let gte = date(fields, "gte")?;
            let lte = date(fields, "lte")?;
            if gte != lte {
                return Err(Error::invalid(format!(
                    "gte ({gte}) and lte ({lte}) must be the same day"
                )));
            }
            DateFilterValue::EqualTo { gte, lte, tz }
        }
        DateFilterType::Between => DateFilterValue::Between {
            gte: Some(date(fields, "gte")?),
            lte: Some(date(fields, "lte")?),
            tz,
        },
        DateFilterType::After => DateFilterValue::After {
            gt: date(fields, "gt")?,
            tz,
        },
        DateFilterType::OnOrAfter => DateFilterValue::OnOrAfter {
            gte: date(fields, "gte")?,
            tz,
        },
        DateFilterType::Before => DateFilterValue::Before {
            lt: date(fields, "lt")?,
            tz,
        },
        DateFilterType::BeforeOrOn => DateFilterValue::BeforeOrOn {
            lte: date(fields, "lte")?,
            tz,
        },
    };
    Ok(value)
}

fn check_type(tag: DateFilterType, fields: &Fields) -> Result<()> {
    match fields.get("type") {
        None => Ok(()),
        Some(Value::String(s)) if s == tag.as_str() => Ok(()),
        Some(other) => Err(Error::invalid(format!("type is {other}"))),
    }
}

fn timezone(fields: &Fields) -> Result<Timezone> {
    match fields.get("tz") {
        None => Ok(Timezone::default()),
        Some(Value::String(s)) => s.parse(),
        Some(other) => Err(Error::invalid(format!("tz must be a string, got {other}"))),
    }
}

fn date(fields: &Fields, key: &str) -> Result<CalendarDate> {
    match fields.get(key) {
        Some(Value::String(s)) => s.parse(),
        Some(other) => Err(Error::invalid(format!("{key} must be a string, got {other}"))),
        None => Err(Error::invalid(format!("{key} is missing"))),
    }
}

fn period(fields: &Fields) -> Result<Period> {
    match fields.get("period") {
        Some(Value::String(s)) => s.parse(),
        Some(other) => Err(Error::invalid(format!("period must be a string, got {other}"))),
        None => Err(Error::invalid("period is missing")),
    }
}

/// Coerce `number` to a positive integer.
///
/// Filter state built from form inputs often carries numbers as strings, so
/// numeric strings (trimmed, empty meaning zero), booleans and single-element
/// arrays are coerced before the positivity check.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn number(fields: &Fields) -> Result<u32> {
    let n = fields
        .get("number")
        .and_then(coerce_number)
        .filter(|n| n.is_finite())
        .ok_or_else(|| Error::invalid("number is missing or not numeric"))?;
    if n.fract() != 0.0 {
        return Err(Error::invalid(format!("number must be an integer, got {n}")));
    }
    if n <= 0.0 || n > f64::from(u32::MAX) {
        return Err(Error::invalid(format!("number must be positive, got {n}")));
    }
    Ok(n as u32)
}

/// Numeric value of a JSON value, `None` where the result would be `NaN`.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => coerce_numeric_str(s),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        Value::Null => Some(0.0),
        Value::Array(items) => match items.as_slice() {
            [] => Some(0.0),
            // A lone element is read through its string form, where booleans
            // are words rather than 0/1
            [Value::Bool(_)] => None,
            [single] => coerce_number(single),
            _ => None,
        },
        Value::Object(_) => None,
    }
}

fn coerce_numeric_str(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Some(0.0)
    } else {
        trimmed.parse().ok()
    }
}
