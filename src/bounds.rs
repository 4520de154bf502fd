//! Conversion of validated filters into absolute query bounds.
//!
//! Day boundaries are computed in the filter's timezone and then pinned to
//! UTC, so `dateFrom`/`dateTo` mean the same instant to any consumer.

use chrono::{DateTime, Days, LocalResult, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::filter::DateFilterValue;
use crate::types::{CalendarDate, Period, Timestamp, Timezone};

/// How far past a skipped local time we look for the first valid instant.
const MAX_GAP_MINUTES: i64 = 180;

/// Query variables produced from a date filter. Absent bounds are omitted
/// from the serialized object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<Timestamp>,
}

impl QueryBounds {
    /// Check if neither bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.date_from.is_none() && self.date_to.is_none()
    }

    const fn starting(date_from: Option<Timestamp>) -> Self {
        Self {
            date_from,
            date_to: None,
        }
    }

    const fn ending(date_to: Option<Timestamp>) -> Self {
        Self {
            date_from: None,
            date_to,
        }
    }
}

impl DateFilterValue {
    /// Convert to query bounds relative to the current time.
    #[must_use]
    pub fn to_query_bounds(&self) -> QueryBounds {
        self.to_query_bounds_at(Utc::now())
    }

    /// Convert to query bounds relative to `now`, in the filter's own
    /// timezone.
    #[must_use]
    pub fn to_query_bounds_at(&self, now: DateTime<Utc>) -> QueryBounds {
        match self.tz() {
            Timezone::Utc => self.to_query_bounds_in(&Utc, now),
            Timezone::Local => self.to_query_bounds_in(&chrono::Local, now),
        }
    }

    /// Convert to query bounds using an explicit timezone for "local" day
    /// arithmetic. The filter's own `tz` field is ignored.
    #[must_use]
    pub fn to_query_bounds_in<Tz: TimeZone>(&self, tz: &Tz, now: DateTime<Utc>) -> QueryBounds {
        let start = |date: CalendarDate| start_of_day(tz, date);
        let end = |date: CalendarDate| end_of_day(tz, date);

        match self {
            Self::InLastPeriod { number, period, .. } => {
                let today = now.with_timezone(tz).date_naive();
                let from = periods_before(today, *number, *period)
                    .and_then(|d| resolve(tz, d, NaiveTime::default()));
                if from.is_none() {
                    warn!(number, %period, "Date filter reaches past the supported calendar");
                }
                QueryBounds::starting(from)
            }
            Self::EqualTo { gte, lte, .. } => QueryBounds {
                date_from: start(*gte),
                date_to: end(*lte),
            },
            Self::Between { gte, lte, .. } => QueryBounds {
                date_from: gte.and_then(start),
                date_to: lte.and_then(end),
            },
            Self::After { gt, .. } => QueryBounds::starting(end(*gt)),
            Self::OnOrAfter { gte, .. } => QueryBounds::starting(start(*gte)),
            Self::Before { lt, .. } => QueryBounds::ending(start(*lt)),
            Self::BeforeOrOn { lte, .. } => QueryBounds::ending(end(*lte)),
        }
    }
}

fn start_of_day<Tz: TimeZone>(tz: &Tz, date: CalendarDate) -> Option<Timestamp> {
    resolve(tz, date.to_naive_date()?, NaiveTime::default())
}

fn end_of_day<Tz: TimeZone>(tz: &Tz, date: CalendarDate) -> Option<Timestamp> {
    let last_milli = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?;
    resolve(tz, date.to_naive_date()?, last_milli)
}

/// Step back `number` periods from `today`. Month and year steps clamp to the
/// last day of the target month.
fn periods_before(today: NaiveDate, number: u32, period: Period) -> Option<NaiveDate> {
    let n = u64::from(number);
    match period {
        Period::Days => today.checked_sub_days(Days::new(n)),
        Period::Weeks => today.checked_sub_days(Days::new(n * 7)),
        Period::Months => today.checked_sub_months(Months::new(number)),
        Period::Years => today.checked_sub_months(Months::new(number.checked_mul(12)?)),
    }
}

/// Pin a wall-clock time to an instant. Ambiguous times take the earlier
/// instant; skipped times move forward to the end of the gap.
fn resolve<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> Option<Timestamp> {
    let naive = date.and_time(time);
    let instant = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt),
        LocalResult::None => (1..=MAX_GAP_MINUTES).find_map(|minutes| {
            let shifted = naive.checked_add_signed(chrono::Duration::minutes(minutes))?;
            tz.from_local_datetime(&shifted).earliest()
        }),
    };
    instant.map(|dt| Timestamp::new(dt.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_str;
    use chrono::FixedOffset;

    fn date(s: &str) -> CalendarDate {
        s.parse().unwrap()
    }

    fn ts(s: &str) -> Option<Timestamp> {
        Some(s.parse().unwrap())
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_between_utc() {
        let value = DateFilterValue::Between {
            gte: Some(date("2024-01-01")),
            lte: Some(date("2024-01-31")),
            tz: Timezone::Utc,
        };
        let bounds = value.to_query_bounds();
        assert_eq!(bounds.date_from, ts("2024-01-01T00:00:00.000Z"));
        assert_eq!(bounds.date_to, ts("2024-01-31T23:59:59.999Z"));
        assert_eq!(
            serde_json::to_value(bounds).unwrap(),
            serde_json::json!({
                "dateFrom": "2024-01-01T00:00:00.000Z",
                "dateTo": "2024-01-31T23:59:59.999Z",
            })
        );
    }

    #[test]
    fn test_equal_to_covers_one_day() {
        let value = DateFilterValue::EqualTo {
            gte: date("2024-03-05"),
            lte: date("2024-03-05"),
            tz: Timezone::Utc,
        };
        let bounds = value.to_query_bounds();
        assert_eq!(bounds.date_from, ts("2024-03-05T00:00:00.000Z"));
        assert_eq!(bounds.date_to, ts("2024-03-05T23:59:59.999Z"));
    }

    #[test]
    fn test_open_legacy_range_omits_date_to() {
        let value = parse_str("2024-01-01→all~UTC").unwrap();
        let bounds = value.to_query_bounds();
        assert_eq!(bounds.date_from, ts("2024-01-01T00:00:00.000Z"));
        assert_eq!(bounds.date_to, None);

        let json = serde_json::to_value(bounds).unwrap();
        assert!(json.get("dateTo").is_none());
        assert_eq!(json["dateFrom"], "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_fully_open_legacy_range() {
        let bounds = parse_str("all").unwrap().to_query_bounds();
        assert!(bounds.is_unbounded());
        assert_eq!(serde_json::to_string(&bounds).unwrap(), "{}");
    }

    #[test]
    fn test_single_sided_variants() {
        let after = DateFilterValue::After {
            gt: date("2024-05-10"),
            tz: Timezone::Utc,
        };
        assert_eq!(
            after.to_query_bounds(),
            QueryBounds::starting(ts("2024-05-10T23:59:59.999Z"))
        );

        let on_or_after = DateFilterValue::OnOrAfter {
            gte: date("2024-05-10"),
            tz: Timezone::Utc,
        };
        assert_eq!(
            on_or_after.to_query_bounds(),
            QueryBounds::starting(ts("2024-05-10T00:00:00.000Z"))
        );

        let before = DateFilterValue::Before {
            lt: date("2024-05-10"),
            tz: Timezone::Utc,
        };
        assert_eq!(
            before.to_query_bounds(),
            QueryBounds::ending(ts("2024-05-10T00:00:00.000Z"))
        );

        let before_or_on = DateFilterValue::BeforeOrOn {
            lte: date("2024-05-10"),
            tz: Timezone::Utc,
        };
        assert_eq!(
            before_or_on.to_query_bounds(),
            QueryBounds::ending(ts("2024-05-10T23:59:59.999Z"))
        );
    }

    #[test]
    fn test_in_last_period_days() {
        let value = DateFilterValue::InLastPeriod {
            number: 7,
            period: Period::Days,
            tz: Timezone::Utc,
        };
        let bounds = value.to_query_bounds_at(noon(2024, 3, 15));
        assert_eq!(bounds.date_from, ts("2024-03-08T00:00:00.000Z"));
        assert_eq!(bounds.date_to, None);
    }

    #[test]
    fn test_in_last_period_uses_current_day() {
        let value = DateFilterValue::InLastPeriod {
            number: 7,
            period: Period::Days,
            tz: Timezone::Utc,
        };
        let today = Utc::now().date_naive();
        let expected = Utc
            .from_utc_datetime(&(today - chrono::Duration::days(7)).and_time(NaiveTime::default()));
        let bounds = value.to_query_bounds();
        // Tolerate a run that straddles midnight UTC
        let from = bounds.date_from.unwrap().get();
        assert!(from == expected || from == expected + chrono::Duration::days(1));
    }

    #[test]
    fn test_in_last_period_weeks_months_years() {
        let now = noon(2024, 3, 31);
        let from = |number, period| {
            DateFilterValue::InLastPeriod {
                number,
                period,
                tz: Timezone::Utc,
            }
            .to_query_bounds_at(now)
            .date_from
        };
        assert_eq!(from(2, Period::Weeks), ts("2024-03-17T00:00:00.000Z"));
        // March 31st minus one month clamps to the end of February
        assert_eq!(from(1, Period::Months), ts("2024-02-29T00:00:00.000Z"));
        assert_eq!(from(1, Period::Years), ts("2023-03-31T00:00:00.000Z"));
    }

    #[test]
    fn test_in_last_period_out_of_range() {
        let value = DateFilterValue::InLastPeriod {
            number: u32::MAX,
            period: Period::Years,
            tz: Timezone::Utc,
        };
        assert!(value.to_query_bounds_at(noon(2024, 1, 1)).is_unbounded());
    }

    #[test]
    fn test_explicit_offset() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let value = DateFilterValue::Between {
            gte: Some(date("2024-01-01")),
            lte: Some(date("2024-01-31")),
            tz: Timezone::Local,
        };
        let bounds = value.to_query_bounds_in(&tokyo, noon(2024, 6, 1));
        assert_eq!(bounds.date_from, ts("2023-12-31T15:00:00.000Z"));
        assert_eq!(bounds.date_to, ts("2024-01-31T14:59:59.999Z"));
    }

    #[test]
    fn test_today_follows_the_zone() {
        // 20:00 UTC on the 15th is already the 16th in UTC+9
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 20, 0, 0).unwrap();
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let value = DateFilterValue::InLastPeriod {
            number: 1,
            period: Period::Days,
            tz: Timezone::Local,
        };
        let bounds = value.to_query_bounds_in(&tokyo, now);
        assert_eq!(bounds.date_from, ts("2024-03-14T15:00:00.000Z"));
    }

    #[test]
    fn test_impossible_dates_roll_over() {
        let value = DateFilterValue::OnOrAfter {
            gte: date("2023-02-30"),
            tz: Timezone::Utc,
        };
        assert_eq!(
            value.to_query_bounds().date_from,
            ts("2023-03-02T00:00:00.000Z")
        );
    }

    #[test]
    fn test_local_uses_process_timezone() {
        let value = DateFilterValue::OnOrAfter {
            gte: date("2024-07-01"),
            tz: Timezone::Local,
        };
        let now = noon(2024, 7, 2);
        assert_eq!(
            value.to_query_bounds_at(now),
            value.to_query_bounds_in(&chrono::Local, now)
        );
    }

    mod daylight_saving {
        use super::*;
        use chrono_tz::America::Santiago;

        // Santiago skips 00:00-01:00 on 2024-09-08 and repeats 23:00-24:00
        // on 2024-04-06.

        #[test]
        fn skipped_midnight_moves_to_end_of_gap() {
            let value = parse_str("2024-09-08").unwrap();
            let bounds = value.to_query_bounds_in(&Santiago, noon(2024, 10, 1));
            assert_eq!(bounds.date_from, ts("2024-09-08T04:00:00.000Z"));
            assert_eq!(bounds.date_to, None);
        }

        #[test]
        fn in_last_period_landing_in_gap() {
            let value = DateFilterValue::InLastPeriod {
                number: 7,
                period: Period::Days,
                tz: Timezone::Local,
            };
            let bounds = value.to_query_bounds_in(&Santiago, noon(2024, 9, 15));
            assert_eq!(bounds.date_from, ts("2024-09-08T04:00:00.000Z"));
        }

        #[test]
        fn repeated_hour_takes_earlier_instant() {
            let value = DateFilterValue::BeforeOrOn {
                lte: date("2024-04-06"),
                tz: Timezone::Local,
            };
            let bounds = value.to_query_bounds_in(&Santiago, noon(2024, 5, 1));
            assert_eq!(bounds.date_to, ts("2024-04-07T02:59:59.999Z"));
        }

        #[test]
        fn ordinary_days_keep_their_offset() {
            let value = DateFilterValue::OnOrAfter {
                gte: date("2024-09-09"),
                tz: Timezone::Local,
            };
            let bounds = value.to_query_bounds_in(&Santiago, noon(2024, 10, 1));
            assert_eq!(bounds.date_from, ts("2024-09-09T03:00:00.000Z"));
        }
    }
}
