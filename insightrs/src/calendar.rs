//! Calendar-day selections and their conversion to absolute UTC time ranges.

use chrono::{
    DateTime, Datelike, Duration, Local, LocalResult, Months, NaiveDate, NaiveDateTime, TimeZone,
    Utc,
};

use crate::error::{InsightError, Result};
use crate::models::TimeRange;

/// Two calendar days picked by the user; either end may still be unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateSelection {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateSelection {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Resolve against `tz`. A half-picked range has no time range yet.
    pub fn to_time_range<Tz: TimeZone>(&self, tz: &Tz) -> Result<Option<TimeRange>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => TimeRange::from_calendar_days(start, end, tz).map(Some),
            _ => Ok(None),
        }
    }

    pub fn to_local_time_range(&self) -> Result<Option<TimeRange>> {
        self.to_time_range(&Local)
    }
}

impl TimeRange {
    /// Span from 00:00:00.000 on `start` to 23:59:59.999 on `end`, both local to `tz`.
    pub fn from_calendar_days<Tz: TimeZone>(
        start: NaiveDate,
        end: NaiveDate,
        tz: &Tz,
    ) -> Result<Self> {
        if end < start {
            return Err(InsightError::Validation(format!(
                "time range ends ({end}) before it starts ({start})"
            )));
        }
        Ok(TimeRange {
            start: start_of_day(start, tz),
            end: end_of_day(end, tz),
        })
    }

    pub fn from_local_calendar_days(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        Self::from_calendar_days(start, end, &Local)
    }
}

pub fn start_of_day<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    resolve_local(tz, day.and_time(chrono::NaiveTime::MIN), Shift::Forward)
}

pub fn end_of_day<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let last_milli = day.and_time(chrono::NaiveTime::MIN) + Duration::days(1)
        - Duration::milliseconds(1);
    resolve_local(tz, last_milli, Shift::Backward)
}

#[derive(Clone, Copy)]
enum Shift {
    Forward,
    Backward,
}

// Midnight can fall into a DST gap in some zones; walk out of the gap
// towards the inside of the day.
fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime, shift: Shift) -> DateTime<Utc> {
    let mut candidate = local;
    for _ in 0..4 {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, latest) => {
                return match shift {
                    Shift::Forward => earliest.with_timezone(&Utc),
                    Shift::Backward => latest.with_timezone(&Utc),
                }
            }
            LocalResult::None => {
                candidate = match shift {
                    Shift::Forward => candidate + Duration::minutes(30),
                    Shift::Backward => candidate - Duration::minutes(30),
                };
            }
        }
    }
    Utc.from_utc_datetime(&local)
}

/// The last seven days, today included.
pub fn last_7_days(today: NaiveDate) -> DateSelection {
    DateSelection::new(today - Duration::days(6), today)
}

/// First to last day of the month containing `today`.
pub fn this_month(today: NaiveDate) -> DateSelection {
    let first = today.with_day(1).unwrap_or(today);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(today);
    DateSelection::new(first, last)
}

/// Six calendar months back from `today`, today included.
pub fn last_6_months(today: NaiveDate) -> DateSelection {
    let start = today.checked_sub_months(Months::new(6)).unwrap_or(today);
    DateSelection::new(start, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_single_day_spans_whole_local_day() {
        let range = TimeRange::from_calendar_days(day(2024, 3, 1), day(2024, 3, 1), &Utc).unwrap();
        assert_eq!(range.start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(range.end.date_naive(), day(2024, 3, 1));
        assert_eq!(
            (range.end.hour(), range.end.minute(), range.end.second()),
            (23, 59, 59)
        );
        assert_eq!(range.end.timestamp_subsec_millis(), 999);
    }

    #[test]
    fn test_local_offset_is_applied_before_utc_conversion() {
        let sao_paulo = FixedOffset::west_opt(3 * 3600).unwrap();
        let range =
            TimeRange::from_calendar_days(day(2024, 3, 1), day(2024, 3, 1), &sao_paulo).unwrap();
        assert_eq!(range.start.to_rfc3339(), "2024-03-01T03:00:00+00:00");
        assert_eq!(range.end.date_naive(), day(2024, 3, 2));
        assert_eq!(range.end.hour(), 2);
        assert_eq!(range.end.timestamp_subsec_millis(), 999);
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        assert!(TimeRange::from_calendar_days(day(2024, 3, 2), day(2024, 3, 1), &Utc).is_err());
    }

    #[test]
    fn test_half_selection_has_no_range() {
        let selection = DateSelection {
            start: Some(day(2024, 3, 1)),
            end: None,
        };
        assert_eq!(selection.to_time_range(&Utc).unwrap(), None);
    }

    #[test]
    fn test_presets() {
        let today = day(2024, 2, 14);
        assert_eq!(last_7_days(today), DateSelection::new(day(2024, 2, 8), today));
        assert_eq!(
            this_month(today),
            DateSelection::new(day(2024, 2, 1), day(2024, 2, 29))
        );
        assert_eq!(
            last_6_months(today),
            DateSelection::new(day(2023, 8, 14), today)
        );
    }
}
