//! Date range resolution and time bucketing
//!
//! Turns the loosely typed request parameters into a concrete
//! [`MetricDateRange`]: UTC instants for querying, the requested timezone for
//! grouping, and a [`Granularity`] that decides the bucket width.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use helpdesk_common::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Days covered when a request names no start date
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Request parameters accepted by the report endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub compare_start_date: Option<String>,
    pub compare_end_date: Option<String>,
    pub timezone: Option<String>,
}

impl ReportParams {
    /// Parameters for an explicit start/end pair
    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start_date: Some(start.into()),
            end_date: Some(end.into()),
            ..Self::default()
        }
    }

    /// Adds a comparison period
    pub fn compared_to(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.compare_start_date = Some(start.into());
        self.compare_end_date = Some(end.into());
        self
    }

    /// Sets the timezone
    pub fn in_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Bucket width for time-series metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    /// Picks the bucket width for a span: finer for short ranges
    pub fn for_span(span: Duration) -> Self {
        if span <= Duration::days(1) {
            Granularity::Hour
        } else if span <= Duration::days(31) {
            Granularity::Day
        } else if span <= Duration::days(92) {
            Granularity::Week
        } else if span <= Duration::days(731) {
            Granularity::Month
        } else {
            Granularity::Year
        }
    }

    /// Formats a local timestamp as this granularity's bucket key
    fn key_for(&self, local: NaiveDateTime) -> String {
        match self {
            Granularity::Hour => local.format("%Y-%m-%d %H:00").to_string(),
            Granularity::Day => local.format("%Y-%m-%d").to_string(),
            Granularity::Week => week_start(local.date()).format("%Y-%m-%d").to_string(),
            Granularity::Month => local.format("%Y-%m").to_string(),
            Granularity::Year => local.format("%Y").to_string(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved reporting interval. `start <= end` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: Tz,
    pub granularity: Granularity,
}

impl MetricDateRange {
    /// Builds a range from UTC instants; granularity follows from the span
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, timezone: Tz) -> Result<Self> {
        if start > end {
            return Err(ReportError::validation_field(
                format!("Start date {start} is after end date {end}"),
                "startDate",
            ));
        }

        Ok(Self {
            start,
            end,
            timezone,
            granularity: Granularity::for_span(end - start),
        })
    }

    /// Whether `at` falls inside the range (both ends inclusive)
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// `at` converted to the range's timezone
    pub fn local(&self, at: DateTime<Utc>) -> DateTime<Tz> {
        at.with_timezone(&self.timezone)
    }

    /// Bucket key the given instant is grouped under
    pub fn bucket_key(&self, at: DateTime<Utc>) -> String {
        self.granularity.key_for(self.local(at).naive_local())
    }

    /// Every bucket key between start and end, in chronological order
    pub fn all_bucket_keys(&self) -> Vec<String> {
        let start = self.local(self.start).naive_local();
        let end = self.local(self.end).naive_local();

        let mut keys = Vec::new();
        match self.granularity {
            Granularity::Hour => {
                let mut cursor = start
                    .with_minute(0)
                    .and_then(|dt| dt.with_second(0))
                    .and_then(|dt| dt.with_nanosecond(0))
                    .unwrap_or(start);
                while cursor <= end {
                    keys.push(self.granularity.key_for(cursor));
                    cursor += Duration::hours(1);
                }
            }
            Granularity::Day => {
                for day in start.date().iter_days().take_while(|d| *d <= end.date()) {
                    keys.push(day.format("%Y-%m-%d").to_string());
                }
            }
            Granularity::Week => {
                let mut cursor = week_start(start.date());
                while cursor <= end.date() {
                    keys.push(cursor.format("%Y-%m-%d").to_string());
                    cursor += Duration::days(7);
                }
            }
            Granularity::Month => {
                let (mut year, mut month) = (start.year(), start.month());
                while (year, month) <= (end.year(), end.month()) {
                    keys.push(format!("{year:04}-{month:02}"));
                    if month == 12 {
                        year += 1;
                        month = 1;
                    } else {
                        month += 1;
                    }
                }
            }
            Granularity::Year => {
                for year in start.year()..=end.year() {
                    keys.push(format!("{year:04}"));
                }
            }
        }

        keys.dedup();
        keys
    }
}

/// A resolved primary period plus the optional comparison period
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRanges {
    pub primary: MetricDateRange,
    pub comparison: Option<MetricDateRange>,
}

/// Normalizes request parameters into concrete date ranges
#[derive(Debug, Clone)]
pub struct DateRangeResolver {
    default_timezone: Tz,
    window_days: i64,
}

impl DateRangeResolver {
    pub fn new(default_timezone: Tz) -> Self {
        Self {
            default_timezone,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    /// Resolver using the configured default timezone
    pub fn from_timezone_name(name: &str) -> Result<Self> {
        Ok(Self::new(parse_timezone(name)?))
    }

    /// Resolve parameters relative to the current time
    pub fn resolve(&self, params: &ReportParams) -> Result<ResolvedRanges> {
        self.resolve_at(params, Utc::now())
    }

    /// Resolve parameters relative to `now`
    pub fn resolve_at(&self, params: &ReportParams, now: DateTime<Utc>) -> Result<ResolvedRanges> {
        let timezone = match params.timezone.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => parse_timezone(name)?,
            _ => self.default_timezone,
        };

        let primary = self.resolve_period(
            params.start_date.as_deref(),
            params.end_date.as_deref(),
            timezone,
            now,
            ("startDate", "endDate"),
        )?;

        let comparison = match (
            params.compare_start_date.as_deref(),
            params.compare_end_date.as_deref(),
        ) {
            (Some(start), Some(end)) => Some(self.resolve_period(
                Some(start),
                Some(end),
                timezone,
                now,
                ("compareStartDate", "compareEndDate"),
            )?),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ReportError::validation_field(
                    "compareEndDate is required when compareStartDate is given",
                    "compareEndDate",
                ))
            }
            (None, Some(_)) => {
                return Err(ReportError::validation_field(
                    "compareStartDate is required when compareEndDate is given",
                    "compareStartDate",
                ))
            }
        };

        debug!(
            start = %primary.start,
            end = %primary.end,
            granularity = %primary.granularity,
            compare = comparison.is_some(),
            "Resolved report date range"
        );

        Ok(ResolvedRanges { primary, comparison })
    }

    fn resolve_period(
        &self,
        start: Option<&str>,
        end: Option<&str>,
        timezone: Tz,
        now: DateTime<Utc>,
        fields: (&str, &str),
    ) -> Result<MetricDateRange> {
        let today = now.with_timezone(&timezone).date_naive();

        let end_date = match end {
            Some(raw) => parse_local_date(raw, timezone, fields.1)?,
            None => today,
        };
        let start_date = match start {
            Some(raw) => parse_local_date(raw, timezone, fields.0)?,
            None => end_date - Duration::days(self.window_days),
        };

        if start_date > end_date {
            return Err(ReportError::validation_field(
                format!("{} ({start_date}) is after {} ({end_date})", fields.0, fields.1),
                fields.0,
            ));
        }

        let start = start_of_day(start_date, timezone);
        let end = end_of_day(end_date, timezone);
        MetricDateRange::new(start, end, timezone)
    }
}

/// Parses an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ReportError::validation_field(format!("Unknown timezone '{name}'"), "timezone"))
}

/// Parses a request date into the calendar date it denotes in `timezone`
fn parse_local_date(raw: &str, timezone: Tz, field: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&timezone).date_naive());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.date());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
        ReportError::validation_field(format!("Invalid date '{raw}' for {field}"), field)
    })
}

fn start_of_day(date: NaiveDate, timezone: Tz) -> DateTime<Utc> {
    local_to_utc(date.and_time(chrono::NaiveTime::MIN), timezone)
}

fn end_of_day(date: NaiveDate, timezone: Tz) -> DateTime<Utc> {
    let last = date
        .and_hms_nano_opt(23, 59, 59, 999_999_999)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
    local_to_utc(last, timezone)
}

fn local_to_utc(naive: NaiveDateTime, timezone: Tz) -> DateTime<Utc> {
    // Midnight can fall into a DST gap; the UTC reading of the same wall
    // clock is close enough for a day boundary.
    match timezone.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => timezone.from_utc_datetime(&naive).with_timezone(&Utc),
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}
