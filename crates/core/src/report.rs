#![forbid(unsafe_code)]

use crate::ids::TerritoryId;
use serde::Serialize;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

pub const REPORT_COMPLETIONS_PER_TERRITORY: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateError {
    InvalidDate,
    InvalidOffset,
    EmptyRange,
}

impl DateError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidDate => "date must be formatted as YYYY-MM-DD",
            Self::InvalidOffset => "offset must be formatted as +HH:MM or -HH:MM",
            Self::EmptyRange => "start date must not be after end date",
        }
    }
}

pub fn parse_date(value: &str) -> Result<Date, DateError> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| DateError::InvalidDate)
}

pub fn parse_offset(value: &str) -> Result<UtcOffset, DateError> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        value,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|_| DateError::InvalidOffset)
}

// Date-only descriptions have nothing that can fail to format.
pub fn format_iso_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Calendar date as shown to users: `dd/mm/yyyy`.
pub fn format_local_date(date: Date) -> String {
    date.format(format_description!("[day]/[month]/[year]"))
        .unwrap_or_default()
}

/// Inclusive millisecond window `[start 00:00:00.000, end 23:59:59.999]` at a fixed offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportRange {
    pub start_ms: i64,
    pub end_ms: i64,
    pub offset: UtcOffset,
}

impl ReportRange {
    pub fn new(start: Date, end: Date, offset: UtcOffset) -> Result<Self, DateError> {
        if start > end {
            return Err(DateError::EmptyRange);
        }
        let start_ms = to_ms(PrimitiveDateTime::new(start, Time::MIDNIGHT).assume_offset(offset));
        let end_of_day = Time::from_hms_milli(23, 59, 59, 999).map_err(|_| DateError::InvalidDate)?;
        let end_ms = to_ms(PrimitiveDateTime::new(end, end_of_day).assume_offset(offset));
        Ok(Self {
            start_ms,
            end_ms,
            offset,
        })
    }

    pub fn contains(&self, ts_ms: i64) -> bool {
        (self.start_ms..=self.end_ms).contains(&ts_ms)
    }

    pub fn local_date(&self, ts_ms: i64) -> Date {
        ms_to_datetime(ts_ms).to_offset(self.offset).date()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TerritoryReportRow {
    pub territory_id: TerritoryId,
    pub name: String,
    pub conclusoes: Vec<String>,
}

/// Up to three most recent completions inside the range, most recent first, as local dates.
pub fn recent_completion_dates(range: &ReportRange, completed_at_ms: &[i64]) -> Vec<String> {
    let mut within: Vec<i64> = completed_at_ms
        .iter()
        .copied()
        .filter(|ts| range.contains(*ts))
        .collect();
    within.sort_unstable_by(|a, b| b.cmp(a));
    within
        .into_iter()
        .take(REPORT_COMPLETIONS_PER_TERRITORY)
        .map(|ts| format_local_date(range.local_date(ts)))
        .collect()
}

fn to_ms(value: OffsetDateTime) -> i64 {
    let ms = value.unix_timestamp_nanos() / 1_000_000i128;
    i64::try_from(ms).unwrap_or(if ms < 0 { i64::MIN } else { i64::MAX })
}

fn ms_to_datetime(ts_ms: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ts_ms) * 1_000_000i128)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

pub fn now_ms() -> i64 {
    to_ms(OffsetDateTime::now_utc()).max(0)
}

/// Millisecond timestamp of a local wall-clock instant; used by callers that
/// record events on a given calendar day.
pub fn date_time_ms(date: Date, time: Time, offset: UtcOffset) -> i64 {
    to_ms(PrimitiveDateTime::new(date, time).assume_offset(offset))
}
