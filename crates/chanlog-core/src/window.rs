//! Inclusive date window used to filter threads and messages.
//!
//! Bounds are given as `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM[:SS]` and read as UTC.
//! A date-only start means the first instant of that day, a date-only end
//! the last millisecond of that day.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Which side of the window a bound belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateWindow {
    /// Window without bounds on either side.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<Self, AppError> {
        if let (Some(f), Some(t)) = (from, to)
            && f > t
        {
            return Err(AppError::ValidationError(format!(
                "window start {f} is after window end {t}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Parse optional user-supplied bounds. Empty strings count as absent.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, AppError> {
        let from = from
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_bound(s, Bound::Start))
            .transpose()?;
        let to = to
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_bound(s, Bound::End))
            .transpose()?;
        Self::new(from, to)
    }

    /// True if `t` lies inside the window, bounds included.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.from.is_none_or(|f| t >= f) && self.to.is_none_or(|e| t <= e)
    }
}

/// Parse one bound, normalizing date-only values per side.
pub fn parse_bound(raw: &str, bound: Bound) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.and_utc());
        }
    }

    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
        AppError::ValidationError(format!(
            "unparseable date '{raw}': expected YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS]"
        ))
    })?;

    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
            .ok_or_else(|| AppError::Generic("invalid end-of-day time".into()))?,
    };
    Ok(date.and_time(time).and_utc())
}
