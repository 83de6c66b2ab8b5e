use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// A calendar month, written as `MM-YYYY` on the wire.
///
/// Persisted as the first day of the month so ordering in the database
/// matches ordering here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(NaiveDate);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePeriodError {
    #[error("expected MM-YYYY, got {0:?}")]
    Layout(String),
    #[error("month out of range: {0}")]
    Month(u32),
    #[error("year out of range: {0}")]
    Year(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("invalid start_date format: {0}")]
    InvalidStart(ParsePeriodError),
    #[error("invalid end_date format: {0}")]
    InvalidEnd(ParsePeriodError),
    #[error("end_date must be after start_date")]
    EndNotAfterStart,
}

impl Period {
    pub fn new(month: u32, year: i32) -> Result<Self, ParsePeriodError> {
        if !(1..=12).contains(&month) {
            return Err(ParsePeriodError::Month(month));
        }
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or(ParsePeriodError::Year(year))
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for Period {
    fn from(date: NaiveDate) -> Self {
        // Day is dropped: storage only ever holds month granularity.
        Self(date.with_day(1).unwrap_or(date))
    }
}

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let layout_err = || ParsePeriodError::Layout(raw.to_string());

        let (month, year) = raw.split_once('-').ok_or_else(layout_err)?;
        if month.len() != 2 || year.len() != 4 {
            return Err(layout_err());
        }
        if !month.bytes().chain(year.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(layout_err());
        }

        let month: u32 = month.parse().map_err(|_| layout_err())?;
        let year: i32 = year.parse().map_err(|_| layout_err())?;
        Self::new(month, year)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:04}", self.month(), self.year())
    }
}

/// Checks a `start_date`/`end_date` pair and returns the parsed periods.
///
/// An empty `end` is treated the same as a missing one.
pub fn validate_period(
    start: &str,
    end: Option<&str>,
) -> Result<(Period, Option<Period>), PeriodError> {
    let start = start.parse::<Period>().map_err(PeriodError::InvalidStart)?;

    let end = match end.filter(|raw| !raw.is_empty()) {
        None => return Ok((start, None)),
        Some(raw) => raw.parse::<Period>().map_err(PeriodError::InvalidEnd)?,
    };

    if end <= start {
        return Err(PeriodError::EndNotAfterStart);
    }

    Ok((start, Some(end)))
}
