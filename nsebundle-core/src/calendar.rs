//! Trading calendars: the canonical session sequence bars are re-indexed onto.
//!
//! Sessions are timezone-naive dates. Exchange calendars here are weekday
//! calendars with an explicit holiday list; the list comes from config.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CalendarError {
    #[error("unknown calendar '{0}' (known: XNSE, XBOM, 24/7)")]
    UnknownCalendar(String),

    #[error("invalid session range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

pub trait TradingCalendar: Send + Sync {
    fn name(&self) -> &str;

    fn is_session(&self, date: NaiveDate) -> bool;

    /// Ordered sessions in the closed range `[start, end]`.
    fn sessions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, CalendarError> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }
        Ok(start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_session(*d))
            .collect())
    }
}

/// Monday–Friday minus holidays.
#[derive(Debug, Clone)]
pub struct WeekdayCalendar {
    name: String,
    holidays: BTreeSet<NaiveDate>,
}

impl WeekdayCalendar {
    pub fn new(name: impl Into<String>, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            name: name.into(),
            holidays: holidays.into_iter().collect(),
        }
    }
}

impl TradingCalendar for WeekdayCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_session(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }
}

/// Every calendar day is a session.
#[derive(Debug, Clone, Default)]
pub struct AlwaysOpenCalendar;

impl TradingCalendar for AlwaysOpenCalendar {
    fn name(&self) -> &str {
        "24/7"
    }

    fn is_session(&self, _date: NaiveDate) -> bool {
        true
    }
}

/// Resolve a calendar name from config.
///
/// The exchange calendars carry no built-in holiday list: `holidays` is the
/// only source of exchange closures. With none configured, "XNSE" is a plain
/// Mon-Fri calendar and the emitter forward-fills bars onto NSE holidays
/// such as 2024-01-26.
pub fn calendar_by_name(
    name: &str,
    holidays: &[NaiveDate],
) -> Result<Box<dyn TradingCalendar>, CalendarError> {
    match name.to_ascii_uppercase().as_str() {
        "XNSE" | "NSE" => Ok(Box::new(WeekdayCalendar::new(
            "XNSE",
            holidays.iter().copied(),
        ))),
        "XBOM" | "BSE" => Ok(Box::new(WeekdayCalendar::new(
            "XBOM",
            holidays.iter().copied(),
        ))),
        "24/7" | "ALWAYS_OPEN" => Ok(Box::new(AlwaysOpenCalendar)),
        _ => Err(CalendarError::UnknownCalendar(name.to_string())),
    }
}
