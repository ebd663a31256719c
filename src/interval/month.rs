use std::fmt;
use std::str::FromStr;

use jiff::civil::Date;
use jiff::{Span, ToSpan};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
#[error("{0}")]
pub struct ParseError(pub String);

/// A calendar month, without a timezone.  Stored as the first day of the month.
#[derive(PartialEq, Debug, Clone, Copy, Hash, Eq, PartialOrd, Ord)]
pub struct Month(Date);

/// Convenience constructor, panics on an invalid month.  Meant for constants and tests.
pub fn month(year: i16, month: i8) -> Month {
    Month::new(year, month).unwrap()
}

impl Month {
    pub fn new(year: i16, month: i8) -> Result<Month, ParseError> {
        if !(1..=12).contains(&month) {
            return Err(ParseError(format!("Month of year {} is not in 1..=12", month)));
        }
        Date::new(year, month, 1)
            .map(Month)
            .map_err(|e| ParseError(format!("Invalid month {}-{}: {}", year, month, e)))
    }

    /// Return the month that contains this date.
    pub fn containing(date: Date) -> Month {
        Month(date.first_of_month())
    }

    pub fn year(&self) -> i16 {
        self.0.year()
    }

    pub fn month(&self) -> i8 {
        self.0.month()
    }

    pub fn start_date(&self) -> Date {
        self.0
    }

    pub fn end_date(&self) -> Date {
        self.0.last_of_month()
    }

    pub fn next(&self) -> Month {
        Month(self.0.saturating_add(1.month()))
    }

    pub fn previous(&self) -> Month {
        Month(self.0.saturating_sub(1.month()))
    }

    /// Shift by `n` months, negative values go back in time.
    pub fn add(&self, n: i32) -> Result<Month, ParseError> {
        let err = |e: jiff::Error| ParseError(format!("Can't add {} months to {}: {}", n, self, e));
        let span = Span::new().try_months(n).map_err(err)?;
        self.0.checked_add(span).map(Month).map_err(err)
    }

    /// All months from self to end, inclusive of the end month.
    /// Empty if end is before self.
    pub fn up_to(&self, end: Month) -> Vec<Month> {
        let mut res = Vec::new();
        let mut current = *self;
        while current <= end {
            res.push(current);
            let next = current.next();
            if next == current {
                break;
            }
            current = next;
        }
        res
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Month {
    type Err = ParseError;

    /// Parse a month in the `YYYY-MM` format, e.g. `2025-03`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError(format!("Failed parsing {} as a month", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        let year = year.parse::<i16>().map_err(|_| err())?;
        let month = month.parse::<i8>().map_err(|_| err())?;
        Month::new(year, month)
    }
}
