//! Calendar periods used to walk a download range month by month.

use crate::fetch::error::FetchError;
use chrono::NaiveDate;
use std::fmt;
use std::fmt::{Display, Formatter};

/// A calendar month, stored as `(year, month)` so the derived ordering is chronological.
///
/// # Examples
///
/// ```
/// use era5land::Month;
///
/// let feb = Month::new(2, 2024);
/// assert_eq!(feb.days_in_month(), 29);
/// assert_eq!(feb.to_string(), "2024-02");
/// assert_eq!(Month(2023, 12).next(), Month(2024, 1));
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Month(pub i32, pub u32);
impl Month {
    pub fn year(self) -> i32 {
        self.0
    }
    pub fn month(self) -> u32 {
        self.1
    }
    pub fn new(month: u32, year: i32) -> Self {
        Self(year, month)
    }

    /// Returns `self` if the month number lies in `1..=12` and the month and the one
    /// after it are representable dates.
    pub fn validate(self) -> Result<Self, FetchError> {
        if (1..=12).contains(&self.1) && self.days_in_month() > 0 {
            Ok(self)
        } else {
            Err(FetchError::InvalidMonth {
                year: self.0,
                month: self.1,
            })
        }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0, self.1, 1)
    }

    /// The following month, rolling over `12 -> (year + 1, 1)`.
    pub fn next(self) -> Month {
        if self.1 >= 12 {
            Month(self.0 + 1, 1)
        } else {
            Month(self.0, self.1 + 1)
        }
    }

    /// Number of days in the month, leap years included. Zero for an invalid month.
    pub fn days_in_month(self) -> u32 {
        match (self.first_day(), self.next().first_day()) {
            (Some(first), Some(following)) => {
                following.signed_duration_since(first).num_days() as u32
            }
            _ => 0,
        }
    }

    /// Zero-padded day numbers `"01"..="DD"`.
    pub fn day_strings(self) -> Vec<String> {
        (1..=self.days_in_month())
            .map(|day| format!("{:02}", day))
            .collect()
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

/// Inclusive range of months, iterated in chronological order.
#[derive(Debug, Clone)]
pub struct MonthRange {
    next: Option<Month>,
    end: Month,
}

impl MonthRange {
    /// Creates a range from `start` to `end`, both included.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidMonth`] if either month number is outside `1..=12`,
    /// and [`FetchError::InvalidPeriod`] if `start` comes after `end`.
    pub fn new(start: Month, end: Month) -> Result<Self, FetchError> {
        let start = start.validate()?;
        let end = end.validate()?;
        if start > end {
            return Err(FetchError::InvalidPeriod { start, end });
        }
        Ok(Self {
            next: Some(start),
            end,
        })
    }

    fn remaining(&self) -> usize {
        match self.next {
            Some(current) => {
                let years = (self.end.0 - current.0) as i64;
                let months = self.end.1 as i64 - current.1 as i64;
                (years * 12 + months + 1).max(0) as usize
            }
            None => 0,
        }
    }
}

impl Iterator for MonthRange {
    type Item = Month;

    fn next(&mut self) -> Option<Month> {
        let current = self.next?;
        self.next = if current < self.end {
            Some(current.next())
        } else {
            None
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MonthRange {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_in_month_handles_leap_years() {
        assert_eq!(Month(2023, 2).days_in_month(), 28);
        assert_eq!(Month(2024, 2).days_in_month(), 29);
        assert_eq!(Month(1900, 2).days_in_month(), 28);
        assert_eq!(Month(2000, 2).days_in_month(), 29);
        assert_eq!(Month(2010, 4).days_in_month(), 30);
        assert_eq!(Month(2010, 12).days_in_month(), 31);
        assert_eq!(Month(2010, 13).days_in_month(), 0);
    }

    #[test]
    fn test_day_strings_are_zero_padded() {
        let days = Month(2010, 2).day_strings();
        assert_eq!(days.len(), 28);
        assert_eq!(days.first().map(String::as_str), Some("01"));
        assert_eq!(days.last().map(String::as_str), Some("28"));
    }

    #[test]
    fn test_range_rolls_over_year_boundary() -> Result<(), FetchError> {
        let months: Vec<Month> = MonthRange::new(Month(2009, 11), Month(2010, 2))?.collect();
        assert_eq!(
            months,
            vec![
                Month(2009, 11),
                Month(2009, 12),
                Month(2010, 1),
                Month(2010, 2)
            ]
        );
        Ok(())
    }

    #[test]
    fn test_range_len_matches_iteration() -> Result<(), FetchError> {
        let range = MonthRange::new(Month(2009, 1), Month(2019, 12))?;
        assert_eq!(range.len(), 132);
        assert_eq!(range.count(), 132);

        let single = MonthRange::new(Month(2015, 6), Month(2015, 6))?;
        assert_eq!(single.len(), 1);
        Ok(())
    }

    #[test]
    fn test_range_rejects_reversed_or_invalid_months() {
        assert!(matches!(
            MonthRange::new(Month(2011, 1), Month(2010, 12)),
            Err(FetchError::InvalidPeriod { .. })
        ));
        assert!(matches!(
            MonthRange::new(Month(2010, 0), Month(2010, 12)),
            Err(FetchError::InvalidMonth { month: 0, .. })
        ));
        assert!(matches!(
            MonthRange::new(Month(2010, 1), Month(2010, 13)),
            Err(FetchError::InvalidMonth { month: 13, .. })
        ));
    }

    #[test]
    fn test_range_rejects_years_without_calendar() {
        assert_eq!(Month(i32::MAX, 1).days_in_month(), 0);
        assert!(matches!(
            MonthRange::new(Month(2010, 1), Month(i32::MAX, 1)),
            Err(FetchError::InvalidMonth { year: i32::MAX, month: 1 })
        ));
        assert!(Month(262_142, 11).validate().is_ok());
        assert!(Month(262_142, 12).validate().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Month(987, 1).to_string(), "0987-01");
        assert_eq!(Month(2010, 3).to_string(), "2010-03");
    }
}
