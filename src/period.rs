use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use thiserror::Error;

/// Reporting window for the statistics views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Monthly { year: i32, month: u32 },
    Yearly { year: i32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("invalid period {0:?}; expected YYYY-MM or YYYY")]
    Format(String),
    #[error("month must be between 1 and 12, got {0}")]
    Month(u32),
    #[error("year {0} is out of range")]
    Year(i32),
}

impl Period {
    pub fn monthly(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::Month(month));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(PeriodError::Year(year));
        }
        Ok(Period::Monthly { year, month })
    }

    pub fn yearly(year: i32) -> Result<Self, PeriodError> {
        if NaiveDate::from_ymd_opt(year, 12, 31).is_none() {
            return Err(PeriodError::Year(year));
        }
        Ok(Period::Yearly { year })
    }

    pub fn current_month() -> Self {
        let today = Local::now().date_naive();
        Period::Monthly {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn year(&self) -> i32 {
        match *self {
            Period::Monthly { year, .. } | Period::Yearly { year } => year,
        }
    }

    pub fn month(&self) -> Option<u32> {
        match *self {
            Period::Monthly { month, .. } => Some(month),
            Period::Yearly { .. } => None,
        }
    }

    /// Inclusive first and last day.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            Period::Monthly { year, month } => {
                let start = ymd(year, month, 1);
                let end = if month == 12 {
                    ymd(year, 12, 31)
                } else {
                    ymd(year, month + 1, 1).pred_opt().unwrap_or(start)
                };
                (start, end)
            }
            Period::Yearly { year } => (ymd(year, 1, 1), ymd(year, 12, 31)),
        }
    }
}

// Constructors only admit years chrono can represent, so this never hits the fallback.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

impl Default for Period {
    fn default() -> Self {
        Self::current_month()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Monthly { year, month } => write!(f, "{year:04}-{month:02}"),
            Period::Yearly { year } => write!(f, "{year:04}"),
        }
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || PeriodError::Format(s.to_string());
        match s.split_once('-') {
            Some((y, m)) => {
                if y.len() != 4 || m.is_empty() || m.len() > 2 {
                    return Err(bad());
                }
                let year = y.parse::<i32>().map_err(|_| bad())?;
                let month = m.parse::<u32>().map_err(|_| bad())?;
                Period::monthly(year, month)
            }
            None => {
                if s.len() != 4 {
                    return Err(bad());
                }
                let year = s.parse::<i32>().map_err(|_| bad())?;
                Period::yearly(year)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn monthly_range_ends_on_last_day() {
        let p: Period = "2024-02".parse().unwrap();
        assert_eq!(p.date_range(), (d(2024, 2, 1), d(2024, 2, 29)));
        let p: Period = "2023-02".parse().unwrap();
        assert_eq!(p.date_range().1, d(2023, 2, 28));
        let p: Period = "2025-12".parse().unwrap();
        assert_eq!(p.date_range(), (d(2025, 12, 1), d(2025, 12, 31)));
        let p: Period = "2025-4".parse().unwrap();
        assert_eq!(p.date_range().1, d(2025, 4, 30));
    }

    #[test]
    fn yearly_range_covers_the_year() {
        let p: Period = "2025".parse().unwrap();
        assert_eq!(p, Period::Yearly { year: 2025 });
        assert_eq!(p.date_range(), (d(2025, 1, 1), d(2025, 12, 31)));
        assert_eq!(p.month(), None);
    }

    #[test]
    fn rejects_malformed_periods() {
        assert_eq!("2025-13".parse::<Period>(), Err(PeriodError::Month(13)));
        assert!(matches!("25-01".parse::<Period>(), Err(PeriodError::Format(_))));
        assert!(matches!("march".parse::<Period>(), Err(PeriodError::Format(_))));
        assert!(matches!("2025-".parse::<Period>(), Err(PeriodError::Format(_))));
    }

    #[test]
    fn display_round_trips() {
        for s in ["2025-03", "1999"] {
            assert_eq!(s.parse::<Period>().unwrap().to_string(), s);
        }
    }
}
