//! Forcing-month selection by observed tidal range.
//!
//! Ranks the calendar months of a water-level record by the spread of a
//! rolling window over the de-meaned series and picks two months to use as
//! canonical "low" and "high" forcing scenarios.
//!
//! # Algorithm
//!
//! 1. Group finite samples by calendar month and subtract each month's mean.
//! 2. For each month take the min and max of its last `window` samples.
//!    Months with fewer than `window` samples of their own are skipped, so a
//!    short month never inherits extremes from the month before it.
//! 4. Sort months by `max − min` ascending.

use super::TideRecord;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for month selection.
#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    /// Not enough months with a complete rolling window
    #[error("need at least 2 ranked months, found {found}")]
    NotEnoughMonths { found: usize },

    /// Rolling window must hold at least one sample
    #[error("rolling window must be at least 1 sample")]
    InvalidWindow,

    /// Unknown selection policy name
    #[error("invalid value '{value}', expected one of: {allowed}")]
    InvalidValue { value: String, allowed: &'static str },
}

/// A calendar month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
}

impl CalendarMonth {
    /// Month containing an instant.
    pub fn of(time: DateTime<Utc>) -> Self {
        Self {
            year: time.year(),
            month: time.month(),
        }
    }

    /// First day of the month.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Last day of the month.
    pub fn last_day(&self) -> Option<NaiveDate> {
        self.first_day()?
            .checked_add_months(Months::new(1))?
            .checked_sub_days(Days::new(1))
    }

    /// Half-open span `[first midnight, next month's first midnight)` in UTC.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.first_day()?;
        let next = first.checked_add_months(Months::new(1))?;
        Some((
            Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0)?),
            Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0)?),
        ))
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Rolling extremes of one month.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonthlyRange {
    pub month: CalendarMonth,
    /// Rolling minimum of the de-meaned series at the month's last sample
    pub low: f64,
    /// Rolling maximum of the de-meaned series at the month's last sample
    pub high: f64,
}

impl MonthlyRange {
    /// Tidal range `high − low`.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Which ranked month becomes the "high" scenario.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MonthSelection {
    /// Second-smallest range
    #[default]
    SecondLowest,
    /// Largest range
    Widest,
}

impl FromStr for MonthSelection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "second-lowest" | "second_lowest" => Ok(MonthSelection::SecondLowest),
            "widest" => Ok(MonthSelection::Widest),
            _ => Err(SelectionError::InvalidValue {
                value: s.to_string(),
                allowed: "second-lowest, widest",
            }),
        }
    }
}

/// The two months chosen as forcing scenarios.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForcingMonths {
    pub low: MonthlyRange,
    pub high: MonthlyRange,
}

/// Month selector settings.
#[derive(Clone, Copy, Debug)]
pub struct ExtremumSelector {
    /// Rolling window length in samples
    pub window: usize,
    /// Policy for the "high" month
    pub high: MonthSelection,
}

impl Default for ExtremumSelector {
    fn default() -> Self {
        Self {
            window: 30,
            high: MonthSelection::SecondLowest,
        }
    }
}

impl ExtremumSelector {
    /// Set the rolling window length.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Set the "high" month policy.
    pub fn with_high(mut self, high: MonthSelection) -> Self {
        self.high = high;
        self
    }

    /// Rank the record's months and pick the forcing months.
    pub fn select(&self, record: &TideRecord) -> Result<ForcingMonths, SelectionError> {
        if self.window == 0 {
            return Err(SelectionError::InvalidWindow);
        }

        let mut ranked = monthly_ranges(record, self.window);
        if ranked.len() < 2 {
            return Err(SelectionError::NotEnoughMonths {
                found: ranked.len(),
            });
        }
        ranked.sort_by(|a, b| a.range().total_cmp(&b.range()));

        let low = ranked[0];
        let high = match self.high {
            MonthSelection::SecondLowest => ranked[1],
            MonthSelection::Widest => ranked[ranked.len() - 1],
        };

        log::info!(
            "forcing months: low {} (range {:.3}), high {} (range {:.3})",
            low.month,
            low.range(),
            high.month,
            high.range()
        );

        Ok(ForcingMonths { low, high })
    }
}

/// Rank a record's months using the selector's settings.
pub fn select_months(
    record: &TideRecord,
    selector: &ExtremumSelector,
) -> Result<ForcingMonths, SelectionError> {
    selector.select(record)
}

/// Rolling extremes of each calendar month, in chronological order.
pub fn monthly_ranges(record: &TideRecord, window: usize) -> Vec<MonthlyRange> {
    if window == 0 {
        return Vec::new();
    }

    // De-mean each month
    let mut months: Vec<(CalendarMonth, usize, usize)> = Vec::new(); // (month, start, end)
    let mut series: Vec<f64> = Vec::new();
    let mut group: Vec<f64> = Vec::new();
    let mut current: Option<CalendarMonth> = None;

    let mut flush = |month: CalendarMonth, group: &mut Vec<f64>, series: &mut Vec<f64>| {
        let mean = group.iter().sum::<f64>() / group.len() as f64;
        let start = series.len();
        series.extend(group.drain(..).map(|v| v - mean));
        months.push((month, start, series.len()));
    };

    for p in record.finite() {
        let month = CalendarMonth::of(p.time);
        if let Some(cur) = current {
            if cur != month {
                flush(cur, &mut group, &mut series);
            }
        }
        current = Some(month);
        group.push(p.value);
    }
    if let Some(cur) = current {
        flush(cur, &mut group, &mut series);
    }

    months
        .into_iter()
        .filter(|&(month, start, end)| {
            let own = end - start;
            if own < window {
                log::debug!("skipping {}: {} samples, window {}", month, own, window);
            }
            own >= window
        })
        .map(|(month, _, end)| {
            let tail = &series[end - window..end];
            MonthlyRange {
                month,
                low: tail.iter().copied().fold(f64::INFINITY, f64::min),
                high: tail.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect()
}
