use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Budget year. A budget year named `2025` with a start month of 3 runs from
/// 2025-03-01 to 2026-02-28.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiscalYear(pub i32);

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FiscalYear {
    pub fn year(self) -> i32 {
        self.0
    }

    /// The budget year a calendar date falls in. `start_month` outside 1..=12
    /// is treated as January.
    pub fn containing(date: NaiveDate, start_month: u32) -> Self {
        let start_month = if (1..=12).contains(&start_month) { start_month } else { 1 };
        if date.month() >= start_month {
            FiscalYear(date.year())
        } else {
            FiscalYear(date.year() - 1)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ~ {}",
            self.start.format("%Y.%m.%d"),
            self.end.format("%Y.%m.%d")
        )
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Share of the range elapsed on `today`, clamped to `[0, 1]`.
    pub fn progress(self, today: NaiveDate) -> Decimal {
        if today < self.start {
            return Decimal::ZERO;
        }
        if today > self.end {
            return Decimal::ONE;
        }
        let total = (self.end - self.start).num_days();
        if total <= 0 {
            return Decimal::ONE;
        }
        let elapsed = (today - self.start).num_days();
        Decimal::from(elapsed) / Decimal::from(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn containing_respects_start_month() {
        assert_eq!(FiscalYear::containing(date(2025, 3, 1), 3), FiscalYear(2025));
        assert_eq!(FiscalYear::containing(date(2026, 2, 28), 3), FiscalYear(2025));
        assert_eq!(FiscalYear::containing(date(2026, 3, 1), 3), FiscalYear(2026));
    }

    #[test]
    fn containing_calendar_year() {
        assert_eq!(FiscalYear::containing(date(2025, 1, 1), 1), FiscalYear(2025));
        assert_eq!(FiscalYear::containing(date(2025, 12, 31), 1), FiscalYear(2025));
    }

    #[test]
    fn invalid_start_month_falls_back_to_january() {
        assert_eq!(FiscalYear::containing(date(2025, 1, 5), 0), FiscalYear(2025));
        assert_eq!(FiscalYear::containing(date(2025, 1, 5), 13), FiscalYear(2025));
    }

    #[test]
    fn progress_is_clamped() {
        let range = DateRange::new(date(2025, 3, 1), date(2025, 3, 11));
        assert_eq!(range.progress(date(2025, 1, 1)), Decimal::ZERO);
        assert_eq!(range.progress(date(2025, 3, 6)), Decimal::new(5, 1));
        assert_eq!(range.progress(date(2025, 4, 1)), Decimal::ONE);
    }

    #[test]
    fn date_range_display() {
        let range = DateRange::new(date(2025, 3, 1), date(2026, 2, 28));
        assert_eq!(range.to_string(), "2025.03.01 ~ 2026.02.28");
    }
}
