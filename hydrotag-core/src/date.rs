use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Range of dates for which recordings can be selected (inclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl Default for DateWindow {
    fn default() -> Self {
        Self {
            min: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN),
            max: NaiveDate::from_ymd_opt(2026, 7, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

impl DateWindow {
    pub fn validate(&self) -> Result<(), String> {
        if self.min > self.max {
            return Err(format!("Date window is inverted: {} > {}", self.min, self.max));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.min && date <= self.max
    }

    /// Accept `date` if it lies inside the window.
    pub fn select(&self, date: NaiveDate) -> Option<SelectedDate> {
        if !self.contains(date) {
            log::warn!("Date {date} is outside {}..={}", self.min, self.max);
            return None;
        }
        Some(SelectedDate::new(date))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedDate {
    pub date: NaiveDate,
    /// `yyyy-MM-dd`, used in exports and file names.
    pub label: String,
}

impl SelectedDate {
    pub fn new(date: NaiveDate) -> Self {
        Self { date, label: date.format("%Y-%m-%d").to_string() }
    }
}

/// Parse a `yyyy-MM-dd` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{s}' (expected YYYY-MM-DD): {e}"))
}
