use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::watch::WatchItem;

pub const MIN_REFRESH_SECS: u32 = 10;
pub const MAX_REFRESH_SECS: u32 = 300;
pub const DEFAULT_REFRESH_SECS: u32 = 60;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 180;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The last `days` days up to and including `today`.
    pub fn lookback(today: NaiveDate, days: i64) -> Self {
        Self::new(today - Duration::days(days), today)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::lookback(Local::now().date_naive(), DEFAULT_LOOKBACK_DAYS)
    }
}

pub fn clamp_refresh(secs: u32) -> u32 {
    secs.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS)
}

/// What the poller needs to run one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub items: Vec<WatchItem>,
    pub range: DateRange,
    pub refresh_secs: u32,
    pub token: Option<String>,
}

impl SessionConfig {
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
    }

    #[inline]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            range: DateRange::default(),
            refresh_secs: DEFAULT_REFRESH_SECS,
            token: None,
        }
    }
}
