//! Trading-session predicate.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

use crate::errors::{Result, ValidationError};

const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Rome;

/// Weekday trading session in a fixed IANA time zone.
///
/// Both session bounds are inclusive. Exchange holidays are not modelled.
#[derive(Debug, Clone)]
pub struct MarketHours {
    timezone: Tz,
    open: NaiveTime,
    close: NaiveTime,
}

impl Default for MarketHours {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl MarketHours {
    /// 09:30 to 16:00 local time in `timezone`.
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
        }
    }

    /// Parse an IANA zone name such as `Europe/Rome`.
    pub fn from_timezone_name(name: &str) -> Result<Self> {
        let timezone: Tz = name.parse().map_err(|e| {
            ValidationError::InvalidInput(format!("Unknown time zone '{}': {}", name, e))
        })?;
        Ok(Self::new(timezone))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.timezone);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let time = local.time();
        time >= self.open && time <= self.close
    }
}
