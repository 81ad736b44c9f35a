use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ScheduleConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    /// Offset of the business's wall clock from UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Business {
    /// Current wall-clock time at the business.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::minutes(self.utc_offset_minutes as i64)
    }
}

/// Source of "now" for operations that compare against appointment wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    BusinessLocal,
    Fixed(NaiveDateTime),
}

impl Clock {
    pub fn now(&self, business: &Business) -> NaiveDateTime {
        match self {
            Clock::BusinessLocal => business.local_now(),
            Clock::Fixed(at) => *at,
        }
    }
}
