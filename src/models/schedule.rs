use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// One opening window on a weekday, e.g. `{"day":"mon","start":"09:00","end":"13:00"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeWindow {
    pub day: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkingHours {
    pub slots: Vec<TimeWindow>,
}

impl WorkingHours {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let hours: WorkingHours = serde_json::from_str(s)?;
        hours.validate()?;
        Ok(hours)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for slot in &self.slots {
            parse_weekday(&slot.day)?;
            let start = parse_time(&slot.start)?;
            let end = parse_time(&slot.end)?;
            if start >= end {
                return Err(anyhow::anyhow!(
                    "window {} {}-{} closes before it opens",
                    slot.day,
                    slot.start,
                    slot.end
                ));
            }
        }
        Ok(())
    }

    /// Opening windows for the given date's weekday, sorted by open time.
    pub fn windows_for(&self, date: NaiveDate) -> Vec<(NaiveTime, NaiveTime)> {
        let weekday = date.weekday();
        let mut windows: Vec<(NaiveTime, NaiveTime)> = self
            .slots
            .iter()
            .filter(|slot| parse_weekday(&slot.day).map(|d| d == weekday).unwrap_or(false))
            .filter_map(|slot| Some((parse_time(&slot.start).ok()?, parse_time(&slot.end).ok()?)))
            .collect();
        windows.sort();
        windows
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancellationPolicy {
    /// Notice, in hours, below which a cancellation is charged.
    #[serde(default)]
    pub min_cancellation_hours: i64,
    /// Share of the total refunded on a late cancellation.
    #[serde(default = "default_refund_percentage")]
    pub refund_percentage: u8,
    #[serde(default)]
    pub no_show_fee_percentage: u8,
}

fn default_refund_percentage() -> u8 {
    100
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self {
            min_cancellation_hours: 0,
            refund_percentage: default_refund_percentage(),
            no_show_fee_percentage: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub working_hours: WorkingHours,
    /// Weekday names the business is always closed.
    #[serde(default)]
    pub days_off: Vec<String>,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    #[serde(default = "default_slot_duration")]
    pub slot_duration: i64,
    #[serde(default)]
    pub buffer_time: i64,
    #[serde(default = "default_advance_booking_days")]
    pub advance_booking_days: i64,
    #[serde(default)]
    pub min_advance_booking_hours: i64,
    #[serde(default)]
    pub max_advance_booking_hours: Option<i64>,
    #[serde(default)]
    pub cancellation_policy: CancellationPolicy,
    #[serde(default = "default_true")]
    pub allow_online_booking: bool,
}

fn default_slot_duration() -> i64 {
    30
}

fn default_advance_booking_days() -> i64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            working_hours: WorkingHours::default(),
            days_off: vec![],
            holidays: vec![],
            slot_duration: default_slot_duration(),
            buffer_time: 0,
            advance_booking_days: default_advance_booking_days(),
            min_advance_booking_hours: 0,
            max_advance_booking_hours: None,
            cancellation_policy: CancellationPolicy::default(),
            allow_online_booking: true,
        }
    }
}

/// Upper bounds keeping every derived date and duration representable.
const MAX_DAYS: i64 = 3650;
const MAX_HOURS: i64 = 87_600;
const MAX_MINUTES: i64 = 1440;

impl ScheduleConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.working_hours.validate()?;
        for day in &self.days_off {
            parse_weekday(day)?;
        }
        if self.slot_duration <= 0 {
            return Err(anyhow::anyhow!("slot_duration must be positive"));
        }
        if self.buffer_time < 0 {
            return Err(anyhow::anyhow!("buffer_time cannot be negative"));
        }
        if self.min_advance_booking_hours < 0 || self.advance_booking_days < 0 {
            return Err(anyhow::anyhow!("advance booking limits cannot be negative"));
        }
        for (name, value, max) in [
            ("slot_duration", self.slot_duration, MAX_MINUTES),
            ("buffer_time", self.buffer_time, MAX_MINUTES),
            ("advance_booking_days", self.advance_booking_days, MAX_DAYS),
            ("min_advance_booking_hours", self.min_advance_booking_hours, MAX_HOURS),
            (
                "max_advance_booking_hours",
                self.max_advance_booking_hours.unwrap_or(0),
                MAX_HOURS,
            ),
            (
                "min_cancellation_hours",
                self.cancellation_policy.min_cancellation_hours,
                MAX_HOURS,
            ),
        ] {
            if value > max {
                return Err(anyhow::anyhow!("{name} cannot exceed {max}"));
            }
        }
        if let Some(max) = self.max_advance_booking_hours {
            if max < self.min_advance_booking_hours {
                return Err(anyhow::anyhow!(
                    "max_advance_booking_hours is below min_advance_booking_hours"
                ));
            }
        }
        let policy = &self.cancellation_policy;
        if policy.refund_percentage > 100 || policy.no_show_fee_percentage > 100 {
            return Err(anyhow::anyhow!("percentages must be between 0 and 100"));
        }
        if policy.min_cancellation_hours < 0 {
            return Err(anyhow::anyhow!("min_cancellation_hours cannot be negative"));
        }
        Ok(())
    }

    pub fn is_closed_on(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday();
        self.holidays.contains(&date)
            || self
                .days_off
                .iter()
                .any(|d| parse_weekday(d).map(|w| w == weekday).unwrap_or(false))
    }
}

pub fn parse_weekday(s: &str) -> anyhow::Result<Weekday> {
    match s.to_lowercase().as_str() {
        "mon" => Ok(Weekday::Mon),
        "tue" => Ok(Weekday::Tue),
        "wed" => Ok(Weekday::Wed),
        "thu" => Ok(Weekday::Thu),
        "fri" => Ok(Weekday::Fri),
        "sat" => Ok(Weekday::Sat),
        "sun" => Ok(Weekday::Sun),
        _ => Err(anyhow::anyhow!("invalid weekday: {s}")),
    }
}

/// Parses `HH:MM`. `24:00` is accepted as the last instant of the day.
pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err(anyhow::anyhow!("invalid time format: {s}"));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    if hour == 24 && minute == 0 {
        return NaiveTime::from_hms_opt(23, 59, 59).ok_or_else(|| anyhow::anyhow!("bad time"));
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
}
