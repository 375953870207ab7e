use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Wall-clock time of day, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self(hour * 60 + minute))
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("invalid time format: {s}"))?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(anyhow::anyhow!("invalid time format: {s}"));
        }
        let hour: u32 = h
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
        let minute: u32 = m
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
        Self::from_hm(hour, minute).ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn hour(self) -> u32 {
        self.0 / 60
    }

    pub fn minute(self) -> u32 {
        self.0 % 60
    }

    /// Raw end minute of `self + duration`. May run past midnight; callers
    /// check it against closing time before turning it back into a time.
    /// `None` only when the sum does not fit in a `u32`.
    pub fn add_minutes(self, duration: u32) -> Option<u32> {
        self.0.checked_add(duration)
    }

    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        let time = NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or_default();
        date.and_time(time)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TimeOfDay::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Formats a raw minute count (possibly past midnight) as `HH:MM`.
pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Half-open `[start, end)` interval on a single calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeInterval {
    pub fn new(date: NaiveDate, start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { date, start, end }
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.date == other.date && self.start < other.end && other.start < self.end
    }
}
