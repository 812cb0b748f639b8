use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::RollError;

/// Minute-resolution time of day. Seconds are dropped everywhere a value
/// enters the system, so ordering matches an `HH:MM` string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    /// Literal constructor for known-good constants.
    pub(crate) const fn at(hour: u16, minute: u16) -> Self {
        Self {
            minutes: hour * 60 + minute,
        }
    }

    pub fn hour(self) -> u32 {
        u32::from(self.minutes / 60)
    }

    pub fn minute(self) -> u32 {
        u32::from(self.minutes % 60)
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(t: NaiveTime) -> Self {
        Self {
            minutes: (t.hour() * 60 + t.minute()) as u16,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = RollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        NaiveTime::parse_from_str(t, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
            .map(TimeOfDay::from)
            .map_err(|_| {
                RollError::new("bad_time", format!("time must be HH:MM, got {:?}", s))
            })
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub trait Clock {
    fn now(&self) -> TimeOfDay;
}

/// Wall clock in the host's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeOfDay {
        chrono::Local::now().time().into()
    }
}

/// Local wall clock that can be pinned to a fixed time, used by the daemon so
/// auto mode can be driven deterministically.
#[derive(Debug, Default, Clone, Copy)]
pub struct PinnableClock {
    pinned: Option<TimeOfDay>,
}

impl PinnableClock {
    pub fn pin(&mut self, at: Option<TimeOfDay>) {
        self.pinned = at;
    }

    pub fn pinned(&self) -> Option<TimeOfDay> {
        self.pinned
    }
}

impl Clock for PinnableClock {
    fn now(&self) -> TimeOfDay {
        self.pinned.unwrap_or_else(|| SystemClock.now())
    }
}
