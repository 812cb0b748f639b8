use serde::{Deserialize, Serialize};

use crate::clock::{Clock, TimeOfDay};
use crate::error::RollError;
use crate::ledger::AttendanceStatus;

/// Arrival windows. The boundary between the present and late windows is
/// stored once, so `present_end` and `late_start` can never drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    present_start: TimeOfDay,
    present_end: TimeOfDay,
    late_end: TimeOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEdge {
    PresentStart,
    PresentEnd,
    LateStart,
    LateEnd,
}

impl WindowEdge {
    pub fn parse(raw: &str) -> Result<Self, RollError> {
        match raw {
            "presentStart" => Ok(WindowEdge::PresentStart),
            "presentEnd" => Ok(WindowEdge::PresentEnd),
            "lateStart" => Ok(WindowEdge::LateStart),
            "lateEnd" => Ok(WindowEdge::LateEnd),
            other => Err(RollError::new(
                "bad_edge",
                "edge must be one of: presentStart, presentEnd, lateStart, lateEnd",
            )
            .with_details(serde_json::json!({ "edge": other }))),
        }
    }
}

impl TimeWindow {
    pub fn new(present_start: TimeOfDay, present_end: TimeOfDay, late_end: TimeOfDay) -> Self {
        Self {
            present_start,
            present_end,
            late_end,
        }
    }

    pub fn present_start(&self) -> TimeOfDay {
        self.present_start
    }

    pub fn present_end(&self) -> TimeOfDay {
        self.present_end
    }

    pub fn late_start(&self) -> TimeOfDay {
        self.present_end
    }

    pub fn late_end(&self) -> TimeOfDay {
        self.late_end
    }

    pub fn set_edge(&mut self, edge: WindowEdge, at: TimeOfDay) {
        match edge {
            WindowEdge::PresentStart => self.present_start = at,
            WindowEdge::PresentEnd | WindowEdge::LateStart => self.present_end = at,
            WindowEdge::LateEnd => self.late_end = at,
        }
    }

    /// Parses `"HH:MM,HH:MM,HH:MM"` (present start, shared boundary, late end).
    pub fn parse_triple(raw: &str) -> Result<Self, RollError> {
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        let [ps, pe, le] = parts.as_slice() else {
            return Err(RollError::new(
                "bad_windows",
                "windows must be three comma separated HH:MM values",
            ));
        };
        Ok(Self::new(ps.parse()?, pe.parse()?, le.parse()?))
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            present_start: TimeOfDay::at(8, 0),
            present_end: TimeOfDay::at(8, 20),
            late_end: TimeOfDay::at(8, 40),
        }
    }
}

pub fn classify(now: TimeOfDay, windows: &TimeWindow) -> AttendanceStatus {
    if now >= windows.present_start() && now < windows.present_end() {
        AttendanceStatus::Present
    } else if now >= windows.late_start() && now < windows.late_end() {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Absent
    }
}

/// The status an auto-mode tap would record right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPreview {
    pub now: TimeOfDay,
    pub status: AttendanceStatus,
}

impl AutoPreview {
    pub fn capture(clock: &dyn Clock, windows: &TimeWindow) -> Self {
        let now = clock.now();
        Self {
            now,
            status: classify(now, windows),
        }
    }
}
