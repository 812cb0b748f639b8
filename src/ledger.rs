use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::classify::{classify, TimeWindow};
use crate::clock::TimeOfDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

/// Status shown for a person who has never been touched. Counting never uses
/// this: untouched people stay out of every tally bucket.
pub const DISPLAY_DEFAULT: AttendanceStatus = AttendanceStatus::Present;

impl AttendanceStatus {
    pub fn code(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Late => "LATE",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "PRESENT" => Some(AttendanceStatus::Present),
            "ABSENT" => Some(AttendanceStatus::Absent),
            "LATE" => Some(AttendanceStatus::Late),
            _ => None,
        }
    }

    /// Manual tap order: PRESENT -> ABSENT -> LATE -> PRESENT.
    pub fn next_manual(self) -> Self {
        match self {
            AttendanceStatus::Present => AttendanceStatus::Absent,
            AttendanceStatus::Absent => AttendanceStatus::Late,
            AttendanceStatus::Late => AttendanceStatus::Present,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Presente",
            AttendanceStatus::Absent => "Ausente",
            AttendanceStatus::Late => "Tarde",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceLedger {
    entries: BTreeMap<String, AttendanceStatus>,
}

impl AttendanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, person_id: &str) -> Option<AttendanceStatus> {
        self.entries.get(person_id).copied()
    }

    pub fn status_of(&self, person_id: &str, default: AttendanceStatus) -> AttendanceStatus {
        self.get(person_id).unwrap_or(default)
    }

    pub fn set(&mut self, person_id: &str, status: AttendanceStatus) {
        self.entries.insert(person_id.to_string(), status);
    }

    pub fn toggle_manual(&mut self, person_id: &str) -> AttendanceStatus {
        let next = self.status_of(person_id, DISPLAY_DEFAULT).next_manual();
        self.set(person_id, next);
        next
    }

    /// Check-in tap: an unset or absent person gets whatever the windows say
    /// right now; a present or late person is cleared back to absent.
    pub fn toggle_auto(
        &mut self,
        person_id: &str,
        now: TimeOfDay,
        windows: &TimeWindow,
    ) -> AttendanceStatus {
        let next = match self.get(person_id) {
            Some(AttendanceStatus::Present) | Some(AttendanceStatus::Late) => {
                AttendanceStatus::Absent
            }
            Some(AttendanceStatus::Absent) | None => classify(now, windows),
        };
        self.set(person_id, next);
        next
    }

    pub fn set_all<'a, I>(&mut self, person_ids: I, status: AttendanceStatus)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for id in person_ids {
            self.set(id, status);
        }
    }

    /// Drops every entry whose person is not in `person_ids` and returns how
    /// many were dropped.
    pub fn retain_people<'a, I>(&mut self, person_ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keep: HashSet<&str> = person_ids.into_iter().collect();
        let before = self.entries.len();
        self.entries.retain(|id, _| keep.contains(id.as_str()));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AttendanceStatus)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn snapshot(&self) -> Vec<(String, AttendanceStatus)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

impl FromIterator<(String, AttendanceStatus)> for AttendanceLedger {
    fn from_iter<T: IntoIterator<Item = (String, AttendanceStatus)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
