use serde::Serialize;

use crate::ledger::{AttendanceLedger, AttendanceStatus};
use crate::roster::Person;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
}

impl Tally {
    pub fn total(&self) -> usize {
        self.present + self.absent + self.late
    }

    fn bump(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
        }
    }
}

/// Counts stored entries only; untouched people land in no bucket.
pub fn tally(ledger: &AttendanceLedger) -> Tally {
    let mut out = Tally::default();
    for (_, status) in ledger.iter() {
        out.bump(status);
    }
    out
}

/// Footer figures: the tally plus how many roster members are still
/// untouched, so nothing downstream has to assume the buckets add up to the
/// roster size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallySummary {
    #[serde(flatten)]
    pub counts: Tally,
    pub roster_size: usize,
    pub unmarked: usize,
}

pub fn summarize(ledger: &AttendanceLedger, roster: &[Person]) -> TallySummary {
    let unmarked = roster.iter().filter(|p| ledger.get(&p.id).is_none()).count();
    TallySummary {
        counts: tally(ledger),
        roster_size: roster.len(),
        unmarked,
    }
}
