use chrono::NaiveDate;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::classify::{AutoPreview, TimeWindow, WindowEdge};
use crate::clock::{Clock, TimeOfDay};
use crate::error::RollError;
use crate::ledger::{AttendanceLedger, AttendanceStatus, DISPLAY_DEFAULT};
use crate::paging::{self, PageMarker};
use crate::roster::{self, Person};
use crate::session::{Mode, ModeController, DEFAULT_TICK_INTERVAL};
use crate::tally::{self, Tally, TallySummary};
use crate::ticker::TickSink;

#[derive(Debug, Clone)]
pub struct RollSettings {
    pub page_size: usize,
    pub tick_interval: Duration,
    pub windows: TimeWindow,
    pub media_base: String,
}

impl Default for RollSettings {
    fn default() -> Self {
        Self {
            page_size: paging::DEFAULT_PAGE_SIZE,
            tick_interval: DEFAULT_TICK_INTERVAL,
            windows: TimeWindow::default(),
            media_base: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedEntry {
    pub person_id: String,
    pub status: AttendanceStatus,
}

/// One committed roll: the whole ledger as it stood when save was pressed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBatch {
    pub id: String,
    pub course_id: String,
    pub date: NaiveDate,
    pub entries: Vec<SavedEntry>,
    pub tally: Tally,
}

/// Where committed rolls go. The roll-call core never decides the storage.
pub trait AttendanceSink {
    fn persist(&mut self, batch: &SaveBatch) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonCard {
    pub id: String,
    pub display_name: String,
    pub initials: String,
    pub document_number: Option<String>,
    pub photo_url: Option<String>,
    pub status: AttendanceStatus,
    pub label: &'static str,
    pub marked: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ShownRange {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollView {
    pub open: bool,
    pub course_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub mode: Mode,
    pub query: String,
    pub windows: TimeWindow,
    pub preview: Option<AutoPreview>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub pages: Vec<PageMarker>,
    pub has_prev: bool,
    pub has_next: bool,
    pub range: Option<ShownRange>,
    pub matches: usize,
    pub people: Vec<PersonCard>,
    pub tally: TallySummary,
    pub saving: bool,
}

/// The roll-call session together with the data its host supplies: roster,
/// ledger, date and the in-flight save flag.
pub struct RollCall {
    settings: RollSettings,
    controller: ModeController,
    course_id: Option<String>,
    roster: Vec<Person>,
    ledger: AttendanceLedger,
    date: Option<NaiveDate>,
    windows: TimeWindow,
    saving: bool,
}

impl RollCall {
    pub fn new(settings: RollSettings, sink: Option<TickSink>) -> Self {
        let controller = ModeController::new(settings.tick_interval, sink);
        let windows = settings.windows;
        Self {
            settings,
            controller,
            course_id: None,
            roster: Vec::new(),
            ledger: AttendanceLedger::new(),
            date: None,
            windows,
            saving: false,
        }
    }

    pub fn open(
        &mut self,
        course_id: &str,
        roster: Vec<Person>,
        date: NaiveDate,
        ledger: AttendanceLedger,
    ) {
        tracing::info!(course_id, %date, people = roster.len(), "roll opened");
        self.course_id = Some(course_id.to_string());
        self.roster = roster;
        self.ledger = self.fit_to_roster(ledger);
        self.date = Some(date);
        self.saving = false;
        self.controller.open();
    }

    pub fn close(&mut self) {
        if self.controller.is_open() {
            tracing::info!(course_id = ?self.course_id, "roll closed");
        }
        self.controller.close();
    }

    pub fn is_open(&self) -> bool {
        self.controller.is_open()
    }

    fn require_open(&self) -> Result<(), RollError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(RollError::new("not_open", "open a roll first"))
        }
    }

    /// Supplied ledgers may carry rows for people who have since left the
    /// roster; only current members are kept so tallies stay within it.
    fn fit_to_roster(&self, mut ledger: AttendanceLedger) -> AttendanceLedger {
        let dropped = ledger.retain_people(self.roster.iter().map(|p| p.id.as_str()));
        if dropped > 0 {
            tracing::warn!(dropped, "ignoring saved marks for people not on the roster");
        }
        ledger
    }

    pub fn course_id(&self) -> Option<&str> {
        self.course_id.as_deref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn roster(&self) -> &[Person] {
        &self.roster
    }

    pub fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }

    pub fn windows(&self) -> &TimeWindow {
        &self.windows
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn timer_running(&self) -> bool {
        self.controller.timer_running()
    }

    /// Date change from the host. A new date means a different roll, so the
    /// ledger is swapped for the one the host supplies for that date.
    pub fn set_date(&mut self, date: NaiveDate, ledger: AttendanceLedger) -> Result<(), RollError> {
        self.require_open()?;
        tracing::info!(%date, entries = ledger.len(), "roll date changed");
        self.date = Some(date);
        self.ledger = self.fit_to_roster(ledger);
        Ok(())
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), RollError> {
        self.require_open()?;
        self.controller.set_mode(mode);
        Ok(())
    }

    pub fn set_query(&mut self, query: &str) -> Result<(), RollError> {
        self.require_open()?;
        self.controller.set_query(query);
        Ok(())
    }

    pub fn set_window_edge(&mut self, edge: WindowEdge, at: TimeOfDay) {
        self.windows.set_edge(edge, at);
    }

    fn matches(&self) -> Vec<&Person> {
        roster::filter(&self.roster, self.controller.query())
    }

    fn total_pages(&self) -> usize {
        paging::total_pages(self.matches().len(), self.settings.page_size)
    }

    pub fn goto_page(&mut self, page: usize) -> Result<usize, RollError> {
        self.require_open()?;
        let total = self.total_pages();
        self.controller.pager_mut().goto(page, total);
        Ok(self.controller.pager().page())
    }

    pub fn next_page(&mut self) -> Result<usize, RollError> {
        self.require_open()?;
        let total = self.total_pages();
        self.controller.pager_mut().next(total);
        Ok(self.controller.pager().page())
    }

    pub fn prev_page(&mut self) -> Result<usize, RollError> {
        self.require_open()?;
        self.controller.pager_mut().prev();
        Ok(self.controller.pager().page())
    }

    /// One tap on a person card. What the tap means depends on the mode.
    pub fn toggle(&mut self, person_id: &str, clock: &dyn Clock) -> Result<AttendanceStatus, RollError> {
        self.require_open()?;
        if !self.roster.iter().any(|p| p.id == person_id) {
            return Err(RollError::new("not_found", "person is not on this roster")
                .with_details(serde_json::json!({ "personId": person_id })));
        }
        let status = match self.controller.mode() {
            Mode::Manual => self.ledger.toggle_manual(person_id),
            Mode::Auto => self.ledger.toggle_auto(person_id, clock.now(), &self.windows),
        };
        tracing::debug!(person_id, ?status, mode = ?self.controller.mode(), "toggled");
        Ok(status)
    }

    pub fn mark_all(&mut self, status: AttendanceStatus) -> Result<(), RollError> {
        self.require_open()?;
        self.ledger
            .set_all(self.roster.iter().map(|p| p.id.as_str()), status);
        tracing::debug!(?status, people = self.roster.len(), "marked all");
        Ok(())
    }

    pub fn preview(&self, clock: &dyn Clock) -> Option<AutoPreview> {
        (self.is_open() && self.controller.mode() == Mode::Auto)
            .then(|| AutoPreview::capture(clock, &self.windows))
    }

    /// Refresh tick from the auto timer: recomputes the live preview and
    /// leaves the ledger alone.
    pub fn on_tick(&mut self, generation: u64, clock: &dyn Clock) -> Option<AutoPreview> {
        if !self.controller.on_tick(generation) {
            return None;
        }
        tracing::trace!(ticks = self.controller.ticks(), "auto preview refreshed");
        self.preview(clock)
    }

    pub fn tally(&self) -> TallySummary {
        tally::summarize(&self.ledger, &self.roster)
    }

    /// Takes the save slot and snapshots the ledger. Fails while an earlier
    /// save is still in flight.
    pub fn begin_save(&mut self) -> Result<SaveBatch, RollError> {
        self.require_open()?;
        if self.saving {
            return Err(RollError::new("save_in_flight", "a save is already running"));
        }
        let (Some(course_id), Some(date)) = (self.course_id.clone(), self.date) else {
            return Err(RollError::new("not_open", "open a roll first"));
        };
        self.saving = true;
        Ok(SaveBatch {
            id: Uuid::new_v4().to_string(),
            course_id,
            date,
            entries: self
                .ledger
                .snapshot()
                .into_iter()
                .map(|(person_id, status)| SavedEntry { person_id, status })
                .collect(),
            tally: tally::tally(&self.ledger),
        })
    }

    pub fn finish_save(&mut self) {
        self.saving = false;
    }

    /// Full save cycle against `sink`. The save slot is released whatever the
    /// outcome; the outcome itself is passed back untouched.
    pub fn save(&mut self, sink: &mut dyn AttendanceSink) -> Result<SaveBatch, RollError> {
        let batch = self.begin_save()?;
        let outcome = sink.persist(&batch);
        self.finish_save();
        match outcome {
            Ok(()) => {
                tracing::info!(batch = %batch.id, entries = batch.entries.len(), "roll saved");
                Ok(batch)
            }
            Err(e) => {
                tracing::warn!(batch = %batch.id, error = %e, "roll save failed");
                Err(RollError::new("save_failed", format!("{e:#}")))
            }
        }
    }

    pub fn view(&self, clock: &dyn Clock) -> RollView {
        let matches = self.matches();
        let page_size = self.settings.page_size;
        let total_pages = paging::total_pages(matches.len(), page_size);
        let pager = self.controller.pager();
        let page = pager.page();
        let people = paging::paginate(&matches, page_size, page)
            .iter()
            .map(|p| self.card(p))
            .collect();
        RollView {
            open: self.is_open(),
            course_id: self.course_id.clone(),
            date: self.date,
            mode: self.controller.mode(),
            query: self.controller.query().to_string(),
            windows: self.windows,
            preview: self.preview(clock),
            page,
            page_size,
            total_pages,
            pages: paging::page_window(page, total_pages),
            has_prev: pager.has_prev(),
            has_next: pager.has_next(total_pages),
            range: paging::shown_range(page, page_size, matches.len())
                .map(|(from, to)| ShownRange { from, to }),
            matches: matches.len(),
            people,
            tally: self.tally(),
            saving: self.saving,
        }
    }

    fn card(&self, p: &Person) -> PersonCard {
        let stored = self.ledger.get(&p.id);
        let status = stored.unwrap_or(DISPLAY_DEFAULT);
        PersonCard {
            id: p.id.clone(),
            display_name: p.display_name(),
            initials: p.initials(),
            document_number: p.document_number.clone(),
            photo_url: p
                .photo
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| roster::media_url(&self.settings.media_base, s)),
            status,
            label: status.label(),
            marked: stored.is_some(),
        }
    }
}
