use serde::Serialize;
use std::time::Duration;

use crate::error::RollError;
use crate::paging::Pager;
use crate::ticker::{AutoRefresh, TickSink};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    #[default]
    Manual,
    Auto,
}

impl Mode {
    pub fn parse(raw: &str) -> Result<Self, RollError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Mode::Manual),
            "auto" => Ok(Mode::Auto),
            _ => Err(RollError::new("bad_mode", "mode must be one of: manual, auto")
                .with_details(serde_json::json!({ "mode": raw }))),
        }
    }
}

/// Transient UI state of one roll-call sitting: open flag, marking mode,
/// search text and page cursor. It also owns the auto-refresh timer, which
/// runs exactly while the session is open in auto mode.
pub struct ModeController {
    open: bool,
    mode: Mode,
    query: String,
    pager: Pager,
    tick_interval: Duration,
    sink: Option<TickSink>,
    refresh: Option<AutoRefresh>,
    generation: u64,
    ticks: u64,
}

impl ModeController {
    pub fn new(tick_interval: Duration, sink: Option<TickSink>) -> Self {
        Self {
            open: false,
            mode: Mode::Manual,
            query: String::new(),
            pager: Pager::default(),
            tick_interval,
            sink,
            refresh: None,
            generation: 0,
            ticks: 0,
        }
    }

    /// Hard reset on every open, whatever the previous sitting left behind.
    pub fn open(&mut self) {
        self.open = true;
        self.mode = Mode::Manual;
        self.query.clear();
        self.pager.reset();
        self.ticks = 0;
        self.sync_timer();
    }

    pub fn close(&mut self) {
        self.open = false;
        self.sync_timer();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::debug!(?mode, "mode changed");
        }
        self.mode = mode;
        self.sync_timer();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// New search text always sends the cursor back to page 1.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.pager.reset();
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn pager_mut(&mut self) -> &mut Pager {
        &mut self.pager
    }

    pub fn timer_running(&self) -> bool {
        self.refresh.is_some()
    }

    /// Number of accepted refresh ticks since the last open.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Accepts a tick only from the live timer. Ticks queued by a timer that
    /// has since been released carry an older generation and are dropped.
    pub fn on_tick(&mut self, generation: u64) -> bool {
        let live = self
            .refresh
            .as_ref()
            .map(|r| r.generation() == generation)
            .unwrap_or(false);
        if live && self.open && self.mode == Mode::Auto {
            self.ticks += 1;
            true
        } else {
            false
        }
    }

    fn sync_timer(&mut self) {
        let wanted = self.open && self.mode == Mode::Auto;
        if !wanted {
            self.refresh = None;
            return;
        }
        if self.refresh.is_some() {
            return;
        }
        let Some(sink) = self.sink.clone() else {
            return;
        };
        self.generation += 1;
        match AutoRefresh::start(self.tick_interval, self.generation, sink) {
            Ok(timer) => self.refresh = Some(timer),
            Err(e) => tracing::warn!(error = %e, "could not start auto refresh timer"),
        }
    }
}
