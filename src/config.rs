use anyhow::{anyhow, Context};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::classify::TimeWindow;
use crate::paging::DEFAULT_PAGE_SIZE;
use crate::roll::RollSettings;
use crate::session::DEFAULT_TICK_INTERVAL;

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub page_size: usize,
    pub tick_interval: Duration,
    pub windows: TimeWindow,
    pub media_base: String,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            page_size: DEFAULT_PAGE_SIZE,
            tick_interval: DEFAULT_TICK_INTERVAL,
            windows: TimeWindow::default(),
            media_base: String::new(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ROLLCALL_WORKSPACE") {
            cfg.workspace = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = get("ROLLCALL_PAGE_SIZE") {
            let size: usize = v
                .trim()
                .parse()
                .with_context(|| format!("ROLLCALL_PAGE_SIZE must be a positive integer, got {:?}", v))?;
            if size == 0 || size > 500 {
                return Err(anyhow!("ROLLCALL_PAGE_SIZE must be in range 1..=500"));
            }
            cfg.page_size = size;
        }
        if let Some(v) = get("ROLLCALL_TICK_MS") {
            let ms: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("ROLLCALL_TICK_MS must be an integer, got {:?}", v))?;
            if ms == 0 {
                return Err(anyhow!("ROLLCALL_TICK_MS must be greater than zero"));
            }
            cfg.tick_interval = Duration::from_millis(ms);
        }
        if let Some(v) = get("ROLLCALL_WINDOWS") {
            cfg.windows = TimeWindow::parse_triple(&v).context("ROLLCALL_WINDOWS")?;
        }
        if let Some(v) = get("ROLLCALL_MEDIA_BASE") {
            cfg.media_base = v.trim().to_string();
        }
        if let Some(v) = get("ROLLCALL_LOG") {
            EnvFilter::try_new(v.trim())
                .with_context(|| format!("ROLLCALL_LOG is not a valid log filter: {:?}", v))?;
            cfg.log_filter = v.trim().to_string();
        }
        Ok(cfg)
    }

    pub fn roll_settings(&self) -> RollSettings {
        RollSettings {
            page_size: self.page_size,
            tick_interval: self.tick_interval,
            windows: self.windows,
            media_base: self.media_base.clone(),
        }
    }
}
