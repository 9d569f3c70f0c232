use anyhow::{Context, Result};
use chrono::{NaiveTime, Weekday};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watchlist: Vec<String>,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,

    /// Report format selector. Only "html" is supported; anything else is
    /// logged and skipped at orchestration level.
    pub format: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./reports"),
            format: "html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Day-of-week name, e.g. "monday".
    pub day_of_week: String,

    /// Time of day in 24-hour HH:MM form, local time.
    pub time: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            day_of_week: "monday".to_string(),
            time: "09:00".to_string(),
        }
    }
}

impl ScheduleConfig {
    pub fn weekday(&self) -> Result<Weekday> {
        self.day_of_week
            .trim()
            .parse::<Weekday>()
            .map_err(|_| anyhow::anyhow!("invalid schedule day_of_week: {:?}", self.day_of_week))
    }

    pub fn time_of_day(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.time.trim(), "%H:%M")
            .with_context(|| format!("invalid schedule time (expected HH:MM): {:?}", self.time))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub retries: u32,
    pub request_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 30,
            retries: 3,
            request_delay_ms: 150,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}
