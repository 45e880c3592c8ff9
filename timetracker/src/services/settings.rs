//! Settings service
//!
//! Manages application settings persistence using JSON file storage.

use crate::config::{
    DEFAULT_DAILY_TARGET_SECONDS, DEFAULT_DAY_RESET_HOUR, DEFAULT_DAY_RESET_MINUTE,
    MAX_DAILY_TARGET_SECONDS, MAX_DAY_RESET_HOUR, MAX_DAY_RESET_MINUTE,
};
use crate::error::Result;
use crate::storage::atomic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the status text counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Count down towards the daily target, then show overtime
    #[default]
    TargetTime,
    /// Count up today's total
    Stopwatch,
}

impl TimerMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            TimerMode::TargetTime => "Target Time",
            TimerMode::Stopwatch => "Stopwatch",
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub timer_mode: TimerMode,
    #[serde(default = "default_daily_target_seconds")]
    pub daily_target_seconds: i64,
    #[serde(default = "default_day_reset_hour")]
    pub day_reset_hour: u32,
    #[serde(default = "default_day_reset_minute")]
    pub day_reset_minute: u32,
    #[serde(default = "default_true")]
    pub hotkey_enabled: bool,
}

fn default_daily_target_seconds() -> i64 {
    DEFAULT_DAILY_TARGET_SECONDS
}

fn default_day_reset_hour() -> u32 {
    DEFAULT_DAY_RESET_HOUR
}

fn default_day_reset_minute() -> u32 {
    DEFAULT_DAY_RESET_MINUTE
}

fn default_true() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            timer_mode: TimerMode::default(),
            daily_target_seconds: default_daily_target_seconds(),
            day_reset_hour: default_day_reset_hour(),
            day_reset_minute: default_day_reset_minute(),
            hotkey_enabled: default_true(),
        }
    }
}

impl AppSettings {
    /// Clamp every field into its valid range
    pub fn normalized(mut self) -> Self {
        self.daily_target_seconds = self.daily_target_seconds.clamp(0, MAX_DAILY_TARGET_SECONDS);
        self.day_reset_hour = self.day_reset_hour.min(MAX_DAY_RESET_HOUR);
        self.day_reset_minute = self.day_reset_minute.min(MAX_DAY_RESET_MINUTE);
        self
    }

    /// e.g. "3h" or "7h 30m"
    pub fn daily_target_formatted(&self) -> String {
        let hours = self.daily_target_seconds / 3600;
        let minutes = (self.daily_target_seconds % 3600) / 60;
        if minutes > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}h", hours)
        }
    }

    /// e.g. "3:00"
    pub fn reset_time_formatted(&self) -> String {
        format!("{}:{:02}", self.day_reset_hour, self.day_reset_minute)
    }
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }

    /// Load settings from disk or create default if not exists.
    ///
    /// An unreadable file is logged and replaced by defaults in memory.
    pub async fn load(&self) -> AppSettings {
        match atomic::read_json::<AppSettings>(&self.settings_path).await {
            Ok(Some(settings)) => settings.normalized(),
            Ok(None) => {
                tracing::info!("Settings file not found, creating default settings");
                let default = AppSettings::default();
                if let Err(e) = self.save(&default).await {
                    tracing::error!("Failed to persist default settings: {}", e);
                }
                default
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings, using defaults: {}", e);
                AppSettings::default()
            }
        }
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        atomic::write_json(&self.settings_path, settings).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }
}
