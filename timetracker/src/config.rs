//! Application configuration constants
//!
//! Central location for all configuration constants, resource limits,
//! and validation boundaries used throughout the application.

use std::time::Duration;

// ===== Session & Tag Limits =====

/// Maximum length of a tag name, in characters (after trimming)
pub const MAX_TAG_LENGTH: usize = 30;

/// Maximum length of a session description, in characters.
/// Remarks are unbounded.
pub const MAX_DESCRIPTION_LENGTH: usize = 140;

/// Number of tags offered when the tag search box is empty
pub const RECENT_TAGS_LIMIT: usize = 10;

// ===== Timer Defaults =====

/// Default daily target (3 hours)
pub const DEFAULT_DAILY_TARGET_SECONDS: i64 = 3 * 3600;

/// Largest daily target (24 hours)
pub const MAX_DAILY_TARGET_SECONDS: i64 = 24 * 3600;

/// Default hour at which a new day bucket begins (03:00 local)
pub const DEFAULT_DAY_RESET_HOUR: u32 = 3;

/// Default minute component of the day reset time
pub const DEFAULT_DAY_RESET_MINUTE: u32 = 0;

/// Largest valid reset hour
pub const MAX_DAY_RESET_HOUR: u32 = 23;

/// Largest valid reset minute
pub const MAX_DAY_RESET_MINUTE: u32 = 59;

/// How often derived display values are recomputed
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Shown in the status text once the daily target is met exactly
pub const TARGET_REACHED_MARKER: &str = "\u{2713}";

// ===== On-disk Layout =====

/// Application name used to resolve the platform data directory
pub const APP_NAME: &str = "TimeTracker";

/// Environment variable that overrides the data directory
pub const DATA_DIR_ENV: &str = "TIMETRACKER_DATA_DIR";

pub const SETTINGS_FILE: &str = "settings.json";
pub const TAGS_FILE: &str = "tags.json";
pub const SESSIONS_DIR: &str = "Sessions";

/// Extension of per-day session bucket files
pub const BUCKET_EXTENSION: &str = "json";

/// Suffix appended to a target path for the in-flight write
pub const TEMP_SUFFIX: &str = "tmp";

/// Suffix appended to a target path for the last-known-good copy
pub const BACKUP_SUFFIX: &str = "bak";

/// Format of a day bucket key (and bucket file stem)
pub const BUCKET_KEY_FORMAT: &str = "%Y-%m-%d";
