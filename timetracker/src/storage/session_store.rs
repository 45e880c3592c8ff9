//! Day-bucketed session storage
//!
//! Sessions are sharded into one file per calendar day under `Sessions/`.
//! The bucket of an instant is its local date, except that instants before
//! the configured reset hour belong to the previous day.
//!
//! Example: with a reset hour of 3, 02:59 on 2024-05-02 is stored in
//! "Sessions/2024-05-01.json".
//!
//! The store does no locking of its own. Callers must not run two
//! read-modify-write operations against the same bucket concurrently;
//! the persister task is the single writer in the running application.

use crate::clock::Clock;
use crate::config::{BUCKET_EXTENSION, BUCKET_KEY_FORMAT};
use crate::error::Result;
use crate::models::Session;
use crate::storage::atomic;
use chrono::{DateTime, Duration, Local, TimeZone, Timelike, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;

/// Bucket key (`YYYY-MM-DD`) of `instant` in its own time zone
pub fn bucket_key<Tz: TimeZone>(instant: &DateTime<Tz>, reset_hour: u32) -> String {
    let date = instant.date_naive();
    let date = if instant.hour() < reset_hour {
        date - Duration::days(1)
    } else {
        date
    };
    date.format(BUCKET_KEY_FORMAT).to_string()
}

/// Bucket key of `instant` in the local time zone
pub fn local_bucket_key(instant: DateTime<Utc>, reset_hour: u32) -> String {
    bucket_key(&instant.with_timezone(&Local), reset_hour)
}

/// File-backed store of per-day session buckets
#[derive(Clone)]
pub struct SessionStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    /// Create a store rooted at the `Sessions` directory
    pub fn new(root: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self { root, clock }
    }

    /// Create the sessions directory if needed
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Session store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Path of the bucket file for `key`
    pub fn bucket_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, BUCKET_EXTENSION))
    }

    /// Load the bucket that `date` falls into.
    ///
    /// Missing or unreadable buckets load as empty.
    pub async fn load(&self, date: DateTime<Utc>, reset_hour: u32) -> Vec<Session> {
        self.load_bucket(&local_bucket_key(date, reset_hour)).await
    }

    /// Load a bucket by key
    pub async fn load_bucket(&self, key: &str) -> Vec<Session> {
        let path = self.bucket_path(key);

        match atomic::read_json::<Vec<Session>>(&path).await {
            Ok(Some(sessions)) => sessions,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Treating bucket {} as empty: {}", key, e);
                Vec::new()
            }
        }
    }

    /// Overwrite the bucket that `date` falls into, ordered by start
    pub async fn save(
        &self,
        sessions: &[Session],
        date: DateTime<Utc>,
        reset_hour: u32,
    ) -> Result<()> {
        let key = local_bucket_key(date, reset_hour);
        self.save_bucket(&key, sessions).await
    }

    async fn save_bucket(&self, key: &str, sessions: &[Session]) -> Result<()> {
        let mut sorted = sessions.to_vec();
        sorted.sort_by_key(|s| s.start);

        atomic::write_json(&self.bucket_path(key), &sorted).await?;

        tracing::debug!("Saved bucket {} ({} sessions)", key, sorted.len());

        Ok(())
    }

    /// Insert or replace `session` in the bucket of its start instant
    pub async fn upsert(&self, session: &Session, reset_hour: u32) -> Result<()> {
        let key = local_bucket_key(session.start, reset_hour);
        let mut sessions = self.load_bucket(&key).await;

        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }

        self.save_bucket(&key, &sessions).await
    }

    /// Remove `session` from the bucket of its start instant
    pub async fn delete(&self, session: &Session, reset_hour: u32) -> Result<()> {
        let key = local_bucket_key(session.start, reset_hour);
        let mut sessions = self.load_bucket(&key).await;
        sessions.retain(|s| s.id != session.id);
        self.save_bucket(&key, &sessions).await
    }

    /// Billable seconds recorded in the bucket of `date`.
    ///
    /// Active entries count their wall-clock time so far; pause time of a
    /// running session is only known to the engine.
    pub async fn total_seconds_worked(&self, date: DateTime<Utc>, reset_hour: u32) -> i64 {
        let now = self.clock.now();
        self.load(date, reset_hour)
            .await
            .iter()
            .map(|s| {
                if s.is_active() {
                    s.wall_seconds(now)
                } else {
                    s.duration_seconds
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::FixedOffset;
    use tempfile::TempDir;

    fn noon_today() -> DateTime<Utc> {
        Local::now()
            .date_naive()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_local_timezone(Local)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    async fn create_test_store(now: DateTime<Utc>) -> (SessionStore, Arc<ManualClock>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(now));
        let store = SessionStore::new(temp_dir.path().join("Sessions"), clock.clone());
        store.initialize().await.unwrap();
        (store, clock, temp_dir)
    }

    fn ended(tag: &str, start: DateTime<Utc>, seconds: i64) -> Session {
        let mut session = Session::begin(tag.to_string(), start);
        session.end = Some(start + Duration::seconds(seconds));
        session.duration_seconds = seconds;
        session
    }

    #[test]
    fn test_bucket_key_reset_hour_boundary() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();

        let before = tz.with_ymd_and_hms(2024, 5, 2, 2, 59, 0).unwrap();
        let at = tz.with_ymd_and_hms(2024, 5, 2, 3, 0, 0).unwrap();

        assert_eq!(bucket_key(&before, 3), "2024-05-01");
        assert_eq!(bucket_key(&at, 3), "2024-05-02");
    }

    #[test]
    fn test_bucket_key_midnight_reset_never_shifts() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(bucket_key(&instant, 0), "2024-01-01");
    }

    #[test]
    fn test_bucket_key_crosses_month_and_year() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 1, 30, 0).unwrap();
        assert_eq!(bucket_key(&instant, 3), "2023-12-31");
    }

    #[tokio::test]
    async fn test_load_missing_bucket_is_empty() {
        let now = noon_today();
        let (store, _clock, _temp) = create_test_store(now).await;

        assert!(store.load(now, 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_sorts_by_start() {
        let now = noon_today();
        let (store, _clock, _temp) = create_test_store(now).await;

        let late = ended("Dev", now + Duration::minutes(30), 60);
        let early = ended("Design", now, 120);

        store.save(&[late.clone(), early.clone()], now, 3).await.unwrap();

        let loaded = store.load(now, 3).await;
        assert_eq!(loaded, vec![early, late]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_matching_id() {
        let now = noon_today();
        let (store, _clock, _temp) = create_test_store(now).await;

        let mut session = Session::begin("Design".to_string(), now);
        store.upsert(&session, 3).await.unwrap();

        session.end = Some(now + Duration::seconds(300));
        session.duration_seconds = 300;
        store.upsert(&session, 3).await.unwrap();

        let loaded = store.load(now, 3).await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].duration_seconds, 300);
    }

    #[tokio::test]
    async fn test_upsert_twice_is_byte_identical() {
        let now = noon_today();
        let (store, _clock, _temp) = create_test_store(now).await;
        let session = ended("Docs", now, 90);
        let path = store.bucket_path(&local_bucket_key(now, 3));

        store.upsert(&session, 3).await.unwrap();
        let first = std::fs::read(&path).unwrap();

        store.upsert(&session, 3).await.unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_delete_removes_only_matching_id() {
        let now = noon_today();
        let (store, _clock, _temp) = create_test_store(now).await;

        let keep = ended("Design", now, 60);
        let removed = ended("Dev", now + Duration::minutes(5), 60);
        store.upsert(&keep, 3).await.unwrap();
        store.upsert(&removed, 3).await.unwrap();

        store.delete(&removed, 3).await.unwrap();

        assert_eq!(store.load(now, 3).await, vec![keep]);
    }

    #[tokio::test]
    async fn test_corrupt_bucket_loads_empty() {
        let now = noon_today();
        let (store, _clock, _temp) = create_test_store(now).await;
        let path = store.bucket_path(&local_bucket_key(now, 3));
        std::fs::write(&path, b"{{{").unwrap();

        assert!(store.load(now, 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_total_seconds_counts_active_session_live() {
        let now = noon_today();
        let (store, clock, _temp) = create_test_store(now).await;

        store.upsert(&ended("Design", now, 600), 3).await.unwrap();
        let active = Session::begin("Dev".to_string(), now + Duration::minutes(20));
        store.upsert(&active, 3).await.unwrap();

        clock.set(now + Duration::minutes(21));

        assert_eq!(store.total_seconds_worked(now, 3).await, 600 + 60);
    }
}
