//! Timer engine
//!
//! Owns the session lifecycle (`Idle` -> `Running` <-> `Paused` -> `Idle`),
//! pause accounting and the derived display values. Every command runs
//! under one mutex, so transitions never interleave. Writes are handed to
//! the [`Persister`] while the lock is held, which keeps their order equal
//! to the order of the transitions that produced them.
//!
//! Derived values are published on a watch channel after every command
//! and every tick; discrete events go out on a broadcast channel.

use crate::clock::Clock;
use crate::config::MAX_DESCRIPTION_LENGTH;
use crate::display;
use crate::error::Result;
use crate::models::{Session, Tag};
use crate::services::persister::Persister;
use crate::services::settings::{AppSettings, SettingsService};
use crate::services::tags::{normalize_tag_name, TagRegistry};
use crate::storage::{local_bucket_key, SessionStore, TagStore};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

/// Derived values for the UI, recomputed from state and the current time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub current_session: Option<Session>,
    pub current_elapsed_seconds: i64,
    pub today_total_seconds: i64,
    pub target_reached: bool,
    pub overtime_seconds: i64,
    pub remaining_seconds: i64,
    /// Status-bar text (remaining, overtime or today's total)
    pub status_text: String,
    /// Running session elapsed, `H:MM:SS` / `M:SS`
    pub elapsed_text: String,
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    SessionStarted(Session),
    SessionEnded(Session),
    /// The UI should ask for the tag of the next session
    TagPromptRequested,
    SettingsChanged(AppSettings),
}

struct EngineState {
    state: TimerState,
    current: Option<Session>,
    /// Reset hour in force when the current session started; the session
    /// stays in that bucket even if the setting changes mid-session.
    current_reset_hour: u32,
    paused_total: Duration,
    pause_started: Option<DateTime<Utc>>,
    settings: AppSettings,
    tags: TagRegistry,
    today_key: String,
    today_sessions: Vec<Session>,
}

pub struct TimerEngine {
    inner: Mutex<EngineState>,
    clock: Arc<dyn Clock>,
    store: SessionStore,
    persister: Persister,
    snapshot_tx: watch::Sender<TimerSnapshot>,
    events_tx: broadcast::Sender<EngineEvent>,
}

impl TimerEngine {
    /// Build an engine from already-loaded state.
    ///
    /// If today's or the previous day's bucket holds an open session (left
    /// behind by a crash) it becomes the current session and the engine
    /// starts `Running`. A session that began before the reset hour was
    /// crossed keeps writing to its own bucket. Pause time accumulated
    /// before the crash is not known and counts as zero.
    pub fn new(
        clock: Arc<dyn Clock>,
        store: SessionStore,
        persister: Persister,
        settings: AppSettings,
        tags: Vec<Tag>,
        today_sessions: Vec<Session>,
        previous_sessions: Vec<Session>,
    ) -> Self {
        let now = clock.now();
        let settings = settings.normalized();
        let today_key = local_bucket_key(now, settings.day_reset_hour);

        let mut open = today_sessions
            .iter()
            .chain(previous_sessions.iter())
            .filter(|s| s.is_active());
        let current = open.next().cloned();
        if open.next().is_some() {
            tracing::warn!("More than one open session found around {}", today_key);
        }
        let state = match &current {
            Some(session) => {
                tracing::info!("Recovering open session {} ({})", session.id, session.tag);
                TimerState::Running
            }
            None => TimerState::Idle,
        };

        let mut inner = EngineState {
            state,
            current,
            current_reset_hour: settings.day_reset_hour,
            paused_total: Duration::zero(),
            pause_started: None,
            settings,
            tags: TagRegistry::new(tags),
            today_key,
            today_sessions,
        };

        let snapshot = compute_snapshot(&mut inner, now);
        let (snapshot_tx, _) = watch::channel(snapshot);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Mutex::new(inner),
            clock,
            store,
            persister,
            snapshot_tx,
            events_tx,
        }
    }

    /// Load settings, tags, today's bucket and the one before it, then
    /// build the engine
    pub async fn load(
        clock: Arc<dyn Clock>,
        store: SessionStore,
        tag_store: &TagStore,
        settings_service: &SettingsService,
        persister: Persister,
    ) -> Self {
        let settings = settings_service.load().await.normalized();
        let tags = tag_store.load().await;
        let now = clock.now();
        let today = store.load(now, settings.day_reset_hour).await;
        let previous = store
            .load(now - Duration::days(1), settings.day_reset_hour)
            .await;

        tracing::info!(
            "Loaded {} tags and {} sessions for today",
            tags.len(),
            today.len()
        );

        Self::new(clock, store, persister, settings, tags, today, previous)
    }

    // ===== Session Lifecycle =====

    /// Start a session tagged `tag_name`. Ignored unless idle or if the
    /// name is blank after trimming.
    pub fn start(&self, tag_name: &str) -> Option<Session> {
        let now = self.clock.now();
        let mut st = self.lock_at(now);

        if st.state != TimerState::Idle {
            tracing::debug!("Ignoring start while {:?}", st.state);
            return None;
        }
        let name = normalize_tag_name(tag_name)?;

        st.tags.upsert(&name, now);
        self.persister.save_tags(st.tags.tags().to_vec());

        let session = Session::begin(name, now);
        st.current = Some(session.clone());
        st.current_reset_hour = st.settings.day_reset_hour;
        st.state = TimerState::Running;
        st.paused_total = Duration::zero();
        st.pause_started = None;

        cache_upsert(&mut st, &session);
        self.persister
            .upsert_session(session.clone(), st.current_reset_hour);

        tracing::info!("Started session {} ({})", session.id, session.tag);

        let snapshot = compute_snapshot(&mut st, now);
        drop(st);
        self.publish(snapshot);
        let _ = self
            .events_tx
            .send(EngineEvent::SessionStarted(session.clone()));

        Some(session)
    }

    pub fn pause(&self) -> bool {
        let now = self.clock.now();
        let mut st = self.lock();

        if st.state != TimerState::Running {
            return false;
        }
        st.state = TimerState::Paused;
        st.pause_started = Some(now);
        tracing::debug!("Paused");

        let snapshot = compute_snapshot(&mut st, now);
        drop(st);
        self.publish(snapshot);
        true
    }

    pub fn resume(&self) -> bool {
        let now = self.clock.now();
        let mut st = self.lock();

        if st.state != TimerState::Paused {
            return false;
        }
        if let Some(pause_start) = st.pause_started.take() {
            st.paused_total += now - pause_start;
        }
        st.state = TimerState::Running;
        tracing::debug!("Resumed, {}s paused in total", st.paused_total.num_seconds());

        let snapshot = compute_snapshot(&mut st, now);
        drop(st);
        self.publish(snapshot);
        true
    }

    pub fn toggle_pause(&self) {
        match self.state() {
            TimerState::Running => {
                self.pause();
            }
            TimerState::Paused => {
                self.resume();
            }
            TimerState::Idle => {}
        }
    }

    /// End the current session, running or paused.
    ///
    /// An ongoing pause is closed first, so it never counts as work.
    pub fn end(&self, description: &str, remarks: &str) -> Option<Session> {
        let now = self.clock.now();
        let mut st = self.lock_at(now);

        if st.state == TimerState::Idle {
            return None;
        }
        let mut session = st.current.take()?;

        if let Some(pause_start) = st.pause_started.take() {
            st.paused_total += now - pause_start;
        }
        let worked = (now - session.start).num_seconds() - st.paused_total.num_seconds();

        session.end = Some(now);
        session.duration_seconds = worked.max(0);
        session.description = truncate_description(description);
        session.remarks = remarks.to_string();
        session.updated_at = now;

        st.state = TimerState::Idle;
        st.paused_total = Duration::zero();

        cache_upsert(&mut st, &session);
        self.persister
            .upsert_session(session.clone(), st.current_reset_hour);

        tracing::info!(
            "Ended session {} ({}) after {}s",
            session.id,
            session.tag,
            session.duration_seconds
        );

        let snapshot = compute_snapshot(&mut st, now);
        drop(st);
        self.publish(snapshot);
        let _ = self
            .events_tx
            .send(EngineEvent::SessionEnded(session.clone()));

        Some(session)
    }

    /// End the current session and ask the UI for the next tag
    pub fn switch_task(&self) -> Option<Session> {
        let ended = self.end("", "");
        let _ = self.events_tx.send(EngineEvent::TagPromptRequested);
        ended
    }

    /// Recompute derived values; never touches the filesystem
    pub fn tick(&self) {
        let now = self.clock.now();
        let snapshot = {
            let mut st = self.lock();
            compute_snapshot(&mut st, now)
        };
        self.publish(snapshot);
    }

    // ===== Session Editing =====

    /// Save edits to a session's description and remarks.
    ///
    /// For the running session only those two fields are taken over.
    pub fn update_session(&self, session: Session) -> Session {
        let now = self.clock.now();
        let mut st = self.lock_at(now);

        let current_reset_hour = st.current_reset_hour;
        let day_reset_hour = st.settings.day_reset_hour;

        let (updated, reset_hour) = match st.current.as_mut() {
            Some(current) if current.id == session.id => {
                current.description = truncate_description(&session.description);
                current.remarks = session.remarks;
                current.updated_at = now;
                (current.clone(), current_reset_hour)
            }
            _ => {
                let mut session = session;
                session.description = truncate_description(&session.description);
                session.updated_at = now;
                (session, day_reset_hour)
            }
        };

        cache_upsert(&mut st, &updated);
        self.persister.upsert_session(updated.clone(), reset_hour);

        let snapshot = compute_snapshot(&mut st, now);
        drop(st);
        self.publish(snapshot);

        updated
    }

    /// Delete a stored session. The running session cannot be deleted.
    pub fn delete_session(&self, session: &Session) -> bool {
        let now = self.clock.now();
        let mut st = self.lock_at(now);

        if st.current.as_ref().map(|c| c.id) == Some(session.id) {
            tracing::debug!("Refusing to delete the running session {}", session.id);
            return false;
        }

        st.today_sessions.retain(|s| s.id != session.id);
        self.persister
            .delete_session(session.clone(), st.settings.day_reset_hour);

        tracing::info!("Deleted session {}", session.id);

        let snapshot = compute_snapshot(&mut st, now);
        drop(st);
        self.publish(snapshot);
        true
    }

    /// Sessions in the bucket of `date`, after pending writes have landed
    pub async fn sessions_for(&self, date: DateTime<Utc>) -> Vec<Session> {
        if let Err(e) = self.persister.flush().await {
            tracing::warn!("Reading sessions without flushing: {}", e);
        }
        let reset_hour = self.lock().settings.day_reset_hour;
        self.store.load(date, reset_hour).await
    }

    pub fn today_sessions(&self) -> Vec<Session> {
        self.lock().today_sessions.clone()
    }

    // ===== Tags =====

    pub fn tags(&self) -> Vec<Tag> {
        self.lock().tags.tags().to_vec()
    }

    pub fn recent_tags(&self, limit: usize) -> Vec<Tag> {
        self.lock().tags.recent(limit)
    }

    pub fn filter_tags(&self, query: &str) -> Vec<Tag> {
        self.lock().tags.filter(query)
    }

    pub fn rename_tag(&self, old_name: &str, new_name: &str) -> bool {
        let mut st = self.lock();
        let renamed = st.tags.rename(old_name, new_name);
        if renamed {
            self.persister.save_tags(st.tags.tags().to_vec());
        }
        renamed
    }

    pub fn delete_tag(&self, id: Uuid) -> bool {
        let mut st = self.lock();
        let deleted = st.tags.delete(id);
        if deleted {
            self.persister.save_tags(st.tags.tags().to_vec());
        }
        deleted
    }

    // ===== Settings =====

    pub fn settings(&self) -> AppSettings {
        self.lock().settings.clone()
    }

    /// Replace the settings, persist them and notify observers.
    ///
    /// If the new reset hour moves "today" to another bucket, today's
    /// sessions are reloaded from disk.
    pub async fn update_settings(&self, settings: AppSettings) {
        let now = self.clock.now();
        let settings = settings.normalized();

        let reload_key = {
            let mut st = self.lock();
            st.settings = settings.clone();
            self.persister.save_settings(settings.clone());

            let key = local_bucket_key(now, settings.day_reset_hour);
            if key != st.today_key {
                Some(key)
            } else {
                None
            }
        };

        tracing::info!(
            "Settings updated: {} mode, target {}, reset {}",
            settings.timer_mode.display_name(),
            settings.daily_target_formatted(),
            settings.reset_time_formatted()
        );
        let _ = self
            .events_tx
            .send(EngineEvent::SettingsChanged(settings.clone()));

        if let Some(key) = reload_key {
            let sessions = self.sessions_for(now).await;
            let mut st = self.lock();
            st.today_key = key;
            st.today_sessions = sessions;
        }

        self.tick();
    }

    // ===== Observation =====

    pub fn state(&self) -> TimerState {
        self.lock().state
    }

    pub fn current_session(&self) -> Option<Session> {
        self.lock().current.clone()
    }

    /// Derived values as of now
    pub fn snapshot(&self) -> TimerSnapshot {
        let now = self.clock.now();
        let mut st = self.lock();
        compute_snapshot(&mut st, now)
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events_tx.subscribe()
    }

    /// Wait for every write issued so far
    pub async fn flush(&self) -> Result<()> {
        self.persister.flush().await
    }

    fn publish(&self, snapshot: TimerSnapshot) {
        self.snapshot_tx.send_replace(snapshot);
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Lock with today's cache already moved to the bucket of `now`
    fn lock_at(&self, now: DateTime<Utc>) -> MutexGuard<'_, EngineState> {
        let mut st = self.lock();
        roll_day(&mut st, now);
        st
    }
}

fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_LENGTH).collect()
}

/// Keep today's cache in step with a session that was just written
fn cache_upsert(st: &mut EngineState, session: &Session) {
    if local_bucket_key(session.start, st.settings.day_reset_hour) != st.today_key {
        return;
    }
    match st.today_sessions.iter_mut().find(|s| s.id == session.id) {
        Some(existing) => *existing = session.clone(),
        None => st.today_sessions.push(session.clone()),
    }
    st.today_sessions.sort_by_key(|s| s.start);
}

fn current_elapsed(st: &EngineState, now: DateTime<Utc>) -> i64 {
    let Some(session) = &st.current else {
        return 0;
    };
    let until = match st.state {
        TimerState::Running => now,
        TimerState::Paused => st.pause_started.unwrap_or(now),
        TimerState::Idle => return 0,
    };
    ((until - session.start) - st.paused_total)
        .num_seconds()
        .max(0)
}

/// Start a fresh, empty day once `now` has left the cached bucket.
///
/// Only this process writes buckets, and a running session stays in the
/// bucket it started in, so the new day has nothing on disk yet.
fn roll_day(st: &mut EngineState, now: DateTime<Utc>) {
    let key = local_bucket_key(now, st.settings.day_reset_hour);
    if key != st.today_key {
        tracing::info!("Day rolled over: {} -> {}", st.today_key, key);
        st.today_key = key;
        st.today_sessions.clear();
    }
}

fn compute_snapshot(st: &mut EngineState, now: DateTime<Utc>) -> TimerSnapshot {
    roll_day(st, now);

    let elapsed = current_elapsed(st, now);
    let current_id = st.current.as_ref().map(|c| c.id);

    let today_total: i64 = st
        .today_sessions
        .iter()
        .map(|s| {
            if !s.is_active() {
                s.duration_seconds
            } else if Some(s.id) == current_id {
                elapsed
            } else {
                s.wall_seconds(now)
            }
        })
        .sum();

    let target = st.settings.daily_target_seconds;

    TimerSnapshot {
        state: st.state,
        current_session: st.current.clone(),
        current_elapsed_seconds: elapsed,
        today_total_seconds: today_total,
        target_reached: today_total >= target,
        overtime_seconds: (today_total - target).max(0),
        remaining_seconds: (target - today_total).max(0),
        status_text: display::status_text(st.settings.timer_mode, today_total, target),
        elapsed_text: display::format_long(elapsed),
    }
}
