//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::clock::{Clock, SystemClock};
use crate::config::{APP_NAME, DATA_DIR_ENV, SESSIONS_DIR, SETTINGS_FILE, TAGS_FILE};
use crate::error::{AppError, Result};
use crate::services::{Persister, SettingsService, TimerEngine};
use crate::storage::{SessionStore, TagStore};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub engine: Arc<TimerEngine>,
}

/// Pick the data directory: an explicit path, then `TIMETRACKER_DATA_DIR`,
/// then the platform application-data directory.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }

    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let dirs = ProjectDirs::from("", "", APP_NAME).ok_or_else(|| {
        AppError::DataDir("Could not determine the application data directory".to_string())
    })?;

    Ok(dirs.data_dir().to_path_buf())
}

/// Application setup - called once on startup
pub async fn setup(app_data_dir: PathBuf) -> Result<AppState> {
    setup_with_clock(app_data_dir, Arc::new(SystemClock)).await
}

/// Setup with an explicit time source
pub async fn setup_with_clock(app_data_dir: PathBuf, clock: Arc<dyn Clock>) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", app_data_dir);

    tokio::fs::create_dir_all(&app_data_dir).await?;

    let session_store = SessionStore::new(app_data_dir.join(SESSIONS_DIR), clock.clone());
    session_store.initialize().await?;
    let tag_store = TagStore::new(app_data_dir.join(TAGS_FILE));
    let settings_service = SettingsService::new(app_data_dir.join(SETTINGS_FILE));

    let (persister, _writer) = Persister::spawn(
        session_store.clone(),
        tag_store.clone(),
        settings_service.clone(),
    );

    let engine = TimerEngine::load(
        clock,
        session_store,
        &tag_store,
        &settings_service,
        persister,
    )
    .await;

    tracing::info!("Application initialized successfully");

    Ok(AppState {
        app_data_dir,
        engine: Arc::new(engine),
    })
}
