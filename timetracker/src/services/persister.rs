//! Background persistence
//!
//! A single task owns every store and applies write requests in the order
//! they were enqueued. Callers never wait for a write: failures are logged
//! and the in-memory state stays authoritative until a later write succeeds.

use crate::error::{AppError, Result};
use crate::models::{Session, Tag};
use crate::services::settings::{AppSettings, SettingsService};
use crate::storage::{SessionStore, TagStore};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug)]
enum WriteRequest {
    UpsertSession { session: Session, reset_hour: u32 },
    DeleteSession { session: Session, reset_hour: u32 },
    SaveTags(Vec<Tag>),
    SaveSettings(AppSettings),
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer task
#[derive(Clone)]
pub struct Persister {
    tx: mpsc::UnboundedSender<WriteRequest>,
}

impl Persister {
    /// Start the writer task.
    ///
    /// The task exits once every `Persister` handle has been dropped and
    /// the queue is drained.
    pub fn spawn(
        sessions: SessionStore,
        tags: TagStore,
        settings: SettingsService,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteRequest>();

        let handle = tokio::spawn(async move {
            tracing::info!("Starting persistence writer");

            while let Some(request) = rx.recv().await {
                match request {
                    WriteRequest::UpsertSession {
                        session,
                        reset_hour,
                    } => {
                        if let Err(e) = sessions.upsert(&session, reset_hour).await {
                            tracing::error!("Failed to save session {}: {}", session.id, e);
                        }
                    }
                    WriteRequest::DeleteSession {
                        session,
                        reset_hour,
                    } => {
                        if let Err(e) = sessions.delete(&session, reset_hour).await {
                            tracing::error!("Failed to delete session {}: {}", session.id, e);
                        }
                    }
                    WriteRequest::SaveTags(list) => {
                        if let Err(e) = tags.save(&list).await {
                            tracing::error!("Failed to save tags: {}", e);
                        }
                    }
                    WriteRequest::SaveSettings(value) => {
                        if let Err(e) = settings.save(&value).await {
                            tracing::error!("Failed to save settings: {}", e);
                        }
                    }
                    WriteRequest::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }

            tracing::info!("Persistence writer stopped");
        });

        (Self { tx }, handle)
    }

    pub fn upsert_session(&self, session: Session, reset_hour: u32) {
        self.enqueue(WriteRequest::UpsertSession {
            session,
            reset_hour,
        });
    }

    pub fn delete_session(&self, session: Session, reset_hour: u32) {
        self.enqueue(WriteRequest::DeleteSession {
            session,
            reset_hour,
        });
    }

    pub fn save_tags(&self, tags: Vec<Tag>) {
        self.enqueue(WriteRequest::SaveTags(tags));
    }

    pub fn save_settings(&self, settings: AppSettings) {
        self.enqueue(WriteRequest::SaveSettings(settings));
    }

    /// Wait until every request enqueued so far has been applied
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(WriteRequest::Flush(ack))
            .map_err(|_| AppError::PersisterClosed)?;
        done.await.map_err(|_| AppError::PersisterClosed)
    }

    fn enqueue(&self, request: WriteRequest) {
        if let Err(e) = self.tx.send(request) {
            tracing::error!("Persistence writer is gone, dropping {:?}", e.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_persister(root: &std::path::Path) -> (Persister, SessionStore, TagStore) {
        let sessions = SessionStore::new(root.join("Sessions"), Arc::new(SystemClock));
        let tags = TagStore::new(root.join("tags.json"));
        let settings = SettingsService::new(root.join("settings.json"));
        let (persister, _handle) = Persister::spawn(sessions.clone(), tags.clone(), settings);
        (persister, sessions, tags)
    }

    #[tokio::test]
    async fn test_writes_apply_in_order() {
        let temp = TempDir::new().unwrap();
        let (persister, sessions, _tags) = create_test_persister(temp.path());

        let start = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        let mut session = Session::begin("Design".to_string(), start);
        persister.upsert_session(session.clone(), 3);

        session.end = Some(start + Duration::seconds(30));
        session.duration_seconds = 30;
        persister.upsert_session(session.clone(), 3);

        persister.flush().await.unwrap();

        let loaded = sessions.load(start, 3).await;
        assert_eq!(loaded, vec![session]);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_writer() {
        let temp = TempDir::new().unwrap();
        // A plain file where the sessions directory should be
        std::fs::write(temp.path().join("Sessions"), b"").unwrap();
        let (persister, _sessions, tags) = create_test_persister(temp.path());

        persister.upsert_session(Session::begin("Dev".to_string(), Utc::now()), 3);
        persister.save_tags(vec![Tag::new("Dev".to_string(), 0, Utc::now())]);
        persister.flush().await.unwrap();

        assert_eq!(tags.load().await.len(), 1);
    }
}
