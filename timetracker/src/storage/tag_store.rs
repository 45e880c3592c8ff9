//! Tag list persistence
//!
//! All tags live in a single `tags.json` record.

use crate::error::Result;
use crate::models::{Tag, TagsFile};
use crate::storage::atomic;
use std::path::PathBuf;

#[derive(Clone)]
pub struct TagStore {
    path: PathBuf,
}

impl TagStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load all tags; a missing or unreadable file yields an empty list
    pub async fn load(&self) -> Vec<Tag> {
        match atomic::read_json::<TagsFile>(&self.path).await {
            Ok(Some(file)) => file.tags,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to load tags, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn save(&self, tags: &[Tag]) -> Result<()> {
        let file = TagsFile {
            tags: tags.to_vec(),
        };
        atomic::write_json(&self.path, &file).await?;
        tracing::debug!("Saved {} tags to {:?}", tags.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_tags_persist_across_instances() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tags.json");

        {
            let store = TagStore::new(path.clone());
            assert!(store.load().await.is_empty());
            store
                .save(&[Tag::new("Design".to_string(), 0, Utc::now())])
                .await
                .unwrap();
        }

        let store = TagStore::new(path);
        let tags = store.load().await;
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Design");
    }
}
