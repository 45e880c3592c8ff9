//! Tag registry
//!
//! In-memory list of tags used to start sessions. Names are matched
//! case-insensitively on upsert; ordering for suggestions is by recency.
//! Persisting the list is the caller's job (see `Persister`).

use crate::config::{MAX_TAG_LENGTH, RECENT_TAGS_LIMIT};
use crate::models::Tag;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Trim and truncate a user-supplied tag name.
///
/// Returns `None` when nothing is left.
pub fn normalize_tag_name(name: &str) -> Option<String> {
    let truncated: String = name.trim().chars().take(MAX_TAG_LENGTH).collect();
    let normalized = truncated.trim_end();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: Vec<Tag>,
}

impl TagRegistry {
    pub fn new(tags: Vec<Tag>) -> Self {
        Self { tags }
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Bump `last_used` of the tag matching `name` (any case), or append a new one.
    ///
    /// Returns the stored tag, or `None` if the name is empty after normalization.
    pub fn upsert(&mut self, name: &str, now: DateTime<Utc>) -> Option<Tag> {
        let name = normalize_tag_name(name)?;
        let lowered = name.to_lowercase();

        if let Some(tag) = self
            .tags
            .iter_mut()
            .find(|t| t.name.to_lowercase() == lowered)
        {
            tag.last_used = now;
            return Some(tag.clone());
        }

        let tag = Tag::new(name, self.tags.len() as i64, now);
        tracing::debug!("Registered new tag: {}", tag.name);
        self.tags.push(tag.clone());
        Some(tag)
    }

    /// Rename the tag named exactly `old_name`.
    ///
    /// Collisions with other tags are not checked, so two tags may end up
    /// sharing a name.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> bool {
        let Some(new_name) = normalize_tag_name(new_name) else {
            return false;
        };

        match self.tags.iter_mut().find(|t| t.name == old_name) {
            Some(tag) => {
                tracing::debug!("Renaming tag {} -> {}", tag.name, new_name);
                tag.name = new_name;
                true
            }
            None => false,
        }
    }

    /// Remove the tag with `id`
    pub fn delete(&mut self, id: Uuid) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t.id != id);
        self.tags.len() != before
    }

    /// Up to `limit` tags, most recently used first
    pub fn recent(&self, limit: usize) -> Vec<Tag> {
        let mut tags = self.tags.clone();
        tags.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        tags.truncate(limit);
        tags
    }

    /// Tags whose name contains `query`, ignoring case.
    ///
    /// An empty query returns the recent tags instead.
    pub fn filter(&self, query: &str) -> Vec<Tag> {
        if query.is_empty() {
            return self.recent(RECENT_TAGS_LIMIT);
        }

        let query_lower = query.to_lowercase();

        self.tags
            .iter()
            .filter(|t| t.name.to_lowercase().contains(&query_lower))
            .cloned()
            .collect()
    }
}
