//! Persisted models
//!
//! Rust structs representing the records written to disk.
//! Field names follow the snake_case keys of the on-disk layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single tracked block of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    #[serde(with = "timestamp")]
    pub start: DateTime<Utc>,
    /// `None` while the session is running
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp::option"
    )]
    pub end: Option<DateTime<Utc>>,
    /// Billable seconds; authoritative once `end` is set
    #[serde(default)]
    pub duration_seconds: i64,
    pub tag: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub remarks: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a running session for `tag` starting at `start`
    pub fn begin(tag: String, start: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end: None,
            duration_seconds: 0,
            tag,
            description: String::new(),
            remarks: String::new(),
            created_at: start,
            updated_at: start,
        }
    }

    pub fn is_active(&self) -> bool {
        self.end.is_none()
    }

    /// Whole seconds between start and end (or `now` while active), ignoring pauses
    pub fn wall_seconds(&self, now: DateTime<Utc>) -> i64 {
        let until = self.end.unwrap_or(now);
        (until - self.start).num_seconds().max(0)
    }
}

/// A label used to start sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(with = "timestamp")]
    pub last_used: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(name: String, sort_order: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            sort_order,
            last_used: now,
            created_at: now,
        }
    }
}

/// Instants on disk: RFC 3339 in UTC with milliseconds,
/// e.g. `2024-05-02T09:00:00.000Z`. Reading accepts any RFC 3339 form.
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        DateTime::<Utc>::deserialize(deserializer)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(instant) => super::serialize(instant, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<DateTime<Utc>>::deserialize(deserializer)
        }
    }
}

/// Top-level record of `tags.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagsFile {
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_session_serializes_snake_case_and_omits_open_end() {
        let start = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        let session = Session::begin("Design".to_string(), start);

        let json = serde_json::to_value(&session).unwrap();

        assert!(json.get("duration_seconds").is_some());
        assert!(json.get("created_at").is_some());
        assert!(json.get("updated_at").is_some());
        assert!(json.get("end").is_none());
    }

    #[test]
    fn test_instants_written_with_milliseconds() {
        let start = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        let mut session = Session::begin("Design".to_string(), start);
        session.end = Some(start + Duration::milliseconds(90_250));

        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["start"], "2024-05-02T09:00:00.000Z");
        assert_eq!(json["end"], "2024-05-02T09:01:30.250Z");
        assert_eq!(json["created_at"], "2024-05-02T09:00:00.000Z");
    }

    #[test]
    fn test_reads_instants_without_fraction() {
        let raw = r#"{
            "id": "6f1c2b9e-8f4e-4c3a-9d7a-2b1e0c5d4a3f",
            "start": "2024-05-02T09:00:00Z",
            "end": "2024-05-02T10:00:00+02:00",
            "duration_seconds": 0,
            "tag": "Dev",
            "created_at": "2024-05-02T09:00:00Z",
            "updated_at": "2024-05-02T09:00:00.5Z"
        }"#;

        let session: Session = serde_json::from_str(raw).unwrap();

        assert_eq!(session.start, Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap());
        assert_eq!(session.end, Some(Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap()));
        assert_eq!(session.updated_at - session.created_at, Duration::milliseconds(500));
    }

    #[test]
    fn test_wall_seconds_uses_end_when_present() {
        let start = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        let mut session = Session::begin("Dev".to_string(), start);

        assert_eq!(session.wall_seconds(start + Duration::seconds(42)), 42);

        session.end = Some(start + Duration::seconds(10));
        assert_eq!(session.wall_seconds(start + Duration::hours(5)), 10);
    }

    #[test]
    fn test_tag_file_keys() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
        let file = TagsFile {
            tags: vec![Tag::new("Docs".to_string(), 0, now)],
        };

        let json = serde_json::to_value(&file).unwrap();
        let tag = &json["tags"][0];

        assert_eq!(tag["name"], "Docs");
        assert!(tag.get("sort_order").is_some());
        assert!(tag.get("last_used").is_some());
    }
}
