//! Error types for TimeTracker
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to a UI bridge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Data directory error: {0}")]
    DataDir(String),

    #[error("Persistence queue closed")]
    PersisterClosed,

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_as_message() {
        let err = AppError::DataDir("no home".to_string());
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!("Data directory error: no home")
        );
    }
}
