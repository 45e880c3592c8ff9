//! Crash-safe file replacement
//!
//! Every persisted file is replaced with the same sequence:
//!
//! 1. write the new content to `<path>.tmp` and fsync it
//! 2. copy the current `<path>` (if any) to `<path>.bak`, best effort
//! 3. remove `<path>` and rename `<path>.tmp` into place
//!
//! `<path>` is never partially written. The only window where it is absent
//! is between steps 3a and 3b, and `<path>.bak` holds the previous version
//! during that window. Readers fall back to the backup when the target is
//! missing or unreadable.

use crate::config::{BACKUP_SUFFIX, TEMP_SUFFIX};
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// `<path>.<suffix>`, keeping the original extension
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

pub fn temp_path(path: &Path) -> PathBuf {
    sibling_path(path, TEMP_SUFFIX)
}

pub fn backup_path(path: &Path) -> PathBuf {
    sibling_path(path, BACKUP_SUFFIX)
}

/// Replace `path` with `contents` using the temp/backup/rename sequence
pub async fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp = temp_path(path);
    let backup = backup_path(path);

    let mut file = fs::File::create(&temp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    if fs::try_exists(path).await.unwrap_or(false) {
        if let Err(e) = fs::copy(path, &backup).await {
            tracing::debug!("Could not refresh backup {:?}: {}", backup, e);
        }
        fs::remove_file(path).await?;
    }

    fs::rename(&temp, path).await?;

    tracing::debug!("Wrote {:?} ({} bytes)", path, contents.len());

    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &content).await
}

/// Read a JSON file, falling back to its `.bak` sibling.
///
/// Returns `Ok(None)` when neither file exists, and an error only when
/// something exists on disk but nothing usable could be read from it.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let primary_err = match read_one::<T>(path).await {
        Ok(Some(value)) => return Ok(Some(value)),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Failed to read {:?}: {}", path, e);
            Some(e)
        }
    };

    let backup = backup_path(path);
    match read_one::<T>(&backup).await {
        Ok(Some(value)) => {
            tracing::warn!("Recovered {:?} from backup {:?}", path, backup);
            Ok(Some(value))
        }
        Ok(None) => match primary_err {
            Some(e) => Err(e),
            None => Ok(None),
        },
        Err(e) => {
            tracing::warn!("Backup {:?} is unreadable too: {}", backup, e);
            Err(primary_err.unwrap_or(e))
        }
    }
}

async fn read_one<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(serde_json::from_slice(&content)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_file_without_leftover_temp() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");

        atomic_write(&path, b"{\"a\":1}").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"{\"a\":1}");
        assert!(!temp_path(&path).exists());
        assert!(!backup_path(&path).exists());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_previous_version_as_backup() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tags.json");

        atomic_write(&path, b"first").await.unwrap();
        atomic_write(&path, b"second").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(std::fs::read(backup_path(&path)).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_backup_is_replaced_in_place() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tags.json");

        atomic_write(&path, b"first").await.unwrap();
        atomic_write(&path, b"second").await.unwrap();
        atomic_write(&path, b"third").await.unwrap();

        assert_eq!(std::fs::read(backup_path(&path)).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_failed_backup_refresh_keeps_old_backup() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.json");
        std::fs::write(backup_path(&path), b"older").unwrap();
        // Something that exists but cannot be copied
        std::fs::create_dir(&path).unwrap();

        assert!(atomic_write(&path, b"new").await.is_err());
        assert_eq!(std::fs::read(backup_path(&path)).unwrap(), b"older");
    }

    #[tokio::test]
    async fn test_sibling_paths_append_suffix() {
        let path = Path::new("/data/Sessions/2024-05-01.json");

        assert_eq!(
            temp_path(path),
            PathBuf::from("/data/Sessions/2024-05-01.json.tmp")
        );
        assert_eq!(
            backup_path(path),
            PathBuf::from("/data/Sessions/2024-05-01.json.bak")
        );
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.json");

        let value: Option<Vec<u32>> = read_json(&path).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_read_falls_back_to_backup_when_target_removed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.json");

        write_json(&path, &vec![1u32, 2]).await.unwrap();
        write_json(&path, &vec![3u32]).await.unwrap();

        // Killed between removing the target and renaming the temp file
        std::fs::write(temp_path(&path), b"[4, 5").unwrap();
        std::fs::remove_file(&path).unwrap();

        let value: Option<Vec<u32>> = read_json(&path).await.unwrap();
        assert_eq!(value, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn test_read_corrupt_without_backup_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.json");
        std::fs::write(&path, b"not json").unwrap();

        let value: Result<Option<Vec<u32>>> = read_json(&path).await;
        assert!(value.is_err());
    }
}
