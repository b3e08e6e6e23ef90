//! # IO Utilities
//!
//! File system operations for the `.surveyor` runtime directory and for
//! exported artifacts.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Get the runtime directory path (.surveyor)
///
/// Holds the run history database and the managed secrets file.
pub fn get_runtime_path() -> PathBuf {
    if let Ok(path) = std::env::var("SURVEYOR_RUNTIME_PATH") {
        return PathBuf::from(path);
    }

    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".surveyor")
}

/// Ensure the runtime directory exists
pub async fn ensure_runtime_dir() -> Result<PathBuf> {
    let path = get_runtime_path();
    fs::create_dir_all(&path)
        .await
        .with_context(|| format!("Failed to create runtime directory: {:?}", path))?;
    Ok(path)
}

/// Write an export artifact, creating parent directories as needed
pub async fn write_export(path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write file: {:?}", path))
}

/// Read a text input such as a brief file
pub async fn read_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_runtime_path_override() {
        std::env::set_var("SURVEYOR_RUNTIME_PATH", "/tmp/surveyor-test-runtime");
        assert_eq!(
            get_runtime_path(),
            PathBuf::from("/tmp/surveyor-test-runtime")
        );
        std::env::remove_var("SURVEYOR_RUNTIME_PATH");
        assert!(get_runtime_path().ends_with(".surveyor"));
    }

    #[tokio::test]
    async fn test_write_and_read_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("survey.json");

        write_export(&path, b"{\"sections\": []}").await.unwrap();
        let content = read_text(&path).await.unwrap();
        assert_eq!(content, "{\"sections\": []}");
    }
}
