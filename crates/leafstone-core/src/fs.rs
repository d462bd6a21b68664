//! Filesystem helpers shared by the scaffolder and the asset materializer
//!
//! Everything written into an ephemeral project gets a fixed mode so that
//! restrictive source permissions never break serving.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// Mode for generated directories
pub const DIR_MODE: u32 = 0o755;

/// Mode for generated and copied files
pub const FILE_MODE: u32 = 0o644;

/// Create a directory (and parents) with [`DIR_MODE`]
pub async fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    set_mode(path, DIR_MODE).await
}

/// Write a file, creating parent directories, and normalize its mode
pub async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            create_dir(parent).await?;
        }
    }

    fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    set_mode(path, FILE_MODE).await
}

/// Copy a file byte for byte and normalize the destination mode
pub async fn copy_file(from: &Path, to: &Path) -> Result<u64> {
    let bytes = fs::copy(from, to)
        .await
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    set_mode(to, FILE_MODE).await?;
    Ok(bytes)
}

/// Recursively remove a directory; a directory that is already gone is not an error
pub async fn remove_dir(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("src/nested/file.txt");

        write_file(&target, b"hello").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_normalizes_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("locked.svg");
        std::fs::write(&source, b"<svg/>").unwrap();
        std::fs::set_permissions(&source, std::fs::Permissions::from_mode(0o400)).unwrap();

        let dest = dir.path().join("copy.svg");
        copy_file(&source, &dest).await.unwrap();

        let mode = std::fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, FILE_MODE);
    }

    #[tokio::test]
    async fn test_remove_missing_dir_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        remove_dir(&dir.path().join("gone")).await.unwrap();
    }
}
