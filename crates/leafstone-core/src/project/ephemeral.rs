//! The throwaway project directory handed to the toolchain

use crate::fs;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Prefix of every ephemeral project directory
pub const TEMP_PREFIX: &str = ".leafstone-temp-";

/// A directory owned by exactly one dev-server or build invocation.
///
/// The random suffix keeps concurrent invocations in the same working directory apart.
/// The directory is not removed on drop; call [`EphemeralProject::remove`].
#[derive(Debug)]
pub struct EphemeralProject {
    root: PathBuf,
}

impl EphemeralProject {
    /// Create a fresh `.leafstone-temp-<random>` directory inside `parent`
    pub async fn create_in(parent: &Path) -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(parent)
            .with_context(|| format!("Failed to create temp directory in {}", parent.display()))?
            .keep();
        fs::create_dir(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Recursively delete the project
    pub async fn remove(self) -> Result<()> {
        fs::remove_dir(&self.root).await
    }
}
