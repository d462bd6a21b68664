//! Asset materialization into the ephemeral project and the build output
//!
//! A missing or unreadable source only skips that asset. Filename collisions are
//! rejected earlier, during extraction, so nothing here can overwrite another asset.

use crate::directives::Asset;
use crate::fs;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

/// Directory (relative to a project or output root) holding copied assets
pub const ASSETS_DIR: &str = "assets";

/// An asset that could not be copied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    pub filename: String,
    pub reason: String,
}

/// Outcome of one copy pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReport {
    /// Filenames copied successfully, in declaration order
    pub copied: Vec<String>,
    /// Assets skipped because of a missing source or a copy error
    pub failed: Vec<AssetFailure>,
}

impl AssetReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Copy declared assets into `<root>/assets/<filename>`.
///
/// An empty declaration list performs no filesystem operation.
pub async fn copy_assets(assets: &[Asset], root: &Path) -> Result<AssetReport> {
    let mut report = AssetReport::default();
    if assets.is_empty() {
        return Ok(report);
    }

    let assets_dir = root.join(ASSETS_DIR);
    fs::create_dir(&assets_dir).await?;

    let names: Vec<&str> = assets.iter().map(|a| a.filename.as_str()).collect();
    println!("{} {}", "Copying assets:".cyan(), names.join(", "));

    for asset in assets {
        if !asset.source_path.is_file() {
            eprintln!(
                "  {} Asset not found: {}",
                "Warning:".yellow(),
                asset.source_path.display()
            );
            report.failed.push(AssetFailure {
                filename: asset.filename.clone(),
                reason: format!("not found: {}", asset.source_path.display()),
            });
            continue;
        }

        let dest = assets_dir.join(&asset.filename);
        match fs::copy_file(&asset.source_path, &dest).await {
            Ok(_) => {
                println!("  {} {} -> {}", "->".blue(), asset.filename, asset.url_path);
                report.copied.push(asset.filename.clone());
            }
            Err(e) => {
                eprintln!(
                    "  {} Failed to copy {}: {:#}",
                    "Warning:".yellow(),
                    asset.filename,
                    e
                );
                report.failed.push(AssetFailure {
                    filename: asset.filename.clone(),
                    reason: format!("{:#}", e),
                });
            }
        }
    }

    Ok(report)
}

/// Re-publish assets already copied into `root` under `<out_dir>/assets/`.
///
/// Assets that never made it into the project are skipped silently; they were
/// reported when the project was populated.
pub async fn publish_assets(assets: &[Asset], root: &Path, out_dir: &Path) -> Result<AssetReport> {
    let mut report = AssetReport::default();
    if assets.is_empty() {
        return Ok(report);
    }

    let published_dir = out_dir.join(ASSETS_DIR);
    fs::create_dir(&published_dir).await?;

    for asset in assets {
        let source = root.join(ASSETS_DIR).join(&asset.filename);
        if !source.is_file() {
            continue;
        }

        match fs::copy_file(&source, &published_dir.join(&asset.filename)).await {
            Ok(_) => {
                println!("  {} Published {} to build /assets/", "->".blue(), asset.filename);
                report.copied.push(asset.filename.clone());
            }
            Err(e) => report.failed.push(AssetFailure {
                filename: asset.filename.clone(),
                reason: format!("{:#}", e),
            }),
        }
    }

    Ok(report)
}
