//! Comment directive extraction
//!
//! Two directive families are recognized in component source:
//!
//! - `// @requires <package>[@<version>]` declares an npm dependency
//! - `// @requires-asset <source> [<filename>]` declares a static asset served
//!   under `/assets/<filename>`; it must start at column 0
//!
//! Only line comments count. Directives inside block comments are ignored.

use crate::error::DirectiveError;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::OnceLock;

/// Version constraint used when a `@requires` directive names no version
pub const LATEST: &str = "latest";

/// URL prefix under which assets are served
pub const ASSET_URL_PREFIX: &str = "/assets/";

/// Package name to version constraint, ordered by package name
pub type Dependencies = BTreeMap<String, String>;

/// A static asset declared with `@requires-asset`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    /// Absolute path of the source file
    pub source_path: PathBuf,
    /// File name inside the `assets/` directory
    pub filename: String,
    /// URL the component uses to reference the asset
    pub url_path: String,
}

/// Everything a component declares through directives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Declarations {
    pub dependencies: Dependencies,
    pub assets: Vec<Asset>,
}

static REQUIRES_RE: OnceLock<Regex> = OnceLock::new();
static REQUIRES_ASSET_RE: OnceLock<Regex> = OnceLock::new();

fn requires_re() -> &'static Regex {
    REQUIRES_RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*// @requires[ \t]+(\S+)").unwrap())
}

fn requires_asset_re() -> &'static Regex {
    REQUIRES_ASSET_RE.get_or_init(|| Regex::new(r"(?m)^// @requires-asset[ \t]+(.+)$").unwrap())
}

/// Extract both dependency and asset declarations
pub fn extract(source: &str, component_file: &Path) -> Result<Declarations, DirectiveError> {
    Ok(Declarations {
        dependencies: extract_dependencies(source),
        assets: extract_assets(source, component_file)?,
    })
}

/// Extract `@requires` directives. The last occurrence of a package wins.
pub fn extract_dependencies(source: &str) -> Dependencies {
    let mut dependencies = Dependencies::new();

    for captures in requires_re().captures_iter(source) {
        let (package, version) = split_requirement(&captures[1]);
        dependencies.insert(package.to_string(), version.to_string());
    }

    dependencies
}

/// Split `package@version` on the last `@`.
///
/// A leading `@` belongs to the scope (`@scope/pkg`), never to the version.
fn split_requirement(token: &str) -> (&str, &str) {
    match token.rfind('@') {
        Some(idx) if idx > 0 && idx + 1 < token.len() => (&token[..idx], &token[idx + 1..]),
        Some(idx) if idx > 0 => (&token[..idx], LATEST),
        _ => (token, LATEST),
    }
}

/// Extract `@requires-asset` directives, resolving sources against the component's directory.
///
/// Fails on the first destination filename used twice, before anything is copied.
pub fn extract_assets(source: &str, component_file: &Path) -> Result<Vec<Asset>, DirectiveError> {
    let base_dir = component_file.parent().unwrap_or_else(|| Path::new(""));
    let mut assets = Vec::new();
    let mut used_filenames = HashSet::new();

    for captures in requires_asset_re().captures_iter(source) {
        let mut parts = captures[1].split_whitespace();
        let Some(asset_path) = parts.next() else {
            continue;
        };

        let filename = match parts.next() {
            Some(custom) => custom.to_string(),
            None => Path::new(asset_path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| asset_path.to_string()),
        };

        if !is_plain_filename(&filename) {
            return Err(DirectiveError::InvalidAssetFilename { filename });
        }

        if !used_filenames.insert(filename.clone()) {
            return Err(DirectiveError::AssetConflict {
                suggestion: format!(
                    "// @requires-asset {} {}",
                    asset_path,
                    suggest_filename(&filename)
                ),
                filename,
            });
        }

        assets.push(Asset {
            source_path: normalize_path(&base_dir.join(asset_path)),
            url_path: format!("{}{}", ASSET_URL_PREFIX, filename),
            filename,
        });
    }

    Ok(assets)
}

/// A single path segment: no separators, not `.` or `..`
fn is_plain_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\'])
}

/// `logo.svg` -> `logo-2.svg`
fn suggest_filename(filename: &str) -> String {
    match filename.find('.') {
        Some(idx) => format!("{}-2{}", &filename[..idx], &filename[idx..]),
        None => format!("{}-2", filename),
    }
}

/// Lexically resolve `.` and `..` segments without touching the filesystem
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                if matches!(
                    normalized.components().next_back(),
                    Some(PathComponent::Normal(_))
                ) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}
