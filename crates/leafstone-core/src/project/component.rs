//! Component file identity

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Supported component source kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Jsx,
    Tsx,
}

impl ComponentKind {
    /// Detect the kind from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jsx" => Some(ComponentKind::Jsx),
            "tsx" => Some(ComponentKind::Tsx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ComponentKind::Jsx => "jsx",
            ComponentKind::Tsx => "tsx",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

/// The single component being previewed or built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// File stem, e.g. `Button` for `Button.jsx`
    pub name: String,
    pub kind: ComponentKind,
    /// Absolute path of the original source file
    pub path: PathBuf,
}

impl Component {
    /// Validate a user-supplied component path and resolve it to an absolute path
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Component file not found: {}", path.display());
        }
        if !path.is_file() {
            anyhow::bail!("Not a file: {}", path.display());
        }

        let kind = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ComponentKind::from_extension)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unsupported component file '{}': expected a .jsx or .tsx file",
                    path.display()
                )
            })?;

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| is_valid_name(stem))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid component name in '{}': use letters, digits, '_', '-' or '$'",
                    path.display()
                )
            })?
            .to_string();

        let path = path
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", path.display()))?;

        Ok(Self { name, kind, path })
    }

    /// File name of the copied component, e.g. `Button.jsx`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.kind.extension())
    }

    /// File name of the entry script, e.g. `main.jsx`
    pub fn entry_file_name(&self) -> String {
        format!("main.{}", self.kind.extension())
    }

    /// Directory containing the original component
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }
}

/// Names end up inside generated JS string literals and URLs
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '$'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(ComponentKind::from_extension("jsx"), Some(ComponentKind::Jsx));
        assert_eq!(ComponentKind::from_extension("TSX"), Some(ComponentKind::Tsx));
        assert_eq!(ComponentKind::from_extension("js"), None);
    }

    #[test]
    fn test_from_path_resolves_component() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Button.jsx");
        std::fs::write(&file, "export default () => null;").unwrap();

        let component = Component::from_path(&file).unwrap();

        assert_eq!(component.name, "Button");
        assert_eq!(component.kind, ComponentKind::Jsx);
        assert!(component.path.is_absolute());
        assert_eq!(component.file_name(), "Button.jsx");
        assert_eq!(component.entry_file_name(), "main.jsx");
    }

    #[test]
    fn test_from_path_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Component::from_path(&dir.path().join("Nope.jsx")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_from_path_rejects_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("button.vue");
        std::fs::write(&file, "").unwrap();

        let err = Component::from_path(&file).unwrap_err();
        assert!(err.to_string().contains(".jsx or .tsx"));
    }

    #[test]
    fn test_from_path_rejects_quotes_in_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Bad'Name.jsx");
        std::fs::write(&file, "").unwrap();

        assert!(Component::from_path(&file).is_err());
    }
}
