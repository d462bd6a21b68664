//! Project scaffolding into an ephemeral root

use super::component::Component;
use super::manifest::PackageManifest;
use super::templates;
use crate::directives::Dependencies;
use crate::fs;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// A file of the generated project, relative to the ephemeral root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl ProjectFile {
    fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Render the full file set for a component without touching the filesystem
pub fn render_project(
    root: &Path,
    component: &Component,
    source: &str,
    dependencies: &Dependencies,
) -> Result<Vec<ProjectFile>> {
    let optimize: Vec<&str> = dependencies.keys().map(String::as_str).collect();
    let manifest = PackageManifest::with_dependencies(dependencies);

    Ok(vec![
        ProjectFile::new("index.html", templates::render_index_html(component)),
        ProjectFile::new("styles.css", templates::render_styles()),
        ProjectFile::new(
            "tailwind.config.js",
            templates::render_tailwind_config(root)?,
        ),
        ProjectFile::new("postcss.config.js", templates::POSTCSS_CONFIG),
        ProjectFile::new(
            "vite.config.mjs",
            templates::render_vite_config(component, &optimize)?,
        ),
        ProjectFile::new(
            Path::new("src").join(component.entry_file_name()),
            templates::render_entry(component),
        ),
        ProjectFile::new(component_relative_path(component), source),
        ProjectFile::new(Path::new("public").join("favicon.svg"), templates::FAVICON_SVG),
        ProjectFile::new("package.json", manifest.to_json()?),
    ])
}

/// Write the project into `root`, overwriting previous contents.
///
/// Returns the relative paths written, in order.
pub async fn scaffold_project(
    root: &Path,
    component: &Component,
    source: &str,
    dependencies: &Dependencies,
) -> Result<Vec<PathBuf>> {
    let files = render_project(root, component, source, dependencies)?;
    let mut written = Vec::with_capacity(files.len());

    for file in files {
        fs::write_file(&root.join(&file.path), &file.contents).await?;
        written.push(file.path);
    }

    Ok(written)
}

/// Rewrite only the copied component source (hot patch)
pub async fn write_component(root: &Path, component: &Component, source: &str) -> Result<()> {
    fs::write_file(&root.join(component_relative_path(component)), source.as_bytes()).await
}

/// `src/<Component>.<ext>`
pub fn component_relative_path(component: &Component) -> PathBuf {
    Path::new("src").join(component.file_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ComponentKind;
    use std::collections::BTreeMap;

    const SOURCE: &str = "\
// @requires lodash@4.17.21
function TestComponent() {
  return <div>Test</div>;
}
export default TestComponent;
";

    fn component() -> Component {
        Component {
            name: "TestComponent".to_string(),
            kind: ComponentKind::Jsx,
            path: PathBuf::from("/work/TestComponent.jsx"),
        }
    }

    fn lodash() -> Dependencies {
        let mut deps = Dependencies::new();
        deps.insert("lodash".to_string(), "4.17.21".to_string());
        deps
    }

    fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
                (rel, std::fs::read(e.path()).unwrap())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_creates_all_required_files() {
        let root = tempfile::tempdir().unwrap();

        scaffold_project(root.path(), &component(), SOURCE, &lodash())
            .await
            .unwrap();

        for file in [
            "index.html",
            "styles.css",
            "tailwind.config.js",
            "postcss.config.js",
            "vite.config.mjs",
            "package.json",
            "src/main.jsx",
            "src/TestComponent.jsx",
            "public/favicon.svg",
        ] {
            assert!(root.path().join(file).is_file(), "missing {}", file);
        }
    }

    #[tokio::test]
    async fn test_component_copied_verbatim() {
        let root = tempfile::tempdir().unwrap();

        scaffold_project(root.path(), &component(), SOURCE, &lodash())
            .await
            .unwrap();

        let copied = std::fs::read_to_string(root.path().join("src/TestComponent.jsx")).unwrap();
        assert_eq!(copied, SOURCE);
    }

    #[tokio::test]
    async fn test_manifest_includes_declared_dependencies() {
        let root = tempfile::tempdir().unwrap();

        scaffold_project(root.path(), &component(), SOURCE, &lodash())
            .await
            .unwrap();

        let manifest: PackageManifest =
            serde_json::from_str(&std::fs::read_to_string(root.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(manifest.dependencies["lodash"], "4.17.21");
        assert_eq!(manifest.dependencies["react"], "^19.1.1");
    }

    #[tokio::test]
    async fn test_scaffolding_twice_is_byte_identical() {
        let root = tempfile::tempdir().unwrap();

        scaffold_project(root.path(), &component(), SOURCE, &lodash())
            .await
            .unwrap();
        let first = snapshot_tree(root.path());

        scaffold_project(root.path(), &component(), SOURCE, &lodash())
            .await
            .unwrap();
        let second = snapshot_tree(root.path());

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_write_component_only_touches_component() {
        let root = tempfile::tempdir().unwrap();
        scaffold_project(root.path(), &component(), SOURCE, &lodash())
            .await
            .unwrap();
        let before = snapshot_tree(root.path());

        let edited = SOURCE.replace("Test</div>", "Edited</div>");
        write_component(root.path(), &component(), &edited)
            .await
            .unwrap();
        let after = snapshot_tree(root.path());

        let changed: Vec<_> = after
            .iter()
            .filter(|(path, contents)| before.get(*path) != Some(*contents))
            .map(|(path, _)| path.clone())
            .collect();
        assert_eq!(changed, vec![PathBuf::from("src/TestComponent.jsx")]);
    }
}
