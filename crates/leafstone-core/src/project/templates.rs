//! Embedded template files and their rendering
//!
//! Templates are static blobs compiled into the binary. Rendering is plain token
//! substitution; values that land inside JavaScript are JSON-encoded.

use super::component::Component;
use anyhow::{Context, Result};
use std::path::Path;

const INDEX_HTML: &str = include_str!("../../templates/index.html");
const STYLES_CSS: &str = include_str!("../../templates/styles.css");
const MAIN_ENTRY: &str = include_str!("../../templates/main.jsx");
const VITE_CONFIG: &str = include_str!("../../templates/vite.config.mjs");
pub const FAVICON_SVG: &str = include_str!("../../templates/favicon.svg");

/// Replaced by the component name in `index.html` and the entry script
pub const COMPONENT_NAME_TOKEN: &str = "{{componentName}}";

/// Replaced by the entry script file name in `index.html`
const ENTRY_FILE_TOKEN: &str = "{{entryFile}}";

/// Static import in the entry script rewritten to the copied component
pub const COMPONENT_IMPORT: &str = r#"import("@component")"#;

pub const POSTCSS_CONFIG: &str = r#"module.exports = {
  plugins: {
    tailwindcss: { config: './tailwind.config.js' },
    autoprefixer: {},
  },
}
"#;

pub fn render_index_html(component: &Component) -> String {
    INDEX_HTML
        .replace(COMPONENT_NAME_TOKEN, &component.name)
        .replace(ENTRY_FILE_TOKEN, &component.entry_file_name())
}

pub fn render_styles() -> &'static str {
    STYLES_CSS
}

/// Entry script importing `./<Component>.<ext>` instead of the `@component` placeholder
pub fn render_entry(component: &Component) -> String {
    MAIN_ENTRY
        .replace(
            COMPONENT_IMPORT,
            &format!(r#"import("./{}")"#, component.file_name()),
        )
        .replace(COMPONENT_NAME_TOKEN, &component.name)
}

/// Tailwind config scanning absolute paths inside the ephemeral root
pub fn render_tailwind_config(root: &Path) -> Result<String> {
    let index = js_string(&root.join("index.html"))?;
    let sources = js_string(&root.join("src").join("**").join("*.{jsx,tsx}"))?;

    Ok(format!(
        r#"/** @type {{import('tailwindcss').Config}} */
module.exports = {{
  content: [
    {index},
    {sources},
  ],
  theme: {{
    extend: {{}},
  }},
  plugins: [
    require("tailwind-dracula")(),
  ],
}}
"#
    ))
}

/// Vite config with the preview middleware serving `/api/components`
pub fn render_vite_config(component: &Component, optimize: &[&str]) -> Result<String> {
    let name = serde_json::to_string(&component.name).context("Failed to encode name")?;
    let directory = js_string(component.directory())?;
    let entry = serde_json::to_string(&format!("src/{}", component.entry_file_name()))
        .context("Failed to encode entry")?;
    let include = serde_json::to_string(optimize).context("Failed to encode dependencies")?;

    Ok(VITE_CONFIG
        .replace("__COMPONENT_NAME__", &name)
        .replace("__COMPONENT_DIRECTORY__", &directory)
        .replace("__OPTIMIZE_INCLUDE__", &include)
        .replace("__ENTRY__", &entry))
}

fn js_string(path: &Path) -> Result<String> {
    serde_json::to_string(&path.to_string_lossy())
        .with_context(|| format!("Failed to encode path {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ComponentKind;
    use std::path::PathBuf;

    fn component(kind: ComponentKind) -> Component {
        Component {
            name: "MyAwesomeComponent".to_string(),
            kind,
            path: PathBuf::from(format!("/work/ui/MyAwesomeComponent.{}", kind.extension())),
        }
    }

    #[test]
    fn test_index_html_substitutes_every_placeholder() {
        let html = render_index_html(&component(ComponentKind::Jsx));

        assert!(!html.contains(COMPONENT_NAME_TOKEN));
        assert_eq!(html.matches("MyAwesomeComponent").count(), 2);
        assert!(html.contains(r#"src="/src/main.jsx""#));
    }

    #[test]
    fn test_entry_imports_copied_component() {
        let entry = render_entry(&component(ComponentKind::Tsx));

        assert!(!entry.contains(COMPONENT_IMPORT));
        assert!(entry.contains(r#"import("./MyAwesomeComponent.tsx")"#));
        assert!(entry.contains("const componentName = 'MyAwesomeComponent';"));
    }

    #[test]
    fn test_tailwind_config_uses_absolute_paths() {
        let config = render_tailwind_config(Path::new("/tmp/.leafstone-temp-abc")).unwrap();

        assert!(config.contains(r#""/tmp/.leafstone-temp-abc/index.html""#));
        assert!(config.contains(r#""/tmp/.leafstone-temp-abc/src/**/*.{jsx,tsx}""#));
    }

    #[test]
    fn test_vite_config_is_fully_rendered() {
        let config = render_vite_config(&component(ComponentKind::Jsx), &["lodash"]).unwrap();

        assert!(!config.contains("__"));
        assert!(config.contains(r#"const componentName = "MyAwesomeComponent";"#));
        assert!(config.contains(r#"const componentDirectory = "/work/ui";"#));
        assert!(config.contains(r#"include: ["lodash"]"#));
        assert!(config.contains(r#"entries: ["src/main.jsx"]"#));
    }
}
