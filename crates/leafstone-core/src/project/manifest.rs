//! Package manifest (`package.json`) for the ephemeral project

use crate::directives::Dependencies;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name written into every generated manifest
pub const PACKAGE_NAME: &str = "leafstone-temp";

/// Runtime dependencies every preview gets; declared dependencies may override them
pub const BASELINE_DEPENDENCIES: &[(&str, &str)] = &[
    ("react", "^19.1.1"),
    ("react-dom", "^19.1.1"),
    ("lucide-react", "^0.539.0"),
];

/// Build toolchain used by the generated configs
pub const TOOLCHAIN_DEPENDENCIES: &[(&str, &str)] = &[
    ("@vitejs/plugin-react-swc", "^3.11.0"),
    ("autoprefixer", "^10.4.21"),
    ("postcss", "^8.5.6"),
    ("tailwind-dracula", "^1.1.0"),
    ("tailwindcss", "^3.4.17"),
    ("vite", "^6.3.5"),
];

/// The generated `package.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,

    pub private: bool,

    /// Baseline runtime dependencies with declared dependencies spread on top
    pub dependencies: BTreeMap<String, String>,

    #[serde(rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Merge baseline dependencies with the ones declared in the component.
    ///
    /// Declared entries win on key collision.
    pub fn with_dependencies(declared: &Dependencies) -> Self {
        let mut dependencies: BTreeMap<String, String> = BASELINE_DEPENDENCIES
            .iter()
            .map(|(name, version)| (name.to_string(), version.to_string()))
            .collect();
        dependencies.extend(declared.iter().map(|(k, v)| (k.clone(), v.clone())));

        let dev_dependencies = TOOLCHAIN_DEPENDENCIES
            .iter()
            .map(|(name, version)| (name.to_string(), version.to_string()))
            .collect();

        Self {
            name: PACKAGE_NAME.to_string(),
            private: true,
            dependencies,
            dev_dependencies,
        }
    }

    /// Pretty-printed JSON with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut json =
            serde_json::to_string_pretty(self).context("Failed to serialize package.json")?;
        json.push('\n');
        Ok(json)
    }
}
