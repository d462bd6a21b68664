//! Ephemeral project scaffolding
//!
//! This module provides:
//! - Component identity (name, `.jsx`/`.tsx` kind, absolute path)
//! - The ephemeral project directory and its lifecycle
//! - The package manifest merge (baseline + declared dependencies)
//! - Template rendering and the scaffolder that writes the project tree

pub mod component;
pub mod ephemeral;
pub mod manifest;
pub mod scaffold;
pub mod templates;

pub use component::{Component, ComponentKind};
pub use ephemeral::EphemeralProject;
pub use manifest::PackageManifest;
pub use scaffold::{scaffold_project, write_component};
