//! Leafstone Core - preview single-file React components
//!
//! This library turns one component file, annotated with comment directives, into a
//! throwaway Vite project and keeps that project in sync while a dev server runs.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Layer 1: Core Operations** - directive extraction, asset copying, project scaffolding
//! - **Layer 2: Toolchain** - the `Toolchain` trait wrapping npm and Vite as external processes
//! - **Layer 3: Sessions** - dev/build pipelines and the watch/restart coordinator
//!
//! # Directives
//!
//! ```text
//! // @requires lodash@4.17.21
//! // @requires-asset ./logo.svg company-logo.svg
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! use leafstone_core::{directives, project::Component};
//!
//! let component = Component::from_path("ui/Button.jsx".as_ref())?;
//! let source = std::fs::read_to_string(&component.path)?;
//! let declarations = directives::extract(&source, &component.path)?;
//! ```

pub mod assets;
pub mod config;
pub mod directives;
pub mod error;
pub mod fs;
pub mod project;
pub mod session;
pub mod toolchain;
pub mod watch;

// Re-export main types for convenience
pub use config::Settings;
pub use directives::{Asset, Declarations, Dependencies};
pub use error::DirectiveError;
pub use project::{Component, ComponentKind, EphemeralProject};
pub use session::{run_build, run_dev, BuildSummary};
pub use toolchain::{PreviewServer, Toolchain, ViteToolchain};
pub use watch::{ChangeEvent, CoordinatorState, Launcher, SessionCoordinator};
