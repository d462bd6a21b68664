//! External build toolchain
//!
//! Installing packages, serving and bundling are delegated to npm and Vite running
//! as child processes. The [`Toolchain`] trait is the seam the sessions are generic
//! over, so the pipeline can be driven without Node in tests.

pub mod check;
pub mod process;
pub mod vite;

use crate::directives::Dependencies;
use anyhow::Result;
use std::path::Path;

pub use check::{check_runtimes, RuntimeInfo};
pub use vite::{DevServer, ViteToolchain};

/// A running preview server
#[allow(async_fn_in_trait)]
pub trait PreviewServer {
    /// Stop the server and release its port
    async fn close(&mut self) -> Result<()>;

    /// Resolves once the server stops on its own. Never resolves after `close`.
    async fn wait(&mut self) -> Result<()>;
}

/// Install/serve/build capability consumed as a black box
#[allow(async_fn_in_trait)]
pub trait Toolchain {
    type Server: PreviewServer;

    /// Populate the project's module directory; `declared` are the packages the
    /// component asked for and must be verified after install
    async fn install(&self, root: &Path, declared: &Dependencies) -> Result<()>;

    /// Start a dev server rooted at `root`; returns once it reports ready
    async fn serve(&self, root: &Path, port: u16) -> Result<Self::Server>;

    /// Produce a static build of `root` into `out_dir`
    async fn build(&self, root: &Path, out_dir: &Path) -> Result<()>;
}
