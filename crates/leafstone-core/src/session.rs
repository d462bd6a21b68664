//! Dev and build pipelines
//!
//! Both modes share one preparation step: read the component, extract its
//! declarations, create an ephemeral project, scaffold it, install packages and
//! copy assets. Dev mode then serves the project under the watch loop; build mode
//! bundles it once and removes it.

use crate::assets::{self, AssetReport};
use crate::config::Settings;
use crate::directives::{self, Declarations};
use crate::project::{scaffold_project, Component, EphemeralProject};
use crate::toolchain::Toolchain;
use crate::watch::{DevLoop, Launcher, LiveSession};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// A populated ephemeral project, ready to serve or build
#[derive(Debug)]
pub struct Prepared {
    pub project: EphemeralProject,
    pub content: String,
    pub declarations: Declarations,
    pub assets: AssetReport,
}

/// Extract, scaffold, install and copy assets for `component`.
///
/// A directive error aborts before anything is created. Any later failure removes
/// the ephemeral project before returning.
pub async fn prepare<T: Toolchain>(
    toolchain: &T,
    component: &Component,
    workspace: &Path,
) -> Result<Prepared> {
    let (content, declarations) = read_component(component).await?;
    let project = create_project(workspace).await?;
    populate_or_remove(toolchain, component, project, content, declarations).await
}

/// Read the component source and extract its declarations
pub async fn read_component(component: &Component) -> Result<(String, Declarations)> {
    let content = tokio::fs::read_to_string(&component.path)
        .await
        .with_context(|| format!("Failed to read {}", component.path.display()))?;
    let declarations = directives::extract(&content, &component.path)?;
    Ok((content, declarations))
}

async fn create_project(workspace: &Path) -> Result<EphemeralProject> {
    let project = EphemeralProject::create_in(workspace).await?;
    println!(
        "{} {}",
        "Created temp directory:".dimmed(),
        project.root().display()
    );
    Ok(project)
}

async fn populate_or_remove<T: Toolchain>(
    toolchain: &T,
    component: &Component,
    project: EphemeralProject,
    content: String,
    declarations: Declarations,
) -> Result<Prepared> {
    match populate(toolchain, component, &project, &content, &declarations).await {
        Ok(assets) => Ok(Prepared {
            project,
            content,
            declarations,
            assets,
        }),
        Err(e) => {
            if let Err(cleanup) = project.remove().await {
                eprintln!("{} {:#}", "Warning:".yellow(), cleanup);
            }
            Err(e)
        }
    }
}

async fn populate<T: Toolchain>(
    toolchain: &T,
    component: &Component,
    project: &EphemeralProject,
    content: &str,
    declarations: &Declarations,
) -> Result<AssetReport> {
    scaffold_project(
        project.root(),
        component,
        content,
        &declarations.dependencies,
    )
    .await?;
    toolchain
        .install(project.root(), &declarations.dependencies)
        .await?;
    assets::copy_assets(&declarations.assets, project.root()).await
}

/// Builds dev sessions on top of a [`Toolchain`]
pub struct DevLauncher<T: Toolchain> {
    toolchain: T,
    component: Component,
    port: u16,
    open_browser: bool,
    workspace: PathBuf,
    /// Root of the project a launch in progress is building
    pending: Option<PathBuf>,
}

impl<T: Toolchain> DevLauncher<T> {
    pub fn new(
        toolchain: T,
        component: Component,
        port: u16,
        open_browser: bool,
        workspace: PathBuf,
    ) -> Self {
        Self {
            toolchain,
            component,
            port,
            open_browser,
            workspace,
            pending: None,
        }
    }
}

impl<T: Toolchain> Launcher for DevLauncher<T> {
    type Server = T::Server;

    async fn launch(&mut self, restart: bool) -> Result<LiveSession<T::Server>> {
        let (content, declarations) = read_component(&self.component).await?;
        let project = create_project(&self.workspace).await?;
        self.pending = Some(project.root().to_path_buf());

        let prepared =
            populate_or_remove(&self.toolchain, &self.component, project, content, declarations)
                .await?;

        let served = self.toolchain.serve(prepared.project.root(), self.port).await;
        let server = match served {
            Ok(server) => server,
            Err(e) => {
                if let Err(cleanup) = prepared.project.remove().await {
                    eprintln!("{} {:#}", "Warning:".yellow(), cleanup);
                }
                return Err(e);
            }
        };

        self.pending = None;

        let url = format!("http://localhost:{}", self.port);
        println!("{} {}", "Server running at".green(), url.bold());

        if !restart && self.open_browser {
            if let Err(e) = open::that(&url) {
                eprintln!("{} Could not open browser: {}", "Warning:".yellow(), e);
            }
        }

        Ok(LiveSession {
            project: prepared.project,
            component: self.component.clone(),
            content: prepared.content,
            declarations: prepared.declarations,
            server,
        })
    }

    async fn abandon(&mut self) -> Result<()> {
        match self.pending.take() {
            Some(root) => crate::fs::remove_dir(&root).await,
            None => Ok(()),
        }
    }
}

/// Serve `component` until a message arrives on `shutdown`
pub async fn run_dev<T: Toolchain>(
    toolchain: T,
    component: Component,
    settings: &Settings,
    open_browser: bool,
    workspace: PathBuf,
    shutdown: mpsc::UnboundedReceiver<()>,
) -> Result<()> {
    println!(
        "{} {}",
        "Starting dev server for".cyan(),
        component.file_name().bold()
    );

    let launcher = DevLauncher::new(toolchain, component, settings.port, open_browser, workspace);
    DevLoop::new(launcher, settings.poll_interval, settings.restart_delay)
        .run(shutdown)
        .await
}

/// What a build produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub out_dir: PathBuf,
    /// Number of files under `out_dir`
    pub files: usize,
    pub assets: AssetReport,
}

/// Bundle `component` into `out_dir` (relative paths resolve against `workspace`).
///
/// The ephemeral project is removed whether or not the build succeeds.
pub async fn run_build<T: Toolchain>(
    toolchain: &T,
    component: &Component,
    workspace: &Path,
    out_dir: &Path,
) -> Result<BuildSummary> {
    let out_dir = if out_dir.is_absolute() {
        out_dir.to_path_buf()
    } else {
        workspace.join(out_dir)
    };

    println!(
        "{} {}",
        "Building".cyan(),
        component.file_name().bold()
    );

    let prepared = prepare(toolchain, component, workspace).await?;
    let result = bundle(toolchain, &prepared, &out_dir).await;

    let removed = prepared.project.remove().await;
    let summary = result?;
    removed?;

    println!(
        "{} {} ({} files)",
        "Build complete:".green(),
        summary.out_dir.display(),
        summary.files
    );
    Ok(summary)
}

async fn bundle<T: Toolchain>(
    toolchain: &T,
    prepared: &Prepared,
    out_dir: &Path,
) -> Result<BuildSummary> {
    toolchain.build(prepared.project.root(), out_dir).await?;
    let assets = assets::publish_assets(
        &prepared.declarations.assets,
        prepared.project.root(),
        out_dir,
    )
    .await?;

    let files = WalkDir::new(out_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count();

    Ok(BuildSummary {
        out_dir: out_dir.to_path_buf(),
        files,
        assets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::Dependencies;
    use crate::project::ComponentKind;
    use crate::project::ephemeral::TEMP_PREFIX;
    use crate::toolchain::PreviewServer;
    use std::cell::RefCell;
    use std::time::Duration;

    const SOURCE: &str = "\
// @requires lodash@4.17.21
// @requires-asset ./logo.svg
export default function Card() { return <img src=\"/assets/logo.svg\" />; }
";

    #[derive(Debug)]
    struct NoopServer;

    impl PreviewServer for NoopServer {
        async fn close(&mut self) -> Result<()> {
            Ok(())
        }

        async fn wait(&mut self) -> Result<()> {
            std::future::pending().await
        }
    }

    /// Records calls; `build` writes a single bundle file
    #[derive(Default)]
    struct FakeToolchain {
        fail_install: bool,
        fail_serve: bool,
        fail_build: bool,
        stall_install: bool,
        installed: RefCell<Vec<Dependencies>>,
    }

    impl Toolchain for FakeToolchain {
        type Server = NoopServer;

        async fn install(&self, root: &Path, declared: &Dependencies) -> Result<()> {
            assert!(root.join("package.json").is_file());
            self.installed.borrow_mut().push(declared.clone());
            if self.stall_install {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.fail_install {
                anyhow::bail!("install exploded");
            }
            Ok(())
        }

        async fn serve(&self, _root: &Path, _port: u16) -> Result<NoopServer> {
            if self.fail_serve {
                anyhow::bail!("port taken");
            }
            Ok(NoopServer)
        }

        async fn build(&self, root: &Path, out_dir: &Path) -> Result<()> {
            if self.fail_build {
                anyhow::bail!("bundle failed");
            }
            assert!(root.join("index.html").is_file());
            std::fs::create_dir_all(out_dir)?;
            std::fs::write(out_dir.join("index.html"), "<html></html>")?;
            Ok(())
        }
    }

    fn component(dir: &Path, source: &str) -> Component {
        let path = dir.join("Card.jsx");
        std::fs::write(&path, source).unwrap();
        std::fs::write(dir.join("logo.svg"), "<svg/>").unwrap();
        Component {
            name: "Card".to_string(),
            kind: ComponentKind::Jsx,
            path,
        }
    }

    fn temp_dirs(workspace: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(workspace)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(TEMP_PREFIX))
            .map(|e| e.path())
            .collect()
    }

    #[tokio::test]
    async fn test_prepare_populates_project() {
        let dir = tempfile::tempdir().unwrap();
        let component = component(dir.path(), SOURCE);
        let toolchain = FakeToolchain::default();

        let prepared = prepare(&toolchain, &component, dir.path()).await.unwrap();
        let root = prepared.project.root();

        assert_eq!(std::fs::read_to_string(root.join("src/Card.jsx")).unwrap(), SOURCE);
        assert_eq!(std::fs::read_to_string(root.join("assets/logo.svg")).unwrap(), "<svg/>");
        assert_eq!(prepared.assets.copied, vec!["logo.svg".to_string()]);
        assert_eq!(toolchain.installed.borrow()[0]["lodash"], "4.17.21");

        prepared.project.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_prepare_conflict_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = "// @requires-asset ./a/logo.svg\n// @requires-asset ./b/logo.svg\n";
        let component = component(dir.path(), source);
        let toolchain = FakeToolchain::default();

        let err = prepare(&toolchain, &component, dir.path()).await.unwrap_err();

        assert!(err.to_string().contains("logo.svg"));
        assert!(temp_dirs(dir.path()).is_empty());
        assert!(toolchain.installed.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_failure_removes_project() {
        let dir = tempfile::tempdir().unwrap();
        let component = component(dir.path(), SOURCE);
        let toolchain = FakeToolchain {
            fail_install: true,
            ..Default::default()
        };

        let err = prepare(&toolchain, &component, dir.path()).await.unwrap_err();

        assert!(err.to_string().contains("install exploded"));
        assert!(temp_dirs(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_launch_failure_removes_project() {
        let dir = tempfile::tempdir().unwrap();
        let component = component(dir.path(), SOURCE);
        let toolchain = FakeToolchain {
            fail_serve: true,
            ..Default::default()
        };
        let mut launcher =
            DevLauncher::new(toolchain, component, 3000, false, dir.path().to_path_buf());

        assert!(launcher.launch(false).await.is_err());
        assert!(temp_dirs(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_abandon_removes_interrupted_launch() {
        let dir = tempfile::tempdir().unwrap();
        let component = component(dir.path(), SOURCE);
        let toolchain = FakeToolchain {
            stall_install: true,
            ..Default::default()
        };
        let mut launcher =
            DevLauncher::new(toolchain, component, 3000, false, dir.path().to_path_buf());

        let interrupted =
            tokio::time::timeout(Duration::from_millis(200), launcher.launch(false)).await;
        assert!(interrupted.is_err());
        assert_eq!(temp_dirs(dir.path()).len(), 1);

        launcher.abandon().await.unwrap();
        assert!(temp_dirs(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_launch_returns_live_session() {
        let dir = tempfile::tempdir().unwrap();
        let component = component(dir.path(), SOURCE);
        let mut launcher = DevLauncher::new(
            FakeToolchain::default(),
            component,
            3000,
            false,
            dir.path().to_path_buf(),
        );

        let session = launcher.launch(false).await.unwrap();

        assert_eq!(session.content, SOURCE);
        assert_eq!(session.declarations.assets.len(), 1);
        assert!(session.project.root().join("index.html").is_file());
        session.project.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_build_publishes_assets_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let component = component(dir.path(), SOURCE);

        let summary = run_build(
            &FakeToolchain::default(),
            &component,
            dir.path(),
            Path::new("dist"),
        )
        .await
        .unwrap();

        assert_eq!(summary.out_dir, dir.path().join("dist"));
        assert!(summary.out_dir.join("assets/logo.svg").is_file());
        assert_eq!(summary.files, 2);
        assert!(summary.assets.is_success());
        assert!(temp_dirs(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_build_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let component = component(dir.path(), SOURCE);
        let toolchain = FakeToolchain {
            fail_build: true,
            ..Default::default()
        };

        let err = run_build(&toolchain, &component, dir.path(), Path::new("dist"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("bundle failed"));
        assert!(temp_dirs(dir.path()).is_empty());
    }
}
