//! Restart coordinator
//!
//! One [`SessionCoordinator`] owns one live session: its ephemeral project, its
//! server and its file watch. Change notifications are classified into
//! [`ChangeEvent`]s and drive this state machine:
//!
//! ```text
//! Idle --ContentOnly--> Idle            (hot patch src/<Component>)
//! Idle --DeclarationsChanged--> Restarting --replacement live--> Terminated
//! Idle --Rejected--> Terminated         (the dev run fails)
//! *    --shutdown signal--> Terminated
//! ```
//!
//! The state itself is the re-entrancy guard: it leaves `Idle` before any teardown
//! step runs, so notifications arriving mid-restart are dropped.

use super::detector::{ChangeDetector, ChangeEvent};
use super::file_watch::FileWatch;
use crate::directives::Declarations;
use crate::project::{scaffold, Component, EphemeralProject};
use crate::toolchain::PreviewServer;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Watching, nothing pending
    Idle,
    /// Teardown in progress; notifications are ignored
    Restarting,
    /// Retired or shut down
    Terminated,
}

/// Result of handling one change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    HotPatched,
    /// Not `Idle`; the notification was dropped
    Ignored,
    /// The session was torn down and must be replaced
    Restart,
}

/// Why [`SessionCoordinator::drive`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Restart,
    Shutdown,
}

/// A running preview and the inputs it was built from
#[derive(Debug)]
pub struct LiveSession<S> {
    pub project: EphemeralProject,
    pub component: Component,
    pub content: String,
    pub declarations: Declarations,
    pub server: S,
}

/// Builds a complete session: extract, scaffold, install, copy assets, serve
#[allow(async_fn_in_trait)]
pub trait Launcher {
    type Server: PreviewServer;

    /// `restart` is false only for the first launch of a dev loop
    async fn launch(&mut self, restart: bool) -> Result<LiveSession<Self::Server>>;

    /// Remove whatever a launch dropped before completion left on disk
    async fn abandon(&mut self) -> Result<()> {
        Ok(())
    }
}

/// What woke the coordinator up
enum Wake {
    Changed,
    WatchClosed,
    ServerStopped(Result<()>),
}

/// Per-session watch state
pub struct SessionCoordinator<S: PreviewServer> {
    state: CoordinatorState,
    session: Option<LiveSession<S>>,
    detector: ChangeDetector,
    watch: Option<FileWatch>,
}

impl<S: PreviewServer> SessionCoordinator<S> {
    pub fn new(session: LiveSession<S>, watch: Option<FileWatch>) -> Result<Self> {
        let detector = ChangeDetector::new(
            &session.component.path,
            session.content.clone(),
            session.declarations.clone(),
        )?;

        Ok(Self {
            state: CoordinatorState::Idle,
            session: Some(session),
            detector,
            watch,
        })
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Root of the live ephemeral project, if the session has not been torn down
    pub fn root(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.project.root())
    }

    /// Apply one new version of the component file.
    ///
    /// A text whose directives cannot be extracted (an asset filename conflict)
    /// tears the session down and fails.
    pub async fn handle_change(&mut self, content: String) -> Result<Outcome> {
        if self.state != CoordinatorState::Idle {
            return Ok(Outcome::Ignored);
        }

        match self.detector.classify(content) {
            ChangeEvent::Unchanged => Ok(Outcome::Unchanged),
            ChangeEvent::ContentOnly { content } => {
                self.hot_patch(&content).await;
                Ok(Outcome::HotPatched)
            }
            ChangeEvent::Rejected { reason } => {
                self.terminate().await?;
                Err(anyhow::anyhow!(reason))
            }
            ChangeEvent::DeclarationsChanged {
                previous,
                declarations,
            } => {
                self.state = CoordinatorState::Restarting;

                println!(
                    "{}",
                    "Dependencies or assets changed, restarting server...".cyan()
                );
                if previous.dependencies != declarations.dependencies {
                    println!("  {} Dependency changes detected", "->".blue());
                }
                if previous.assets != declarations.assets {
                    println!("  {} Asset changes detected", "->".blue());
                }

                self.teardown_for_restart().await?;
                Ok(Outcome::Restart)
            }
        }
    }

    /// A failed write is reported and the session keeps serving the previous text
    async fn hot_patch(&self, content: &str) {
        let Some(session) = &self.session else {
            return;
        };

        match scaffold::write_component(session.project.root(), &session.component, content).await
        {
            Ok(()) => println!("{} {}", "Updated".green(), session.component.file_name()),
            Err(e) => eprintln!("{} Failed to update temp component: {:#}", "Error:".red(), e),
        }
    }

    /// Restart order: unwatch, close the server, delete the project
    async fn teardown_for_restart(&mut self) -> Result<()> {
        self.stop_watching();

        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.server.close().await {
                eprintln!("{} {:#}", "Warning:".yellow(), e);
            }
            session.project.remove().await?;
        }

        Ok(())
    }

    /// Shutdown order: unwatch, delete the project, close the server
    pub async fn terminate(&mut self) -> Result<()> {
        self.state = CoordinatorState::Terminated;
        self.stop_watching();

        if let Some(mut session) = self.session.take() {
            println!(
                "{}",
                "Cleaning up temporary files and shutting down...".cyan()
            );
            let removed = session.project.remove().await;
            let closed = session.server.close().await;
            removed?;
            closed?;
        }

        Ok(())
    }

    /// The replacement session is live; this coordinator has nothing left to do
    pub fn retire(&mut self) {
        self.state = CoordinatorState::Terminated;
    }

    fn stop_watching(&mut self) {
        if let Some(watch) = self.watch.take() {
            if let Err(e) = watch.unwatch() {
                eprintln!("{} {:#}", "Warning:".yellow(), e);
            }
        }
    }

    async fn next_wake(&mut self) -> Wake {
        let watch = self.watch.as_mut();
        let server = self.session.as_mut().map(|s| &mut s.server);

        tokio::select! {
            changed = async move {
                match watch {
                    Some(watch) => watch.changed().await,
                    None => std::future::pending().await,
                }
            } => match changed {
                Some(()) => Wake::Changed,
                None => Wake::WatchClosed,
            },
            stopped = async move {
                match server {
                    Some(server) => server.wait().await,
                    None => std::future::pending().await,
                }
            } => Wake::ServerStopped(stopped),
        }
    }

    /// Process notifications until a restart is required or shutdown is requested.
    ///
    /// The server stopping on its own ends the session with an error.
    pub async fn drive(&mut self, shutdown: &mut mpsc::UnboundedReceiver<()>) -> Result<Exit> {
        loop {
            let wake = tokio::select! {
                _ = shutdown.recv() => None,
                wake = self.next_wake() => Some(wake),
            };

            match wake {
                None => {
                    self.terminate().await?;
                    return Ok(Exit::Shutdown);
                }
                Some(Wake::WatchClosed) => {
                    self.terminate().await?;
                    anyhow::bail!("File watcher stopped unexpectedly");
                }
                Some(Wake::ServerStopped(stopped)) => {
                    self.terminate().await?;
                    stopped?;
                    anyhow::bail!("Dev server stopped unexpectedly");
                }
                Some(Wake::Changed) => {}
            }

            let Some(path) = self.session.as_ref().map(|s| s.component.path.clone()) else {
                continue;
            };

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    eprintln!(
                        "{} Failed to read {}: {}",
                        "Warning:".yellow(),
                        path.display(),
                        e
                    );
                    continue;
                }
            };

            if self.handle_change(content).await? == Outcome::Restart {
                return Ok(Exit::Restart);
            }
        }
    }
}

/// Dev mode: launch, watch, restart on declaration changes, tear down on shutdown
pub struct DevLoop<L: Launcher> {
    launcher: L,
    poll_interval: Duration,
    restart_delay: Duration,
}

impl<L: Launcher> DevLoop<L> {
    pub fn new(launcher: L, poll_interval: Duration, restart_delay: Duration) -> Self {
        Self {
            launcher,
            poll_interval,
            restart_delay,
        }
    }

    /// Run until a message arrives on `shutdown` (or its sender is dropped).
    ///
    /// Shutdown is honored at any point, including while a session is launching.
    pub async fn run(mut self, mut shutdown: mpsc::UnboundedReceiver<()>) -> Result<()> {
        let Some(mut coordinator) = self.start(false, &mut shutdown).await? else {
            return Ok(());
        };

        loop {
            match coordinator.drive(&mut shutdown).await? {
                Exit::Shutdown => return Ok(()),
                Exit::Restart => {
                    let replacement = self.start(true, &mut shutdown).await?;
                    coordinator.retire();
                    match replacement {
                        Some(replacement) => coordinator = replacement,
                        None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Launch a session unless shutdown arrives first; `None` means shut down
    async fn start(
        &mut self,
        restart: bool,
        shutdown: &mut mpsc::UnboundedReceiver<()>,
    ) -> Result<Option<SessionCoordinator<L::Server>>> {
        let launched = tokio::select! {
            biased;
            _ = shutdown.recv() => None,
            launched = self.launch_and_watch(restart) => Some(launched),
        };

        match launched {
            Some(coordinator) => coordinator.map(Some),
            None => {
                println!(
                    "{}",
                    "Cleaning up temporary files and shutting down...".cyan()
                );
                self.launcher.abandon().await?;
                Ok(None)
            }
        }
    }

    async fn launch_and_watch(&mut self, restart: bool) -> Result<SessionCoordinator<L::Server>> {
        if restart {
            // Let the old server release its port
            tokio::time::sleep(self.restart_delay).await;
        }

        let mut session = self.launcher.launch(restart).await?;

        let watch = match FileWatch::start(&session.component.path, self.poll_interval) {
            Ok(watch) => watch,
            Err(e) => {
                let _ = session.server.close().await;
                let _ = session.project.remove().await;
                return Err(e);
            }
        };
        println!(
            "{} {}",
            "Watching for changes in:".dimmed(),
            watch.path().display()
        );

        SessionCoordinator::new(session, Some(watch))
    }
}
