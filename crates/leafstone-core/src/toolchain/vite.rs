//! npm + Vite implementation of the toolchain

use super::process::{run_streamed, Invocation};
use super::{PreviewServer, Toolchain};
use crate::config::Settings;
use crate::directives::{Dependencies, LATEST};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::timeout;

/// Upper bound on waiting for the dev server's ready line
const STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Drives `npm install` and the Vite CLI through `npx`
#[derive(Debug, Clone)]
pub struct ViteToolchain {
    npm: String,
    npx: String,
    install_timeout: Duration,
}

impl ViteToolchain {
    pub fn new(npm: impl Into<String>, npx: impl Into<String>, install_timeout: Duration) -> Self {
        Self {
            npm: npm.into(),
            npx: npx.into(),
            install_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.npm, &settings.npx, settings.install_timeout)
    }
}

/// `name@version`, or the bare name for `latest`
pub fn install_spec(name: &str, version: &str) -> String {
    if version == LATEST {
        name.to_string()
    } else {
        format!("{}@{}", name, version)
    }
}

/// Declared packages missing from `node_modules` after install
pub fn missing_packages<'a>(root: &Path, declared: &'a Dependencies) -> Vec<&'a str> {
    let modules = root.join("node_modules");
    declared
        .keys()
        .filter(|name| !modules.join(name.as_str()).exists())
        .map(String::as_str)
        .collect()
}

impl Toolchain for ViteToolchain {
    type Server = DevServer;

    async fn install(&self, root: &Path, declared: &Dependencies) -> Result<()> {
        if declared.is_empty() {
            println!("{}", "Installing preview toolchain...".cyan());
        } else {
            let specs: Vec<String> = declared
                .iter()
                .map(|(name, version)| install_spec(name, version))
                .collect();
            println!(
                "{} {}",
                "Installing dependencies:".cyan(),
                specs.join(", ")
            );
        }

        run_streamed(&Invocation {
            program: &self.npm,
            args: ["install", "--no-audit", "--no-fund"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cwd: root,
            timeout: Some(self.install_timeout),
        })
        .await
        .context("Failed to install dependencies")?;

        let missing = missing_packages(root, declared);
        for name in declared.keys() {
            if missing.contains(&name.as_str()) {
                eprintln!(
                    "  {} Package {} was not installed correctly",
                    "Warning:".yellow(),
                    name
                );
            } else {
                println!("  {} Package {} installed", "->".blue(), name);
            }
        }

        Ok(())
    }

    async fn serve(&self, root: &Path, port: u16) -> Result<DevServer> {
        let mut command = Command::new(&self.npx);
        command
            .args(["vite", "--port", &port.to_string(), "--strictPort"])
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true);
        // npx runs vite as a grandchild; a fresh group lets close() reach it
        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .with_context(|| format!("Failed to start dev server with `{} vite`", self.npx))?;
        let mut server = DevServer {
            pid: child.id(),
            child: Some(child),
        };

        let mut lines = server
            .child
            .as_mut()
            .and_then(|child| child.stdout.take())
            .map(|stdout| BufReader::new(stdout).lines())
            .context("Failed to capture dev server output")?;

        let ready = timeout(STARTUP_TIMEOUT, server.until_ready(&mut lines, port)).await;
        match ready {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                server.close().await?;
                return Err(e);
            }
            Err(_) => {
                server.close().await?;
                anyhow::bail!(
                    "Dev server did not report ready within {} seconds",
                    STARTUP_TIMEOUT.as_secs()
                );
            }
        }

        // Keep forwarding output after startup
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                println!("  {}", line);
            }
        });

        Ok(server)
    }

    async fn build(&self, root: &Path, out_dir: &Path) -> Result<()> {
        run_streamed(&Invocation {
            program: &self.npx,
            args: vec![
                "vite".to_string(),
                "build".to_string(),
                "--outDir".to_string(),
                out_dir.to_string_lossy().into_owned(),
                "--emptyOutDir".to_string(),
                "--base".to_string(),
                "./".to_string(),
            ],
            cwd: root,
            timeout: None,
        })
        .await
        .context("Build failed")
    }
}

/// `vite` prints this once the server is listening
pub fn is_ready_line(line: &str) -> bool {
    line.contains("ready in") || line.contains("Local:")
}

/// Handle on a running `vite` dev server process group
#[derive(Debug)]
pub struct DevServer {
    child: Option<Child>,
    pid: Option<u32>,
}

impl DevServer {
    async fn until_ready(
        &mut self,
        lines: &mut Lines<BufReader<ChildStdout>>,
        port: u16,
    ) -> Result<()> {
        let child = self.child.as_mut().context("Dev server already closed")?;

        loop {
            let exited = tokio::select! {
                line = lines.next_line() => match line.context("Failed to read dev server output")? {
                    Some(line) => {
                        println!("  {}", line);
                        if is_ready_line(&line) {
                            return Ok(());
                        }
                        continue;
                    }
                    None => child.wait().await,
                },
                status = child.wait() => status,
            };

            let status = exited.context("Failed to wait for dev server")?;
            anyhow::bail!(
                "Dev server exited during startup (exit code: {}). Is port {} already in use?",
                status.code().unwrap_or(-1),
                port
            );
        }
    }

    fn kill_group(&self) {
        #[cfg(unix)]
        if let Some(pid) = self.pid.and_then(|pid| i32::try_from(pid).ok()) {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            // ESRCH: the group is already gone
            let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }
}

impl PreviewServer for DevServer {
    async fn close(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            self.kill_group();
            if child
                .try_wait()
                .context("Failed to poll dev server")?
                .is_none()
            {
                child.kill().await.context("Failed to stop dev server")?;
            }
        }
        Ok(())
    }

    async fn wait(&mut self) -> Result<()> {
        let Some(child) = self.child.as_mut() else {
            return std::future::pending().await;
        };

        let status = child.wait().await.context("Failed to wait for dev server")?;
        anyhow::bail!(
            "Dev server exited unexpectedly (exit code: {})",
            status.code().unwrap_or(-1)
        )
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.kill_group();
        }
    }
}
