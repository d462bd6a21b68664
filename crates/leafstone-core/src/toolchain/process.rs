//! Child process execution with streamed output

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

/// How long to wait for a process to exit once its output has closed
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// A command to run inside a project directory
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub program: &'a str,
    pub args: Vec<String>,
    pub cwd: &'a Path,
    /// Kill the process if its output does not finish in time
    pub timeout: Option<Duration>,
}

impl Invocation<'_> {
    /// Human readable command line
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Run a command to completion, streaming stdout and stderr line by line.
///
/// A non-zero exit status or a timeout is an error.
pub async fn run_streamed(invocation: &Invocation<'_>) -> Result<()> {
    let cmd = invocation.display();
    println!("{} {}", "Running:".dimmed(), cmd.yellow());

    let mut child = Command::new(invocation.program)
        .args(&invocation.args)
        .current_dir(invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start `{}`", cmd))?;

    let stdout = child.stdout.take().context("Failed to capture stdout")?;
    let stderr = child.stderr.take().context("Failed to capture stderr")?;

    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();

    let output_task = async {
        let mut stdout_done = false;
        let mut stderr_done = false;

        while !(stdout_done && stderr_done) {
            tokio::select! {
                line = stdout_reader.next_line(), if !stdout_done => {
                    match line {
                        Ok(Some(line)) => println!("  {}", line),
                        Ok(None) => stdout_done = true,
                        Err(e) => {
                            eprintln!("{} {}", "Error reading stdout:".red(), e);
                            stdout_done = true;
                        }
                    }
                }
                line = stderr_reader.next_line(), if !stderr_done => {
                    match line {
                        Ok(Some(line)) => eprintln!("  {}", line.yellow()),
                        Ok(None) => stderr_done = true,
                        Err(e) => {
                            eprintln!("{} {}", "Error reading stderr:".red(), e);
                            stderr_done = true;
                        }
                    }
                }
            }
        }
    };

    match invocation.timeout {
        Some(limit) => {
            if timeout(limit, output_task).await.is_err() {
                let _ = child.kill().await;
                anyhow::bail!(
                    "`{}` timed out after {} seconds",
                    cmd,
                    limit.as_secs()
                );
            }
        }
        None => output_task.await,
    }

    match timeout(EXIT_GRACE, child.wait()).await {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => anyhow::bail!(
            "`{}` failed with exit code: {}",
            cmd,
            status.code().unwrap_or(-1)
        ),
        Ok(Err(e)) => Err(e).with_context(|| format!("Failed to wait for `{}`", cmd)),
        Err(_) => {
            let _ = child.kill().await;
            anyhow::bail!("`{}` hung after closing its output", cmd);
        }
    }
}
