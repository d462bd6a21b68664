//! leafstone CLI - preview and build single-file React components

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leafstone_core::toolchain::check_runtimes;
use leafstone_core::{run_build, run_dev, Component, Settings, ViteToolchain};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "leafstone")]
#[command(about = "Preview and build single-file React components")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a component with live reload
    Dev(DevArgs),
    /// Bundle a component into a static site
    Build(BuildArgs),
}

#[derive(Parser, Debug)]
pub struct DevArgs {
    /// Component file (.jsx or .tsx)
    pub file: PathBuf,

    /// Dev server port (default 3000, or `port` in leafstone.yaml)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Do not open a browser on startup
    #[arg(long = "no-open")]
    pub no_open: bool,
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Component file (.jsx or .tsx)
    pub file: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "dist")]
    pub out: PathBuf,
}

#[tokio::main]
async fn main() {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    let args = Args::parse();
    let result = run(args).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    if let Err(e) = result {
        let _ = cliclack::log::error(format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let settings = Settings::load(&cwd)?;

    match args.command {
        Command::Dev(dev_args) => dev(dev_args, settings, cwd).await,
        Command::Build(build_args) => build(build_args, settings, &cwd).await,
    }
}

async fn dev(args: DevArgs, mut settings: Settings, cwd: PathBuf) -> Result<()> {
    if let Some(port) = args.port {
        settings.port = port;
    }

    cliclack::intro("leafstone dev")?;
    let component = Component::from_path(&args.file)?;
    report_runtimes(&settings)?;

    // First Ctrl+C shuts down gracefully, a second one exits immediately
    let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
    let interrupted = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler(move || {
        if interrupted.swap(true, Ordering::SeqCst) {
            let _ = console::Term::stderr().show_cursor();
            std::process::exit(130);
        }
        let _ = shutdown_tx.send(());
    })
    .context("Failed to install Ctrl+C handler")?;

    let toolchain = ViteToolchain::from_settings(&settings);
    run_dev(
        toolchain,
        component,
        &settings,
        !args.no_open,
        cwd,
        shutdown_rx,
    )
    .await?;

    cliclack::outro("Preview stopped")?;
    Ok(())
}

async fn build(args: BuildArgs, settings: Settings, cwd: &Path) -> Result<()> {
    // Handle Ctrl+C by exiting; there is no session to wind down
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    cliclack::intro("leafstone build")?;
    let component = Component::from_path(&args.file)?;
    report_runtimes(&settings)?;

    let toolchain = ViteToolchain::from_settings(&settings);
    let summary = run_build(&toolchain, &component, cwd, &args.out).await?;

    for failure in &summary.assets.failed {
        cliclack::log::warning(format!(
            "Asset {} was not published: {}",
            failure.filename, failure.reason
        ))?;
    }

    cliclack::outro(format!(
        "Built {} into {}",
        component.file_name(),
        summary.out_dir.display()
    ))?;
    Ok(())
}

fn report_runtimes(settings: &Settings) -> Result<()> {
    for runtime in check_runtimes(&settings.npm)? {
        cliclack::log::success(format!(
            "{} {}",
            runtime.name,
            runtime.version.unwrap_or_default()
        ))?;
    }
    Ok(())
}
