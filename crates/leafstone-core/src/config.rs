//! Runtime settings
//!
//! Settings come from, in increasing precedence: built-in defaults, an optional
//! `leafstone.yaml` in the working directory, `LEAFSTONE_*` environment variables,
//! and finally CLI flags applied by the binary.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Optional settings file looked up in the working directory
pub const CONFIG_FILE: &str = "leafstone.yaml";

pub const DEFAULT_PORT: u16 = 3000;

/// Time for a torn-down server to release its port before the replacement binds it
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_millis(100);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment variable overriding the npm binary
pub const NPM_ENV: &str = "LEAFSTONE_NPM";

/// Environment variable overriding the npx binary
pub const NPX_ENV: &str = "LEAFSTONE_NPX";

/// Environment variable overriding the restart delay in milliseconds
pub const RESTART_DELAY_ENV: &str = "LEAFSTONE_RESTART_DELAY_MS";

/// Package manager binaries; Windows ships them as `.cmd` shims
const NPM_BINARIES: (&str, &str) = if cfg!(windows) {
    ("npm.cmd", "npx.cmd")
} else {
    ("npm", "npx")
};

/// Effective settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    pub restart_delay: Duration,
    pub poll_interval: Duration,
    pub install_timeout: Duration,
    pub npm: String,
    pub npx: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            restart_delay: DEFAULT_RESTART_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            install_timeout: DEFAULT_INSTALL_TIMEOUT,
            npm: NPM_BINARIES.0.to_string(),
            npx: NPM_BINARIES.1.to_string(),
        }
    }
}

/// Contents of `leafstone.yaml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub port: Option<u16>,
    pub restart_delay_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub install_timeout_secs: Option<u64>,
    pub npm: Option<String>,
    pub npx: Option<String>,
}

impl Settings {
    /// Load defaults, `<dir>/leafstone.yaml` and the process environment
    pub fn load(dir: &Path) -> Result<Self> {
        let mut settings = Self::default();

        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file: FileSettings = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            settings.apply_file(file);
        }

        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn apply_file(&mut self, file: FileSettings) {
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(ms) = file.restart_delay_ms {
            self.restart_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = file.install_timeout_secs {
            self.install_timeout = Duration::from_secs(secs);
        }
        if let Some(npm) = file.npm {
            self.npm = npm;
        }
        if let Some(npx) = file.npx {
            self.npx = npx;
        }
    }

    /// Apply `LEAFSTONE_*` overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(npm) = lookup(NPM_ENV).filter(|v| !v.is_empty()) {
            self.npm = npm;
        }
        if let Some(npx) = lookup(NPX_ENV).filter(|v| !v.is_empty()) {
            self.npx = npx;
        }
        if let Some(delay) = lookup(RESTART_DELAY_ENV) {
            let ms: u64 = delay
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", RESTART_DELAY_ENV, delay))?;
            self.restart_delay = Duration::from_millis(ms);
        }
        Ok(())
    }
}
