//! Runtime detection for Node.js and npm

use anyhow::Result;
use std::process::Command;

/// Runtime detection result
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    pub name: &'static str,
    pub version: Option<String>,
    pub available: bool,
}

/// Run `<program> --version` and report what was found
pub fn detect(name: &'static str, program: &str) -> RuntimeInfo {
    let output = Command::new(program).arg("--version").output();

    match output {
        Ok(out) if out.status.success() => {
            let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
            RuntimeInfo {
                name,
                version: Some(version),
                available: true,
            }
        }
        _ => RuntimeInfo {
            name,
            version: None,
            available: false,
        },
    }
}

/// Check if Node.js is available
pub fn check_node() -> RuntimeInfo {
    detect("Node.js", "node")
}

/// Check if the configured npm binary is available
pub fn check_npm(npm: &str) -> RuntimeInfo {
    detect("npm", npm)
}

/// Fail unless both Node.js and npm are installed
pub fn check_runtimes(npm: &str) -> Result<Vec<RuntimeInfo>> {
    let runtimes = vec![check_node(), check_npm(npm)];

    let missing: Vec<_> = runtimes
        .iter()
        .filter(|r| !r.available)
        .map(|r| format!("  - {} (install from https://nodejs.org)", r.name))
        .collect();

    if !missing.is_empty() {
        anyhow::bail!("Missing required runtimes:\n{}", missing.join("\n"));
    }

    Ok(runtimes)
}
