//! Server configuration: optional YAML file layered under CLI flags / env.
//!
//! ```yaml
//! mloop_path: "dotnet /opt/mloop/mloop.dll"
//! timeouts:
//!   default_ms: 300000
//!   train_ms: 600000
//!   serve_ms: 5000
//! env:
//!   DOTNET_CLI_TELEMETRY_OPTOUT: "1"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::exec::{Executable, MloopRunner};

pub const CONFIG_ENV: &str = "MLOOP_MCP_CONFIG";

/// Per-operation deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub default_ms: u64,
    pub train_ms: u64,
    /// Short on purpose: `serve` never exits, so the deadline marks "started".
    pub serve_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            default_ms: 300_000,
            train_ms: 600_000,
            serve_ms: 5_000,
        }
    }
}

impl Timeouts {
    pub fn general(&self) -> Duration {
        Duration::from_millis(self.default_ms)
    }

    pub fn train(&self) -> Duration {
        Duration::from_millis(self.train_ms)
    }

    pub fn serve(&self) -> Duration {
        Duration::from_millis(self.serve_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Executable command line; `MLOOP_PATH` / `--mloop-path` take precedence.
    pub mloop_path: Option<String>,
    pub timeouts: Timeouts,
    /// Extra environment for every `mloop` process.
    pub env: HashMap<String, String>,
}

impl Settings {
    /// Load from a YAML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Apply an explicit executable override (CLI flag or `MLOOP_PATH`).
    pub fn with_mloop_path(mut self, path: Option<String>) -> Self {
        if let Some(p) = path.filter(|p| !p.trim().is_empty()) {
            self.mloop_path = Some(p);
        }
        self
    }

    pub fn executable(&self) -> Result<Executable> {
        match &self.mloop_path {
            Some(raw) => Executable::parse(raw),
            None => Executable::resolve(),
        }
    }

    pub fn runner(&self) -> Result<MloopRunner> {
        Ok(MloopRunner::new(self.executable()?)
            .with_default_timeout(self.timeouts.general())
            .with_env(self.env.clone()))
    }
}
