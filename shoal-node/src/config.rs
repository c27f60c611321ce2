//! Load config from file and environment.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use shoal_core::SwarmConfig;
use tracing::warn;

/// Node configuration. File: ~/.config/shoal/config.toml or /etc/shoal/config.toml.
/// Env overrides: SHOAL_TICK_INTERVAL_MS, SHOAL_HTTP_TIMEOUT_SECS,
/// SHOAL_SIMULTANEOUS_HTTP_DOWNLOADS, SHOAL_SIMULTANEOUS_P2P_DOWNLOADS,
/// SHOAL_P2P_REQUEST_TIMEOUT_TICKS.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Coordinator tick period (default 500 ms).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Whole-request timeout for HTTP segment fetches (default 30 s).
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub swarm: SwarmConfig,
}

fn default_tick_interval_ms() -> u64 {
    500
}
fn default_http_timeout_secs() -> u64 {
    30
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            http_timeout_secs: default_http_timeout_secs(),
            swarm: SwarmConfig::default(),
        }
    }
}

/// Load config: defaults, then the first config file found, then env vars.
/// A broken config file is reported and skipped.
pub fn load() -> NodeConfig {
    let mut c = match config_paths().into_iter().find(|p| p.exists()) {
        Some(path) => load_from(&path).unwrap_or_else(|e| {
            warn!("ignoring config file: {e:#}");
            NodeConfig::default()
        }),
        None => NodeConfig::default(),
    };
    apply_env(&mut c, |key| std::env::var(key).ok());
    c
}

/// Parse one TOML file.
pub fn load_from(path: &Path) -> anyhow::Result<NodeConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parsing {}", path.display()))
}

/// Apply `SHOAL_*` overrides looked up through `var`. Unparseable values are ignored.
pub fn apply_env(c: &mut NodeConfig, var: impl Fn(&str) -> Option<String>) {
    fn parse<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
        let raw = var(key)?;
        match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(key, value = %raw, "ignoring unparseable env override");
                None
            }
        }
    }
    if let Some(v) = parse(&var, "SHOAL_TICK_INTERVAL_MS") {
        c.tick_interval_ms = v;
    }
    if let Some(v) = parse(&var, "SHOAL_HTTP_TIMEOUT_SECS") {
        c.http_timeout_secs = v;
    }
    if let Some(v) = parse(&var, "SHOAL_SIMULTANEOUS_HTTP_DOWNLOADS") {
        c.swarm.simultaneous_http_downloads = v;
    }
    if let Some(v) = parse(&var, "SHOAL_SIMULTANEOUS_P2P_DOWNLOADS") {
        c.swarm.simultaneous_p2p_downloads = v;
    }
    if let Some(v) = parse(&var, "SHOAL_P2P_REQUEST_TIMEOUT_TICKS") {
        c.swarm.p2p_request_timeout_ticks = v;
    }
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/shoal/config.toml"));
    }
    out.push(PathBuf::from("/etc/shoal/config.toml"));
    out
}
