//! Swarm tuning knobs. Hosts deserialize this from their own config file.

use serde::Deserialize;

/// Default high-demand lookahead in seconds.
pub const DEFAULT_HIGH_DEMAND_TIME_WINDOW: f64 = 15.0;

/// Default timeout for peer segment requests, in coordinator ticks.
pub const DEFAULT_P2P_REQUEST_TIMEOUT_TICKS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwarmConfig {
    /// Seconds ahead of the playhead that must be fetched now, over HTTP if needed.
    #[serde(default = "default_high_demand_time_window")]
    pub high_demand_time_window: f64,
    /// Seconds ahead of the playhead that may be fetched over HTTP.
    #[serde(default = "default_http_download_time_window")]
    pub http_download_time_window: f64,
    /// Seconds ahead of the playhead that may be fetched from peers.
    #[serde(default = "default_p2p_download_time_window")]
    pub p2p_download_time_window: f64,
    #[serde(default = "default_simultaneous_http_downloads")]
    pub simultaneous_http_downloads: usize,
    #[serde(default = "default_simultaneous_p2p_downloads")]
    pub simultaneous_p2p_downloads: usize,
    #[serde(default = "default_p2p_request_timeout_ticks")]
    pub p2p_request_timeout_ticks: u64,
}

fn default_high_demand_time_window() -> f64 {
    DEFAULT_HIGH_DEMAND_TIME_WINDOW
}
fn default_http_download_time_window() -> f64 {
    45.0
}
fn default_p2p_download_time_window() -> f64 {
    60.0
}
fn default_simultaneous_http_downloads() -> usize {
    2
}
fn default_simultaneous_p2p_downloads() -> usize {
    3
}
fn default_p2p_request_timeout_ticks() -> u64 {
    DEFAULT_P2P_REQUEST_TIMEOUT_TICKS
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            high_demand_time_window: default_high_demand_time_window(),
            http_download_time_window: default_http_download_time_window(),
            p2p_download_time_window: default_p2p_download_time_window(),
            simultaneous_http_downloads: default_simultaneous_http_downloads(),
            simultaneous_p2p_downloads: default_simultaneous_p2p_downloads(),
            p2p_request_timeout_ticks: default_p2p_request_timeout_ticks(),
        }
    }
}
