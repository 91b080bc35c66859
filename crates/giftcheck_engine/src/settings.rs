use std::time::Duration;

use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/";

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Root of the analysis service; endpoints are resolved relative to it.
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Timeout for the health probe, kept short so fallback is quick.
    pub health_timeout: Duration,
    /// `max_workers` sent with batch requests.
    pub remote_max_workers: usize,
    /// Skip the probe and always simulate.
    pub offline: bool,
    pub simulator: SimulatorSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url"),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
            health_timeout: Duration::from_secs(3),
            remote_max_workers: 5,
            offline: false,
            simulator: SimulatorSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorSettings {
    pub min_latency: Duration,
    pub max_latency: Duration,
    /// Fixed seed for reproducible runs; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            min_latency: Duration::from_millis(500),
            max_latency: Duration::from_millis(2500),
            seed: None,
        }
    }
}
