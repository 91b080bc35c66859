//! App configuration: an optional RON file, overridden by command-line flags.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use engine_logging::LogDestination;
use giftcheck_core::{SessionSettings, DEFAULT_CONCURRENCY};
use giftcheck_engine::{EngineSettings, SimulatorSettings, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::Args;

pub const DEFAULT_CONFIG_FILE: &str = "giftcheck.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: String,
    pub workers: usize,
    pub request_timeout_secs: u64,
    pub chunk_size: Option<usize>,
    pub auto_save: bool,
    pub output_dir: PathBuf,
    pub page_size: usize,
    pub log: String,
    pub offline: bool,
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_BASE_URL.to_string(),
            workers: DEFAULT_CONCURRENCY,
            request_timeout_secs: 15,
            chunk_size: None,
            auto_save: true,
            output_dir: PathBuf::from("./output"),
            page_size: 20,
            log: "terminal".to_string(),
            offline: false,
            seed: None,
        }
    }
}

impl AppConfig {
    /// Reads `path`, or [`DEFAULT_CONFIG_FILE`] if it exists, or falls back to defaults.
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        ron::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn apply_overrides(&mut self, args: &Args) {
        if let Some(server) = &args.server {
            self.server = server.clone();
        }
        if let Some(workers) = args.workers {
            self.workers = workers;
        }
        if args.chunk_size.is_some() {
            self.chunk_size = args.chunk_size;
        }
        if let Some(output) = &args.output {
            self.output_dir = output.clone();
        }
        if let Some(page_size) = args.page_size {
            self.page_size = page_size;
        }
        if let Some(log) = args.log {
            self.log = log.name().to_string();
        }
        if args.seed.is_some() {
            self.seed = args.seed;
        }
        self.offline |= args.offline;
    }

    pub fn log_destination(&self) -> anyhow::Result<LogDestination> {
        LogDestination::parse(&self.log)
            .with_context(|| format!("unknown log destination {:?}", self.log))
    }

    pub fn engine_settings(&self) -> anyhow::Result<EngineSettings> {
        let base_url =
            Url::parse(&self.server).with_context(|| format!("invalid server url {:?}", self.server))?;
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        Ok(EngineSettings {
            base_url,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            offline: self.offline,
            simulator: SimulatorSettings {
                seed: self.seed,
                ..SimulatorSettings::default()
            },
            ..EngineSettings::default()
        })
    }

    pub fn session_settings(&self) -> anyhow::Result<SessionSettings> {
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.chunk_size == Some(0) {
            bail!("chunk size must be at least 1");
        }
        Ok(SessionSettings {
            max_workers: self.workers,
            chunk_size: self.chunk_size,
            auto_save: self.auto_save,
            page_size: self.page_size.max(1),
        })
    }
}
