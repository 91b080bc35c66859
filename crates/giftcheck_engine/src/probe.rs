use engine_logging::{engine_debug, engine_trace};
use serde::Deserialize;
use url::Url;

use crate::remote::endpoint;
use crate::types::RemoteErrorKind;
use crate::{EngineSettings, RemoteError};

/// Decides whether the analysis service can take requests right now.
///
/// Asked once per request or batch; answers are never cached.
#[async_trait::async_trait]
pub trait HealthProbe: Send + Sync {
    /// Never fails: every problem reads as "not healthy".
    async fn is_healthy(&self) -> bool;
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: String,
}

/// Probes `GET /api/health`.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: reqwest::Client,
    url: Url,
}

impl HttpHealthProbe {
    pub fn new(settings: &EngineSettings) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.health_timeout)
            .timeout(settings.health_timeout)
            .build()
            .map_err(|err| RemoteError::new(RemoteErrorKind::Network, err.to_string()))?;
        let url = endpoint(&settings.base_url, "api/health")?;
        Ok(Self { client, url })
    }
}

#[async_trait::async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn is_healthy(&self) -> bool {
        let response = match self.client.get(self.url.clone()).send().await {
            Ok(response) => response,
            Err(err) => {
                engine_debug!("Health probe {} unreachable: {}", self.url, err);
                return false;
            }
        };

        let status = response.status();
        if !status.is_success() {
            engine_debug!("Health probe {} answered {}", self.url, status);
            return false;
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                engine_debug!("Health probe body unreadable: {}", err);
                return false;
            }
        };
        match serde_json::from_slice::<HealthBody>(&body) {
            Ok(health) => {
                engine_trace!("Health probe status {:?}", health.status);
                is_healthy_status(&health.status)
            }
            Err(err) => {
                engine_debug!("Health probe body malformed: {}", err);
                false
            }
        }
    }
}

fn is_healthy_status(status: &str) -> bool {
    let status = status.trim();
    status.eq_ignore_ascii_case("healthy") || status.eq_ignore_ascii_case("ok")
}

/// Always reports the service as down, forcing simulated mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProbe;

#[async_trait::async_trait]
impl HealthProbe for OfflineProbe {
    async fn is_healthy(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_statuses() {
        assert!(is_healthy_status("healthy"));
        assert!(is_healthy_status(" OK "));
        assert!(!is_healthy_status("degraded"));
        assert!(!is_healthy_status(""));
    }
}
