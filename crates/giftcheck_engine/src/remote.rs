//! HTTP client for the analysis service.
//!
//! Endpoints, relative to the configured base URL:
//! - `POST api/analyze` with `{"link": ...}` returns one record
//! - `POST api/batch_analyze` with `{"links": [...], "max_workers": n}` returns `{"results": [...]}`
//!
//! Failures come back as `{"error": "..."}`, usually with a non-2xx status.
use engine_logging::engine_debug;
use giftcheck_core::{AnalysisMode, Attributes, Category, ClassificationResult, Link};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::classifier::Classifier;
use crate::clock::{format_expiry, now_ms};
use crate::types::RemoteErrorKind;
use crate::{EngineSettings, RemoteError};

/// The service refuses batch requests with more links than this.
pub const MAX_BATCH_LINKS: usize = 50;

#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: reqwest::Client,
    analyze_url: Url,
    batch_url: Url,
    max_workers: usize,
}

impl RemoteClient {
    pub fn new(settings: &EngineSettings) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| RemoteError::new(RemoteErrorKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            analyze_url: endpoint(&settings.base_url, "api/analyze")?,
            batch_url: endpoint(&settings.base_url, "api/batch_analyze")?,
            max_workers: settings.remote_max_workers.max(1),
        })
    }

    pub async fn classify_one(&self, link: &Link) -> Result<ClassificationResult, RemoteError> {
        let body = self
            .post_json(&self.analyze_url, json!({ "link": link.as_str() }))
            .await?;
        let record: WireRecord = parse_body(&body)?;
        if let Some(error) = record.service_error() {
            return Err(RemoteError::new(RemoteErrorKind::Service, error));
        }
        Ok(record.into_result(link, now_ms()))
    }

    /// Classifies `links` in consecutive chunks of at most `chunk_size`
    /// (clamped to `1..=MAX_BATCH_LINKS`), one request per chunk, in order.
    ///
    /// `on_result` sees each chunk's results as soon as that chunk returns.
    /// The first failing chunk aborts the call; results of earlier chunks have
    /// already been passed to `on_result` by then.
    pub async fn classify_batch<F>(
        &self,
        links: &[Link],
        chunk_size: usize,
        mut on_result: F,
    ) -> Result<Vec<ClassificationResult>, RemoteError>
    where
        F: FnMut(&ClassificationResult),
    {
        let chunk_size = chunk_size.clamp(1, MAX_BATCH_LINKS);
        let mut results = Vec::with_capacity(links.len());
        for chunk in links.chunks(chunk_size) {
            let chunk_results = self.post_chunk(chunk).await?;
            for result in &chunk_results {
                on_result(result);
            }
            results.extend(chunk_results);
        }
        Ok(results)
    }

    async fn post_chunk(&self, links: &[Link]) -> Result<Vec<ClassificationResult>, RemoteError> {
        let payload = json!({
            "links": links.iter().map(Link::as_str).collect::<Vec<_>>(),
            "max_workers": self.max_workers,
        });
        let body = self.post_json(&self.batch_url, payload).await?;
        let batch: WireBatch = parse_body(&body)?;

        let records = match (batch.results, batch.error) {
            (Some(records), _) => records,
            (None, Some(error)) => return Err(RemoteError::new(RemoteErrorKind::Service, error)),
            (None, None) => {
                return Err(RemoteError::new(
                    RemoteErrorKind::MalformedBody,
                    "missing results",
                ))
            }
        };
        if records.len() != links.len() {
            return Err(RemoteError::new(
                RemoteErrorKind::CountMismatch {
                    expected: links.len(),
                    actual: records.len(),
                },
                "",
            ));
        }

        let now = now_ms();
        Ok(links
            .iter()
            .zip(records)
            .map(|(link, record)| record.into_result(link, now))
            .collect())
    }

    async fn post_json(&self, url: &Url, payload: serde_json::Value) -> Result<Vec<u8>, RemoteError> {
        engine_debug!("POST {}", url);
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .map(|err| err.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(RemoteError::new(
                RemoteErrorKind::HttpStatus(status.as_u16()),
                message,
            ));
        }
        Ok(body.to_vec())
    }
}

#[async_trait::async_trait]
impl Classifier for RemoteClient {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Remote
    }

    async fn classify(&self, link: &Link) -> Result<ClassificationResult, RemoteError> {
        self.classify_one(link).await
    }

    /// Goes through [`RemoteClient::classify_batch`], so a chunk larger than
    /// the service limit becomes several requests and the results of the
    /// requests that succeeded reach `on_result` even if a later one fails.
    async fn classify_chunk(
        &self,
        links: &[Link],
        on_result: &mut (dyn FnMut(ClassificationResult) + Send),
    ) -> Result<(), RemoteError> {
        self.classify_batch(links, MAX_BATCH_LINKS, |result| on_result(result.clone()))
            .await
            .map(|_| ())
    }
}

/// Resolves `path` against `base`, treating `base` as a directory.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, RemoteError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }
    base.join(path)
        .map_err(|err| RemoteError::new(RemoteErrorKind::InvalidUrl, err.to_string()))
}

fn parse_body<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, RemoteError> {
    serde_json::from_slice(body)
        .map_err(|err| RemoteError::new(RemoteErrorKind::MalformedBody, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        return RemoteError::new(RemoteErrorKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return RemoteError::new(RemoteErrorKind::InvalidUrl, err.to_string());
    }
    RemoteError::new(RemoteErrorKind::Network, err.to_string())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct WireBatch {
    results: Option<Vec<WireRecord>>,
    error: Option<String>,
}

/// One record as the service sends it. Everything is optional because the
/// service omits whatever does not apply.
#[derive(Debug, Default, Deserialize)]
struct WireRecord {
    status: Option<String>,
    gift_status: Option<String>,
    vip_status: Option<String>,
    timestamp: Option<i64>,
    message: Option<String>,
    error_message: Option<String>,
    error: Option<String>,
    status_text: Option<String>,
    gift_type: Option<String>,
    gift_price: Option<f64>,
    sender_name: Option<String>,
    total_count: Option<u32>,
    used_count: Option<u32>,
    available_count: Option<u32>,
    expire_time: Option<i64>,
    expire_date: Option<String>,
    remaining_days: Option<f64>,
}

impl WireRecord {
    /// A bare `{error}` body with no status at all.
    fn service_error(&self) -> Option<String> {
        match (&self.status, &self.error) {
            (None, Some(error)) => Some(error.clone()),
            _ => None,
        }
    }

    fn category(&self, privileged: bool) -> Category {
        let gift = self.gift_status.as_deref().map(Category::from_tag);
        if privileged {
            let vip = self.vip_status.as_deref().map(Category::from_tag);
            return match (vip, gift) {
                (Some(Category::Valid), _) | (None, Some(Category::Available | Category::Valid)) => {
                    Category::Valid
                }
                _ => Category::Expired,
            };
        }
        match gift.unwrap_or(Category::Unknown) {
            Category::Valid => Category::Available,
            other => other,
        }
    }

    fn into_result(self, link: &Link, now_ms: i64) -> ClassificationResult {
        let timestamp = self.timestamp.unwrap_or(now_ms);
        let message = self
            .error_message
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error.clone());

        let result = if self.status.as_deref() == Some("success") {
            let category = self.category(link.is_privileged());
            let result = ClassificationResult::success(link, category, timestamp);
            match message {
                Some(message) => result.with_message(message),
                None => result,
            }
        } else {
            let message = message.unwrap_or_else(|| {
                format!(
                    "service reported status {}",
                    self.status.as_deref().unwrap_or("missing")
                )
            });
            ClassificationResult::error(link, message, timestamp)
        };

        let expire_date = self
            .expire_date
            .or_else(|| self.expire_time.and_then(format_expiry));
        result.with_attributes(Attributes {
            status_text: self.status_text,
            gift_type: self.gift_type,
            price: self.gift_price,
            sender_name: self.sender_name,
            total_count: self.total_count,
            used_count: self.used_count,
            available_count: self.available_count,
            expire_time_ms: self.expire_time,
            expire_date,
            remaining_days: self.remaining_days.map(|days| days.max(0.0).floor() as u32),
        })
    }
}
