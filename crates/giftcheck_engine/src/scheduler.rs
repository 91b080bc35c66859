//! Batch scheduling: runs one batch of links through a single classifier
//! across a fixed number of concurrent lanes.
//!
//! Per invocation the flow is `probe -> pick mode -> drain lanes -> done`.
//! Lanes are contiguous slices of the input processed one link at a time,
//! all joined on the calling task; the shared completion counter is bumped
//! after each link and the sink hears about it before the lane moves on.
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::future::join_all;
use giftcheck_core::{AnalysisMode, BatchConfig, ClassificationResult, Link};

use crate::classifier::Classifier;
use crate::clock::now_ms;
use crate::probe::{HealthProbe, HttpHealthProbe, OfflineProbe};
use crate::{BatchError, EngineSettings, RemoteClient, RemoteError, Simulator};

/// Receives notifications while a batch runs. Calls may come from any lane;
/// within a lane they follow input order.
pub trait BatchSink: Send + Sync {
    fn on_mode(&self, _mode: AnalysisMode) {}
    fn on_progress(&self, completed: usize, total: usize);
    fn on_result(&self, result: &ClassificationResult);
}

/// Sink for callers that only want the returned results.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl BatchSink for NullSink {
    fn on_progress(&self, _completed: usize, _total: usize) {}
    fn on_result(&self, _result: &ClassificationResult) {}
}

pub struct BatchScheduler {
    probe: Arc<dyn HealthProbe>,
    remote: Arc<dyn Classifier>,
    fallback: Arc<dyn Classifier>,
}

impl BatchScheduler {
    pub fn new(
        probe: Arc<dyn HealthProbe>,
        remote: Arc<dyn Classifier>,
        fallback: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            probe,
            remote,
            fallback,
        }
    }

    /// Wires the HTTP probe and client with the simulator as fallback.
    pub fn from_settings(settings: &EngineSettings) -> Result<Self, RemoteError> {
        let probe: Arc<dyn HealthProbe> = if settings.offline {
            Arc::new(OfflineProbe)
        } else {
            Arc::new(HttpHealthProbe::new(settings)?)
        };
        Ok(Self::new(
            probe,
            Arc::new(RemoteClient::new(settings)?),
            Arc::new(Simulator::new(settings.simulator.clone())),
        ))
    }

    /// Probes once and returns the classifier to use until the next probe.
    pub async fn select_mode(&self) -> Arc<dyn Classifier> {
        if self.probe.is_healthy().await {
            self.remote.clone()
        } else {
            engine_info!("Analysis service unavailable, falling back to simulation");
            self.fallback.clone()
        }
    }

    /// Classifies `links` and returns one result per link, in input order.
    ///
    /// Per-link failures become error results; only an invalid `config` fails
    /// the call, and it does so before probing.
    pub async fn run(
        &self,
        links: &[Link],
        config: &BatchConfig,
        sink: &dyn BatchSink,
    ) -> Result<Vec<ClassificationResult>, BatchError> {
        validate(config)?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let classifier = self.select_mode().await;
        let mode = classifier.mode();
        sink.on_mode(mode);

        let chunk_size = match mode {
            AnalysisMode::Remote => config.chunk_size,
            AnalysisMode::Simulated => None,
        };
        let lanes = partition_lanes(links.len(), config.concurrency_limit);
        engine_info!(
            "Batch of {} links in {} mode across {} lanes{}",
            links.len(),
            mode,
            lanes.len(),
            chunk_size
                .map(|size| format!(" (chunks of {size})"))
                .unwrap_or_default()
        );

        let ctx = LaneContext {
            classifier: classifier.as_ref(),
            sink,
            completed: AtomicUsize::new(0),
            total: links.len(),
        };
        let lane_runs = lanes.into_iter().enumerate().map(|(lane, range)| {
            let lane_links = &links[range];
            let ctx = &ctx;
            async move {
                match chunk_size {
                    Some(size) => run_chunked_lane(ctx, lane, lane_links, size).await,
                    None => run_lane(ctx, lane, lane_links).await,
                }
            }
        });
        let results: Vec<ClassificationResult> =
            join_all(lane_runs).await.into_iter().flatten().collect();

        engine_debug!(
            "Batch drained: {} results, {} reported",
            results.len(),
            ctx.completed.load(Ordering::SeqCst)
        );
        Ok(results)
    }

    /// Probes, then classifies one link with whichever classifier won.
    pub async fn classify_single(&self, link: &Link) -> (AnalysisMode, ClassificationResult) {
        let classifier = self.select_mode().await;
        let result = match classifier.classify(link).await {
            Ok(result) => result,
            Err(err) => {
                engine_warn!("Classifying {} failed: {}", link, err);
                ClassificationResult::error(link, err.to_string(), now_ms())
            }
        };
        (classifier.mode(), result)
    }
}

fn validate(config: &BatchConfig) -> Result<(), BatchError> {
    if config.concurrency_limit == 0 {
        return Err(BatchError::InvalidConfig("concurrency limit must be at least 1"));
    }
    if config.chunk_size == Some(0) {
        return Err(BatchError::InvalidConfig("chunk size must be at least 1"));
    }
    Ok(())
}

/// Splits `len` items into `min(concurrency, len)` contiguous lanes whose
/// sizes differ by at most one; longer lanes come first.
pub fn partition_lanes(len: usize, concurrency: usize) -> Vec<Range<usize>> {
    let lanes = concurrency.min(len);
    if lanes == 0 {
        return Vec::new();
    }
    let base = len / lanes;
    let extra = len % lanes;

    let mut ranges = Vec::with_capacity(lanes);
    let mut start = 0;
    for lane in 0..lanes {
        let size = base + usize::from(lane < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

struct LaneContext<'a> {
    classifier: &'a dyn Classifier,
    sink: &'a dyn BatchSink,
    completed: AtomicUsize,
    total: usize,
}

impl LaneContext<'_> {
    fn report(&self, result: &ClassificationResult) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.sink.on_progress(completed, self.total);
        self.sink.on_result(result);
    }
}

async fn run_lane(ctx: &LaneContext<'_>, lane: usize, links: &[Link]) -> Vec<ClassificationResult> {
    let mut results = Vec::with_capacity(links.len());
    for link in links {
        let result = match ctx.classifier.classify(link).await {
            Ok(result) => result,
            Err(err) => {
                engine_warn!("Lane {}: {} failed: {}", lane, link, err);
                ClassificationResult::error(link, err.to_string(), now_ms())
            }
        };
        ctx.report(&result);
        results.push(result);
    }
    results
}

/// A failed chunk ends the lane: results the chunk delivered before failing
/// are kept, the rest of the chunk and everything after it in the lane are
/// reported as aborted.
async fn run_chunked_lane(
    ctx: &LaneContext<'_>,
    lane: usize,
    links: &[Link],
    chunk_size: usize,
) -> Vec<ClassificationResult> {
    let mut results = Vec::with_capacity(links.len());
    let mut next = 0;
    while next < links.len() {
        let chunk = &links[next..(next + chunk_size).min(links.len())];
        let mut delivered = 0;
        let outcome = {
            let mut deliver = |result: ClassificationResult| {
                if delivered < chunk.len() {
                    ctx.report(&result);
                    results.push(result);
                    delivered += 1;
                }
            };
            ctx.classifier.classify_chunk(chunk, &mut deliver).await
        };
        next += delivered;

        if let Err(err) = outcome.and_then(|()| ensure_complete(chunk.len(), delivered)) {
            let remaining = &links[next..];
            engine_warn!(
                "Lane {}: chunk of {} failed after {} results, aborting {} remaining links: {}",
                lane,
                chunk.len(),
                delivered,
                remaining.len(),
                err
            );
            let now = now_ms();
            for link in remaining {
                let result = ClassificationResult::error(link, format!("batch aborted: {err}"), now);
                ctx.report(&result);
                results.push(result);
            }
            break;
        }
    }
    results
}

fn ensure_complete(expected: usize, actual: usize) -> Result<(), RemoteError> {
    if actual == expected {
        return Ok(());
    }
    Err(RemoteError::new(
        crate::RemoteErrorKind::CountMismatch { expected, actual },
        "",
    ))
}
