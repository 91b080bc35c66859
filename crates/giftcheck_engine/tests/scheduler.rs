use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use giftcheck_core::{
    AnalysisMode, BatchConfig, Category, ClassificationResult, Link, ResultStatus,
};
use giftcheck_engine::{
    partition_lanes, BatchError, BatchScheduler, BatchSink, Classifier, HealthProbe, NullSink,
    RemoteError, RemoteErrorKind, Simulator, SimulatorSettings,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn links(count: usize) -> Vec<Link> {
    (0..count)
        .map(|i| Link::parse(&format!("http://163cn.tv/item{i}")).unwrap())
        .collect()
}

fn config(concurrency_limit: usize) -> BatchConfig {
    BatchConfig {
        concurrency_limit,
        chunk_size: None,
    }
}

struct FixedProbe {
    healthy: bool,
    calls: AtomicUsize,
}

impl FixedProbe {
    fn new(healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            healthy,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl HealthProbe for FixedProbe {
    async fn is_healthy(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.healthy
    }
}

/// Classifier that fails on chosen links and tracks how many calls overlap.
struct FakeClassifier {
    mode: AnalysisMode,
    failing: HashSet<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
    chunk_sizes: Mutex<Vec<usize>>,
}

impl FakeClassifier {
    fn new(mode: AnalysisMode) -> Self {
        Self {
            mode,
            failing: HashSet::new(),
            delay: Duration::from_millis(5),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            chunk_sizes: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(mut self, link: &Link) -> Self {
        self.failing.insert(link.as_str().to_string());
        self
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Classifier for FakeClassifier {
    fn mode(&self) -> AnalysisMode {
        self.mode
    }

    async fn classify(&self, link: &Link) -> Result<ClassificationResult, RemoteError> {
        self.calls.lock().unwrap().push(link.as_str().to_string());
        self.enter().await;
        if self.failing.contains(link.as_str()) {
            return Err(RemoteError::new(RemoteErrorKind::HttpStatus(500), "boom"));
        }
        Ok(ClassificationResult::success(link, Category::Available, 1))
    }

    /// Streams results up to the first failing link, then fails the chunk.
    async fn classify_chunk(
        &self,
        links: &[Link],
        on_result: &mut (dyn FnMut(ClassificationResult) + Send),
    ) -> Result<(), RemoteError> {
        self.chunk_sizes.lock().unwrap().push(links.len());
        self.enter().await;
        for link in links {
            if self.failing.contains(link.as_str()) {
                return Err(RemoteError::new(RemoteErrorKind::Timeout, ""));
            }
            on_result(ClassificationResult::success(link, Category::Available, 1));
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSink {
    modes: Mutex<Vec<AnalysisMode>>,
    progress: Mutex<Vec<(usize, usize)>>,
    results: Mutex<Vec<ClassificationResult>>,
    result_before_progress: AtomicBool,
}

impl BatchSink for RecordingSink {
    fn on_mode(&self, mode: AnalysisMode) {
        self.modes.lock().unwrap().push(mode);
    }

    fn on_progress(&self, completed: usize, total: usize) {
        self.progress.lock().unwrap().push((completed, total));
    }

    fn on_result(&self, result: &ClassificationResult) {
        let results = {
            let mut results = self.results.lock().unwrap();
            results.push(result.clone());
            results.len()
        };
        if results > self.progress.lock().unwrap().len() {
            self.result_before_progress.store(true, Ordering::SeqCst);
        }
    }
}

fn scheduler(
    probe: Arc<FixedProbe>,
    remote: Arc<FakeClassifier>,
    fallback: Arc<dyn Classifier>,
) -> BatchScheduler {
    BatchScheduler::new(probe, remote, fallback)
}

fn fast_simulator(seed: u64) -> Arc<Simulator> {
    Arc::new(Simulator::with_seed(
        seed,
        SimulatorSettings {
            min_latency: Duration::from_millis(1),
            max_latency: Duration::from_millis(15),
            seed: None,
        },
    ))
}

#[tokio::test]
async fn unhealthy_probe_simulates_single_link() {
    init_logging();
    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote));
    let scheduler = scheduler(FixedProbe::new(false), remote.clone(), fast_simulator(1));
    let sink = RecordingSink::default();
    let input = vec![Link::parse("http://163cn.tv/abc").unwrap()];

    let results = scheduler.run(&input, &config(5), &sink).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ResultStatus::Success);
    assert_eq!(results[0].link, input[0]);
    assert_eq!(*sink.progress.lock().unwrap(), vec![(1, 1)]);
    assert_eq!(*sink.modes.lock().unwrap(), vec![AnalysisMode::Simulated]);
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn remote_failure_becomes_error_result_for_that_link_only() {
    init_logging();
    let input = links(3);
    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote).failing_on(&input[1]));
    let scheduler = scheduler(FixedProbe::new(true), remote.clone(), fast_simulator(2));
    let sink = RecordingSink::default();

    let results = scheduler.run(&input, &config(5), &sink).await.unwrap();

    let statuses: Vec<ResultStatus> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![ResultStatus::Success, ResultStatus::Error, ResultStatus::Success]
    );
    assert!(results[1].message.as_deref().unwrap().contains("boom"));

    let progress = sink.progress.lock().unwrap().clone();
    assert_eq!(progress.len(), 3);
    assert!(progress.windows(2).all(|pair| pair[0].0 < pair[1].0));
    assert_eq!(progress.last(), Some(&(3, 3)));
    assert!(!sink.result_before_progress.load(Ordering::SeqCst));
    assert_eq!(*sink.modes.lock().unwrap(), vec![AnalysisMode::Remote]);
}

#[tokio::test]
async fn ten_links_three_lanes_all_returned_in_order() {
    init_logging();
    let input = links(10);
    let lanes = partition_lanes(input.len(), 3);
    assert_eq!(lanes.len(), 3);
    assert!(lanes.iter().all(|lane| lane.len() <= 4));

    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote));
    let scheduler = scheduler(FixedProbe::new(false), remote, fast_simulator(3));
    let results = scheduler.run(&input, &config(3), &NullSink).await.unwrap();

    let returned: Vec<&Link> = results.iter().map(|r| &r.link).collect();
    assert_eq!(returned, input.iter().collect::<Vec<_>>());
}

#[tokio::test]
async fn in_flight_calls_never_exceed_limit() {
    init_logging();
    for (count, limit) in [(10, 3), (4, 8), (7, 1)] {
        let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote));
        let scheduler = scheduler(FixedProbe::new(true), remote.clone(), fast_simulator(4));
        let results = scheduler
            .run(&links(count), &config(limit), &NullSink)
            .await
            .unwrap();

        assert_eq!(results.len(), count);
        assert!(remote.max_in_flight() <= limit.min(count));
        assert!(remote.max_in_flight() >= 1);
    }
}

#[tokio::test]
async fn limit_of_one_processes_in_input_order() {
    let input = links(5);
    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote));
    let scheduler = scheduler(FixedProbe::new(true), remote.clone(), fast_simulator(5));

    scheduler.run(&input, &config(1), &NullSink).await.unwrap();

    let expected: Vec<String> = input.iter().map(|l| l.as_str().to_string()).collect();
    assert_eq!(remote.calls(), expected);
    assert_eq!(remote.max_in_flight(), 1);
}

#[tokio::test]
async fn limit_above_count_starts_every_link_at_once() {
    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote));
    let scheduler = scheduler(FixedProbe::new(true), remote.clone(), fast_simulator(6));

    scheduler.run(&links(4), &config(10), &NullSink).await.unwrap();

    assert_eq!(remote.max_in_flight(), 4);
}

#[tokio::test]
async fn zero_concurrency_is_rejected_before_probing() {
    let probe = FixedProbe::new(true);
    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote));
    let scheduler = scheduler(probe.clone(), remote.clone(), fast_simulator(7));

    let err = scheduler
        .run(&links(3), &config(0), &NullSink)
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::InvalidConfig(_)));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn empty_batch_skips_probe_and_sink() {
    let probe = FixedProbe::new(true);
    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote));
    let scheduler = scheduler(probe.clone(), remote, fast_simulator(8));
    let sink = RecordingSink::default();

    let results = scheduler.run(&[], &config(4), &sink).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    assert!(sink.modes.lock().unwrap().is_empty());
    assert!(sink.progress.lock().unwrap().is_empty());
}

#[tokio::test]
async fn probe_runs_once_per_batch() {
    let probe = FixedProbe::new(true);
    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote));
    let scheduler = scheduler(probe.clone(), remote, fast_simulator(9));

    scheduler.run(&links(6), &config(3), &NullSink).await.unwrap();
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);

    scheduler.run(&links(2), &config(3), &NullSink).await.unwrap();
    assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_chunk_aborts_rest_of_its_lane_only() {
    init_logging();
    // Two lanes of six; chunks of two. Lane 0 fails on its second chunk.
    let input = links(12);
    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote).failing_on(&input[2]));
    let scheduler = scheduler(FixedProbe::new(true), remote.clone(), fast_simulator(10));
    let sink = RecordingSink::default();
    let chunked = BatchConfig {
        concurrency_limit: 2,
        chunk_size: Some(2),
    };

    let results = scheduler.run(&input, &chunked, &sink).await.unwrap();

    assert_eq!(results.len(), 12);
    for (index, result) in results.iter().enumerate() {
        assert_eq!(result.link, input[index]);
        if (2..6).contains(&index) {
            assert_eq!(result.status, ResultStatus::Error, "link {index}");
            assert!(result
                .message
                .as_deref()
                .unwrap()
                .starts_with("batch aborted"));
        } else {
            assert_eq!(result.status, ResultStatus::Success, "link {index}");
        }
    }
    assert_eq!(sink.progress.lock().unwrap().len(), 12);
    // Lane 0 stopped after its failing chunk; lane 1 sent all three.
    assert_eq!(remote.chunk_sizes.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn results_delivered_before_chunk_failure_are_kept() {
    init_logging();
    let input = links(6);
    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote).failing_on(&input[3]));
    let scheduler = scheduler(FixedProbe::new(true), remote.clone(), fast_simulator(13));
    let sink = RecordingSink::default();
    let chunked = BatchConfig {
        concurrency_limit: 1,
        chunk_size: Some(4),
    };

    let results = scheduler.run(&input, &chunked, &sink).await.unwrap();

    let statuses: Vec<ResultStatus> = results.iter().map(|result| result.status).collect();
    assert_eq!(
        statuses,
        vec![
            ResultStatus::Success,
            ResultStatus::Success,
            ResultStatus::Success,
            ResultStatus::Error,
            ResultStatus::Error,
            ResultStatus::Error,
        ]
    );
    assert_eq!(*remote.chunk_sizes.lock().unwrap(), vec![4]);
    assert_eq!(sink.progress.lock().unwrap().last(), Some(&(6, 6)));
}

#[tokio::test]
async fn simulated_mode_ignores_chunk_size() {
    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote));
    let scheduler = scheduler(FixedProbe::new(false), remote.clone(), fast_simulator(11));
    let chunked = BatchConfig {
        concurrency_limit: 2,
        chunk_size: Some(3),
    };

    let results = scheduler.run(&links(4), &chunked, &NullSink).await.unwrap();

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(ClassificationResult::is_success));
    assert!(remote.chunk_sizes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn single_link_reports_mode_and_error() {
    let input = links(1);
    let remote = Arc::new(FakeClassifier::new(AnalysisMode::Remote).failing_on(&input[0]));
    let scheduler = scheduler(FixedProbe::new(true), remote, fast_simulator(12));

    let (mode, result) = scheduler.classify_single(&input[0]).await;

    assert_eq!(mode, AnalysisMode::Remote);
    assert_eq!(result.status, ResultStatus::Error);
    assert_eq!(result.link, input[0]);
}
