use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::engine_error;
use giftcheck_core::{AnalysisMode, BatchConfig, BatchId, ClassificationResult, Link};

use crate::scheduler::{BatchScheduler, BatchSink};
use crate::{BatchError, EngineError, EngineEvent, EngineSettings};

enum EngineCommand {
    StartBatch {
        batch_id: BatchId,
        links: Vec<Link>,
        config: BatchConfig,
    },
}

impl EngineCommand {
    fn batch_id(&self) -> BatchId {
        match self {
            EngineCommand::StartBatch { batch_id, .. } => *batch_id,
        }
    }
}

/// Runs batches on a background runtime and reports back over a channel.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let scheduler = Arc::new(BatchScheduler::from_settings(&settings)?);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self::with_scheduler(scheduler, runtime))
    }

    /// Uses the given scheduler and runtime instead of building them from settings.
    pub fn with_scheduler(scheduler: Arc<BatchScheduler>, runtime: tokio::runtime::Runtime) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let batch_id = command.batch_id();
                let scheduler = scheduler.clone();
                let task_tx = event_tx.clone();
                let task = runtime.spawn(async move {
                    handle_command(scheduler.as_ref(), command, task_tx).await;
                });
                // A batch that dies without reporting still has to complete.
                let watch_tx = event_tx.clone();
                runtime.spawn(async move {
                    if let Err(err) = task.await {
                        engine_error!("Batch {} task failed: {}", batch_id, err);
                        let _ = watch_tx.send(EngineEvent::BatchCompleted {
                            batch_id,
                            result: Err(BatchError::Crashed(err.to_string())),
                        });
                    }
                });
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn start_batch(&self, batch_id: BatchId, links: Vec<Link>, config: BatchConfig) {
        if self
            .cmd_tx
            .send(EngineCommand::StartBatch {
                batch_id,
                links,
                config,
            })
            .is_err()
        {
            engine_error!("Engine thread is gone, batch {} dropped", batch_id);
        }
    }

    /// `Ok(None)` when nothing is queued; `Disconnected` once the engine
    /// thread is gone and no event can ever arrive.
    pub fn try_recv(&self) -> Result<Option<EngineEvent>, EngineError> {
        match self.event_rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => Err(EngineError::Disconnected),
        }
    }

    /// Like [`EngineHandle::try_recv`], waiting up to `timeout` for an event.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineError> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineError::Disconnected),
        }
    }
}

/// Forwards scheduler notifications as engine events for one batch.
struct ChannelBatchSink {
    batch_id: BatchId,
    tx: mpsc::Sender<EngineEvent>,
}

impl BatchSink for ChannelBatchSink {
    fn on_mode(&self, mode: AnalysisMode) {
        let _ = self.tx.send(EngineEvent::ModeSelected {
            batch_id: self.batch_id,
            mode,
        });
    }

    fn on_progress(&self, completed: usize, total: usize) {
        let _ = self.tx.send(EngineEvent::Progress {
            batch_id: self.batch_id,
            completed,
            total,
        });
    }

    fn on_result(&self, result: &ClassificationResult) {
        let _ = self.tx.send(EngineEvent::Result {
            batch_id: self.batch_id,
            result: result.clone(),
        });
    }
}

async fn handle_command(
    scheduler: &BatchScheduler,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::StartBatch {
            batch_id,
            links,
            config,
        } => {
            let sink = ChannelBatchSink {
                batch_id,
                tx: event_tx.clone(),
            };
            let result = scheduler
                .run(&links, &config, &sink)
                .await
                .map(|results| results.len());
            let _ = event_tx.send(EngineEvent::BatchCompleted { batch_id, result });
        }
    }
}
