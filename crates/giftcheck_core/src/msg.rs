use crate::{
    AnalysisMode, BatchId, ClassificationResult, ExportSelection, Link, ResultFilter,
    SessionSettings, SessionSnapshot, SortSpec,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the link input (raw, multi-line text).
    InputChanged(String),
    /// User submitted the current input for analysis.
    LinksSubmitted,
    /// Restore links and results from a persisted session.
    RestoreSession(SessionSnapshot),
    /// Engine probed the remote service and picked a mode for the batch.
    ModeSelected { batch_id: BatchId, mode: AnalysisMode },
    /// Engine progress for a batch.
    BatchProgress {
        batch_id: BatchId,
        completed: usize,
        total: usize,
    },
    /// One classified link.
    ResultReceived {
        batch_id: BatchId,
        result: ClassificationResult,
    },
    /// Every lane of the batch is drained, or the batch was rejected.
    BatchFinished {
        batch_id: BatchId,
        error: Option<String>,
    },
    PauseClicked,
    ResumeClicked,
    StopClicked,
    FilterChanged(ResultFilter),
    SortChanged(SortSpec),
    PageChanged(usize),
    ExportRequested(ExportSelection),
    ExportResultsRequested,
    BackupRequested,
    /// Drop the result for one link. The link stays known, so the next
    /// submission checks it again.
    RemoveResult(Link),
    /// Forget all links and results.
    ClearAll,
    SettingsChanged(SessionSettings),
    /// Render tick to coalesce redraws.
    Tick,
    NoOp,
}
