use crate::{
    BatchConfig, BatchId, ClassificationResult, ExportSelection, Link, SessionSettings,
    SessionSnapshot,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Classify `links` as one batch.
    StartBatch {
        batch_id: BatchId,
        links: Vec<Link>,
        config: BatchConfig,
    },
    /// Write the snapshot to the session store.
    PersistSession(SessionSnapshot),
    /// Write the selected links out as a plain list.
    ExportLinks {
        selection: ExportSelection,
        links: Vec<String>,
    },
    /// Write full result records as JSON.
    ExportResults(Vec<ClassificationResult>),
    /// Write settings, links and results as one JSON backup.
    ExportBackup {
        settings: SessionSettings,
        snapshot: SessionSnapshot,
    },
}
