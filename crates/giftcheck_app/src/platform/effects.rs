use std::time::Duration;

use engine_logging::{engine_error, engine_info, engine_warn};
use giftcheck_core::{Effect, ExportSelection, Msg};
use giftcheck_engine::{EngineError, EngineEvent, EngineHandle, SessionBackup, SessionStore};

/// File names for exports, relative to the output directory.
#[derive(Debug, Clone, Default)]
pub struct ExportTargets {
    pub available: Option<String>,
    pub unavailable: Option<String>,
    pub all: Option<String>,
    pub json: Option<String>,
    pub backup: Option<String>,
}

impl ExportTargets {
    fn filename(&self, selection: ExportSelection) -> &str {
        match selection {
            ExportSelection::Available => self.available.as_deref().unwrap_or("available_links.txt"),
            ExportSelection::Unavailable => {
                self.unavailable.as_deref().unwrap_or("unavailable_links.txt")
            }
            ExportSelection::All => self.all.as_deref().unwrap_or("all_links.txt"),
        }
    }

    fn json_filename(&self) -> &str {
        self.json.as_deref().unwrap_or("results.json")
    }

    fn backup_filename(&self) -> &str {
        self.backup.as_deref().unwrap_or("giftcheck_backup.json")
    }
}

/// Carries out effects from the update loop. Sole owner of the engine and store.
pub struct EffectRunner {
    engine: EngineHandle,
    store: SessionStore,
    exports: ExportTargets,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, store: SessionStore, exports: ExportTargets) -> Self {
        Self {
            engine,
            store,
            exports,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartBatch {
                    batch_id,
                    links,
                    config,
                } => {
                    engine_info!(
                        "StartBatch batch_id={} links={} workers={} chunk_size={:?}",
                        batch_id,
                        links.len(),
                        config.concurrency_limit,
                        config.chunk_size
                    );
                    self.engine.start_batch(batch_id, links, config);
                }
                Effect::PersistSession(snapshot) => {
                    if let Err(err) = self.store.save(&snapshot) {
                        engine_error!("Failed to save session to {:?}: {}", self.store.dir(), err);
                    }
                }
                Effect::ExportLinks { selection, links } => {
                    let filename = self.exports.filename(selection);
                    match self.store.export_links(filename, &links) {
                        Ok(path) => println!("Exported {} links to {}", links.len(), path.display()),
                        Err(err) => engine_error!("Failed to export {}: {}", filename, err),
                    }
                }
                Effect::ExportResults(results) => {
                    let filename = self.exports.json_filename();
                    match self.store.export_results(filename, &results) {
                        Ok(path) => {
                            println!("Exported {} results to {}", results.len(), path.display())
                        }
                        Err(err) => engine_error!("Failed to export {}: {}", filename, err),
                    }
                }
                Effect::ExportBackup { settings, snapshot } => {
                    let filename = self.exports.backup_filename();
                    let backup = SessionBackup::new(settings, snapshot);
                    match self.store.export_backup(filename, &backup) {
                        Ok(path) => println!("Wrote backup to {}", path.display()),
                        Err(err) => engine_error!("Failed to write backup {}: {}", filename, err),
                    }
                }
            }
        }
    }

    /// Next engine event as an update message, waiting up to `timeout`.
    /// Fails once the engine is gone.
    pub fn poll(&self, timeout: Duration) -> Result<Option<Msg>, EngineError> {
        Ok(self.engine.recv_timeout(timeout)?.map(map_event))
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::ModeSelected { batch_id, mode } => {
            engine_info!("Batch {} running in {} mode", batch_id, mode);
            Msg::ModeSelected { batch_id, mode }
        }
        EngineEvent::Progress {
            batch_id,
            completed,
            total,
        } => Msg::BatchProgress {
            batch_id,
            completed,
            total,
        },
        EngineEvent::Result { batch_id, result } => Msg::ResultReceived { batch_id, result },
        EngineEvent::BatchCompleted { batch_id, result } => {
            let error = match result {
                Ok(count) => {
                    engine_info!("Batch {} finished with {} results", batch_id, count);
                    None
                }
                Err(err) => {
                    engine_warn!("Batch {} failed: {}", batch_id, err);
                    Some(err.to_string())
                }
            };
            Msg::BatchFinished { batch_id, error }
        }
    }
}

#[cfg(test)]
mod tests {
    use giftcheck_core::AnalysisMode;
    use giftcheck_engine::BatchError;

    use super::*;

    #[test]
    fn completion_error_is_carried_into_message() {
        let msg = map_event(EngineEvent::BatchCompleted {
            batch_id: 3,
            result: Err(BatchError::InvalidConfig("concurrency limit must be at least 1")),
        });
        match msg {
            Msg::BatchFinished {
                batch_id: 3,
                error: Some(error),
            } => assert!(error.contains("concurrency limit")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn crashed_batch_finishes_with_its_error() {
        let msg = map_event(EngineEvent::BatchCompleted {
            batch_id: 2,
            result: Err(BatchError::Crashed("task panicked".to_string())),
        });
        assert!(matches!(
            msg,
            Msg::BatchFinished {
                batch_id: 2,
                error: Some(ref error),
            } if error.contains("task panicked")
        ));
    }

    #[test]
    fn mode_event_keeps_batch_id() {
        assert_eq!(
            map_event(EngineEvent::ModeSelected {
                batch_id: 5,
                mode: AnalysisMode::Remote
            }),
            Msg::ModeSelected {
                batch_id: 5,
                mode: AnalysisMode::Remote
            }
        );
    }

    #[test]
    fn export_names_fall_back_per_selection() {
        let targets = ExportTargets {
            available: Some("ok.txt".to_string()),
            json: Some("dump.json".to_string()),
            ..ExportTargets::default()
        };
        assert_eq!(targets.filename(ExportSelection::Available), "ok.txt");
        assert_eq!(
            targets.filename(ExportSelection::Unavailable),
            "unavailable_links.txt"
        );
        assert_eq!(targets.filename(ExportSelection::All), "all_links.txt");
        assert_eq!(targets.json_filename(), "dump.json");
        assert_eq!(targets.backup_filename(), "giftcheck_backup.json");
    }
}
