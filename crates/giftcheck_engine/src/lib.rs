//! Giftcheck engine: link classification, batch scheduling and persistence.
mod classifier;
mod clock;
mod engine;
mod probe;
mod remote;
mod scheduler;
mod settings;
mod simulator;
mod store;
mod types;

pub use classifier::Classifier;
pub use clock::{format_expiry, now_ms};
pub use engine::EngineHandle;
pub use probe::{HealthProbe, HttpHealthProbe, OfflineProbe};
pub use remote::{RemoteClient, MAX_BATCH_LINKS};
pub use scheduler::{partition_lanes, BatchScheduler, BatchSink, NullSink};
pub use settings::{EngineSettings, SimulatorSettings, DEFAULT_BASE_URL};
pub use simulator::{draw_result, Simulator};
pub use store::{
    ensure_output_dir, AtomicFileWriter, SessionBackup, SessionStore, StoreError, BACKUP_VERSION,
    SESSION_FILENAME,
};
pub use types::{BatchError, EngineError, EngineEvent, RemoteError, RemoteErrorKind};
