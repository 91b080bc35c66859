//! Giftcheck core: link validation, result model, aggregation and the pure
//! session state machine.
mod effect;
mod link;
mod msg;
mod query;
mod result;
mod state;
mod stats;
mod update;
mod view_model;

pub use effect::Effect;
pub use link::{
    dedupe_links, is_privileged_link, parse_links, validation_summary, Link, LinkRejected,
    ValidationSummary,
};
pub use msg::Msg;
pub use query::{
    paginate, select_links, sort_results, ExportSelection, Page, PrivilegeFilter, ResultFilter,
    SortKey, SortOrder, SortSpec,
};
pub use result::{
    AnalysisMode, Attributes, BatchConfig, Category, ClassificationResult, ResultStatus,
    DEFAULT_CONCURRENCY,
};
pub use state::{
    AppState, BatchId, BatchProgress, SessionSettings, SessionSnapshot, SessionState, SubmitStats,
    AUTO_SAVE_EVERY,
};
pub use stats::Statistics;
pub use update::update;
pub use view_model::{AppViewModel, ResultRowView};
