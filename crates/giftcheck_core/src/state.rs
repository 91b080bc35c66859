use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::view_model::{AppViewModel, ResultRowView};
use crate::{
    dedupe_links, paginate, parse_links, select_links, sort_results, validation_summary,
    AnalysisMode, BatchConfig, ClassificationResult, ExportSelection, Link, ResultFilter,
    SortSpec, Statistics, DEFAULT_CONCURRENCY,
};

pub type BatchId = u64;

/// With auto-save on, persist after this many new results.
pub const AUTO_SAVE_EVERY: usize = 10;

/// Lifecycle of the session's current batch.
///
/// `Paused` and `Stopping` are advisory: the engine keeps classifying and
/// its results are still applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopping,
    Finished,
}

impl SessionState {
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            SessionState::Running | SessionState::Paused | SessionState::Stopping
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub max_workers: usize,
    pub chunk_size: Option<usize>,
    pub auto_save: bool,
    pub page_size: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_CONCURRENCY,
            chunk_size: None,
            auto_save: true,
            page_size: 20,
        }
    }
}

impl SessionSettings {
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            concurrency_limit: self.max_workers,
            chunk_size: self.chunk_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed.min(self.total) * 100) / self.total) as u8
    }
}

/// Outcome of the last submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitStats {
    pub accepted: usize,
    pub rejected: usize,
    /// Accepted links not queued: repeats within the input or links that
    /// already have a result.
    pub skipped: usize,
    /// Known links without a result that were queued again.
    pub requeued: usize,
}

/// What gets persisted between runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub links: Vec<Link>,
    pub results: Vec<ClassificationResult>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    session: SessionState,
    input: String,
    links: Vec<Link>,
    results: Vec<ClassificationResult>,
    statistics: Statistics,
    progress: BatchProgress,
    mode: Option<AnalysisMode>,
    next_batch_id: BatchId,
    active_batch: Option<BatchId>,
    settings: SessionSettings,
    filter: ResultFilter,
    sort: SortSpec,
    page: usize,
    last_submit: Option<SubmitStats>,
    last_error: Option<String>,
    unsaved: usize,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SessionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn results(&self) -> &[ClassificationResult] {
        &self.results
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn active_batch(&self) -> Option<BatchId> {
        self.active_batch
    }

    pub fn view(&self) -> AppViewModel {
        let mut rows: Vec<&ClassificationResult> = self
            .results
            .iter()
            .filter(|result| self.filter.matches(result))
            .collect();
        sort_results(&mut rows, self.sort);
        let matching = rows.len();
        let page = paginate(&rows, self.page, self.settings.page_size);

        AppViewModel {
            session: self.session,
            mode: self.mode,
            progress: self.progress,
            link_count: self.links.len(),
            statistics: self.statistics.clone(),
            rows: page.items.into_iter().map(ResultRowView::from).collect(),
            page: page.page,
            total_pages: page.total_pages,
            matching,
            last_submit: self.last_submit,
            last_error: self.last_error.clone(),
            dirty: self.dirty,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            links: self.links.clone(),
            results: self.results.clone(),
        }
    }

    pub fn export_links(&self, selection: ExportSelection) -> Vec<String> {
        select_links(&self.results, selection)
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_input(&mut self, input: String) {
        self.input = input;
    }

    /// Parses the current input and queues its links that have no result
    /// yet, followed by known links still waiting for one (a restored session
    /// or a batch that ended early). Returns the new batch, if there is
    /// anything to check.
    pub(crate) fn take_submission(&mut self) -> Option<(BatchId, Vec<Link>)> {
        let raw = std::mem::take(&mut self.input);
        let summary = validation_summary(&raw);
        let submitted = dedupe_links(parse_links(&raw));

        let (fresh, requeued) = {
            let answered: HashSet<&Link> =
                self.results.iter().map(|result| &result.link).collect();
            let fresh: Vec<Link> = submitted
                .iter()
                .filter(|link| !answered.contains(link))
                .cloned()
                .collect();
            let queued: HashSet<&Link> = fresh.iter().collect();
            let requeued: Vec<Link> = self
                .links
                .iter()
                .filter(|link| !answered.contains(link) && !queued.contains(link))
                .cloned()
                .collect();
            (fresh, requeued)
        };

        self.last_submit = Some(SubmitStats {
            accepted: summary.valid,
            rejected: summary.invalid,
            skipped: summary.valid.saturating_sub(fresh.len()),
            requeued: requeued.len(),
        });
        self.mark_dirty();

        if fresh.is_empty() && requeued.is_empty() {
            return None;
        }

        let known: HashSet<Link> = self.links.iter().cloned().collect();
        self.links
            .extend(fresh.iter().filter(|link| !known.contains(*link)).cloned());
        let mut batch = fresh;
        batch.extend(requeued);

        self.next_batch_id += 1;
        let batch_id = self.next_batch_id;
        self.session = SessionState::Running;
        self.active_batch = Some(batch_id);
        self.progress = BatchProgress {
            completed: 0,
            total: batch.len(),
        };
        self.mode = None;
        self.last_error = None;
        Some((batch_id, batch))
    }

    /// Known links that have no result yet.
    pub fn pending_links(&self) -> Vec<Link> {
        let answered: HashSet<&Link> = self.results.iter().map(|result| &result.link).collect();
        self.links
            .iter()
            .filter(|link| !answered.contains(link))
            .cloned()
            .collect()
    }

    pub(crate) fn is_active(&self, batch_id: BatchId) -> bool {
        self.active_batch == Some(batch_id)
    }

    pub(crate) fn set_mode(&mut self, mode: AnalysisMode) {
        self.mode = Some(mode);
        self.mark_dirty();
    }

    pub(crate) fn apply_progress(&mut self, completed: usize, total: usize) {
        // Callbacks from different lanes may arrive out of order.
        if completed >= self.progress.completed {
            self.progress = BatchProgress { completed, total };
            self.mark_dirty();
        }
    }

    /// Appends a result; returns true when an auto-save is due.
    pub(crate) fn apply_result(&mut self, result: ClassificationResult) -> bool {
        self.statistics.record(&result);
        self.results.push(result);
        self.unsaved += 1;
        self.mark_dirty();
        self.settings.auto_save && self.unsaved >= AUTO_SAVE_EVERY
    }

    /// Drops the result for `link`; returns false if there was none.
    pub(crate) fn remove_result(&mut self, link: &Link) -> bool {
        let before = self.results.len();
        self.results.retain(|result| &result.link != link);
        if self.results.len() == before {
            return false;
        }
        self.statistics = Statistics::from_results(&self.results);
        self.mark_dirty();
        true
    }

    pub(crate) fn finish_batch(&mut self, error: Option<String>) {
        self.session = SessionState::Finished;
        self.active_batch = None;
        self.last_error = error;
        self.mark_dirty();
    }

    pub(crate) fn wants_save_on_finish(&self) -> bool {
        self.settings.auto_save && self.unsaved > 0
    }

    pub(crate) fn mark_saved(&mut self) {
        self.unsaved = 0;
    }

    pub(crate) fn set_session(&mut self, session: SessionState) {
        if self.session != session {
            self.session = session;
            self.mark_dirty();
        }
    }

    pub(crate) fn restore(&mut self, snapshot: SessionSnapshot) {
        self.statistics = Statistics::from_results(&snapshot.results);
        self.links = dedupe_links(snapshot.links);
        self.results = snapshot.results;
        self.unsaved = 0;
        self.page = 1;
        self.mark_dirty();
    }

    pub(crate) fn clear(&mut self) {
        self.links.clear();
        self.results.clear();
        self.statistics = Statistics::default();
        self.progress = BatchProgress::default();
        self.mode = None;
        self.session = SessionState::Idle;
        self.last_submit = None;
        self.last_error = None;
        self.unsaved = 0;
        self.page = 1;
        self.mark_dirty();
    }

    pub(crate) fn set_filter(&mut self, filter: ResultFilter) {
        self.filter = filter;
        self.page = 1;
        self.mark_dirty();
    }

    pub(crate) fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.mark_dirty();
    }

    pub(crate) fn set_page(&mut self, page: usize) {
        self.page = page;
        self.mark_dirty();
    }

    pub(crate) fn set_settings(&mut self, settings: SessionSettings) {
        self.settings = settings;
        self.mark_dirty();
    }
}
