use crate::{AppState, Effect, Msg, SessionState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::LinksSubmitted => {
            // One batch at a time; the input stays put until the batch is done.
            if state.session().is_in_flight() {
                return (state, Vec::new());
            }
            match state.take_submission() {
                Some((batch_id, links)) => vec![Effect::StartBatch {
                    batch_id,
                    links,
                    config: state.settings().batch_config(),
                }],
                None => Vec::new(),
            }
        }
        Msg::RestoreSession(snapshot) => {
            if state.session().is_in_flight() {
                return (state, Vec::new());
            }
            state.restore(snapshot);
            Vec::new()
        }
        Msg::ModeSelected { batch_id, mode } => {
            if state.is_active(batch_id) {
                state.set_mode(mode);
            }
            Vec::new()
        }
        Msg::BatchProgress {
            batch_id,
            completed,
            total,
        } => {
            if state.is_active(batch_id) {
                state.apply_progress(completed, total);
            }
            Vec::new()
        }
        Msg::ResultReceived { result, .. } => {
            // Results are kept even after Stop: the engine does not cancel lanes.
            if state.apply_result(result) {
                state.mark_saved();
                vec![Effect::PersistSession(state.snapshot())]
            } else {
                Vec::new()
            }
        }
        Msg::BatchFinished { batch_id, error } => {
            if !state.is_active(batch_id) {
                return (state, Vec::new());
            }
            state.finish_batch(error);
            if state.wants_save_on_finish() {
                state.mark_saved();
                vec![Effect::PersistSession(state.snapshot())]
            } else {
                Vec::new()
            }
        }
        Msg::PauseClicked => {
            if state.session() == SessionState::Running {
                state.set_session(SessionState::Paused);
            }
            Vec::new()
        }
        Msg::ResumeClicked => {
            if state.session() == SessionState::Paused {
                state.set_session(SessionState::Running);
            }
            Vec::new()
        }
        Msg::StopClicked => {
            if matches!(
                state.session(),
                SessionState::Running | SessionState::Paused
            ) {
                state.set_session(SessionState::Stopping);
            }
            Vec::new()
        }
        Msg::FilterChanged(filter) => {
            state.set_filter(filter);
            Vec::new()
        }
        Msg::SortChanged(sort) => {
            state.set_sort(sort);
            Vec::new()
        }
        Msg::PageChanged(page) => {
            state.set_page(page);
            Vec::new()
        }
        Msg::ExportRequested(selection) => {
            let links = state.export_links(selection);
            if links.is_empty() {
                Vec::new()
            } else {
                vec![Effect::ExportLinks { selection, links }]
            }
        }
        Msg::ExportResultsRequested => {
            if state.results().is_empty() {
                Vec::new()
            } else {
                vec![Effect::ExportResults(state.results().to_vec())]
            }
        }
        Msg::BackupRequested => vec![Effect::ExportBackup {
            settings: state.settings(),
            snapshot: state.snapshot(),
        }],
        Msg::RemoveResult(link) => {
            if state.session().is_in_flight() || !state.remove_result(&link) {
                return (state, Vec::new());
            }
            state.mark_saved();
            vec![Effect::PersistSession(state.snapshot())]
        }
        Msg::ClearAll => {
            if state.session().is_in_flight() {
                return (state, Vec::new());
            }
            state.clear();
            state.mark_saved();
            vec![Effect::PersistSession(state.snapshot())]
        }
        Msg::SettingsChanged(settings) => {
            state.set_settings(settings);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
