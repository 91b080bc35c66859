use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use engine_logging::{engine_debug, engine_info};
use giftcheck_core::{
    update, AppState, ExportSelection, Msg, ResultFilter, SessionState, SortOrder, SortSpec,
};
use giftcheck_engine::{EngineHandle, SessionStore};
use log::LevelFilter;

use super::config::AppConfig;
use super::effects::{EffectRunner, ExportTargets};
use super::report;
use crate::cli::Args;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run_app(args: Args) -> anyhow::Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_overrides(&args);
    engine_logging::initialize(config.log_destination()?, LevelFilter::Info, None);

    let session_settings = config.session_settings()?;
    let engine = EngineHandle::new(config.engine_settings()?).context("starting engine")?;
    let runner = EffectRunner::new(
        engine,
        SessionStore::new(&config.output_dir),
        ExportTargets {
            available: args.export_available.clone(),
            unavailable: args.export_unavailable.clone(),
            all: args.export_all.clone(),
            json: args.export_json.clone(),
            backup: args.backup.clone(),
        },
    );
    let mut app = App::new(runner);
    app.dispatch(Msg::SettingsChanged(session_settings));

    if args.clear {
        engine_info!("Clearing saved session in {:?}", config.output_dir);
        app.dispatch(Msg::ClearAll);
    } else {
        let snapshot = app.runner.store().load();
        app.dispatch(Msg::RestoreSession(snapshot));
    }

    for link in &args.remove {
        engine_info!("Dropping saved result for {}", link);
        app.dispatch(Msg::RemoveResult(link.clone()));
    }

    let text = match &args.input {
        Some(input) => Some(read_input(input)?),
        None if !app.state.pending_links().is_empty() => {
            engine_info!(
                "Checking {} saved links without a result",
                app.state.pending_links().len()
            );
            Some(String::new())
        }
        None => None,
    };
    if let Some(text) = text {
        app.dispatch(Msg::InputChanged(text));
        app.dispatch(Msg::LinksSubmitted);
        app.wait_for_batch()?;
    }

    app.dispatch(Msg::FilterChanged(filter_from(&args)));
    app.dispatch(Msg::SortChanged(SortSpec {
        key: args.sort.into(),
        order: if args.desc {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        },
    }));
    app.dispatch(Msg::PageChanged(args.page));

    if args.export_available.is_some() {
        app.dispatch(Msg::ExportRequested(ExportSelection::Available));
    }
    if args.export_unavailable.is_some() {
        app.dispatch(Msg::ExportRequested(ExportSelection::Unavailable));
    }
    if args.export_all.is_some() {
        app.dispatch(Msg::ExportRequested(ExportSelection::All));
    }
    if args.export_json.is_some() {
        app.dispatch(Msg::ExportResultsRequested);
    }
    if args.backup.is_some() {
        app.dispatch(Msg::BackupRequested);
    }

    print!("{}", report::render(&app.state.view()));
    Ok(())
}

struct App {
    state: AppState,
    runner: EffectRunner,
}

impl App {
    fn new(runner: EffectRunner) -> Self {
        Self {
            state: AppState::new(),
            runner,
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.run(effects);
    }

    /// Feeds engine events back into the state until the batch is done.
    /// Fails if the engine goes away first.
    fn wait_for_batch(&mut self) -> anyhow::Result<()> {
        if !self.state.session().is_in_flight() {
            engine_debug!("No new links to classify");
            return Ok(());
        }
        while self.state.session().is_in_flight() {
            let polled = self.runner.poll(POLL_INTERVAL);
            let Some(msg) = polled.context("waiting for batch results")? else {
                continue;
            };
            self.dispatch(msg);
            if self.state.consume_dirty() {
                render_progress(&self.state);
            }
        }
        if self.state.session() == SessionState::Finished {
            eprintln!();
        }
        Ok(())
    }
}

fn render_progress(state: &AppState) {
    let view = state.view();
    let mode = view
        .mode
        .map(|mode| mode.to_string())
        .unwrap_or_else(|| "probing".to_string());
    eprint!(
        "\r[{mode}] {}/{} ({}%)",
        view.progress.completed,
        view.progress.total,
        view.progress.percentage()
    );
    let _ = io::stderr().flush();
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading links from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("reading links from {}", path.display()))
}

fn filter_from(args: &Args) -> ResultFilter {
    if args.only.is_empty() {
        return ResultFilter::default();
    }
    let mut filter = ResultFilter::only(args.only.iter().filter_map(|arg| arg.category()));
    filter.include_errors = args.only.iter().any(|arg| arg.category().is_none());
    filter
}
