mod app;
mod config;
mod effects;
mod report;

pub use app::run_app;
