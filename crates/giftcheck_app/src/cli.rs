use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use engine_logging::LogDestination;
use giftcheck_core::{Category, Link, SortKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogArg {
    File,
    Terminal,
    Both,
}

impl LogArg {
    /// Name as written in the config file.
    pub fn name(self) -> &'static str {
        match self {
            LogArg::File => "file",
            LogArg::Terminal => "terminal",
            LogArg::Both => "both",
        }
    }
}

impl From<LogArg> for LogDestination {
    fn from(arg: LogArg) -> Self {
        match arg {
            LogArg::File => LogDestination::File,
            LogArg::Terminal => LogDestination::Terminal,
            LogArg::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    /// Ordinary gift with copies left
    Available,
    /// Invite link still usable
    Valid,
    Expired,
    /// Every copy already taken
    Claimed,
    Invalid,
    Unknown,
    /// Results whose classification failed
    Error,
}

impl CategoryArg {
    /// `None` for `Error`, which is a status rather than a category.
    pub fn category(self) -> Option<Category> {
        match self {
            CategoryArg::Available => Some(Category::Available),
            CategoryArg::Valid => Some(Category::Valid),
            CategoryArg::Expired => Some(Category::Expired),
            CategoryArg::Claimed => Some(Category::Claimed),
            CategoryArg::Invalid => Some(Category::Invalid),
            CategoryArg::Unknown => Some(Category::Unknown),
            CategoryArg::Error => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Order the results arrived in
    Submitted,
    Time,
    Category,
    Price,
    Link,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Submitted => SortKey::Submitted,
            SortArg::Time => SortKey::Timestamp,
            SortArg::Category => SortKey::Category,
            SortArg::Price => SortKey::Price,
            SortArg::Link => SortKey::Link,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "giftcheck")]
#[command(about = "Check gift and VIP invite links in bulk", long_about = None)]
pub struct Args {
    /// Newline-separated links; `-` reads stdin. Omit to only report the saved session
    pub input: Option<PathBuf>,

    /// RON config file (defaults to ./giftcheck.ron when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the analysis service
    #[arg(long)]
    pub server: Option<String>,

    /// Links classified concurrently
    #[arg(long)]
    pub workers: Option<usize>,

    /// Links per remote batch request (remote mode only)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Directory for the session file and exports
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Skip the service and simulate every classification
    #[arg(long)]
    pub offline: bool,

    /// Seed for simulated classifications
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where log output goes
    #[arg(long, value_enum)]
    pub log: Option<LogArg>,

    /// Result page to print (1-based)
    #[arg(long, default_value = "1")]
    pub page: usize,

    /// Results per page
    #[arg(long)]
    pub page_size: Option<usize>,

    #[arg(long, value_enum, default_value = "submitted")]
    pub sort: SortArg,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Only print results in these categories
    #[arg(long, value_enum, num_args = 1..)]
    pub only: Vec<CategoryArg>,

    /// Write claimable links to this file in the output directory
    #[arg(long)]
    pub export_available: Option<String>,

    /// Write all other links to this file in the output directory
    #[arg(long)]
    pub export_unavailable: Option<String>,

    /// Write every checked link to this file in the output directory
    #[arg(long)]
    pub export_all: Option<String>,

    /// Write full results as JSON to this file in the output directory
    #[arg(long)]
    pub export_json: Option<String>,

    /// Write settings, links and results as a JSON backup to this file
    #[arg(long)]
    pub backup: Option<String>,

    /// Drop the saved result for these links so the next run checks them again
    #[arg(long, value_parser = parse_link, num_args = 1..)]
    pub remove: Vec<Link>,

    /// Forget the saved session before doing anything else
    #[arg(long)]
    pub clear: bool,
}

fn parse_link(raw: &str) -> Result<Link, String> {
    Link::parse(raw).ok_or_else(|| format!("not a supported gift or invite link: {raw}"))
}
