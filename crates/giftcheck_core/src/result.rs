use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Link;

/// Default number of concurrent lanes per batch.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Where the results of one batch come from. Fixed for the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Remote,
    Simulated,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Remote => write!(f, "remote"),
            AnalysisMode::Simulated => write!(f, "simulated"),
        }
    }
}

/// Caller-supplied knobs for one batch invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Upper bound on concurrent lanes; must be at least 1.
    pub concurrency_limit: usize,
    /// When set and the batch runs remotely, each lane sends its links in
    /// chunks of this size instead of one request per link.
    pub chunk_size: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY,
            chunk_size: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Error,
}

/// Classification tag of a link.
///
/// Ordinary links land in [`Category::ORDINARY`], VIP invite links in
/// [`Category::PRIVILEGED`]. `Unknown` only appears when the remote service
/// reports a tag this crate does not recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Available,
    Valid,
    Expired,
    Claimed,
    Invalid,
    Unknown,
}

impl Category {
    pub const ORDINARY: [Category; 4] = [
        Category::Available,
        Category::Expired,
        Category::Claimed,
        Category::Invalid,
    ];
    pub const PRIVILEGED: [Category; 2] = [Category::Valid, Category::Expired];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Available => "available",
            Category::Valid => "valid",
            Category::Expired => "expired",
            Category::Claimed => "claimed",
            Category::Invalid => "invalid",
            Category::Unknown => "unknown",
        }
    }

    /// Maps a wire tag to a category; unrecognised tags become `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "available" => Category::Available,
            "valid" => Category::Valid,
            "expired" => Category::Expired,
            "claimed" => Category::Claimed,
            "invalid" => Category::Invalid,
            _ => Category::Unknown,
        }
    }

    /// Whether a link in this category can still be redeemed.
    pub fn is_claimable(self) -> bool {
        matches!(self, Category::Available | Category::Valid)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category-specific details. Every field is optional; which ones are set
/// depends on the category and on the producer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_days: Option<u32>,
}

/// Outcome for one link. Produced once per link per batch and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub link: Link,
    pub status: ResultStatus,
    pub category: Category,
    pub privileged: bool,
    /// Creation time, Unix epoch milliseconds.
    pub timestamp_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl ClassificationResult {
    pub fn success(link: &Link, category: Category, timestamp_ms: i64) -> Self {
        Self {
            link: link.clone(),
            status: ResultStatus::Success,
            category,
            privileged: link.is_privileged(),
            timestamp_ms,
            message: None,
            attributes: Attributes::default(),
        }
    }

    /// An error record: the link could not be classified.
    pub fn error(link: &Link, message: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            link: link.clone(),
            status: ResultStatus::Error,
            category: Category::Invalid,
            privileged: link.is_privileged(),
            timestamp_ms,
            message: Some(message.into()),
            attributes: Attributes::default(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    pub fn is_claimable(&self) -> bool {
        self.is_success() && self.category.is_claimable()
    }

    /// Short human-readable description for listings.
    pub fn status_text(&self) -> String {
        if let Some(text) = &self.attributes.status_text {
            return text.clone();
        }
        match (&self.status, &self.message) {
            (ResultStatus::Error, Some(message)) => message.clone(),
            _ => self.category.to_string(),
        }
    }
}
