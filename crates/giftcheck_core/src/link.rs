use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Marker carried by VIP invite links.
const PRIVILEGED_MARKER: &str = "vip-invite-cashier";

/// Accepted link forms. New forms may be appended; existing ones must keep
/// matching what they matched before.
static ACCEPTED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Short redirect: http://163cn.tv/GBm6AHn
        r"^https?://163cn\.tv/[A-Za-z0-9_]+$",
        // VIP invite, anywhere in the line.
        r"vip-invite-cashier",
        // Long gift-receive page the short links redirect to.
        r"^https?://(?:[A-Za-z0-9-]+\.)*163\.com/\S*gift-receive\S*$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("accepted link pattern"))
    .collect()
});

/// A validated candidate link.
///
/// Only constructible through [`Link::parse`] (or deserialization, which
/// applies the same check), so every `Link` matches at least one accepted
/// pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Link(String);

/// Returned when a line matches none of the accepted link patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRejected(pub String);

impl fmt::Display for LinkRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not an accepted link: {:?}", self.0)
    }
}

impl std::error::Error for LinkRejected {}

impl Link {
    /// Trims `raw` and accepts it if it matches any accepted pattern.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !is_accepted(trimmed) {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// VIP invite links are classified into the privileged category set.
    pub fn is_privileged(&self) -> bool {
        is_privileged_link(&self.0)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Link {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Link {
    type Error = LinkRejected;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Link::parse(&value).ok_or(LinkRejected(value))
    }
}

impl From<Link> for String {
    fn from(link: Link) -> Self {
        link.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationSummary {
    /// Non-empty lines after trimming.
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

pub fn is_privileged_link(link: &str) -> bool {
    link.contains(PRIVILEGED_MARKER)
}

fn is_accepted(line: &str) -> bool {
    ACCEPTED_PATTERNS.iter().any(|pattern| pattern.is_match(line))
}

/// Splits raw input into lines and keeps the accepted links, in input order.
///
/// Rejected lines are dropped silently; use [`validation_summary`] to count them.
pub fn parse_links(raw: &str) -> Vec<Link> {
    raw.lines().filter_map(Link::parse).collect()
}

pub fn validation_summary(raw: &str) -> ValidationSummary {
    let mut summary = ValidationSummary::default();
    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        summary.total += 1;
        if is_accepted(line) {
            summary.valid += 1;
        }
    }
    summary.invalid = summary.total - summary.valid;
    summary
}

/// Removes repeated links, keeping the first occurrence of each.
pub fn dedupe_links(links: Vec<Link>) -> Vec<Link> {
    let mut seen = HashSet::with_capacity(links.len());
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_invite_forms_are_accepted() {
        assert!(Link::parse("http://163cn.tv/GBm6AHn").is_some());
        assert!(Link::parse("https://163cn.tv/abc_123").is_some());
        assert!(Link::parse("https://y.music.163.com/m/vip-invite-cashier?token=x").is_some());
        assert!(Link::parse(
            "https://music.163.com/prime/m/gift-receive?d=abc&p=1&userid=42"
        )
        .is_some());
    }

    #[test]
    fn near_misses_are_rejected() {
        assert!(Link::parse("http://163cn.tv/").is_none());
        assert!(Link::parse("http://163cn.tv/abc/def").is_none());
        assert!(Link::parse("ftp://163cn.tv/abc").is_none());
        assert!(Link::parse("http://example.com/abc").is_none());
        assert!(Link::parse("   ").is_none());
    }

    #[test]
    fn short_link_code_is_ascii_only() {
        assert!(Link::parse("http://163cn.tv/中文").is_none());
        assert!(Link::parse("http://163cn.tv/abcé").is_none());
        assert!(validation_summary("http://163cn.tv/中文\n").invalid == 1);
    }

    #[test]
    fn privileged_predicate_follows_invite_marker() {
        let invite = Link::parse("https://y.music.163.com/m/vip-invite-cashier?t=1").unwrap();
        let gift = Link::parse("http://163cn.tv/abc").unwrap();
        assert!(invite.is_privileged());
        assert!(!gift.is_privileged());
    }

    #[test]
    fn dedupe_keeps_first_occurrence_order() {
        let links = parse_links("http://163cn.tv/b\nhttp://163cn.tv/a\nhttp://163cn.tv/b\n");
        let deduped = dedupe_links(links);
        let as_str: Vec<_> = deduped.iter().map(Link::as_str).collect();
        assert_eq!(as_str, vec!["http://163cn.tv/b", "http://163cn.tv/a"]);
    }
}
