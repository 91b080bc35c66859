//! Filtering, ordering, paging and export selection over result collections.
use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Category, ClassificationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrivilegeFilter {
    #[default]
    Any,
    Privileged,
    Ordinary,
}

/// Which results are shown.
///
/// `categories` applies to successful results only (empty means all);
/// error results are controlled by `include_errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    pub categories: BTreeSet<Category>,
    pub include_errors: bool,
    pub privilege: PrivilegeFilter,
    /// Case-insensitive substring over the link and status text.
    pub search: Option<String>,
}

impl Default for ResultFilter {
    fn default() -> Self {
        Self {
            categories: BTreeSet::new(),
            include_errors: true,
            privilege: PrivilegeFilter::Any,
            search: None,
        }
    }
}

impl ResultFilter {
    pub fn only(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            categories: categories.into_iter().collect(),
            include_errors: false,
            ..Self::default()
        }
    }

    pub fn matches(&self, result: &ClassificationResult) -> bool {
        let privilege_ok = match self.privilege {
            PrivilegeFilter::Any => true,
            PrivilegeFilter::Privileged => result.privileged,
            PrivilegeFilter::Ordinary => !result.privileged,
        };
        if !privilege_ok {
            return false;
        }

        let status_ok = if result.is_success() {
            self.categories.is_empty() || self.categories.contains(&result.category)
        } else {
            self.include_errors
        };
        if !status_ok {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                result.link.as_str().to_lowercase().contains(&needle)
                    || result.status_text().to_lowercase().contains(&needle)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    /// Arrival order.
    #[default]
    Submitted,
    Timestamp,
    Category,
    Price,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

/// Stable sort; ties keep arrival order regardless of direction.
pub fn sort_results(rows: &mut [&ClassificationResult], sort: SortSpec) {
    let compare = |a: &&ClassificationResult, b: &&ClassificationResult| -> Ordering {
        match sort.key {
            SortKey::Submitted => Ordering::Equal,
            SortKey::Timestamp => a.timestamp_ms.cmp(&b.timestamp_ms),
            SortKey::Category => a.category.cmp(&b.category),
            SortKey::Price => price_of(a).total_cmp(&price_of(b)),
            SortKey::Link => a.link.cmp(&b.link),
        }
    };

    match (sort.key, sort.order) {
        (SortKey::Submitted, SortOrder::Ascending) => {}
        (SortKey::Submitted, SortOrder::Descending) => rows.reverse(),
        (_, SortOrder::Ascending) => rows.sort_by(compare),
        (_, SortOrder::Descending) => rows.sort_by(|a, b| compare(b, a)),
    }
}

fn price_of(result: &ClassificationResult) -> f64 {
    result.attributes.price.unwrap_or(f64::NEG_INFINITY)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, clamped to `1..=total_pages`.
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Slices `rows` into pages of `page_size` (minimum 1) and returns `page`.
///
/// Out-of-range pages clamp to the nearest valid page; an empty input has a
/// single empty page.
pub fn paginate<T: Clone>(rows: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = rows.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);
    let items = rows.get(start..end).map(<[T]>::to_vec).unwrap_or_default();

    Page {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportSelection {
    /// Successful and still claimable.
    Available,
    /// Everything else, including error results.
    Unavailable,
    /// Every link that has a result.
    All,
}

pub fn select_links<'a>(
    results: impl IntoIterator<Item = &'a ClassificationResult>,
    selection: ExportSelection,
) -> Vec<String> {
    results
        .into_iter()
        .filter(|result| match selection {
            ExportSelection::Available => result.is_claimable(),
            ExportSelection::Unavailable => !result.is_claimable(),
            ExportSelection::All => true,
        })
        .map(|result| result.link.to_string())
        .collect()
}
