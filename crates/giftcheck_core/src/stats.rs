use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Category, ClassificationResult};

/// Running counts over a result collection.
///
/// Category counts, values and gift types only cover successful results;
/// `privileged` covers every result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    pub success: usize,
    pub errors: usize,
    pub available: usize,
    pub valid: usize,
    pub expired: usize,
    pub claimed: usize,
    pub invalid: usize,
    pub unknown: usize,
    pub privileged: usize,
    pub privileged_valid: usize,
    pub total_value: f64,
    pub available_value: f64,
    pub gift_types: BTreeMap<String, usize>,
}

impl Statistics {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ClassificationResult>) -> Self {
        let mut stats = Self::default();
        for result in results {
            stats.record(result);
        }
        stats
    }

    pub fn record(&mut self, result: &ClassificationResult) {
        self.total += 1;
        if result.privileged {
            self.privileged += 1;
        }
        if !result.is_success() {
            self.errors += 1;
            return;
        }

        self.success += 1;
        *self.category_slot(result.category) += 1;
        if result.privileged && result.category == Category::Valid {
            self.privileged_valid += 1;
        }

        let price = result.attributes.price.unwrap_or(0.0);
        self.total_value += price;
        if result.category.is_claimable() {
            self.available_value += price;
        }

        let gift_type = result
            .attributes
            .gift_type
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        *self.gift_types.entry(gift_type).or_insert(0) += 1;
    }

    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Available => self.available,
            Category::Valid => self.valid,
            Category::Expired => self.expired,
            Category::Claimed => self.claimed,
            Category::Invalid => self.invalid,
            Category::Unknown => self.unknown,
        }
    }

    /// Share of the total value that is still claimable, in percent.
    pub fn claimable_rate(&self) -> Option<f64> {
        if self.total_value > 0.0 {
            Some(self.available_value / self.total_value * 100.0)
        } else {
            None
        }
    }

    fn category_slot(&mut self, category: Category) -> &mut usize {
        match category {
            Category::Available => &mut self.available,
            Category::Valid => &mut self.valid,
            Category::Expired => &mut self.expired,
            Category::Claimed => &mut self.claimed,
            Category::Invalid => &mut self.invalid,
            Category::Unknown => &mut self.unknown,
        }
    }
}
