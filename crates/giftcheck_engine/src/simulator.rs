//! Offline stand-in for the analysis service.
//!
//! Produces plausible, randomised classifications with a per-call delay so
//! the rest of the system behaves as it would against the real service.
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use giftcheck_core::{AnalysisMode, Attributes, Category, ClassificationResult, Link};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::classifier::Classifier;
use crate::clock::{format_expiry, now_ms};
use crate::{RemoteError, SimulatorSettings};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Gift products an ordinary link may carry, with their price.
const GIFT_CATALOG: [(&str, f64); 3] = [
    ("VIP monthly card", 15.0),
    ("VIP annual card", 98.0),
    ("Music package monthly card", 12.0),
];

pub struct Simulator {
    rng: Mutex<StdRng>,
    settings: SimulatorSettings,
}

impl Simulator {
    pub fn new(settings: SimulatorSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            settings,
        }
    }

    pub fn with_seed(seed: u64, settings: SimulatorSettings) -> Self {
        Self::new(SimulatorSettings {
            seed: Some(seed),
            ..settings
        })
    }

    /// Classifies one link after a random delay. Never fails.
    pub async fn classify_link(&self, link: &Link) -> ClassificationResult {
        let delay = self.draw_latency();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut rng = self.lock_rng();
        draw_result(&mut *rng, link, now_ms())
    }

    fn draw_latency(&self) -> Duration {
        let SimulatorSettings {
            min_latency,
            max_latency,
            ..
        } = self.settings;
        if max_latency <= min_latency {
            return min_latency;
        }
        self.lock_rng().gen_range(min_latency..max_latency)
    }

    fn lock_rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl Classifier for Simulator {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Simulated
    }

    async fn classify(&self, link: &Link) -> Result<ClassificationResult, RemoteError> {
        Ok(self.classify_link(link).await)
    }
}

/// Draws a classification for `link` at time `now_ms`.
///
/// VIP invite links only ever get `valid` or `expired`; ordinary links get
/// `available`, `expired`, `claimed` or `invalid`. The status is always success.
pub fn draw_result<R: Rng + ?Sized>(rng: &mut R, link: &Link, now_ms: i64) -> ClassificationResult {
    if link.is_privileged() {
        draw_privileged(rng, link, now_ms)
    } else {
        draw_ordinary(rng, link, now_ms)
    }
}

fn draw_privileged<R: Rng + ?Sized>(rng: &mut R, link: &Link, now_ms: i64) -> ClassificationResult {
    let valid = rng.gen::<f64>() > 0.3;
    let (category, expire_time_ms, remaining_days, status_text) = if valid {
        (
            Category::Valid,
            now_ms + rng.gen_range(1..=30 * DAY_MS),
            rng.gen_range(0..30),
            "VIP valid",
        )
    } else {
        (
            Category::Expired,
            now_ms - rng.gen_range(1..=30 * DAY_MS),
            0,
            "VIP expired",
        )
    };

    ClassificationResult::success(link, category, now_ms).with_attributes(Attributes {
        status_text: Some(status_text.to_string()),
        gift_type: Some("VIP invite".to_string()),
        expire_time_ms: Some(expire_time_ms),
        expire_date: format_expiry(expire_time_ms),
        remaining_days: Some(remaining_days),
        ..Attributes::default()
    })
}

fn draw_ordinary<R: Rng + ?Sized>(rng: &mut R, link: &Link, now_ms: i64) -> ClassificationResult {
    let roll = rng.gen::<f64>();
    let mut attributes = Attributes::default();

    let category = if roll > 0.7 {
        let available = rng.gen_range(1..=5);
        let total = available + rng.gen_range(0..=2);
        attributes.available_count = Some(available);
        attributes.total_count = Some(total);
        attributes.used_count = Some(total - available);
        attributes.status_text = Some(format!("claimable ({available}/{total})"));
        Category::Available
    } else if roll > 0.4 {
        let expired_at = now_ms - rng.gen_range(1..=30 * DAY_MS);
        attributes.expire_time_ms = Some(expired_at);
        attributes.expire_date = format_expiry(expired_at);
        attributes.status_text = Some("expired".to_string());
        Category::Expired
    } else if roll > 0.2 {
        let total = rng.gen_range(1..=10);
        attributes.total_count = Some(total);
        attributes.used_count = Some(total);
        attributes.available_count = Some(0);
        attributes.status_text = Some("fully claimed".to_string());
        Category::Claimed
    } else {
        attributes.status_text = Some("link invalid".to_string());
        Category::Invalid
    };

    let (gift_type, price) = GIFT_CATALOG[rng.gen_range(0..GIFT_CATALOG.len())];
    attributes.gift_type = Some(gift_type.to_string());
    attributes.price = Some(price);
    attributes.sender_name = Some(format!("user{}", rng.gen_range(0..1000)));

    ClassificationResult::success(link, category, now_ms).with_attributes(attributes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use giftcheck_core::ResultStatus;

    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn link(raw: &str) -> Link {
        Link::parse(raw).unwrap()
    }

    #[test]
    fn privileged_links_stay_in_privileged_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let invite = link("https://y.music.163.com/m/vip-invite-cashier?token=1");
        for _ in 0..500 {
            let result = draw_result(&mut rng, &invite, NOW);
            assert!(result.privileged);
            assert!(Category::PRIVILEGED.contains(&result.category));
            let expiry = result.attributes.expire_time_ms.unwrap();
            match result.category {
                Category::Valid => assert!(expiry > NOW),
                _ => {
                    assert!(expiry < NOW);
                    assert_eq!(result.attributes.remaining_days, Some(0));
                }
            }
        }
    }

    #[test]
    fn ordinary_distribution_covers_all_categories() {
        let mut rng = StdRng::seed_from_u64(11);
        let gift = link("http://163cn.tv/abc");
        let mut seen: HashMap<Category, usize> = HashMap::new();
        for _ in 0..2_000 {
            let result = draw_result(&mut rng, &gift, NOW);
            assert_eq!(result.status, ResultStatus::Success);
            assert!(!result.privileged);
            assert!(Category::ORDINARY.contains(&result.category));
            *seen.entry(result.category).or_insert(0) += 1;
        }
        // Expected shares: 30% available, 30% expired, 20% claimed, 20% invalid.
        for (category, low, high) in [
            (Category::Available, 450, 750),
            (Category::Expired, 450, 750),
            (Category::Claimed, 250, 550),
            (Category::Invalid, 250, 550),
        ] {
            let count = seen.get(&category).copied().unwrap_or(0);
            assert!(
                (low..=high).contains(&count),
                "{category}: {count} outside {low}..={high}"
            );
        }
    }

    #[test]
    fn ordinary_attributes_are_consistent_with_category() {
        let mut rng = StdRng::seed_from_u64(3);
        let gift = link("http://163cn.tv/xyz");
        for _ in 0..500 {
            let result = draw_result(&mut rng, &gift, NOW);
            let attrs = &result.attributes;
            assert!(attrs.price.is_some());
            match result.category {
                Category::Available => {
                    let available = attrs.available_count.unwrap();
                    let total = attrs.total_count.unwrap();
                    assert!((1..=5).contains(&available));
                    assert!(total >= available && total <= available + 2);
                    assert_eq!(attrs.used_count, Some(total - available));
                }
                Category::Expired => assert!(attrs.expire_time_ms.unwrap() < NOW),
                Category::Claimed => assert_eq!(attrs.used_count, attrs.total_count),
                Category::Invalid => assert!(attrs.total_count.is_none()),
                other => panic!("unexpected category {other}"),
            }
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let gift = link("http://163cn.tv/seed");
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            assert_eq!(draw_result(&mut a, &gift, NOW), draw_result(&mut b, &gift, NOW));
        }
    }

    #[tokio::test]
    async fn classify_waits_within_latency_bounds() {
        let settings = SimulatorSettings {
            min_latency: Duration::from_millis(20),
            max_latency: Duration::from_millis(40),
            seed: None,
        };
        let simulator = Simulator::with_seed(1, settings);
        let started = std::time::Instant::now();
        let result = simulator.classify(&link("http://163cn.tv/wait")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(result.link.as_str(), "http://163cn.tv/wait");
    }
}
