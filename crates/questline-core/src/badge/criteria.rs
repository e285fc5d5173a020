//! Unlock criteria.

use crate::metrics::{MetricKey, UserMetrics};
use serde::Serialize;

/// A typed unlock predicate.
///
/// `Composite` is a logical AND; there is no OR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Criteria {
    Count { metric: MetricKey, threshold: u64 },
    Streak { metric: MetricKey, threshold: u64 },
    Level { metric: MetricKey, threshold: u64 },
    /// Lower is better: satisfied by a recorded value at or under the threshold.
    Time { metric: MetricKey, threshold: u64 },
    Composite { conditions: &'static [Criteria] },
}

impl Criteria {
    /// Evaluate against a metrics snapshot.
    #[must_use]
    pub fn is_satisfied(&self, metrics: &UserMetrics) -> bool {
        match self {
            Criteria::Count { metric, threshold }
            | Criteria::Streak { metric, threshold }
            | Criteria::Level { metric, threshold } => metrics.value(*metric) >= *threshold,
            Criteria::Time { metric, threshold } => {
                let value = metrics.value(*metric);
                value > 0 && value <= *threshold
            }
            Criteria::Composite { conditions } => conditions.iter().all(|c| c.is_satisfied(metrics)),
        }
    }

    /// Every metric this criteria reads, including nested conditions.
    #[must_use]
    pub fn metrics(&self) -> Vec<MetricKey> {
        let mut keys = Vec::new();
        self.collect_metrics(&mut keys);
        keys
    }

    fn collect_metrics(&self, keys: &mut Vec<MetricKey>) {
        match self {
            Criteria::Count { metric, .. }
            | Criteria::Streak { metric, .. }
            | Criteria::Level { metric, .. }
            | Criteria::Time { metric, .. } => {
                if !keys.contains(metric) {
                    keys.push(*metric);
                }
            }
            Criteria::Composite { conditions } => {
                for condition in *conditions {
                    condition.collect_metrics(keys);
                }
            }
        }
    }

    /// `(current, target, percent)` toward satisfying this criteria.
    ///
    /// Composite progress counts satisfied conditions. Time progress is
    /// inverted so that a faster time reads as more progress.
    #[must_use]
    pub fn progress(&self, metrics: &UserMetrics) -> (u64, u64, u8) {
        match self {
            Criteria::Count { metric, threshold }
            | Criteria::Streak { metric, threshold }
            | Criteria::Level { metric, threshold } => {
                let current = metrics.value(*metric);
                (current, *threshold, rounded_percent(current, *threshold))
            }
            Criteria::Time { metric, threshold } => {
                let current = metrics.value(*metric);
                let percent = if current == 0 {
                    0
                } else {
                    rounded_percent(*threshold, current)
                };
                (current, *threshold, percent)
            }
            Criteria::Composite { conditions } => {
                let satisfied = conditions.iter().filter(|c| c.is_satisfied(metrics)).count() as u64;
                let total = conditions.len() as u64;
                (satisfied, total, rounded_percent(satisfied, total))
            }
        }
    }
}

/// `min(100, round(numerator * 100 / denominator))`; a zero denominator is complete.
fn rounded_percent(numerator: u64, denominator: u64) -> u8 {
    if denominator == 0 {
        return 100;
    }
    let scaled = numerator.saturating_mul(100).saturating_add(denominator / 2) / denominator;
    scaled.min(100) as u8
}
