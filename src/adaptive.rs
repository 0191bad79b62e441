//! Schema-evolution governor: per-path grace-period tracking.
//!
//! Services legitimately grow new payload fields over time. Blocking every
//! unknown path forever produces false positives; whitelisting on sheer
//! repetition hands attackers a replay lever. The governor takes the middle
//! road: a new path must survive a grace period AND a minimum observation
//! count AND look statistically boring (frequent, low anomaly, low entropy)
//! before it is promoted into the allow set. Suppressed paths are policy
//! authority and are never rescued here.

use crate::event::Features;

use serde::{Deserialize, Serialize};

use std::collections::HashMap;

/// Promotion gate over the feature vector. Repetition alone can satisfy
/// `frequency_min`; the anomaly and entropy ceilings are what reject
/// spam-repeated synonym attacks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PromoteThreshold {
    pub frequency_min: f64,
    pub anomaly_max: f64,
    pub entropy_max: f64,
}

impl Default for PromoteThreshold {
    fn default() -> Self {
        Self {
            frequency_min: 0.02,
            anomaly_max: 0.3,
            entropy_max: 0.7,
        }
    }
}

/// Configuration for the adaptive layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AdaptiveConfig {
    /// Minimum milliseconds between a path's first sighting and promotion.
    pub grace_period_ms: u64,
    /// Minimum observation count before promotion.
    pub min_observations: u64,
    /// Cap on tracked `(service, path)` records; least-recently-seen records
    /// are evicted past this point.
    pub max_records: usize,
    pub promote_threshold: PromoteThreshold,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 60_000,
            min_observations: 10,
            max_records: 100_000,
            promote_threshold: PromoteThreshold::default(),
        }
    }
}

/// Lifecycle state of a tracked path. Suppressed is terminal; rescinding a
/// suppression is an operator action outside this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathState {
    Observing,
    Promoted,
    Suppressed,
}

/// Tracking record for one `(service, path)` pair.
#[derive(Debug, Clone)]
pub struct AdaptiveRecord {
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
    pub count: u64,
    pub state: PathState,
}

/// What the governor concluded for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveDecision {
    /// The path is promoted. `just_promoted` is true exactly once, on the
    /// observation that flipped the state; the caller applies the `allow`
    /// side effect to the store then.
    Allow { just_promoted: bool },
    /// The path is suppressed; no promotion path exists from here.
    Block,
    /// No verdict yet. `in_grace` is true while the grace window or the
    /// observation minimum is still unmet; false once the path has served
    /// its grace but failed the promotion gate. Callers treat in-grace
    /// paths conservatively.
    Observe { in_grace: bool },
}

/// The adaptive record table. Owned by the coordinator; all calls happen
/// under its write lock.
#[derive(Debug)]
pub struct AdaptiveLayer {
    config: AdaptiveConfig,
    records: HashMap<(String, String), AdaptiveRecord>,
}

impl AdaptiveLayer {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
        }
    }

    /// Process one observation of `(service, path)` at `now_ms`.
    pub fn observe(
        &mut self,
        service_id: &str,
        path: &str,
        features: &Features,
        now_ms: u64,
    ) -> AdaptiveDecision {
        let key = (service_id.to_owned(), path.to_owned());
        let record = self.records.entry(key).or_insert(AdaptiveRecord {
            first_seen_ms: now_ms,
            last_seen_ms: now_ms,
            count: 0,
            state: PathState::Observing,
        });
        record.count += 1;
        record.last_seen_ms = now_ms;

        let decision = match record.state {
            PathState::Suppressed => AdaptiveDecision::Block,
            PathState::Promoted => AdaptiveDecision::Allow {
                just_promoted: false,
            },
            PathState::Observing => {
                let in_grace = now_ms.saturating_sub(record.first_seen_ms)
                    < self.config.grace_period_ms
                    || record.count < self.config.min_observations;
                if in_grace {
                    AdaptiveDecision::Observe { in_grace: true }
                } else if Self::passes_gate(&self.config.promote_threshold, features) {
                    record.state = PathState::Promoted;
                    AdaptiveDecision::Allow {
                        just_promoted: true,
                    }
                } else {
                    AdaptiveDecision::Observe { in_grace: false }
                }
            }
        };

        self.evict_over_cap();
        decision
    }

    fn passes_gate(threshold: &PromoteThreshold, features: &Features) -> bool {
        features.frequency >= threshold.frequency_min
            && features.anomaly <= threshold.anomaly_max
            && features.entropy <= threshold.entropy_max
    }

    /// Pin a record to the terminal Suppressed state, creating it if the
    /// path was never observed. Called when the agent suppresses a path.
    pub fn mark_suppressed(&mut self, service_id: &str, path: &str, now_ms: u64) {
        let key = (service_id.to_owned(), path.to_owned());
        let record = self.records.entry(key).or_insert(AdaptiveRecord {
            first_seen_ms: now_ms,
            last_seen_ms: now_ms,
            count: 0,
            state: PathState::Observing,
        });
        record.last_seen_ms = now_ms;
        record.state = PathState::Suppressed;
        self.evict_over_cap();
    }

    /// Evict least-recently-seen records until the table is back under its
    /// cap. Eviction drops tracking state only: a Promoted record's store
    /// allow and a Suppressed record's store suppression both survive.
    fn evict_over_cap(&mut self) {
        while self.records.len() > self.config.max_records {
            let oldest = self
                .records
                .iter()
                .min_by_key(|(_, record)| record.last_seen_ms)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.records.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn record(&self, service_id: &str, path: &str) -> Option<&AdaptiveRecord> {
        self.records
            .get(&(service_id.to_owned(), path.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
