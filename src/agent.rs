//! Tabular Q-learning over discretized traffic features.
//!
//! The agent sees a 4-tuple of bucketed features (depth, anomaly, entropy,
//! frequency) and picks one of three actions. Selection is epsilon-greedy
//! with a linear epsilon decay; updates follow the standard one-step
//! Q-learning rule. The reward table is deliberately asymmetric: a missed
//! attack costs 2.5x a false block, a risk preference that belongs to the
//! operator and must not be rebalanced silently.

use crate::event::{Features, TrafficLabel};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

/// Discretized feature tuple used as the Q-table key.
///
/// Buckets are half-open `[k/B, (k+1)/B)` with the final bucket closed at
/// 1.0, so keys are stable across implementations. Depth is clamped into
/// the bucket range directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentState {
    pub depth: u8,
    pub anomaly: u8,
    pub entropy: u8,
    pub frequency: u8,
}

/// The agent's action vocabulary. Ordering matters: Q-value ties resolve to
/// the earliest variant (Allow < Observe < Suppress).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AgentAction {
    Allow,
    Observe,
    Suppress,
}

impl AgentAction {
    pub const ALL: [AgentAction; 3] = [
        AgentAction::Allow,
        AgentAction::Observe,
        AgentAction::Suppress,
    ];

    fn index(self) -> usize {
        match self {
            AgentAction::Allow => 0,
            AgentAction::Observe => 1,
            AgentAction::Suppress => 2,
        }
    }

    /// Whether this action blocks traffic. Observe does not block, so an
    /// observed attack still counts as a miss.
    pub fn blocks(self) -> bool {
        matches!(self, AgentAction::Suppress)
    }
}

/// Outcome rewards, keyed on whether the action blocked and what the
/// traffic actually was.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RewardTable {
    pub true_negative: f64,
    pub true_positive: f64,
    pub false_positive: f64,
    pub false_negative: f64,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            true_negative: 1.0,
            true_positive: 1.0,
            false_positive: -2.0,
            false_negative: -5.0,
        }
    }
}

impl RewardTable {
    pub fn reward(&self, action: AgentAction, label: TrafficLabel) -> f64 {
        match (action.blocks(), label) {
            (true, TrafficLabel::Malicious) => self.true_positive,
            (true, TrafficLabel::Benign) => self.false_positive,
            (false, TrafficLabel::Benign) => self.true_negative,
            (false, TrafficLabel::Malicious) => self.false_negative,
        }
    }
}

/// Agent hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AgentConfig {
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon_start: f64,
    pub epsilon_end: f64,
    pub epsilon_decay_episodes: u64,
    pub feature_buckets: u8,
    pub reward: RewardTable,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            epsilon_start: 0.3,
            epsilon_end: 0.01,
            epsilon_decay_episodes: 1_000,
            feature_buckets: 4,
            reward: RewardTable::default(),
        }
    }
}

/// The decision agent. Owned by the coordinator; every call happens under
/// its write lock.
#[derive(Debug)]
pub struct Agent {
    config: AgentConfig,
    q_table: HashMap<AgentState, [f64; 3]>,
    episodes: u64,
    rng: StdRng,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic construction for tests and reproducible training runs.
    pub fn with_seed(config: AgentConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: AgentConfig, rng: StdRng) -> Self {
        Self {
            config,
            q_table: HashMap::new(),
            episodes: 0,
            rng,
        }
    }

    /// Map raw features into the discretized Q-table key.
    pub fn discretize(&self, depth: u32, features: &Features) -> AgentState {
        let buckets = self.config.feature_buckets.max(1);
        AgentState {
            depth: depth.min(u32::from(buckets - 1)) as u8,
            anomaly: bucket(features.anomaly, buckets),
            entropy: bucket(features.entropy, buckets),
            frequency: bucket(features.frequency, buckets),
        }
    }

    /// Current exploration rate: linear from `epsilon_start` to
    /// `epsilon_end` across `epsilon_decay_episodes`, then held.
    pub fn epsilon(&self) -> f64 {
        let config = &self.config;
        if config.epsilon_decay_episodes == 0 {
            return config.epsilon_end;
        }
        let progress = self.episodes.min(config.epsilon_decay_episodes) as f64
            / config.epsilon_decay_episodes as f64;
        config.epsilon_start + (config.epsilon_end - config.epsilon_start) * progress
    }

    /// Epsilon-greedy action selection. Advances the episode counter.
    ///
    /// A Q-row containing non-finite values means the table is corrupt for
    /// this state; the agent degrades to Observe and logs rather than act
    /// on garbage.
    pub fn select_action(&mut self, state: AgentState) -> AgentAction {
        let epsilon = self.epsilon();
        self.episodes += 1;

        let row = self.q_table.get(&state).copied().unwrap_or_default();
        if row.iter().any(|q| !q.is_finite()) {
            tracing::warn!(?state, "non-finite Q values, degrading to observe");
            return AgentAction::Observe;
        }

        if self.rng.gen::<f64>() < epsilon {
            return AgentAction::ALL[self.rng.gen_range(0..AgentAction::ALL.len())];
        }
        greedy(&row)
    }

    /// The greedy action for `state` without exploration or episode
    /// advance. `None` when the row is corrupt.
    pub fn greedy_action(&self, state: AgentState) -> Option<AgentAction> {
        let row = self.q_table.get(&state).copied().unwrap_or_default();
        if row.iter().any(|q| !q.is_finite()) {
            tracing::warn!(?state, "non-finite Q values, skipping greedy action");
            return None;
        }
        Some(greedy(&row))
    }

    /// One-step Q-learning update:
    /// `Q[s][a] <- (1 - alpha) * Q[s][a] + alpha * (r + gamma * max Q[s'])`.
    pub fn update(
        &mut self,
        state: AgentState,
        action: AgentAction,
        reward: f64,
        next_state: AgentState,
    ) {
        if !reward.is_finite() {
            tracing::warn!(?state, reward, "non-finite reward dropped");
            return;
        }
        let next_max = self
            .q_table
            .get(&next_state)
            .map(|row| row.iter().fold(f64::NEG_INFINITY, |acc, q| acc.max(*q)))
            .unwrap_or(0.0);
        let alpha = self.config.alpha;
        let gamma = self.config.gamma;
        let row = self.q_table.entry(state).or_default();
        let q = &mut row[action.index()];
        *q = (1.0 - alpha) * *q + alpha * (reward + gamma * next_max);
    }

    /// Train on an outcome whose label arrived from elsewhere (the adaptive
    /// layer's definitive decisions). The agent did not act, so the update
    /// applies to the action it would have taken greedily.
    pub fn reinforce(&mut self, state: AgentState, label: TrafficLabel) {
        let Some(action) = self.greedy_action(state) else {
            return;
        };
        let reward = self.config.reward.reward(action, label);
        self.update(state, action, reward, state);
    }

    pub fn reward_for(&self, action: AgentAction, label: TrafficLabel) -> f64 {
        self.config.reward.reward(action, label)
    }

    pub fn q_value(&self, state: AgentState, action: AgentAction) -> f64 {
        self.q_table
            .get(&state)
            .map(|row| row[action.index()])
            .unwrap_or(0.0)
    }

    /// Overwrite a single Q entry. Exists for tests and operator tooling;
    /// the engine itself only writes through `update`.
    pub fn set_q(&mut self, state: AgentState, action: AgentAction, value: f64) {
        self.q_table.entry(state).or_default()[action.index()] = value;
    }

    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn state_count(&self) -> usize {
        self.q_table.len()
    }
}

fn bucket(value: f64, buckets: u8) -> u8 {
    let clamped = value.clamp(0.0, 1.0);
    let index = (clamped * f64::from(buckets)).floor() as u8;
    index.min(buckets - 1)
}

fn greedy(row: &[f64; 3]) -> AgentAction {
    let mut best = AgentAction::Allow;
    for action in AgentAction::ALL {
        if row[action.index()] > row[best.index()] {
            best = action;
        }
    }
    best
}
