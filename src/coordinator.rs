//! The single-writer engine core.
//!
//! The coordinator owns every piece of mutable state: the per-service
//! policy stores, the adaptive record table, and the Q-table. All mutating
//! calls serialize through one lock; readers never take it. Each successful
//! store mutation recompiles the affected service and republishes the
//! snapshot map through an `ArcSwap`, so data-plane readers grab the
//! current snapshot with a single atomic load.
//!
//! Mutations are staged on a clone of the store and committed only after
//! the compiler accepts the result. A compile failure (snapshot over its
//! size ceiling) therefore leaves both the store and the published
//! snapshot exactly as they were.

use crate::adaptive::{AdaptiveDecision, AdaptiveLayer, PathState};
use crate::agent::{Agent, AgentAction};
use crate::config::EngineConfig;
use crate::event::{Event, TrafficLabel};
use crate::policy::{
    compile, decode_store, encode_store, Access, FieldPath, FlatSnapshot, PolicyError, PolicyStore,
};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::sync::Arc;

/// The verdict handed back to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Allow,
    Block,
    Observe,
}

/// Result of one `on_detect` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectOutcome {
    pub decision: Decision,
    pub snapshot_version: u64,
}

struct ServiceEntry {
    store: PolicyStore,
    version: u64,
}

struct EngineState {
    services: HashMap<String, ServiceEntry>,
    adaptive: AdaptiveLayer,
    agent: Agent,
}

/// Owner of all write access to the policy engine.
pub struct Coordinator {
    config: EngineConfig,
    state: Mutex<EngineState>,
    snapshots: ArcSwap<HashMap<String, Arc<FlatSnapshot>>>,
}

impl Coordinator {
    pub fn new(config: EngineConfig) -> Self {
        let agent = Agent::new(config.agent.clone());
        Self::with_agent(config, agent)
    }

    /// Deterministic construction for tests and reproducible runs.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        let agent = Agent::with_seed(config.agent.clone(), seed);
        Self::with_agent(config, agent)
    }

    fn with_agent(config: EngineConfig, agent: Agent) -> Self {
        let adaptive = AdaptiveLayer::new(config.adaptive.clone());
        Self {
            config,
            state: Mutex::new(EngineState {
                services: HashMap::new(),
                adaptive,
                agent,
            }),
            snapshots: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn parse_path(&self, raw: &str) -> Result<FieldPath, PolicyError> {
        Ok(FieldPath::parse(raw, &self.config.path)?)
    }

    // -----------------------------------------------------------------------
    // Detection
    // -----------------------------------------------------------------------

    /// Process a detection event against the wall clock.
    pub fn on_detect(&self, event: &Event) -> Result<DetectOutcome, PolicyError> {
        self.on_detect_at(event, now_ms())
    }

    /// Process a detection event at an explicit timestamp.
    ///
    /// The adaptive layer speaks first. A definitive Allow/Block
    /// short-circuits the agent but still trains it on the implied label,
    /// so stable policy is not unlearned. Otherwise the agent picks an
    /// action and the action mutates the store; an agent Allow for a path
    /// still inside its adaptive grace window is advisory only (the store
    /// is untouched and the caller sees Observe), while Suppress always
    /// takes effect.
    ///
    /// Malformed paths fail before any state is touched.
    pub fn on_detect_at(&self, event: &Event, now_ms: u64) -> Result<DetectOutcome, PolicyError> {
        let path = self.parse_path(&event.path)?;
        let depth = event.features.depth.unwrap_or(path.depth() as u32);

        let mut state = self.state.lock();
        self.ensure_service(&mut state, &event.service_id);

        let adaptive_decision =
            state
                .adaptive
                .observe(&event.service_id, &event.path, &event.features, now_ms);
        let agent_state = state.agent.discretize(depth, &event.features);

        let decision = match adaptive_decision {
            AdaptiveDecision::Block => {
                state.agent.reinforce(agent_state, TrafficLabel::Malicious);
                Decision::Block
            }
            AdaptiveDecision::Allow { just_promoted } => {
                if just_promoted {
                    tracing::info!(
                        service = %event.service_id,
                        path = %event.path,
                        "path promoted into allow set"
                    );
                    self.commit(&mut state, &event.service_id, |store| store.allow(&path))?;
                }
                state.agent.reinforce(agent_state, TrafficLabel::Benign);
                Decision::Allow
            }
            AdaptiveDecision::Observe { in_grace } => {
                let action = state.agent.select_action(agent_state);
                match action {
                    AgentAction::Allow if !in_grace => {
                        self.commit(&mut state, &event.service_id, |store| store.allow(&path))?;
                    }
                    AgentAction::Allow => {
                        // Advisory only: unknown paths are not allow-listed
                        // before they have served their grace period.
                        tracing::debug!(
                            service = %event.service_id,
                            path = %event.path,
                            "agent allow gated by grace period"
                        );
                    }
                    AgentAction::Suppress => {
                        tracing::info!(
                            service = %event.service_id,
                            path = %event.path,
                            "agent suppressed path"
                        );
                        self.commit(&mut state, &event.service_id, |store| store.suppress(&path))?;
                        state
                            .adaptive
                            .mark_suppressed(&event.service_id, &event.path, now_ms);
                    }
                    AgentAction::Observe => {}
                }

                if let Some(label) = event.label {
                    let reward = state.agent.reward_for(action, label);
                    state.agent.update(agent_state, action, reward, agent_state);
                }

                match action {
                    AgentAction::Allow if !in_grace => Decision::Allow,
                    AgentAction::Allow => Decision::Observe,
                    AgentAction::Suppress => Decision::Block,
                    AgentAction::Observe => Decision::Observe,
                }
            }
        };

        Ok(DetectOutcome {
            decision,
            snapshot_version: self.published_version(&event.service_id),
        })
    }

    // -----------------------------------------------------------------------
    // Explicit policy writes
    // -----------------------------------------------------------------------

    /// Operator allow. Returns the published snapshot version.
    pub fn allow(&self, service_id: &str, raw_path: &str) -> Result<u64, PolicyError> {
        let path = self.parse_path(raw_path)?;
        let mut state = self.state.lock();
        self.ensure_service(&mut state, service_id);
        self.commit(&mut state, service_id, |store| store.allow(&path))?;
        Ok(self.published_version(service_id))
    }

    /// Operator suppress. Also pins the adaptive record so the path can
    /// never promote back.
    pub fn suppress(&self, service_id: &str, raw_path: &str) -> Result<u64, PolicyError> {
        let path = self.parse_path(raw_path)?;
        let mut state = self.state.lock();
        self.ensure_service(&mut state, service_id);
        self.commit(&mut state, service_id, |store| store.suppress(&path))?;
        state.adaptive.mark_suppressed(service_id, raw_path, now_ms());
        Ok(self.published_version(service_id))
    }

    /// Copy suppressions from one service's store into another's, limited
    /// to paths accepted by `filter`. The target service is created when it
    /// does not exist yet.
    pub fn transduce<F>(
        &self,
        source_service: &str,
        target_service: &str,
        filter: F,
    ) -> Result<u64, PolicyError>
    where
        F: FnMut(&str) -> bool,
    {
        let mut state = self.state.lock();
        let source_store = state
            .services
            .get(source_service)
            .ok_or_else(|| PolicyError::UnknownService(source_service.to_owned()))?
            .store
            .clone();
        self.ensure_service(&mut state, target_service);
        self.commit(&mut state, target_service, |store| {
            store.transduce_from(&source_store, filter)
        })?;
        tracing::info!(
            source = %source_service,
            target = %target_service,
            "suppressions transduced"
        );
        Ok(self.published_version(target_service))
    }

    // -----------------------------------------------------------------------
    // Snapshots and serialization
    // -----------------------------------------------------------------------

    /// The currently published snapshot for a service. Lock-free.
    pub fn snapshot(&self, service_id: &str) -> Result<Arc<FlatSnapshot>, PolicyError> {
        self.snapshots
            .load()
            .get(service_id)
            .cloned()
            .ok_or_else(|| PolicyError::UnknownService(service_id.to_owned()))
    }

    /// Every service with a published snapshot.
    pub fn services(&self) -> Vec<String> {
        let mut services: Vec<String> = self.snapshots.load().keys().cloned().collect();
        services.sort_unstable();
        services
    }

    /// Serialize a service's store into the interchange format.
    pub fn export(&self, service_id: &str) -> Result<Vec<u8>, PolicyError> {
        let state = self.state.lock();
        let entry = state
            .services
            .get(service_id)
            .ok_or_else(|| PolicyError::UnknownService(service_id.to_owned()))?;
        Ok(encode_store(&entry.store))
    }

    /// Replace a service's store from exported bytes and republish. A
    /// malformed payload fails without side effects.
    pub fn reload(&self, service_id: &str, bytes: &[u8]) -> Result<u64, PolicyError> {
        let store = decode_store(bytes)?;
        let mut state = self.state.lock();
        self.ensure_service(&mut state, service_id);
        self.commit(&mut state, service_id, |current| *current = store)?;
        tracing::info!(service = %service_id, "store reloaded from snapshot");
        Ok(self.published_version(service_id))
    }

    /// Check a path directly against a service's store.
    pub fn check(&self, service_id: &str, raw_path: &str) -> Result<Access, PolicyError> {
        let path = self.parse_path(raw_path)?;
        let state = self.state.lock();
        let entry = state
            .services
            .get(service_id)
            .ok_or_else(|| PolicyError::UnknownService(service_id.to_owned()))?;
        Ok(entry.store.check(&path))
    }

    /// Adaptive lifecycle state for a `(service, path)` pair, if tracked.
    pub fn adaptive_state(&self, service_id: &str, path: &str) -> Option<PathState> {
        let state = self.state.lock();
        state
            .adaptive
            .record(service_id, path)
            .map(|record| record.state)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_service(&self, state: &mut EngineState, service_id: &str) {
        if !state.services.contains_key(service_id) {
            state.services.insert(
                service_id.to_owned(),
                ServiceEntry {
                    store: PolicyStore::new(),
                    version: 1,
                },
            );
            self.publish(service_id, FlatSnapshot::empty(service_id, 1));
            tracing::debug!(service = %service_id, "service registered");
        }
    }

    /// Stage a mutation on a clone of the store, compile it, and commit
    /// both store and snapshot only if compilation succeeds.
    fn commit<F>(
        &self,
        state: &mut EngineState,
        service_id: &str,
        mutate: F,
    ) -> Result<(), PolicyError>
    where
        F: FnOnce(&mut PolicyStore),
    {
        let entry = state
            .services
            .get_mut(service_id)
            .ok_or_else(|| PolicyError::UnknownService(service_id.to_owned()))?;
        let mut staged = entry.store.clone();
        mutate(&mut staged);

        let next_version = entry.version + 1;
        let snapshot = compile(
            &staged,
            service_id,
            next_version,
            self.config.max_snapshot_paths,
        )?;

        entry.store = staged;
        entry.version = next_version;
        self.publish(service_id, snapshot);
        Ok(())
    }

    fn publish(&self, service_id: &str, snapshot: FlatSnapshot) {
        let current = self.snapshots.load();
        let mut next = (**current).clone();
        next.insert(service_id.to_owned(), Arc::new(snapshot));
        self.snapshots.store(Arc::new(next));
    }

    fn published_version(&self, service_id: &str) -> u64 {
        self.snapshots
            .load()
            .get(service_id)
            .map(|snapshot| snapshot.version())
            .unwrap_or(0)
    }
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::{AdaptiveConfig, PromoteThreshold};
    use crate::agent::AgentConfig;
    use crate::event::Features;

    /// Fast grace settings and a non-exploring agent, so every test is
    /// deterministic.
    fn test_config() -> EngineConfig {
        EngineConfig {
            adaptive: AdaptiveConfig {
                grace_period_ms: 1_000,
                min_observations: 3,
                max_records: 100_000,
                promote_threshold: PromoteThreshold {
                    frequency_min: 0.01,
                    anomaly_max: 0.5,
                    entropy_max: 0.8,
                },
            },
            agent: AgentConfig {
                epsilon_start: 0.0,
                epsilon_end: 0.0,
                ..AgentConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    fn coordinator() -> Coordinator {
        Coordinator::with_seed(test_config(), 1)
    }

    fn calm_event(service: &str, path: &str) -> Event {
        Event::new(service, path, Features::new(0.1, 0.1, 0.02))
    }

    // -----------------------------------------------------------------------
    // Registration and snapshots
    // -----------------------------------------------------------------------

    #[test]
    fn first_event_registers_service_with_empty_snapshot() {
        let engine = coordinator();
        engine
            .on_detect_at(&calm_event("svc", "a.b"), 0)
            .unwrap();

        let snapshot = engine.snapshot("svc").unwrap();
        assert_eq!(snapshot.version(), 1);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn unknown_service_snapshot_is_an_error() {
        let engine = coordinator();
        assert!(matches!(
            engine.snapshot("ghost"),
            Err(PolicyError::UnknownService(_))
        ));
    }

    #[test]
    fn versions_are_strictly_monotone_across_commits() {
        let engine = coordinator();
        let mut last = 0;
        for path in ["a.b", "c.d", "e.f", "g.h"] {
            let version = engine.allow("svc", path).unwrap();
            assert!(
                version > last,
                "version must grow: {last} then {version}"
            );
            last = version;
        }
    }

    #[test]
    fn snapshot_readers_see_committed_allows() {
        let engine = coordinator();
        engine.allow("svc", "user.name").unwrap();
        engine.allow("svc", "user.email").unwrap();

        let snapshot = engine.snapshot("svc").unwrap();
        assert!(snapshot.contains("user.name"));
        assert!(snapshot.contains("user.email"));
        assert!(!snapshot.contains("user"));
    }

    #[test]
    fn held_snapshots_survive_later_commits() {
        let engine = coordinator();
        engine.allow("svc", "old.path").unwrap();
        let held = engine.snapshot("svc").unwrap();

        engine.suppress("svc", "old.path").unwrap();

        // The old snapshot is immutable; only a fresh load sees the change.
        assert!(held.contains("old.path"));
        assert!(!engine.snapshot("svc").unwrap().contains("old.path"));
    }

    // -----------------------------------------------------------------------
    // Grace-period promotion end to end
    // -----------------------------------------------------------------------

    #[test]
    fn promotion_flows_into_store_and_snapshot() {
        let engine = coordinator();
        let event = calm_event("svc", "data.new_field");

        let first = engine.on_detect_at(&event, 0).unwrap();
        assert_eq!(first.decision, Decision::Observe);
        let second = engine.on_detect_at(&event, 500).unwrap();
        assert_eq!(second.decision, Decision::Observe);

        let third = engine.on_detect_at(&event, 1_100).unwrap();
        assert_eq!(third.decision, Decision::Allow);

        assert_eq!(
            engine.check("svc", "data.new_field").unwrap(),
            Access::Allowed
        );
        assert!(engine.snapshot("svc").unwrap().contains("data.new_field"));
        assert_eq!(
            engine.adaptive_state("svc", "data.new_field"),
            Some(PathState::Promoted)
        );
    }

    #[test]
    fn early_third_event_stays_in_observation() {
        let engine = coordinator();
        let event = calm_event("svc", "data.new_field");

        engine.on_detect_at(&event, 0).unwrap();
        engine.on_detect_at(&event, 200).unwrap();
        let third = engine.on_detect_at(&event, 400).unwrap();

        assert_eq!(third.decision, Decision::Observe);
        assert!(!engine.snapshot("svc").unwrap().contains("data.new_field"));
        assert_eq!(
            engine.adaptive_state("svc", "data.new_field"),
            Some(PathState::Observing)
        );
    }

    // -----------------------------------------------------------------------
    // Synonym-attack rejection
    // -----------------------------------------------------------------------

    #[test]
    fn repeated_anomalous_traffic_never_promotes() {
        let engine = coordinator();
        let event = Event::new("svc", "data.message", Features::new(0.95, 0.2, 0.9));

        for i in 0..50u64 {
            engine.on_detect_at(&event, i * 100).unwrap();
        }

        // The anomaly ceiling keeps the adaptive gate closed no matter how
        // often the path repeats. Whatever the agent does per event, the
        // record never reaches Promoted.
        assert_eq!(
            engine.adaptive_state("svc", "data.message"),
            Some(PathState::Observing)
        );
    }

    #[test]
    fn agent_suppression_makes_blocks_stick() {
        let engine = coordinator();
        // Teach the agent that this feature shape is hostile.
        {
            let mut state = engine.state.lock();
            let hostile = state
                .agent
                .discretize(2, &Features::new(0.95, 0.2, 0.9));
            state.agent.set_q(hostile, AgentAction::Suppress, 10.0);
        }

        let event = Event::new("svc", "data.message", Features::new(0.95, 0.2, 0.9));
        let outcome = engine.on_detect_at(&event, 0).unwrap();
        assert_eq!(outcome.decision, Decision::Block);

        assert_eq!(
            engine.check("svc", "data.message").unwrap(),
            Access::BlockedSuppressed
        );
        assert_eq!(
            engine.adaptive_state("svc", "data.message"),
            Some(PathState::Suppressed)
        );

        // Follow-up traffic is blocked by the adaptive layer directly.
        let outcome = engine.on_detect_at(&event, 100).unwrap();
        assert_eq!(outcome.decision, Decision::Block);
    }

    #[test]
    fn suppression_is_terminal_even_for_calm_traffic() {
        let engine = coordinator();
        engine.suppress("svc", "data.field").unwrap();

        let event = calm_event("svc", "data.field");
        for t in 0..20u64 {
            let outcome = engine.on_detect_at(&event, t * 1_000).unwrap();
            assert_eq!(outcome.decision, Decision::Block);
        }
        assert_eq!(
            engine.adaptive_state("svc", "data.field"),
            Some(PathState::Suppressed)
        );
    }

    // -----------------------------------------------------------------------
    // Grace gating of agent allows
    // -----------------------------------------------------------------------

    #[test]
    fn agent_allow_is_gated_during_grace() {
        let engine = coordinator();
        // Greedy agent with an empty table ties to Allow, but the path has
        // not served its grace period, so nothing is allow-listed.
        let outcome = engine
            .on_detect_at(&calm_event("svc", "fresh.path"), 0)
            .unwrap();
        assert_eq!(outcome.decision, Decision::Observe);
        assert_eq!(
            engine.check("svc", "fresh.path").unwrap(),
            Access::DeniedNotFound
        );
    }

    #[test]
    fn agent_allow_takes_effect_after_grace() {
        let engine = coordinator();
        // High anomaly keeps the adaptive gate closed, so the decision
        // falls to the agent even after grace has been served.
        let event = Event::new("svc", "late.path", Features::new(0.9, 0.2, 0.5));
        engine.on_detect_at(&event, 0).unwrap();
        engine.on_detect_at(&event, 500).unwrap();
        let outcome = engine.on_detect_at(&event, 1_100).unwrap();

        assert_eq!(outcome.decision, Decision::Allow);
        assert_eq!(engine.check("svc", "late.path").unwrap(), Access::Allowed);
        // The adaptive record is untouched: this was an agent allow, not a
        // promotion.
        assert_eq!(
            engine.adaptive_state("svc", "late.path"),
            Some(PathState::Observing)
        );
    }

    // -----------------------------------------------------------------------
    // Transduction
    // -----------------------------------------------------------------------

    #[test]
    fn transduce_copies_suppression_not_allows() {
        let engine = coordinator();
        engine.allow("source", "x").unwrap();
        engine.suppress("source", "y.z").unwrap();

        engine.transduce("source", "target", |_| true).unwrap();

        assert_eq!(
            engine.check("target", "y.z").unwrap(),
            Access::BlockedSuppressed
        );
        assert_eq!(engine.check("target", "x").unwrap(), Access::DeniedNotFound);
    }

    #[test]
    fn transduce_filter_limits_spread() {
        let engine = coordinator();
        engine.suppress("source", "payload.content").unwrap();
        engine.suppress("source", "db.query").unwrap();

        engine
            .transduce("source", "target", |path| path.starts_with("payload"))
            .unwrap();

        assert_eq!(
            engine.check("target", "payload.content").unwrap(),
            Access::BlockedSuppressed
        );
        assert_eq!(
            engine.check("target", "db.query").unwrap(),
            Access::DeniedNotFound
        );
    }

    #[test]
    fn transduce_from_unknown_source_fails() {
        let engine = coordinator();
        assert!(matches!(
            engine.transduce("ghost", "target", |_| true),
            Err(PolicyError::UnknownService(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Export / reload
    // -----------------------------------------------------------------------

    #[test]
    fn export_reload_round_trips_policy() {
        let engine = coordinator();
        engine.allow("svc", "user.name").unwrap();
        engine.suppress("svc", "payload.content").unwrap();
        let bytes = engine.export("svc").unwrap();

        let other = coordinator();
        other.reload("svc", &bytes).unwrap();

        assert_eq!(other.check("svc", "user.name").unwrap(), Access::Allowed);
        assert_eq!(
            other.check("svc", "payload.content").unwrap(),
            Access::BlockedSuppressed
        );
        let snapshot = other.snapshot("svc").unwrap();
        assert!(snapshot.contains("user.name"));
        assert!(!snapshot.contains("payload.content"));
    }

    #[test]
    fn reload_rejects_garbage_without_side_effects() {
        let engine = coordinator();
        engine.allow("svc", "keep.me").unwrap();
        let version_before = engine.snapshot("svc").unwrap().version();

        let result = engine.reload("svc", b"not a policy store");
        assert!(matches!(result, Err(PolicyError::Serialization(_))));

        let snapshot = engine.snapshot("svc").unwrap();
        assert_eq!(snapshot.version(), version_before);
        assert!(snapshot.contains("keep.me"));
    }

    // -----------------------------------------------------------------------
    // Failure semantics
    // -----------------------------------------------------------------------

    #[test]
    fn invalid_path_fails_without_mutation() {
        let engine = coordinator();
        engine.allow("svc", "real.path").unwrap();
        let version_before = engine.snapshot("svc").unwrap().version();

        let event = calm_event("svc", "bad..path");
        assert!(matches!(
            engine.on_detect_at(&event, 0),
            Err(PolicyError::InvalidPath(_))
        ));

        assert_eq!(engine.snapshot("svc").unwrap().version(), version_before);
        assert!(engine.adaptive_state("svc", "bad..path").is_none());
    }

    #[test]
    fn compile_failure_keeps_previous_snapshot() {
        let config = EngineConfig {
            max_snapshot_paths: 1,
            ..test_config()
        };
        let engine = Coordinator::with_seed(config, 1);
        engine.allow("svc", "first.path").unwrap();

        let result = engine.allow("svc", "second.path");
        assert!(matches!(result, Err(PolicyError::Capacity(_))));

        // The store itself also rolled back: the rejected path is absent.
        assert_eq!(
            engine.check("svc", "second.path").unwrap(),
            Access::DeniedNotFound
        );
        let snapshot = engine.snapshot("svc").unwrap();
        assert!(snapshot.contains("first.path"));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn eviction_of_promoted_record_keeps_store_allow() {
        let config = EngineConfig {
            adaptive: AdaptiveConfig {
                max_records: 1,
                ..test_config().adaptive
            },
            ..test_config()
        };
        let engine = Coordinator::with_seed(config, 1);

        let event = calm_event("svc", "data.new_field");
        engine.on_detect_at(&event, 0).unwrap();
        engine.on_detect_at(&event, 500).unwrap();
        engine.on_detect_at(&event, 1_100).unwrap();
        assert!(engine.snapshot("svc").unwrap().contains("data.new_field"));

        // A different path evicts the promoted record from the table.
        engine
            .on_detect_at(&calm_event("svc", "other.path"), 2_000)
            .unwrap();
        assert!(engine.adaptive_state("svc", "data.new_field").is_none());

        // The store keeps the allow: eviction never revokes policy.
        assert!(engine.snapshot("svc").unwrap().contains("data.new_field"));
        assert_eq!(
            engine.check("svc", "data.new_field").unwrap(),
            Access::Allowed
        );
    }

    #[test]
    fn services_lists_registered_services() {
        let engine = coordinator();
        engine.allow("beta", "a").unwrap();
        engine.allow("alpha", "a").unwrap();
        assert_eq!(engine.services(), vec!["alpha", "beta"]);
    }
}
